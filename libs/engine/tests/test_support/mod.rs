#![allow(dead_code)]

use physcalc_engine::units::Quantity;
use physcalc_engine::{parse_converted_expression, Environment, EvalOptions, Result};
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use std::thread;

/// Output sink shared between a test and the environment it drives.
#[derive(Clone, Default)]
pub struct Output(Rc<RefCell<Vec<u8>>>);

impl Output {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_string).collect()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn env_with(options: EvalOptions) -> (Environment, Output) {
    let output = Output::default();
    let env = Environment::with_output(options, Box::new(output.clone()));
    (env, output)
}

pub fn env() -> (Environment, Output) {
    env_with(EvalOptions::default())
}

/// Evaluates one expression in a fresh environment.
pub fn eval(text: &str) -> Result<Quantity> {
    let (mut env, _) = env();
    eval_in(&mut env, text)
}

pub fn eval_in(env: &mut Environment, text: &str) -> Result<Quantity> {
    parse_converted_expression(text, env).value
}

/// Runs each line and panics with the failing line on error.
pub fn run(env: &mut Environment, lines: &[&str]) {
    for line in lines {
        if let Err(e) = env.execute(line) {
            panic!("'{line}' failed: {e}");
        }
    }
}

pub fn assert_close(actual: f64, expected: f64) {
    let tolerance = 1e-9 * expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected}, got {actual}"
    );
}

/// Stack size of a thread from `std::thread::spawn` and of the test harness.
pub const SMALL_STACK: usize = 2 * 1024 * 1024;

/// Runs `f` on a fresh thread with a 2 MiB stack. Panics inside `f`
/// propagate to the caller.
pub fn on_small_stack<F>(f: F)
where
    F: FnOnce() + Send + 'static,
{
    let handle = thread::Builder::new()
        .stack_size(SMALL_STACK)
        .spawn(f)
        .expect("spawn test thread");
    if let Err(panic) = handle.join() {
        std::panic::resume_unwind(panic);
    }
}
