//! PhysCalc - calculator for physical quantities
//!
//! Runs script files and `-e` command lines, then (with no inputs, or with
//! `--interactive`) reads commands from stdin.

mod config;
mod logging;
mod repl;

use anyhow::Context;
use clap::Parser;
use config::Config;
use physcalc_engine::Environment;
use std::path::PathBuf;
use std::thread;

/// Evaluation recurses once per user-function call and argument list. The
/// engine defaults fit 2 MiB; this leaves room up to `MAX_DEPTH_LIMIT`.
const SESSION_STACK_SIZE: usize = 64 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "physcalc", version)]
#[command(about = "Calculator for physical quantities with units")]
struct Args {
    /// Script files to run, in order
    files: Vec<PathBuf>,

    /// Command line to execute (repeatable)
    #[arg(short = 'e', long = "eval", value_name = "COMMANDS")]
    eval: Vec<String>,

    /// Read commands from stdin after running files and -e lines
    #[arg(short, long)]
    interactive: bool,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum depth of nested function calls
    #[arg(long)]
    max_call_depth: Option<usize>,

    /// Maximum nesting of parentheses and argument lists
    #[arg(long)]
    max_nesting: Option<usize>,

    /// Label impossible [unit] conversions instead of failing
    #[arg(long)]
    lenient_conversion: bool,

    /// Significant digits of printed values
    #[arg(short, long)]
    precision: Option<usize>,

    /// Treat ',' only as a list separator, never as a decimal point.
    /// By default `max(1,2)` reads one argument, 1.2; write `max(1, 2)`.
    #[arg(long)]
    no_decimal_comma: bool,

    /// Additional directory searched by Read and file functions (repeatable)
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    /// Flags take precedence over every configuration source.
    fn apply(&self, config: &mut Config) {
        if let Some(depth) = self.max_call_depth {
            config.engine.max_call_depth = depth;
        }
        if let Some(nesting) = self.max_nesting {
            config.engine.max_nesting = nesting;
        }
        if self.lenient_conversion {
            config.engine.lenient_conversion = true;
        }
        if let Some(precision) = self.precision {
            config.engine.precision = Some(precision);
        }
        if self.no_decimal_comma {
            config.engine.decimal_comma = false;
        }
        config.engine.script_dirs.extend(self.include.iter().cloned());
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }

    fn wants_session(&self) -> bool {
        self.interactive || (self.files.is_empty() && self.eval.is_empty())
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    let _log_guard = logging::init_logging(&config.logging).context("Failed to initialize logging")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting PhysCalc");

    let session = thread::Builder::new()
        .name("session".into())
        .stack_size(SESSION_STACK_SIZE)
        .spawn(move || run(&args, &config))
        .context("Failed to start session thread")?;

    session
        .join()
        .map_err(|_| anyhow::anyhow!("Session thread panicked"))?
}

fn run(args: &Args, config: &Config) -> anyhow::Result<()> {
    let mut env = Environment::new(config.eval_options());

    for file in &args.files {
        env.run_script(file)
            .map_err(|e| anyhow::anyhow!(repl::describe(&e)))
            .with_context(|| format!("Failed to run {}", file.display()))?;
    }
    for line in &args.eval {
        env.execute(line)
            .map_err(|e| anyhow::anyhow!(repl::describe(&e)))
            .with_context(|| format!("Failed to execute '{line}'"))?;
    }
    if let Some(name) = env.cancel_declaration() {
        anyhow::bail!("declaration of '{name}' was never closed");
    }

    if args.wants_session() {
        repl::run(&mut env)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn arguments_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn flags_override_configuration() {
        let args = Args::parse_from([
            "physcalc",
            "--precision",
            "4",
            "--lenient-conversion",
            "--max-nesting",
            "64",
            "--no-decimal-comma",
            "-I",
            "lib",
            "--log-level",
            "debug",
            "-e",
            "Print 1",
        ]);
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.engine.precision, Some(4));
        assert_eq!(config.engine.max_nesting, 64);
        assert!(config.engine.lenient_conversion);
        assert!(!config.engine.decimal_comma);
        assert_eq!(config.engine.script_dirs, vec![PathBuf::from("lib")]);
        assert_eq!(config.logging.level, "debug");
        assert!(!args.wants_session());
    }

    #[test]
    fn no_inputs_starts_a_session() {
        let args = Args::parse_from(["physcalc"]);
        assert!(args.wants_session());
    }
}
