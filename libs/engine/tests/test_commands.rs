//! Command interpreter tests: bindings, functions, namespaces and scripts.

mod test_support;

use physcalc_engine::units;
use physcalc_engine::{execute_lines, Error, EvalOptions, DEFAULT_MAX_CALL_DEPTH};
use std::fs;
use test_support::{assert_close, env, env_with, eval_in, on_small_stack, run};

#[test]
fn test_print_and_bare_expressions() {
    let (mut env, out) = env();
    run(&mut env, &["Print 1 + 1, 3 m", "2 * 3", "PRINT 4 km [m]"]);
    assert_eq!(out.lines(), vec!["2, 3 m", "6", "4000 m"]);
}

#[test]
fn test_several_commands_on_one_line() {
    let (mut env, out) = env();
    run(&mut env, &["Var a = 1; Var b = 2; Print a + b // trailing comment"]);
    assert_eq!(out.lines(), vec!["3"]);
}

#[test]
fn test_variables_and_assignment() {
    let (mut env, out) = env();
    run(&mut env, &["Var x = 3 m", "Print x * 2", "y = 5", "y = y + 1", "Print y"]);
    assert_eq!(out.lines(), vec!["6 m", "6"]);
}

#[test]
fn test_unexpected_trailing_input() {
    let (mut env, _) = env();
    assert!(matches!(env.execute("Var x = 1 ]"), Err(Error::Syntax { .. })));
}

#[test]
fn test_precision_option() {
    let (mut env, out) = env_with(EvalOptions {
        precision: Some(3),
        ..EvalOptions::default()
    });
    run(&mut env, &["Print 2 / 3", "Print 12.3456 m"]);
    assert_eq!(out.lines(), vec!["0.667", "12.3 m"]);
}

#[test]
fn test_unit_declaration() {
    let (mut env, out) = env();
    run(&mut env, &["Unit furlong = 201.168 m", "Print 1 furlong [m]", "Print 2 furlong"]);
    assert_eq!(out.lines(), vec!["201.168 m", "2 furlong"]);
}

#[test]
fn test_unit_declaration_from_expression() {
    let (mut env, _) = env();
    run(&mut env, &["Unit knot = 1852 m / 1 h"]);
    let speed = eval_in(&mut env, "10 knot [km/h]").unwrap();
    assert_close(speed.value(), 18.52);
}

#[test]
fn test_duplicate_unit_symbol() {
    let (mut env, _) = env();
    assert!(matches!(
        env.execute("Unit m = 3 s"),
        Err(Error::Unit(units::Error::DuplicateSymbol(_)))
    ));
}

#[test]
fn test_single_line_function() {
    let (mut env, out) = env();
    run(&mut env, &["Func sq(x) { Return x * x }", "Print sq(3)", "Print sq(sq(2))"]);
    assert_eq!(out.lines(), vec!["9", "16"]);
}

#[test]
fn test_commands_after_closing_brace_run() {
    let (mut env, out) = env();
    run(&mut env, &["Func one() { Return 1 } Print one() + 1"]);
    assert_eq!(out.lines(), vec!["2"]);
}

#[test]
fn test_multi_line_function() {
    let (mut env, out) = env();
    run(&mut env, &["Func f(x) {", "Print x * 2", "}"]);
    assert!(!env.declaration_pending());
    run(&mut env, &["f(4)"]);
    // The body prints; the call itself yields false.
    assert_eq!(out.lines(), vec!["8", "0"]);
}

#[test]
fn test_pending_declaration_swallows_lines() {
    let (mut env, out) = env();
    run(&mut env, &["Func g() {", "Print 1"]);
    assert!(env.declaration_pending());
    assert!(out.lines().is_empty());
    run(&mut env, &["}"]);
    assert!(!env.declaration_pending());
}

#[test]
fn test_parameters_shadow_globals() {
    let (mut env, out) = env();
    run(&mut env, &["Var x = 1", "Func id(x) { Return x }", "Print id(5), x"]);
    assert_eq!(out.lines(), vec!["5, 1"]);
}

#[test]
fn test_functions_assign_outer_variables() {
    let (mut env, out) = env();
    run(&mut env, &[
        "Var counter = 0",
        "Func bump() { counter = counter + 1 }",
        "bump(); bump()",
        "Print counter",
    ]);
    assert_eq!(out.lines(), vec!["0", "0", "2"]);
}

#[test]
fn test_function_locals_are_dropped() {
    let (mut env, _) = env();
    run(&mut env, &["Func f() { Var local = 3; Return local }", "Print f()"]);
    assert_eq!(
        env.execute("Print local"),
        Err(Error::UnknownIdentifier("local".into()))
    );
}

#[test]
fn test_parameter_units_convert_arguments() {
    let (mut env, _) = env();
    run(&mut env, &["Func speed(d [m], t [s]) { Return d / t }"]);
    let v = eval_in(&mut env, "speed(1 km, 1 min) [m/s]").unwrap();
    assert_close(v.value(), 1000.0 / 60.0);

    match eval_in(&mut env, "speed(1 s, 1 s)") {
        Err(Error::ParameterUnit { function, param, unit }) => {
            assert_eq!((function.as_str(), param.as_str(), unit.as_str()), ("speed", "d", "m"));
        }
        other => panic!("expected a parameter unit error, got {other:?}"),
    }
}

#[test]
fn test_user_function_arity() {
    let (mut env, _) = env();
    run(&mut env, &["Func add(a, b) { Return a + b }"]);
    assert!(matches!(
        eval_in(&mut env, "add(1)"),
        Err(Error::Arity { got: 1, .. })
    ));
}

#[test]
fn test_recursion_limit() {
    let (mut env, _) = env_with(EvalOptions {
        max_call_depth: 20,
        ..EvalOptions::default()
    });
    run(&mut env, &["Func forever(n) { Return forever(n + 1) }"]);
    assert_eq!(
        eval_in(&mut env, "forever(0)"),
        Err(Error::RecursionLimit(20))
    );
    assert_eq!(env.depth(), 0);
}

#[test]
fn test_default_recursion_limit_on_small_stack() {
    on_small_stack(|| {
        let (mut env, _) = env();
        run(&mut env, &["Func r(n) { Return r(n + 1) }"]);
        assert_eq!(
            eval_in(&mut env, "r(0)"),
            Err(Error::RecursionLimit(DEFAULT_MAX_CALL_DEPTH))
        );
        assert_eq!(env.depth(), 0);
    });
}

#[test]
fn test_default_call_depth_is_reachable_on_small_stack() {
    on_small_stack(|| {
        let (mut env, _) = env();
        // f0 calls f1 calls ... the last one, one frame each.
        let last = DEFAULT_MAX_CALL_DEPTH - 1;
        for i in 0..last {
            run(&mut env, &[format!("Func f{i}(n) {{ Return f{}(n) + 1 }}", i + 1).as_str()]);
        }
        run(&mut env, &[format!("Func f{last}(n) {{ Return n }}").as_str()]);
        assert_eq!(
            eval_in(&mut env, "f0(0)").map(|q| q.value()),
            Ok(last as f64)
        );
    });
}

#[test]
fn test_return_outside_function() {
    let (mut env, _) = env();
    assert!(matches!(env.execute("Return 1"), Err(Error::Evaluation(_))));
}

#[test]
fn test_unclosed_declaration_in_batch() {
    let (mut env, _) = env();
    assert!(matches!(
        execute_lines(&mut env, &["Func f() {", "Return 1"]),
        Err(Error::Declaration(_))
    ));
    assert!(!env.declaration_pending());
}

#[test]
fn test_batch_returns_first_return_value() {
    let (mut env, _) = env();
    run(&mut env, &["Func f() {", "Return 7", "Return 8", "}"]);
    assert_eq!(eval_in(&mut env, "f()").unwrap().value(), 7.0);
}

#[test]
fn test_duplicate_parameter() {
    let (mut env, _) = env();
    assert!(matches!(
        env.execute("Func f(a, a) { Return a }"),
        Err(Error::Declaration(_))
    ));
    assert!(!env.declaration_pending());
}

#[test]
fn test_namespaces() {
    let (mut env, out) = env();
    run(&mut env, &[
        "Namespace phys",
        "Var phys.c = 299792458 m/s",
        "Namespace phys.em",
        "Var phys.em.e = 1.602176634E-19 C",
        "Print phys.c",
        "Print phys.em.e * 1 V [J]",
    ]);
    let lines = out.lines();
    assert_eq!(lines[0], "299792458 m/s");
    assert!(lines[1].ends_with(" J"));
}

#[test]
fn test_function_cannot_extend_outer_namespace() {
    let (mut env, _) = env();
    run(&mut env, &[
        "Namespace Outer",
        "Func mk() {",
        "Namespace Outer.inner",
        "Return 1",
        "}",
    ]);
    assert!(matches!(env.execute("Print mk()"), Err(Error::Declaration(_))));
    assert_eq!(
        env.execute("Var Outer.inner.x = 1"),
        Err(Error::UnknownIdentifier("inner".into()))
    );
    run(&mut env, &["Var Outer.x = 1"]);
    assert_eq!(env.depth(), 0);
}

#[test]
fn test_function_local_namespace() {
    let (mut env, out) = env();
    run(&mut env, &[
        "Func local() {",
        "Namespace tmp",
        "Var tmp.x = 3 m",
        "Namespace tmp.deeper",
        "Return tmp.x",
        "}",
        "Print local()",
        "Print local()",
    ]);
    assert_eq!(out.lines(), vec!["3 m", "3 m"]);
    assert_eq!(
        env.execute("Print tmp.x"),
        Err(Error::UnknownIdentifier("tmp".into()))
    );
}

#[test]
fn test_namespace_must_exist() {
    let (mut env, _) = env();
    assert_eq!(
        env.execute("Var nowhere.x = 1"),
        Err(Error::UnknownIdentifier("nowhere".into()))
    );
}

#[test]
fn test_names_cannot_change_kind() {
    let (mut env, _) = env();
    run(&mut env, &["Namespace space"]);
    assert!(matches!(env.execute("Var space = 1"), Err(Error::Declaration(_))));
    assert!(matches!(env.execute("space = 1"), Err(Error::Evaluation(_))));
}

#[test]
fn test_qualified_unit_system_lookup() {
    let (mut env, out) = env();
    run(&mut env, &["Print 3 * SI.km [m]"]);
    assert_eq!(out.lines(), vec!["3000 m"]);
}

#[test]
fn test_remove() {
    let (mut env, _) = env();
    run(&mut env, &["Var tmp = 1", "Remove tmp"]);
    assert_eq!(
        env.execute("Print tmp"),
        Err(Error::UnknownIdentifier("tmp".into()))
    );
    assert!(matches!(env.execute("Remove SI"), Err(Error::Evaluation(_))));
    assert!(matches!(
        env.execute("Remove missing"),
        Err(Error::UnknownIdentifier(_))
    ));
}

#[test]
fn test_list() {
    let (mut env, out) = env();
    run(&mut env, &["Var x = 2 m", "Func g(a [m], b) { Return a }", "Namespace ns", "List"]);
    let lines = out.lines();
    assert!(lines.contains(&"x = 2 m".to_string()), "{lines:?}");
    assert!(lines.contains(&"g(a [m], b)".to_string()), "{lines:?}");
    assert!(lines.contains(&"SI: unit system".to_string()), "{lines:?}");
    assert!(lines.contains(&"ns: namespace ns".to_string()), "{lines:?}");
}

#[test]
fn test_read_script() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("consts.cal"),
        "// gravity\nVar g0 = 9.80665 m/s^2\nFunc weight(mass [Kg]) {\n  Return mass * g0\n}\n",
    )
    .unwrap();

    let (mut env, out) = env_with(EvalOptions {
        script_dirs: vec![dir.path().to_path_buf()],
        ..EvalOptions::default()
    });
    run(&mut env, &["Read consts", "Print g0", "Print weight(2 Kg)"]);
    assert_eq!(out.lines(), vec!["9.80665 m/s^2", "19.6133 N"]);
}

#[test]
fn test_read_missing_file() {
    let (mut env, _) = env();
    assert!(matches!(
        env.execute("Read surely_not_here"),
        Err(Error::Io { .. })
    ));
}

#[test]
fn test_file_function() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("answer.cal"), "Var local = 40\nReturn local + 2\n").unwrap();

    let (mut env, out) = env_with(EvalOptions {
        script_dirs: vec![dir.path().to_path_buf()],
        ..EvalOptions::default()
    });
    run(&mut env, &["Print answer() * 2 m"]);
    assert_eq!(out.lines(), vec!["84 m"]);
    assert_eq!(
        env.execute("Print local"),
        Err(Error::UnknownIdentifier("local".into()))
    );
}

#[test]
fn test_errors_leave_environment_usable() {
    let (mut env, out) = env();
    assert!(env.execute("Print 1 m + 1 s").is_err());
    run(&mut env, &["Print 1 m + 1 m"]);
    assert_eq!(out.lines(), vec!["2 m"]);
}
