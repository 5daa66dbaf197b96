//! Function declarations fed one line at a time.

mod test_support;

use physcalc_engine::{
    continue_function_declaration, DeclarationState, Error, FunctionDeclaration, Parameter,
};
use test_support::env;

#[test]
fn test_declaration_across_three_calls() {
    let (mut env, _) = env();

    let first = continue_function_declaration("Func f(x) {", &mut env);
    assert_eq!(first.value, Ok(None));
    assert!(env.declaration_pending());

    let second = continue_function_declaration("Print x * 2", &mut env);
    assert_eq!(second.value, Ok(None));
    assert!(env.declaration_pending());

    let third = continue_function_declaration("}", &mut env);
    let function = third.value.unwrap().expect("declaration should be complete");
    assert!(!env.declaration_pending());

    assert_eq!(function.name, "f");
    assert_eq!(
        function.parameters,
        vec![Parameter {
            name: "x".into(),
            unit: None
        }]
    );
    assert_eq!(function.body, vec!["Print x * 2"]);
}

#[test]
fn test_state_returns_to_command_line_only_at_close() {
    let mut declaration = FunctionDeclaration::new();
    assert_eq!(declaration.state(), DeclarationState::ExecuteCommandLine);

    declaration.feed("Func f(x) {");
    assert_eq!(declaration.state(), DeclarationState::ReadFunctionBody);
    declaration.feed("Print x * 2");
    assert_eq!(declaration.state(), DeclarationState::ReadFunctionBody);
    declaration.feed("}");
    assert_eq!(declaration.state(), DeclarationState::ExecuteCommandLine);
}

#[test]
fn test_brace_on_its_own_line() {
    let mut declaration = FunctionDeclaration::new();
    assert_eq!(declaration.feed("Func area(w [m], h [m])").value, Ok(None));
    assert_eq!(declaration.state(), DeclarationState::ReadFunctionBlock);
    assert_eq!(declaration.feed("{").value, Ok(None));
    assert_eq!(declaration.feed("Return w * h").value, Ok(None));
    let function = declaration.feed("}").value.unwrap().unwrap();
    assert_eq!(function.parameters.len(), 2);
    assert_eq!(function.parameters[1].unit.as_deref(), Some("m"));
}

#[test]
fn test_comments_are_ignored_in_header() {
    let mut declaration = FunctionDeclaration::new();
    declaration.feed("Func f() // no parameters");
    assert_eq!(declaration.state(), DeclarationState::ReadFunctionBlock);
}

#[test]
fn test_closing_brace_inside_comment_does_not_close() {
    let mut declaration = FunctionDeclaration::new();
    declaration.feed("Func f() {");
    assert_eq!(declaration.feed("Return 1 // }").value, Ok(None));
    assert!(declaration.is_open());
}

#[test]
fn test_text_after_close_is_returned() {
    let mut declaration = FunctionDeclaration::new();
    declaration.feed("Func f() {");
    let parsed = declaration.feed("Return 1 }; Print f()");
    assert!(parsed.value.unwrap().is_some());
    assert_eq!(parsed.rest, "; Print f()");
}

#[test]
fn test_malformed_header_resets() {
    let mut declaration = FunctionDeclaration::new();
    assert!(matches!(
        declaration.feed("Func f x").value,
        Err(Error::Syntax { .. })
    ));
    assert!(!declaration.is_open());

    assert!(matches!(
        declaration.feed("Func f(1)").value,
        Err(Error::Syntax { .. })
    ));
    assert!(matches!(
        declaration.feed("Func f(x [m/]) {").value,
        Err(Error::Unit(_))
    ));
    assert!(matches!(
        declaration.feed("Func f(x) Return x").value,
        Err(Error::Syntax { .. })
    ));
}

#[test]
fn test_declarations_are_per_scope() {
    let (mut env, _) = env();
    continue_function_declaration("Func f() {", &mut env);
    assert!(env.declaration_pending());
    assert_eq!(env.cancel_declaration().as_deref(), Some("f"));
    assert!(!env.declaration_pending());
}
