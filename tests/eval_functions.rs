use nabla_lang::language::parser::parse_program;
use nabla_lang::runtime::{error::RuntimeError, value::Value, Interpreter};
use pretty_assertions::assert_eq;

fn run(source: &str) -> Interpreter {
    let mut interpreter = Interpreter::new();
    let program = parse_program(source).expect("parse failed");
    interpreter.run(&program).expect("run failed");
    interpreter
}

fn run_err(source: &str) -> RuntimeError {
    let mut interpreter = Interpreter::new();
    let program = parse_program(source).expect("parse failed");
    interpreter
        .run(&program)
        .expect_err("expected a runtime error")
}

fn run_more(interpreter: &mut Interpreter, source: &str) {
    let program = parse_program(source).expect("parse failed");
    interpreter.run(&program).expect("run failed");
}

fn number(interpreter: &Interpreter, name: &str) -> f64 {
    match interpreter.env().get(name) {
        Ok(Value::Number(v)) => v,
        other => panic!("expected number binding for `{name}`, got {other:?}"),
    }
}

#[test]
fn call_returns_the_returned_value() {
    let interpreter = run(
        "func add(a, b) { return a + b; }\n\
         r = add(2, 3);",
    );
    assert_eq!(number(&interpreter, "r"), 5.0);
}

#[test]
fn return_unwinds_nested_control_flow_to_the_call_site() {
    let interpreter = run(
        "func find(limit) {\n\
             i = 0;\n\
             while true {\n\
                 if i >= limit {\n\
                     return i;\n\
                 }\n\
                 i = i + 1;\n\
             }\n\
             i = 999;\n\
         }\n\
         r = find(3);",
    );
    assert_eq!(number(&interpreter, "r"), 3.0);
}

#[test]
fn function_without_return_yields_unit() {
    let interpreter = run("func noop() { x = 1; }\nu = noop();");
    assert!(matches!(interpreter.env().get("u"), Ok(Value::Unit)));
}

#[test]
fn parameters_shadow_caller_bindings_only_inside_the_call() {
    let interpreter = run(
        "x = 1;\n\
         func shadow(x) { x = 99; temp = 5; }\n\
         shadow(42);",
    );
    assert_eq!(number(&interpreter, "x"), 1.0);
    assert!(!interpreter.env().contains("temp"));
}

#[test]
fn body_observes_caller_bindings() {
    let interpreter = run(
        "g = 7;\n\
         func read() { return g; }\n\
         r = read();",
    );
    assert_eq!(number(&interpreter, "r"), 7.0);
}

#[test]
fn snapshot_restore_fully_isolates_the_call_frame() {
    let interpreter = run(
        "g = 1;\n\
         func mutate() { g = 100; }\n\
         mutate();",
    );
    assert_eq!(number(&interpreter, "g"), 1.0);
}

#[test]
fn missing_arguments_leave_parameters_unbound() {
    let err = run_err(
        "func pair(a, b) { return b; }\n\
         r = pair(1);",
    );
    assert!(matches!(err, RuntimeError::UndefinedVariable { name } if name == "b"));
}

#[test]
fn extra_arguments_are_silently_dropped() {
    let interpreter = run(
        "func first(a) { return a; }\n\
         r = first(1, 2, 3);",
    );
    assert_eq!(number(&interpreter, "r"), 1.0);
}

#[test]
fn calling_an_undefined_name_fails() {
    assert!(matches!(
        run_err("boom();"),
        RuntimeError::UndefinedFunction { name } if name == "boom"
    ));
}

#[test]
fn builtins_shadow_user_definitions() {
    let interpreter = run(
        "func sqrt(x) { return 0; }\n\
         r = sqrt(16);",
    );
    assert!((number(&interpreter, "r") - 4.0).abs() < 1e-9);
}

#[test]
fn recursion() {
    let interpreter = run(
        "func fib(n) {\n\
             if n < 2 { return n; }\n\
             return fib(n - 1) + fib(n - 2);\n\
         }\n\
         r = fib(10);",
    );
    assert_eq!(number(&interpreter, "r"), 55.0);
}

#[test]
fn redefinition_overwrites() {
    let interpreter = run(
        "func f() { return 1; }\n\
         func f() { return 2; }\n\
         r = f();",
    );
    assert_eq!(number(&interpreter, "r"), 2.0);
}

#[test]
fn definition_does_not_execute_the_body() {
    let interpreter = run("func later() { marker = 1; }");
    assert!(!interpreter.env().contains("marker"));
}

#[test]
fn environment_persists_across_runs_like_a_repl() {
    let mut interpreter = run("x = 1;");
    run_more(&mut interpreter, "y = x + 1;");
    assert_eq!(number(&interpreter, "y"), 2.0);
}

#[test]
fn function_table_persists_across_runs() {
    let mut interpreter = run("func f() { return 3; }");
    run_more(&mut interpreter, "r = f();");
    assert_eq!(number(&interpreter, "r"), 3.0);
}

#[test]
fn errors_inside_calls_still_restore_the_caller_environment() {
    let mut interpreter = Interpreter::new();
    let program = parse_program(
        "x = 1;\n\
         func bad() { x = 50; y = missing; }\n\
         bad();",
    )
    .expect("parse failed");
    assert!(interpreter.run(&program).is_err());
    assert!(matches!(
        interpreter.env().get("x"),
        Ok(Value::Number(v)) if v == 1.0
    ));
}

#[test]
fn model_handles_share_state_across_call_frames() {
    // Handles clone shallowly, so training inside a call frame survives the
    // snapshot restore.
    let interpreter = run(
        "net = create_cluster_net(1, 2);\n\
         func trainer(m) { train_cluster_net(m, [[0], [10]], 0.5, 10); }\n\
         trainer(net);\n\
         labels = predict_cluster(net, [[0], [10]]);",
    );
    match interpreter.env().get("labels") {
        Ok(Value::List(labels)) => {
            assert_eq!(labels.len(), 2);
            let a = labels[0].to_string();
            let b = labels[1].to_string();
            assert_ne!(a, b);
        }
        other => panic!("expected label list, got {other:?}"),
    }
}
