use std::{fs, path::PathBuf};

use amaryllis::{
    environment::{Environment, EnvironmentRef, ProgramEnvironment},
    evaluator,
    value::{Value, ValueKind},
};
use tempfile::tempdir;

fn test_environment() -> EnvironmentRef {
    let run_directory = std::env::current_dir().expect("current directory");
    let program = ProgramEnvironment::new(run_directory);
    Environment::new(PathBuf::from("<test>"), program)
}

fn eval_option(source: &str) -> Option<Value> {
    evaluator::evaluate_source(source, &test_environment()).expect("source should parse")
}

fn eval(source: &str) -> Value {
    eval_option(source).expect("expected a value")
}

fn expect_int(value: &Value) -> i64 {
    match &*value.0 {
        ValueKind::Integer(n) => *n,
        _ => panic!("expected INTEGER, found {} ({value})", value.type_name()),
    }
}

fn expect_bool(value: &Value) -> bool {
    match &*value.0 {
        ValueKind::Boolean(b) => *b,
        _ => panic!("expected BOOLEAN, found {} ({value})", value.type_name()),
    }
}

fn expect_string(value: &Value) -> String {
    match &*value.0 {
        ValueKind::String(s) => s.clone(),
        _ => panic!("expected STRING, found {} ({value})", value.type_name()),
    }
}

fn expect_null(value: &Value) {
    assert!(
        matches!(&*value.0, ValueKind::Null),
        "expected NULL, found {} ({value})",
        value.type_name()
    );
}

fn expect_error(value: &Value) -> String {
    match &*value.0 {
        ValueKind::Error(message) => message.clone(),
        _ => panic!("expected ERROR, found {} ({value})", value.type_name()),
    }
}

#[test]
fn evaluates_integer_arithmetic() {
    let cases = [
        ("5 + 5 * 2", 15),
        ("10 / 3", 3),
        ("-50 + 100 + -50", 0),
        ("(5 + 10 * 2 + 15 / 3) * 2 + -10", 50),
        ("2 * 2 * 2 * 2", 16),
    ];
    for (source, expected) in cases {
        assert_eq!(expect_int(&eval(source)), expected, "{source}");
    }
}

#[test]
fn division_truncates_and_zero_is_an_error() {
    assert_eq!(expect_int(&eval("7 / 2")), 3);
    assert_eq!(expect_error(&eval("1 / 0")), "division by zero");
}

#[test]
fn evaluates_string_concatenation() {
    assert_eq!(expect_string(&eval("\"foo\" + \"bar\"")), "foobar");
}

#[test]
fn string_comparison_is_an_unknown_operator() {
    assert_eq!(
        expect_error(&eval("\"a\" < \"b\"")),
        "unknown operator: STRING < STRING"
    );
}

#[test]
fn bang_negates_truthiness() {
    let cases = [
        ("!true", false),
        ("!false", true),
        ("!!true", true),
        ("!5", false),
        ("!0", false),
    ];
    for (source, expected) in cases {
        assert_eq!(expect_bool(&eval(source)), expected, "{source}");
    }
}

#[test]
fn minus_prefix_is_integer_only() {
    assert_eq!(expect_int(&eval("-5")), -5);
    assert_eq!(expect_error(&eval("-true")), "unknown operator: -BOOLEAN");
}

#[test]
fn comparison_and_equality_on_integers() {
    let cases = [
        ("1 < 2", true),
        ("1 > 2", false),
        ("1 == 1", true),
        ("1 != 1", false),
        ("1 != 2", true),
    ];
    for (source, expected) in cases {
        assert_eq!(expect_bool(&eval(source)), expected, "{source}");
    }
}

#[test]
fn equality_falls_back_to_identity() {
    let cases = [
        ("true == true", true),
        ("false == false", true),
        ("true == false", false),
        ("true != false", true),
        ("(1 < 2) == true", true),
        // Mixed kinds compare by identity rather than erroring.
        ("5 == true", false),
        ("5 != true", true),
    ];
    for (source, expected) in cases {
        assert_eq!(expect_bool(&eval(source)), expected, "{source}");
    }
}

#[test]
fn type_mismatch_error_message() {
    assert_eq!(
        expect_error(&eval("5 + true")),
        "type mismatch: INTEGER + BOOLEAN"
    );
    // Evaluation halts at the error.
    assert_eq!(
        expect_error(&eval("5 + true; 5;")),
        "type mismatch: INTEGER + BOOLEAN"
    );
}

#[test]
fn unknown_operator_on_same_types() {
    assert_eq!(
        expect_error(&eval("true + false")),
        "unknown operator: BOOLEAN + BOOLEAN"
    );
}

#[test]
fn if_expressions_branch_on_truthiness() {
    assert_eq!(expect_int(&eval("if (1 < 2) { 10 } else { 20 }")), 10);
    assert_eq!(expect_int(&eval("if (1 > 2) { 10 } else { 20 }")), 20);
    expect_null(&eval("if (false) { 10 }"));
    // Zero is truthy.
    assert_eq!(expect_int(&eval("if (0) { 1 } else { 2 }")), 1);
}

#[test]
fn return_short_circuits_the_program() {
    assert_eq!(expect_int(&eval("9; return 2 * 5; 9;")), 10);
}

#[test]
fn return_propagates_through_nested_blocks() {
    let source = "
        if (10 > 1) {
            if (10 > 1) {
                return 10;
            }
            return 1;
        }
    ";
    assert_eq!(expect_int(&eval(source)), 10);
}

#[test]
fn let_binds_and_identifiers_resolve() {
    let cases = [
        ("let a = 5; a;", 5),
        ("let a = 5 * 5; a;", 25),
        ("let a = 5; let b = a; b;", 5),
        ("let a = 5; let b = a; let c = a + b + 5; c;", 15),
    ];
    for (source, expected) in cases {
        assert_eq!(expect_int(&eval(source)), expected, "{source}");
    }
}

#[test]
fn let_shadows_in_inner_scope_only() {
    let source = "
        let x = 5;
        let shadow = function() { let x = 10; x };
        shadow() + x
    ";
    assert_eq!(expect_int(&eval(source)), 15);
}

#[test]
fn unknown_identifier_error_message() {
    assert_eq!(expect_error(&eval("foobar")), "identifier not found: foobar");
}

#[test]
fn let_does_not_bind_on_error() {
    let source = "let a = missing; a;";
    assert_eq!(expect_error(&eval(source)), "identifier not found: missing");
}

#[test]
fn functions_apply_and_fall_through_to_last_value() {
    let cases = [
        ("let identity = function(x) { x; }; identity(5);", 5),
        ("let identity = function(x) { return x; }; identity(5);", 5),
        ("let double = function(x) { x * 2; }; double(5);", 10),
        ("let add = function(x, y) { x + y; }; add(5, add(5, 5));", 15),
        ("function(x) { x; }(5)", 5),
    ];
    for (source, expected) in cases {
        assert_eq!(expect_int(&eval(source)), expected, "{source}");
    }
}

#[test]
fn closures_capture_their_defining_environment() {
    let source = "
        let newAdder = function(x) {
            function(y) { x + y }
        };
        let addTwo = newAdder(2);
        addTwo(3);
    ";
    assert_eq!(expect_int(&eval(source)), 5);
}

#[test]
fn recursive_functions_evaluate() {
    let source = "
        let fib = function(n) {
            if (n < 2) { return n; }
            return fib(n - 1) + fib(n - 2);
        };
        fib(10);
    ";
    assert_eq!(expect_int(&eval(source)), 55);
}

#[test]
fn arity_mismatch_is_an_error() {
    let source = "let add = function(x, y) { x + y; }; add(1);";
    assert_eq!(
        expect_error(&eval(source)),
        "function expected 2 arguments but received 1"
    );
}

#[test]
fn calling_a_non_function_is_an_error() {
    assert_eq!(expect_error(&eval("5(1)")), "not a function: INTEGER");
}

#[test]
fn array_literals_and_indexing() {
    assert_eq!(expect_int(&eval("[1, 2 * 2, 3 + 3][2]")), 6);
    assert_eq!(expect_int(&eval("let xs = [1, 2, 3]; xs[0] + xs[1] + xs[2]")), 6);
}

#[test]
fn array_index_out_of_range_yields_null() {
    expect_null(&eval("[1, 2, 3][3]"));
    expect_null(&eval("[1, 2, 3][-1]"));
}

#[test]
fn array_evaluation_stops_at_first_error() {
    assert_eq!(
        expect_error(&eval("[1, missing, 3]")),
        "identifier not found: missing"
    );
}

#[test]
fn hash_literals_with_mixed_keys() {
    let source = "
        let h = {\"one\": 1, 2: \"two\", true: 3};
        h[\"one\"] + h[true]
    ";
    assert_eq!(expect_int(&eval(source)), 4);
    assert_eq!(
        expect_string(&eval("let h = {2: \"two\"}; h[2]")),
        "two"
    );
}

#[test]
fn hash_missing_key_yields_null() {
    expect_null(&eval("{\"a\": 1}[\"missing\"]"));
}

#[test]
fn hash_duplicate_keys_keep_the_last_value() {
    assert_eq!(expect_int(&eval("{\"a\": 1, \"a\": 2}[\"a\"]")), 2);
}

#[test]
fn unusable_hash_key_is_an_error() {
    assert_eq!(
        expect_error(&eval("{[1, 2]: 3}")),
        "unusable as hash key: ARRAY"
    );
    assert_eq!(
        expect_error(&eval("{\"a\": 1}[[1]]")),
        "unusable as hash key: ARRAY"
    );
}

#[test]
fn index_on_unsupported_type_is_an_error() {
    assert_eq!(
        expect_error(&eval("5[0]")),
        "index operator not supported: INTEGER"
    );
}

#[test]
fn hash_bare_key_shorthand_reuses_the_key_expression() {
    assert_eq!(expect_int(&eval("let h = {3}; h[3]")), 3);
}

#[test]
fn trailing_let_produces_no_value() {
    assert!(eval_option("let a = 5;").is_none());
}

#[test]
fn export_records_and_returns_the_value() {
    let value = eval("let answer = 42; export answer;");
    assert_eq!(expect_int(&value), 42);
}

#[test]
fn imports_bind_module_exports() {
    let dir = tempdir().expect("temp dir");
    fs::write(
        dir.path().join("mathlib.ama"),
        "let double = function(x) { x * 2; };\nexport double;\n",
    )
    .expect("write module");

    let run_directory = dir.path().canonicalize().expect("canonicalize");
    let program = ProgramEnvironment::new(run_directory.clone());
    let environment = Environment::new(run_directory.join("main.ama"), program);

    let value = evaluator::evaluate_source(
        "import \"mathlib.ama\" mathlib; mathlib.double(21);",
        &environment,
    )
    .expect("parse")
    .expect("value");
    assert_eq!(expect_int(&value), 42);
}

#[test]
fn importing_twice_reuses_the_registry_entry() {
    let dir = tempdir().expect("temp dir");
    fs::write(
        dir.path().join("shared.ama"),
        "let value = function() { 7 };\nexport value;\n",
    )
    .expect("write module");

    let run_directory = dir.path().canonicalize().expect("canonicalize");
    let program = ProgramEnvironment::new(run_directory.clone());
    let environment = Environment::new(run_directory.join("main.ama"), program.clone());

    let value = evaluator::evaluate_source(
        "import \"shared.ama\" a; import \"shared.ama\" b; a.value() + b.value();",
        &environment,
    )
    .expect("parse")
    .expect("value");
    assert_eq!(expect_int(&value), 14);
    assert!(program
        .borrow()
        .is_module_registered(&run_directory.join("shared.ama")));
}

#[test]
fn missing_export_is_an_error() {
    let dir = tempdir().expect("temp dir");
    fs::write(dir.path().join("empty.ama"), "let hidden = 1;\n").expect("write module");

    let run_directory = dir.path().canonicalize().expect("canonicalize");
    let program = ProgramEnvironment::new(run_directory.clone());
    let environment = Environment::new(run_directory.join("main.ama"), program);

    let value = evaluator::evaluate_source(
        "import \"empty.ama\" empty; empty.hidden();",
        &environment,
    )
    .expect("parse")
    .expect("value");
    assert_eq!(expect_error(&value), "export not found: hidden");
}

#[test]
fn exports_only_cover_executed_statements() {
    let dir = tempdir().expect("temp dir");
    fs::write(
        dir.path().join("partial.ama"),
        "let early = function() { 1 };\nexport early;\n",
    )
    .expect("write module");

    let run_directory = dir.path().canonicalize().expect("canonicalize");
    let program = ProgramEnvironment::new(run_directory.clone());
    let environment = Environment::new(run_directory.join("main.ama"), program);

    let value = evaluator::evaluate_source(
        "import \"partial.ama\" partial; partial.early();",
        &environment,
    )
    .expect("parse")
    .expect("value");
    assert_eq!(expect_int(&value), 1);
}

#[test]
fn access_on_a_non_import_is_an_error() {
    let value = eval("let x = 5; x.y(1)");
    assert_eq!(expect_error(&value), "access not supported: INTEGER");
}

#[test]
fn access_without_a_call_is_an_error() {
    let dir = tempdir().expect("temp dir");
    fs::write(dir.path().join("lib.ama"), "let f = function() { 1 };\nexport f;\n")
        .expect("write module");

    let run_directory = dir.path().canonicalize().expect("canonicalize");
    let program = ProgramEnvironment::new(run_directory.clone());
    let environment = Environment::new(run_directory.join("main.ama"), program);

    let value = evaluator::evaluate_source("import \"lib.ama\" lib; lib.f;", &environment)
        .expect("parse")
        .expect("value");
    let message = expect_error(&value);
    assert!(message.starts_with("access not supported"), "{message}");
}

#[test]
fn print_builtin_resolves_and_returns_null() {
    expect_null(&eval("print(\"\")"));
    // A let binding shadows the builtin.
    assert_eq!(expect_int(&eval("let print = 3; print")), 3);
}
