use std::{path::Path, process, rc::Rc};

use indexmap::IndexMap;

use crate::{
    ast::{BinaryOp, BlockStatement, Expression, Identifier, Program, Statement, UnaryOp},
    builtins,
    diagnostics::AmaryllisError,
    environment::{Environment, EnvironmentRef},
    lexer::Lexer,
    parser::{self, Parser},
    value::{HashPair, Value, ValueKind},
};

/// Evaluates a parsed program against an environment. Statements produce an
/// optional value; the program stops early on an `Error` value and unwraps
/// one `ReturnValue` layer at the top.
pub fn evaluate(program: &Program, environment: &EnvironmentRef) -> Option<Value> {
    let mut result = None;
    for statement in &program.statements {
        result = evaluate_statement(statement, environment);
        if let Some(value) = &result {
            match &*value.0 {
                ValueKind::ReturnValue(inner) => return Some(inner.clone()),
                ValueKind::Error(_) => return result,
                _ => {}
            }
        }
    }
    result
}

/// Parses and evaluates a complete source string; syntax errors are returned
/// without evaluating anything.
pub fn evaluate_source(
    source: &str,
    environment: &EnvironmentRef,
) -> Result<Option<Value>, AmaryllisError> {
    let lexer = Lexer::new(source);
    let mut parser = Parser::new(lexer);
    let program = parser.parse_program();
    if !parser.errors().is_empty() {
        return Err(AmaryllisError::Parse(parser.errors().to_vec()));
    }
    Ok(evaluate(&program, environment))
}

fn evaluate_statement(statement: &Statement, environment: &EnvironmentRef) -> Option<Value> {
    match statement {
        Statement::Let { name, value } => {
            let value = evaluate_expression(value, environment);
            if value.is_error() {
                return Some(value);
            }
            environment.borrow_mut().set(name.name.clone(), value);
            None
        }
        Statement::Return { value } => {
            let value = evaluate_expression(value, environment);
            if value.is_error() {
                return Some(value);
            }
            Some(Value::return_value(value))
        }
        Statement::Expression { expression } => Some(evaluate_expression(expression, environment)),
        Statement::Import { path, binding } => evaluate_import(path, binding, environment),
        Statement::Export { name } => Some(evaluate_export(name, environment)),
    }
}

/// Blocks stop on either control signal but leave `ReturnValue` wrapped, so
/// a `return` inside nested blocks keeps propagating until the enclosing
/// program or function call unwraps it.
fn evaluate_block(block: &BlockStatement, environment: &EnvironmentRef) -> Option<Value> {
    let mut result = None;
    for statement in &block.statements {
        result = evaluate_statement(statement, environment);
        if let Some(value) = &result {
            if matches!(&*value.0, ValueKind::ReturnValue(_) | ValueKind::Error(_)) {
                return result;
            }
        }
    }
    result
}

fn evaluate_import(path: &str, binding: &Identifier, environment: &EnvironmentRef) -> Option<Value> {
    let (run_directory, program) = {
        let environment = environment.borrow();
        (environment.run_directory(), environment.program())
    };
    let filepath = run_directory.join(path);
    let filepath = filepath.canonicalize().unwrap_or(filepath);

    if !program.borrow().is_module_registered(&filepath) {
        program.borrow_mut().register_module(filepath.clone());
        let module = match parser::parse_file(&filepath) {
            Ok(module) => module,
            Err(AmaryllisError::Parse(diagnostics)) => {
                for diagnostic in &diagnostics {
                    eprintln!("{diagnostic}");
                }
                abort_module_failure(&filepath);
            }
            Err(error) => {
                eprintln!("{error}");
                abort_module_failure(&filepath);
            }
        };
        let module_environment = Environment::new(filepath.clone(), Rc::clone(&program));
        if let Some(result) = evaluate(&module, &module_environment) {
            if result.is_error() {
                eprintln!("{result}");
                abort_module_failure(&filepath);
            }
        }
    }

    environment
        .borrow_mut()
        .set(binding.name.clone(), Value::import(filepath));
    None
}

/// A failing import is fatal to the whole run: imports happen outside normal
/// expression evaluation, so there is no error-value channel to hand the
/// failure back through.
fn abort_module_failure(path: &Path) -> ! {
    eprintln!("failed to load module {}", path.display());
    process::exit(1);
}

fn evaluate_export(name: &Identifier, environment: &EnvironmentRef) -> Value {
    let value = evaluate_identifier(name, environment);
    if value.is_error() {
        return value;
    }
    environment.borrow().export(name.name.clone(), value.clone());
    value
}

fn evaluate_expression(expression: &Expression, environment: &EnvironmentRef) -> Value {
    match expression {
        Expression::Identifier(identifier) => evaluate_identifier(identifier, environment),
        Expression::IntegerLiteral { value } => Value::integer(*value),
        Expression::StringLiteral { value } => Value::string(value.clone()),
        Expression::Boolean { value } => Value::boolean(*value),
        Expression::Prefix { operator, right } => {
            let right = evaluate_expression(right, environment);
            if right.is_error() {
                return right;
            }
            evaluate_prefix_expression(*operator, right)
        }
        Expression::Infix {
            operator,
            left,
            right,
        } => {
            let left = evaluate_expression(left, environment);
            if left.is_error() {
                return left;
            }
            let right = evaluate_expression(right, environment);
            if right.is_error() {
                return right;
            }
            evaluate_infix_expression(*operator, left, right)
        }
        Expression::If {
            condition,
            consequence,
            alternative,
        } => {
            let condition = evaluate_expression(condition, environment);
            if condition.is_error() {
                return condition;
            }
            if condition.is_truthy() {
                evaluate_block(consequence, environment).unwrap_or_else(Value::null)
            } else if let Some(alternative) = alternative {
                evaluate_block(alternative, environment).unwrap_or_else(Value::null)
            } else {
                Value::null()
            }
        }
        Expression::Function { parameters, body } => Value::function(
            parameters.clone(),
            body.clone(),
            Rc::clone(environment),
        ),
        Expression::Call {
            function,
            arguments,
        } => {
            let function = evaluate_expression(function, environment);
            if function.is_error() {
                return function;
            }
            let arguments = match evaluate_expressions(arguments, environment) {
                Ok(arguments) => arguments,
                Err(error) => return error,
            };
            apply_function(function, arguments)
        }
        Expression::Array { elements } => match evaluate_expressions(elements, environment) {
            Ok(elements) => Value::array(elements),
            Err(error) => error,
        },
        Expression::Index { left, index } => {
            let left = evaluate_expression(left, environment);
            if left.is_error() {
                return left;
            }
            let index = evaluate_expression(index, environment);
            if index.is_error() {
                return index;
            }
            evaluate_index_expression(left, index)
        }
        Expression::Hash { pairs } => evaluate_hash_literal(pairs, environment),
        Expression::Access { accessor, accessed } => {
            evaluate_access_expression(accessor, accessed, environment)
        }
    }
}

fn evaluate_identifier(identifier: &Identifier, environment: &EnvironmentRef) -> Value {
    if let Some(value) = Environment::get(environment, &identifier.name) {
        return value;
    }
    if let Some(builtin) = builtins::lookup(&identifier.name) {
        return builtin;
    }
    Value::error(format!("identifier not found: {}", identifier.name))
}

/// Evaluates expressions left to right, stopping at the first error.
fn evaluate_expressions(
    expressions: &[Expression],
    environment: &EnvironmentRef,
) -> Result<Vec<Value>, Value> {
    let mut result = Vec::with_capacity(expressions.len());
    for expression in expressions {
        let value = evaluate_expression(expression, environment);
        if value.is_error() {
            return Err(value);
        }
        result.push(value);
    }
    Ok(result)
}

fn evaluate_prefix_expression(operator: UnaryOp, right: Value) -> Value {
    match operator {
        UnaryOp::Not => Value::boolean(!right.is_truthy()),
        UnaryOp::Negate => match &*right.0 {
            ValueKind::Integer(value) => Value::integer(-value),
            _ => Value::error(format!("unknown operator: -{}", right.type_name())),
        },
    }
}

fn evaluate_infix_expression(operator: BinaryOp, left: Value, right: Value) -> Value {
    match (&*left.0, &*right.0) {
        (ValueKind::Integer(left), ValueKind::Integer(right)) => {
            evaluate_integer_infix_expression(operator, *left, *right)
        }
        (ValueKind::String(left_value), ValueKind::String(right_value)) => match operator {
            BinaryOp::Add => Value::string(format!("{left_value}{right_value}")),
            _ => Value::error(format!(
                "unknown operator: {} {} {}",
                left.type_name(),
                operator,
                right.type_name()
            )),
        },
        // Canonical singletons make pointer identity a valid equality for
        // the remaining kinds; this arm comes before the type-mismatch check
        // so `5 == true` is `false`, not an error.
        _ if operator == BinaryOp::Equal => Value::boolean(left.identical(&right)),
        _ if operator == BinaryOp::NotEqual => Value::boolean(!left.identical(&right)),
        _ if left.type_name() != right.type_name() => Value::error(format!(
            "type mismatch: {} {} {}",
            left.type_name(),
            operator,
            right.type_name()
        )),
        _ => Value::error(format!(
            "unknown operator: {} {} {}",
            left.type_name(),
            operator,
            right.type_name()
        )),
    }
}

fn evaluate_integer_infix_expression(operator: BinaryOp, left: i64, right: i64) -> Value {
    match operator {
        BinaryOp::Add => Value::integer(left + right),
        BinaryOp::Sub => Value::integer(left - right),
        BinaryOp::Mul => Value::integer(left * right),
        BinaryOp::Div => match left.checked_div(right) {
            Some(quotient) => Value::integer(quotient),
            None => Value::error("division by zero"),
        },
        BinaryOp::Less => Value::boolean(left < right),
        BinaryOp::Greater => Value::boolean(left > right),
        BinaryOp::Equal => Value::boolean(left == right),
        BinaryOp::NotEqual => Value::boolean(left != right),
    }
}

fn evaluate_index_expression(left: Value, index: Value) -> Value {
    match (&*left.0, &*index.0) {
        (ValueKind::Array(elements), ValueKind::Integer(position)) => {
            if *position < 0 || *position >= elements.len() as i64 {
                return Value::null();
            }
            elements[*position as usize].clone()
        }
        (ValueKind::Hash(pairs), _) => match index.hash_key() {
            Some(key) => pairs
                .get(&key)
                .map(|pair| pair.value.clone())
                .unwrap_or_else(Value::null),
            None => Value::error(format!("unusable as hash key: {}", index.type_name())),
        },
        _ => Value::error(format!(
            "index operator not supported: {}",
            left.type_name()
        )),
    }
}

fn evaluate_hash_literal(
    pairs: &[(Expression, Expression)],
    environment: &EnvironmentRef,
) -> Value {
    let mut evaluated = IndexMap::new();
    for (key_expression, value_expression) in pairs {
        let key = evaluate_expression(key_expression, environment);
        if key.is_error() {
            return key;
        }
        let Some(hash_key) = key.hash_key() else {
            return Value::error(format!("unusable as hash key: {}", key.type_name()));
        };
        let value = evaluate_expression(value_expression, environment);
        if value.is_error() {
            return value;
        }
        // Last write wins for duplicate keys.
        evaluated.insert(hash_key, HashPair { key, value });
    }
    Value::hash(evaluated)
}

fn apply_function(function: Value, arguments: Vec<Value>) -> Value {
    match &*function.0 {
        ValueKind::Function(function) => {
            if arguments.len() != function.parameters.len() {
                return Value::error(format!(
                    "function expected {} arguments but received {}",
                    function.parameters.len(),
                    arguments.len()
                ));
            }
            let extended = Environment::enclosed(&function.environment);
            for (parameter, argument) in function.parameters.iter().zip(arguments) {
                extended.borrow_mut().set(parameter.name.clone(), argument);
            }
            unwrap_return_value(evaluate_block(&function.body, &extended))
        }
        ValueKind::Builtin(builtin) => (builtin.function)(&arguments),
        _ => Value::error(format!("not a function: {}", function.type_name())),
    }
}

fn unwrap_return_value(result: Option<Value>) -> Value {
    match result {
        Some(value) => match &*value.0 {
            ValueKind::ReturnValue(inner) => inner.clone(),
            _ => value,
        },
        None => Value::null(),
    }
}

fn evaluate_access_expression(
    accessor: &Expression,
    accessed: &Expression,
    environment: &EnvironmentRef,
) -> Value {
    let accessor = evaluate_expression(accessor, environment);
    if accessor.is_error() {
        return accessor;
    }
    let ValueKind::Import(path) = &*accessor.0 else {
        return Value::error(format!("access not supported: {}", accessor.type_name()));
    };
    let Expression::Call {
        function,
        arguments,
    } = accessed
    else {
        return Value::error(format!("access not supported: {accessed}"));
    };
    let Expression::Identifier(identifier) = function.as_ref() else {
        return Value::error(format!("access not supported: {accessed}"));
    };
    let Some(member) = environment.borrow().module_export(path, &identifier.name) else {
        return Value::error(format!("export not found: {}", identifier.name));
    };
    let arguments = match evaluate_expressions(arguments, environment) {
        Ok(arguments) => arguments,
        Err(error) => return error,
    };
    apply_function(member, arguments)
}
