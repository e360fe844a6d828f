use crate::value::{BuiltinFunction, Value};

/// Fixed builtin table. Names resolve here only after the environment chain
/// has been exhausted, so a `let` binding can shadow a builtin.
pub fn lookup(name: &str) -> Option<Value> {
    match name {
        "print" => Some(Value::builtin(BuiltinFunction {
            name: "print",
            function: builtin_print,
        })),
        _ => None,
    }
}

fn builtin_print(arguments: &[Value]) -> Value {
    for argument in arguments {
        print!("{argument}");
    }
    Value::null()
}
