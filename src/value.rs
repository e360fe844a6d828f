use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
    path::PathBuf,
    rc::Rc,
};

use indexmap::IndexMap;

use crate::{
    ast::{BlockStatement, Identifier},
    environment::EnvironmentRef,
};

thread_local! {
    static TRUE: Value = Value(Rc::new(ValueKind::Boolean(true)));
    static FALSE: Value = Value(Rc::new(ValueKind::Boolean(false)));
    static NULL: Value = Value(Rc::new(ValueKind::Null));
}

/// Shared handle to a runtime value. `true`, `false`, and `null` are
/// canonical singletons, so pointer identity on the handle is a valid
/// equality for the non-integer, non-string kinds.
#[derive(Clone)]
pub struct Value(pub Rc<ValueKind>);

pub enum ValueKind {
    Integer(i64),
    String(String),
    Boolean(bool),
    Null,
    Array(Vec<Value>),
    Hash(IndexMap<HashKey, HashPair>),
    Function(UserFunction),
    Builtin(BuiltinFunction),
    ReturnValue(Value),
    Error(String),
    Import(PathBuf),
}

#[derive(Clone)]
pub struct UserFunction {
    pub parameters: Vec<Identifier>,
    pub body: BlockStatement,
    pub environment: EnvironmentRef,
}

#[derive(Clone)]
pub struct BuiltinFunction {
    pub name: &'static str,
    pub function: fn(&[Value]) -> Value,
}

/// Type-tagged digest making a value usable as a hash-literal key. Keys of
/// different kinds never collide; keys of one kind collide exactly when
/// their values are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub value_type: &'static str,
    pub value: u64,
}

#[derive(Clone)]
pub struct HashPair {
    pub key: Value,
    pub value: Value,
}

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Self(Rc::new(kind))
    }

    pub fn integer(value: i64) -> Self {
        Self::new(ValueKind::Integer(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ValueKind::String(value.into()))
    }

    pub fn boolean(value: bool) -> Self {
        if value {
            TRUE.with(Value::clone)
        } else {
            FALSE.with(Value::clone)
        }
    }

    pub fn null() -> Self {
        NULL.with(Value::clone)
    }

    pub fn array(elements: Vec<Value>) -> Self {
        Self::new(ValueKind::Array(elements))
    }

    pub fn hash(pairs: IndexMap<HashKey, HashPair>) -> Self {
        Self::new(ValueKind::Hash(pairs))
    }

    pub fn function(
        parameters: Vec<Identifier>,
        body: BlockStatement,
        environment: EnvironmentRef,
    ) -> Self {
        Self::new(ValueKind::Function(UserFunction {
            parameters,
            body,
            environment,
        }))
    }

    pub fn builtin(builtin: BuiltinFunction) -> Self {
        Self::new(ValueKind::Builtin(builtin))
    }

    pub fn return_value(value: Value) -> Self {
        Self::new(ValueKind::ReturnValue(value))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ValueKind::Error(message.into()))
    }

    pub fn import(path: PathBuf) -> Self {
        Self::new(ValueKind::Import(path))
    }

    pub fn is_error(&self) -> bool {
        matches!(&*self.0, ValueKind::Error(_))
    }

    pub fn is_truthy(&self) -> bool {
        match &*self.0 {
            ValueKind::Boolean(value) => *value,
            ValueKind::Null => false,
            _ => true,
        }
    }

    /// Pointer identity on the shared handle; the `==`/`!=` fallback for
    /// operands that are neither integers nor strings.
    pub fn identical(&self, other: &Value) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn type_name(&self) -> &'static str {
        match &*self.0 {
            ValueKind::Integer(_) => "INTEGER",
            ValueKind::String(_) => "STRING",
            ValueKind::Boolean(_) => "BOOLEAN",
            ValueKind::Null => "NULL",
            ValueKind::Array(_) => "ARRAY",
            ValueKind::Hash(_) => "HASH",
            ValueKind::Function(_) => "FUNCTION",
            ValueKind::Builtin(_) => "BUILTIN",
            ValueKind::ReturnValue(_) => "RETURN_VALUE",
            ValueKind::Error(_) => "ERROR",
            ValueKind::Import(_) => "IMPORT",
        }
    }

    pub fn hash_key(&self) -> Option<HashKey> {
        match &*self.0 {
            ValueKind::Integer(value) => Some(HashKey {
                value_type: self.type_name(),
                value: *value as u64,
            }),
            ValueKind::Boolean(value) => Some(HashKey {
                value_type: self.type_name(),
                value: u64::from(*value),
            }),
            ValueKind::String(value) => {
                let mut hasher = DefaultHasher::new();
                value.hash(&mut hasher);
                Some(HashKey {
                    value_type: self.type_name(),
                    value: hasher.finish(),
                })
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            ValueKind::Integer(value) => write!(f, "{value}"),
            ValueKind::String(value) => write!(f, "{value}"),
            ValueKind::Boolean(value) => write!(f, "{value}"),
            ValueKind::Null => write!(f, "null"),
            ValueKind::Array(elements) => {
                write!(f, "[")?;
                for (index, element) in elements.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, "]")
            }
            ValueKind::Hash(pairs) => {
                write!(f, "{{")?;
                for (index, pair) in pairs.values().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", pair.key, pair.value)?;
                }
                write!(f, "}}")
            }
            ValueKind::Function(function) => {
                write!(f, "function(")?;
                for (index, parameter) in function.parameters.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{parameter}")?;
                }
                write!(f, ") {{ {} }}", function.body)
            }
            ValueKind::Builtin(builtin) => write!(f, "builtin function {}", builtin.name),
            ValueKind::ReturnValue(value) => write!(f, "{value}"),
            ValueKind::Error(message) => write!(f, "ERROR: {message}"),
            ValueKind::Import(path) => write!(f, "import({})", path.display()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            ValueKind::String(value) => write!(f, "{value:?}"),
            _ => write!(f, "{self}"),
        }
    }
}
