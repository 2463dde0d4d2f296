use std::fmt;

use super::DirectiveRegistry;
use crate::document::{SchemaDocument, TypeDefinition, TypeKind, TypeRef, Value};

/// A value does not fit the type it is given for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionError {
    path: String,
    message: String,
}

impl CoercionError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            path: String::new(),
            message: message.into(),
        }
    }

    fn at_index(mut self, idx: usize) -> Self {
        self.path = format!("[{idx}]{}", self.path);
        self
    }

    fn at_field(mut self, name: &str) -> Self {
        self.path = format!(".{name}{}", self.path);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CoercionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path.trim_start_matches('.');
        if path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{} (at `{path}`)", self.message)
        }
    }
}

const STRING_SCALARS: &[&str] = &[
    "String",
    "AWSDate",
    "AWSTime",
    "AWSDateTime",
    "AWSEmail",
    "AWSJSON",
    "AWSURL",
    "AWSPhone",
    "AWSIPAddress",
];

impl DirectiveRegistry {
    /// Checks that `value` is a valid literal for `ty`, following GraphQL input coercion.
    ///
    /// Named types are looked up among the registry's support types first, then in the
    /// document.
    pub fn coerce(&self, document: &SchemaDocument, value: &Value, ty: &TypeRef) -> Result<(), CoercionError> {
        Coercion {
            registry: self,
            document,
        }
        .coerce(value, ty)
    }
}

struct Coercion<'a> {
    registry: &'a DirectiveRegistry,
    document: &'a SchemaDocument,
}

impl Coercion<'_> {
    fn lookup(&self, name: &str) -> Option<&TypeDefinition> {
        self.registry
            .support_type(name)
            .or_else(|| self.document.get_type(name))
    }

    fn coerce(&self, value: &Value, ty: &TypeRef) -> Result<(), CoercionError> {
        match ty {
            TypeRef::NonNull(inner) => {
                if value.is_null() {
                    return Err(CoercionError::new(format!("expected a non-null {inner}, found null")));
                }
                self.coerce(value, inner)
            }
            _ if value.is_null() => Ok(()),
            TypeRef::List(inner) => match value {
                Value::List(items) => items
                    .iter()
                    .enumerate()
                    .try_for_each(|(idx, item)| self.coerce(item, inner).map_err(|err| err.at_index(idx))),
                single => self.coerce(single, inner),
            },
            TypeRef::Named(name) => self.coerce_named(value, name),
        }
    }

    fn coerce_named(&self, value: &Value, name: &str) -> Result<(), CoercionError> {
        let mismatch = || CoercionError::new(format!("expected a value of type {name}, found {value}"));

        match name {
            "Int" => match value {
                Value::Int(int) if i32::try_from(*int).is_ok() => Ok(()),
                Value::Int(_) => Err(CoercionError::new(format!("{value} does not fit in a 32-bit Int"))),
                _ => Err(mismatch()),
            },
            "AWSTimestamp" => match value {
                Value::Int(_) => Ok(()),
                _ => Err(mismatch()),
            },
            "Float" => match value {
                Value::Int(_) | Value::Float(_) => Ok(()),
                _ => Err(mismatch()),
            },
            "Boolean" => match value {
                Value::Boolean(_) => Ok(()),
                _ => Err(mismatch()),
            },
            "ID" => match value {
                Value::String(_) | Value::Int(_) => Ok(()),
                _ => Err(mismatch()),
            },
            name if STRING_SCALARS.contains(&name) => match value {
                Value::String(_) => Ok(()),
                _ => Err(mismatch()),
            },
            name => {
                let Some(definition) = self.lookup(name) else {
                    return Err(CoercionError::new(format!("unknown type {name}")));
                };
                self.coerce_definition(value, definition)
            }
        }
    }

    fn coerce_definition(&self, value: &Value, definition: &TypeDefinition) -> Result<(), CoercionError> {
        let name = &definition.name;

        match definition.kind {
            TypeKind::Scalar => Ok(()),
            TypeKind::Enum => match value {
                Value::Enum(symbol) if definition.has_value(symbol) => Ok(()),
                Value::Enum(symbol) => Err(CoercionError::new(format!("{symbol} is not a value of enum {name}"))),
                _ => Err(CoercionError::new(format!(
                    "expected a value of enum {name}, found {value}"
                ))),
            },
            TypeKind::InputObject => {
                let Value::Object(fields) = value else {
                    return Err(CoercionError::new(format!("expected an object of type {name}, found {value}")));
                };

                if let Some(unknown) = fields.keys().find(|key| !definition.has_field(key)) {
                    return Err(CoercionError::new(format!("{name} has no field named {unknown}")));
                }

                for field in &definition.fields {
                    match fields.get(&field.name) {
                        Some(field_value) => self
                            .coerce(field_value, &field.ty)
                            .map_err(|err| err.at_field(&field.name))?,
                        None if field.ty.is_non_null() && field.default_value.is_none() => {
                            return Err(CoercionError::new(format!(
                                "missing required field {} of {name}",
                                field.name
                            )));
                        }
                        None => {}
                    }
                }

                Ok(())
            }
            TypeKind::Object | TypeKind::Interface | TypeKind::Union => {
                Err(CoercionError::new(format!("{name} is not an input type")))
            }
        }
    }
}
