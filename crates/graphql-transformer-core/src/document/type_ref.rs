use std::fmt;

use async_graphql_parser::types::{BaseType, Type};

/// A reference to a named type, possibly wrapped in lists and non-null markers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    /// Wraps the reference in a non-null marker. Already non-null references are returned as is.
    #[must_use]
    pub fn non_null(self) -> Self {
        match self {
            TypeRef::NonNull(_) => self,
            other => TypeRef::NonNull(Box::new(other)),
        }
    }

    #[must_use]
    pub fn list(self) -> Self {
        TypeRef::List(Box::new(self))
    }

    /// Strips the outermost non-null marker, if any.
    #[must_use]
    pub fn nullable(self) -> Self {
        match self {
            TypeRef::NonNull(inner) => *inner,
            other => other,
        }
    }

    pub fn base_name(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.base_name(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    pub fn is_list(&self) -> bool {
        match self {
            TypeRef::List(_) => true,
            TypeRef::NonNull(inner) => inner.is_list(),
            TypeRef::Named(_) => false,
        }
    }

    /// The element type of a list, ignoring the outer non-null marker.
    pub fn list_item(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::List(inner) => Some(inner),
            TypeRef::NonNull(inner) => inner.list_item(),
            TypeRef::Named(_) => None,
        }
    }

    /// Same structure with another base name.
    #[must_use]
    pub fn with_base_name(&self, name: &str) -> Self {
        match self {
            TypeRef::Named(_) => TypeRef::named(name),
            TypeRef::List(inner) => TypeRef::List(Box::new(inner.with_base_name(name))),
            TypeRef::NonNull(inner) => TypeRef::NonNull(Box::new(inner.with_base_name(name))),
        }
    }

    pub(crate) fn from_ast(ty: &Type) -> Self {
        let base = match &ty.base {
            BaseType::Named(name) => TypeRef::named(name.as_str()),
            BaseType::List(inner) => TypeRef::from_ast(inner).list(),
        };
        if ty.nullable {
            base
        } else {
            base.non_null()
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => f.write_str(name),
            TypeRef::List(inner) => write!(f, "[{inner}]"),
            TypeRef::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrappers() {
        let ty = TypeRef::named("Post").non_null().list().non_null();

        assert_eq!(ty.to_string(), "[Post!]!");
        assert_eq!(ty.base_name(), "Post");
        assert!(ty.is_list());
        assert_eq!(ty.list_item().map(ToString::to_string).as_deref(), Some("Post!"));
        assert_eq!(ty.clone().nullable().to_string(), "[Post!]");
        assert_eq!(ty.with_base_name("Comment").to_string(), "[Comment!]!");
    }

    #[test]
    fn non_null_is_idempotent() {
        assert_eq!(TypeRef::named("ID").non_null().non_null().to_string(), "ID!");
    }

    #[test]
    fn from_parser_type() {
        let ty = Type::new("[String!]").unwrap();

        assert_eq!(TypeRef::from_ast(&ty).to_string(), "[String!]");
    }
}
