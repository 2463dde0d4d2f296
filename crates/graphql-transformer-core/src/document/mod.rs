//! Owned, mutable representation of a GraphQL SDL document.
//!
//! The document is created by [`parse`], mutated in place by transformers through the helpers
//! on [`SchemaDocument`], and turned back into SDL by [`render`]. Definitions keep their source
//! order; injected definitions are appended.

mod parse;
mod render;
mod type_ref;
mod value;

pub use self::{parse::parse, render::render, type_ref::TypeRef, value::Value};
pub use async_graphql_parser::Pos;

pub(crate) use self::{
    parse::{convert_input_value, convert_type_definition},
    value::write_quoted,
};

use indexmap::IndexMap;

use crate::error::ConflictError;

/// Scalars every GraphQL document knows about.
pub const BUILTIN_SCALARS: &[&str] = &["String", "Int", "Float", "Boolean", "ID"];

/// Scalars provided by AppSync on top of the GraphQL built-ins.
pub const APPSYNC_SCALARS: &[&str] = &[
    "AWSDate",
    "AWSTime",
    "AWSDateTime",
    "AWSTimestamp",
    "AWSEmail",
    "AWSJSON",
    "AWSURL",
    "AWSPhone",
    "AWSIPAddress",
];

pub fn is_builtin_scalar(name: &str) -> bool {
    BUILTIN_SCALARS.contains(&name) || APPSYNC_SCALARS.contains(&name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr, strum::EnumIter)]
pub enum RootOperation {
    Query,
    Mutation,
    Subscription,
}

/// Names of the root operation types. Defaults to `Query`, `Mutation` and `Subscription`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootOperationTypes {
    pub query: String,
    pub mutation: String,
    pub subscription: String,
}

impl Default for RootOperationTypes {
    fn default() -> Self {
        Self {
            query: RootOperation::Query.to_string(),
            mutation: RootOperation::Mutation.to_string(),
            subscription: RootOperation::Subscription.to_string(),
        }
    }
}

impl RootOperationTypes {
    pub fn name(&self, operation: RootOperation) -> &str {
        match operation {
            RootOperation::Query => &self.query,
            RootOperation::Mutation => &self.mutation,
            RootOperation::Subscription => &self.subscription,
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        [&self.query, &self.mutation, &self.subscription]
            .into_iter()
            .any(|name| name == type_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    #[strum(serialize = "input object")]
    InputObject,
}

impl TypeKind {
    /// Whether a type of this kind may be used as an argument or input field type.
    pub fn is_input(self) -> bool {
        matches!(self, TypeKind::Scalar | TypeKind::Enum | TypeKind::InputObject)
    }

    /// Whether a type of this kind may be used as a field type of an object or interface.
    pub fn is_output(self) -> bool {
        !matches!(self, TypeKind::InputObject)
    }

    pub fn is_leaf(self) -> bool {
        matches!(self, TypeKind::Scalar | TypeKind::Enum)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    pub arguments: IndexMap<String, Value>,
    pub pos: Option<Pos>,
}

impl Directive {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: IndexMap::new(),
            pos: None,
        }
    }

    /// Builder variant of [`Directive::set_argument`] for directives constructed in code, where
    /// argument names are known to be distinct.
    #[must_use]
    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    pub fn set_argument(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<(), ConflictError> {
        let name = name.into();
        if self.arguments.contains_key(&name) {
            return Err(ConflictError::DuplicateArgument {
                directive: self.name.clone(),
                argument: name,
            });
        }
        self.arguments.insert(name, value.into());
        Ok(())
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    /// The arguments as a JSON object, so they can be deserialized into a typed configuration.
    pub fn arguments_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.arguments
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }

    pub fn deserialize_arguments<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.arguments_json())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputValueDefinition {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub default_value: Option<Value>,
    pub directives: Vec<Directive>,
    pub pos: Option<Pos>,
}

impl InputValueDefinition {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            default_value: None,
            directives: Vec::new(),
            pos: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// A field of an object, interface or input object type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub description: Option<String>,
    pub arguments: Vec<InputValueDefinition>,
    pub ty: TypeRef,
    pub directives: Vec<Directive>,
    /// Only meaningful for input object fields.
    pub default_value: Option<Value>,
    pub pos: Option<Pos>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            arguments: Vec::new(),
            ty,
            directives: Vec::new(),
            default_value: None,
            pos: None,
        }
    }

    #[must_use]
    pub fn with_argument(mut self, argument: InputValueDefinition) -> Self {
        self.arguments.push(argument);
        self
    }

    #[must_use]
    pub fn with_directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn argument(&self, name: &str) -> Option<&InputValueDefinition> {
        self.arguments.iter().find(|argument| argument.name == name)
    }

    pub fn directive(&self, name: &str) -> Option<&Directive> {
        self.directives.iter().find(|directive| directive.name == name)
    }

    pub fn has_directive(&self, name: &str) -> bool {
        self.directive(name).is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValueDefinition {
    pub name: String,
    pub description: Option<String>,
    pub directives: Vec<Directive>,
    pub pos: Option<Pos>,
}

impl EnumValueDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            directives: Vec::new(),
            pos: None,
        }
    }
}

/// A named type. Which of `fields`, `implements`, `members` and `values` are populated depends
/// on the `kind`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinition {
    pub name: String,
    pub kind: TypeKind,
    pub description: Option<String>,
    pub fields: Vec<FieldDefinition>,
    pub directives: Vec<Directive>,
    pub implements: Vec<String>,
    pub members: Vec<String>,
    pub values: Vec<EnumValueDefinition>,
    pub pos: Option<Pos>,
}

impl TypeDefinition {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            fields: Vec::new(),
            directives: Vec::new(),
            implements: Vec::new(),
            members: Vec::new(),
            values: Vec::new(),
            pos: None,
        }
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Object)
    }

    pub fn input_object(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::InputObject)
    }

    pub fn enumeration<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut definition = Self::new(name, TypeKind::Enum);
        definition.values = values.into_iter().map(EnumValueDefinition::new).collect();
        definition
    }

    #[must_use]
    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn with_directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldDefinition> {
        self.fields.iter_mut().find(|field| field.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn directive(&self, name: &str) -> Option<&Directive> {
        self.directives.iter().find(|directive| directive.name == name)
    }

    pub fn has_directive(&self, name: &str) -> bool {
        self.directive(name).is_some()
    }

    pub fn has_value(&self, name: &str) -> bool {
        self.values.iter().any(|value| value.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDocument {
    types: IndexMap<String, TypeDefinition>,
    roots: RootOperationTypes,
}

impl SchemaDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn roots(&self) -> &RootOperationTypes {
        &self.roots
    }

    pub(crate) fn roots_mut(&mut self) -> &mut RootOperationTypes {
        &mut self.roots
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values()
    }

    /// Snapshot of the type names in document order.
    pub fn type_names(&self) -> Vec<String> {
        self.types.keys().cloned().collect()
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn get_type_mut(&mut self, name: &str) -> Option<&mut TypeDefinition> {
        self.types.get_mut(name)
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&FieldDefinition> {
        self.get_type(type_name).and_then(|ty| ty.field(field_name))
    }

    /// Kind of the named type, if it is declared in the document.
    pub fn kind_of(&self, type_name: &str) -> Option<TypeKind> {
        self.get_type(type_name).map(|ty| ty.kind)
    }

    /// Whether the name refers to a built-in scalar or to a scalar or enum declared in the document.
    pub fn is_leaf_type(&self, type_name: &str) -> bool {
        is_builtin_scalar(type_name) || self.kind_of(type_name).is_some_and(TypeKind::is_leaf)
    }

    pub fn add_type(&mut self, definition: TypeDefinition) -> Result<(), ConflictError> {
        if self.types.contains_key(&definition.name) {
            return Err(ConflictError::DuplicateType(definition.name));
        }
        self.types.insert(definition.name.clone(), definition);
        Ok(())
    }

    pub fn remove_type(&mut self, name: &str) -> Option<TypeDefinition> {
        self.types.shift_remove(name)
    }

    /// The root operation type, created as an empty object type if the document has none yet.
    pub fn get_or_insert_root(&mut self, operation: RootOperation) -> &mut TypeDefinition {
        let name = self.roots.name(operation).to_owned();
        self.types
            .entry(name.clone())
            .or_insert_with(|| TypeDefinition::object(name))
    }

    pub fn add_field(&mut self, type_name: &str, field: FieldDefinition) -> Result<(), ConflictError> {
        let ty = self.type_mut_or_missing(type_name)?;
        if ty.has_field(&field.name) {
            return Err(ConflictError::DuplicateField {
                ty: type_name.to_owned(),
                field: field.name,
            });
        }
        ty.fields.push(field);
        Ok(())
    }

    /// Like [`SchemaDocument::add_field`], but places the field at `index` (clamped to the
    /// number of fields).
    pub fn insert_field(&mut self, type_name: &str, index: usize, field: FieldDefinition) -> Result<(), ConflictError> {
        let ty = self.type_mut_or_missing(type_name)?;
        if ty.has_field(&field.name) {
            return Err(ConflictError::DuplicateField {
                ty: type_name.to_owned(),
                field: field.name,
            });
        }
        let index = index.min(ty.fields.len());
        ty.fields.insert(index, field);
        Ok(())
    }

    /// Adds the field, replacing an existing field of the same name in place. This is the
    /// explicit override: the previous definition is returned.
    pub fn add_or_replace_field(
        &mut self,
        type_name: &str,
        field: FieldDefinition,
    ) -> Result<Option<FieldDefinition>, ConflictError> {
        let ty = self.type_mut_or_missing(type_name)?;
        match ty.field_mut(&field.name) {
            Some(existing) => Ok(Some(std::mem::replace(existing, field))),
            None => {
                ty.fields.push(field);
                Ok(None)
            }
        }
    }

    pub fn remove_field(&mut self, type_name: &str, field_name: &str) -> Result<FieldDefinition, ConflictError> {
        let ty = self.type_mut_or_missing(type_name)?;
        let Some(idx) = ty.fields.iter().position(|field| field.name == field_name) else {
            return Err(ConflictError::MissingField {
                ty: type_name.to_owned(),
                field: field_name.to_owned(),
            });
        };
        Ok(ty.fields.remove(idx))
    }

    /// Replaces the type of a field and returns the previous one.
    pub fn set_field_type(&mut self, type_name: &str, field_name: &str, ty: TypeRef) -> Result<TypeRef, ConflictError> {
        let field = self.field_mut_or_missing(type_name, field_name)?;
        Ok(std::mem::replace(&mut field.ty, ty))
    }

    /// Applies the directive to the type, or to one of its fields. A directive that is already
    /// present on the node is a conflict.
    pub fn add_directive(
        &mut self,
        type_name: &str,
        field_name: Option<&str>,
        directive: Directive,
    ) -> Result<(), ConflictError> {
        let coordinate = coordinate(type_name, field_name);
        let directives = self.directives_mut(type_name, field_name)?;
        if directives.iter().any(|existing| existing.name == directive.name) {
            return Err(ConflictError::DuplicateDirective {
                coordinate,
                directive: directive.name,
            });
        }
        directives.push(directive);
        Ok(())
    }

    /// Removes the first occurrence of the named directive from the node.
    pub fn remove_directive(
        &mut self,
        type_name: &str,
        field_name: Option<&str>,
        name: &str,
    ) -> Result<Option<Directive>, ConflictError> {
        let directives = self.directives_mut(type_name, field_name)?;
        Ok(directives
            .iter()
            .position(|directive| directive.name == name)
            .map(|idx| directives.remove(idx)))
    }

    fn directives_mut(&mut self, type_name: &str, field_name: Option<&str>) -> Result<&mut Vec<Directive>, ConflictError> {
        match field_name {
            Some(field_name) => Ok(&mut self.field_mut_or_missing(type_name, field_name)?.directives),
            None => Ok(&mut self.type_mut_or_missing(type_name)?.directives),
        }
    }

    fn type_mut_or_missing(&mut self, type_name: &str) -> Result<&mut TypeDefinition, ConflictError> {
        self.types
            .get_mut(type_name)
            .ok_or_else(|| ConflictError::MissingType(type_name.to_owned()))
    }

    fn field_mut_or_missing(&mut self, type_name: &str, field_name: &str) -> Result<&mut FieldDefinition, ConflictError> {
        self.type_mut_or_missing(type_name)?
            .field_mut(field_name)
            .ok_or_else(|| ConflictError::MissingField {
                ty: type_name.to_owned(),
                field: field_name.to_owned(),
            })
    }

    pub(crate) fn insert_parsed_type(&mut self, definition: TypeDefinition) -> Option<TypeDefinition> {
        self.types.insert(definition.name.clone(), definition)
    }
}

fn coordinate(type_name: &str, field_name: Option<&str>) -> String {
    match field_name {
        Some(field_name) => format!("{type_name}.{field_name}"),
        None => type_name.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn post_document() -> SchemaDocument {
        parse("type Post { id: ID! title: String }").unwrap()
    }

    #[test]
    fn add_field_rejects_existing_names() {
        let mut document = post_document();

        let result = document.add_field("Post", FieldDefinition::new("title", TypeRef::named("String")));

        assert_matches!(result, Err(ConflictError::DuplicateField { ty, field }) => {
            assert_eq!(ty, "Post");
            assert_eq!(field, "title");
        });
    }

    #[test]
    fn add_or_replace_field_overrides() {
        let mut document = post_document();

        let previous = document
            .add_or_replace_field("Post", FieldDefinition::new("title", TypeRef::named("String").non_null()))
            .unwrap();

        assert_eq!(previous.unwrap().ty.to_string(), "String");
        assert_eq!(document.field("Post", "title").unwrap().ty.to_string(), "String!");
        assert_eq!(document.get_type("Post").unwrap().fields.len(), 2);
    }

    #[test]
    fn insert_field_clamps_index() {
        let mut document = post_document();

        document
            .insert_field("Post", 0, FieldDefinition::new("first", TypeRef::named("Int")))
            .unwrap();
        document
            .insert_field("Post", 99, FieldDefinition::new("last", TypeRef::named("Int")))
            .unwrap();

        let names: Vec<_> = document
            .get_type("Post")
            .unwrap()
            .fields
            .iter()
            .map(|field| field.name.as_str())
            .collect();
        assert_eq!(names, ["first", "id", "title", "last"]);
    }

    #[test]
    fn mutations_on_missing_nodes_fail() {
        let mut document = post_document();

        assert_matches!(
            document.add_field("Comment", FieldDefinition::new("id", TypeRef::named("ID"))),
            Err(ConflictError::MissingType(name)) if name == "Comment"
        );
        assert_matches!(
            document.set_field_type("Post", "body", TypeRef::named("String")),
            Err(ConflictError::MissingField { .. })
        );
        assert_matches!(document.remove_field("Post", "body"), Err(ConflictError::MissingField { .. }));
    }

    #[test]
    fn directives_are_unique_per_node() {
        let mut document = post_document();

        document.add_directive("Post", None, Directive::new("model")).unwrap();
        document
            .add_directive("Post", Some("title"), Directive::new("default").with_argument("value", "x"))
            .unwrap();

        assert_matches!(
            document.add_directive("Post", None, Directive::new("model")),
            Err(ConflictError::DuplicateDirective { coordinate, directive }) => {
                assert_eq!(coordinate, "Post");
                assert_eq!(directive, "model");
            }
        );

        let removed = document.remove_directive("Post", Some("title"), "default").unwrap();
        assert_eq!(removed.unwrap().argument("value"), Some(&Value::from("x")));
        assert!(document.remove_directive("Post", Some("title"), "default").unwrap().is_none());
    }

    #[test]
    fn duplicate_types_conflict() {
        let mut document = post_document();

        assert_matches!(
            document.add_type(TypeDefinition::object("Post")),
            Err(ConflictError::DuplicateType(name)) if name == "Post"
        );
    }

    #[test]
    fn root_types_are_created_on_demand() {
        let mut document = post_document();

        document
            .get_or_insert_root(RootOperation::Query)
            .fields
            .push(FieldDefinition::new("posts", TypeRef::named("Post").list()));

        assert_eq!(document.type_names(), ["Post", "Query"]);
        assert_eq!(document.get_type("Query").unwrap().kind, TypeKind::Object);
    }

    #[test]
    fn set_argument_rejects_duplicates() {
        let mut directive = Directive::new("index").with_argument("name", "byTitle");

        assert_matches!(
            directive.set_argument("name", "bySlug"),
            Err(ConflictError::DuplicateArgument { directive, argument }) => {
                assert_eq!(directive, "index");
                assert_eq!(argument, "name");
            }
        );
    }
}
