//! The set of directives a transformation run accepts, with their argument shapes and
//! allowed locations.

mod builtins;
mod coercion;

pub use self::coercion::CoercionError;

use async_graphql_parser::types::{DirectiveLocation, TypeSystemDefinition};
use indexmap::IndexMap;
use itertools::Itertools;

use crate::{
    document::{convert_input_value, convert_type_definition, is_builtin_scalar, TypeDefinition, TypeRef, Value},
    error::{ConflictError, ParseError, RegistryError},
};

bitflags::bitflags! {
    /// Type system locations a directive may be applied to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DirectiveLocations: u16 {
        const SCHEMA = 1 << 0;
        const SCALAR = 1 << 1;
        const OBJECT = 1 << 2;
        const FIELD_DEFINITION = 1 << 3;
        const ARGUMENT_DEFINITION = 1 << 4;
        const INTERFACE = 1 << 5;
        const UNION = 1 << 6;
        const ENUM = 1 << 7;
        const ENUM_VALUE = 1 << 8;
        const INPUT_OBJECT = 1 << 9;
        const INPUT_FIELD_DEFINITION = 1 << 10;
    }
}

impl DirectiveLocations {
    /// Location names joined by ` | `, as they appear in a directive definition.
    pub fn describe(self) -> String {
        self.iter_names().map(|(name, _)| name).join(" | ")
    }

    fn from_ast(location: DirectiveLocation) -> Option<Self> {
        Some(match location {
            DirectiveLocation::Schema => Self::SCHEMA,
            DirectiveLocation::Scalar => Self::SCALAR,
            DirectiveLocation::Object => Self::OBJECT,
            DirectiveLocation::FieldDefinition => Self::FIELD_DEFINITION,
            DirectiveLocation::ArgumentDefinition => Self::ARGUMENT_DEFINITION,
            DirectiveLocation::Interface => Self::INTERFACE,
            DirectiveLocation::Union => Self::UNION,
            DirectiveLocation::Enum => Self::ENUM,
            DirectiveLocation::EnumValue => Self::ENUM_VALUE,
            DirectiveLocation::InputObject => Self::INPUT_OBJECT,
            DirectiveLocation::InputFieldDefinition => Self::INPUT_FIELD_DEFINITION,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentSignature {
    pub name: String,
    pub ty: TypeRef,
    pub default_value: Option<Value>,
}

impl ArgumentSignature {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            default_value: None,
        }
    }

    /// Arguments of a non-null type without a default must be provided.
    pub fn is_required(&self) -> bool {
        self.ty.is_non_null() && self.default_value.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveSignature {
    pub name: String,
    pub description: Option<String>,
    pub arguments: Vec<ArgumentSignature>,
    pub locations: DirectiveLocations,
    pub repeatable: bool,
}

impl DirectiveSignature {
    pub fn new(name: impl Into<String>, locations: DirectiveLocations) -> Self {
        Self {
            name: name.into(),
            description: None,
            arguments: Vec::new(),
            locations,
            repeatable: false,
        }
    }

    #[must_use]
    pub fn argument(mut self, argument: ArgumentSignature) -> Self {
        self.arguments.push(argument);
        self
    }

    #[must_use]
    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    pub fn find_argument(&self, name: &str) -> Option<&ArgumentSignature> {
        self.arguments.iter().find(|argument| argument.name == name)
    }
}

#[derive(Debug, Clone)]
struct RegisteredDirective {
    signature: DirectiveSignature,
    declared_by: String,
}

/// Declared directives, plus the input and enum types their arguments refer to.
#[derive(Debug, Clone, Default)]
pub struct DirectiveRegistry {
    directives: IndexMap<String, RegisteredDirective>,
    support_types: IndexMap<String, (TypeDefinition, String)>,
}

impl DirectiveRegistry {
    /// A registry without any directive, not even the AppSync ones.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry holding the directives AppSync itself understands.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for signature in builtins::appsync_directives() {
            registry.directives.insert(
                signature.name.clone(),
                RegisteredDirective {
                    signature,
                    declared_by: builtins::DECLARED_BY.to_owned(),
                },
            );
        }
        registry
    }

    pub fn register(&mut self, declared_by: &str, signature: DirectiveSignature) -> Result<(), ConflictError> {
        if let Some(existing) = self.directives.get(&signature.name) {
            return Err(ConflictError::DuplicateDirectiveDefinition {
                name: signature.name,
                existing: existing.declared_by.clone(),
                incoming: declared_by.to_owned(),
            });
        }

        tracing::trace!(directive = %signature.name, declared_by, "registering directive");
        self.directives.insert(
            signature.name.clone(),
            RegisteredDirective {
                signature,
                declared_by: declared_by.to_owned(),
            },
        );
        Ok(())
    }

    /// Registers every `directive @...` definition in the SDL and keeps its other type
    /// definitions as support types for argument coercion. Returns the names of the
    /// registered directives, in definition order.
    ///
    /// Two declarers may provide the same support type as long as the definitions agree.
    pub fn register_sdl(&mut self, declared_by: &str, sdl: &str) -> Result<Vec<String>, RegistryError> {
        if sdl.trim().is_empty() {
            return Ok(Vec::new());
        }

        let document = async_graphql_parser::parse_schema(sdl).map_err(ParseError::from)?;
        let mut names = Vec::new();

        for definition in document.definitions {
            match definition {
                TypeSystemDefinition::Schema(schema) => {
                    return Err(ParseError::Unsupported {
                        what: "schema definition in directive declarations".to_owned(),
                        pos: Some(schema.pos),
                    }
                    .into());
                }
                TypeSystemDefinition::Type(definition) => {
                    let definition = strip_positions(convert_type_definition(definition)?);
                    self.register_support_type(declared_by, definition)?;
                }
                TypeSystemDefinition::Directive(definition) => {
                    let pos = definition.pos;
                    let definition = definition.node;

                    let mut locations = DirectiveLocations::empty();
                    for location in definition.locations {
                        let Some(location) = DirectiveLocations::from_ast(location.node) else {
                            return Err(ParseError::Unsupported {
                                what: format!("executable location on @{}", definition.name.node),
                                pos: Some(location.pos),
                            }
                            .into());
                        };
                        locations |= location;
                    }

                    let mut signature = DirectiveSignature::new(definition.name.node.to_string(), locations);
                    signature.description = definition.description.map(|description| description.node);
                    signature.repeatable = definition.is_repeatable;
                    for argument in definition.arguments {
                        let argument = convert_input_value(argument)?;
                        signature.arguments.push(ArgumentSignature {
                            name: argument.name,
                            ty: argument.ty,
                            default_value: argument.default_value,
                        });
                    }

                    tracing::trace!(directive = %signature.name, line = pos.line, "parsed directive definition");
                    names.push(signature.name.clone());
                    self.register(declared_by, signature)?;
                }
            }
        }

        Ok(names)
    }

    fn register_support_type(&mut self, declared_by: &str, definition: TypeDefinition) -> Result<(), ConflictError> {
        match self.support_types.get(&definition.name) {
            Some((existing, _)) if *existing == definition => Ok(()),
            Some(_) => Err(ConflictError::DuplicateType(definition.name)),
            None => {
                self.support_types
                    .insert(definition.name.clone(), (definition, declared_by.to_owned()));
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&DirectiveSignature> {
        self.directives.get(name).map(|registered| &registered.signature)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.directives.contains_key(name)
    }

    /// Name of whoever registered the directive.
    pub fn declared_by(&self, name: &str) -> Option<&str> {
        self.directives
            .get(name)
            .map(|registered| registered.declared_by.as_str())
    }

    pub fn signatures(&self) -> impl Iterator<Item = &DirectiveSignature> {
        self.directives.values().map(|registered| &registered.signature)
    }

    pub fn support_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.support_types.get(name).map(|(definition, _)| definition)
    }

    /// Whether the name is a scalar known without being declared in a document.
    pub fn is_builtin_scalar(&self, name: &str) -> bool {
        is_builtin_scalar(name)
    }
}

fn strip_positions(mut definition: TypeDefinition) -> TypeDefinition {
    definition.pos = None;
    for directive in &mut definition.directives {
        directive.pos = None;
    }
    for field in &mut definition.fields {
        field.pos = None;
        for argument in &mut field.arguments {
            argument.pos = None;
        }
        for directive in &mut field.directives {
            directive.pos = None;
        }
    }
    for value in &mut definition.values {
        value.pos = None;
    }
    definition
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use indoc::indoc;

    use super::*;

    const AUTH_SDL: &str = indoc! {r#"
        directive @auth(rules: [AuthRule!]!) on OBJECT | FIELD_DEFINITION
        input AuthRule { allow: AuthStrategy! ownerField: String }
        enum AuthStrategy { owner public }
    "#};

    #[test]
    fn registers_from_sdl() {
        let mut registry = DirectiveRegistry::empty();

        let names = registry.register_sdl("auth", AUTH_SDL).unwrap();

        assert_eq!(names, ["auth"]);
        let signature = registry.get("auth").unwrap();
        assert_eq!(signature.locations, DirectiveLocations::OBJECT | DirectiveLocations::FIELD_DEFINITION);
        assert!(signature.find_argument("rules").unwrap().is_required());
        assert!(registry.support_type("AuthRule").is_some());
        assert_eq!(registry.declared_by("auth"), Some("auth"));
    }

    #[test]
    fn duplicate_directive_names_conflict() {
        let mut registry = DirectiveRegistry::with_builtins();
        registry.register_sdl("auth", AUTH_SDL).unwrap();

        let result = registry.register_sdl("other", "directive @auth on OBJECT");

        assert_matches!(
            result,
            Err(RegistryError::Conflict(ConflictError::DuplicateDirectiveDefinition { name, existing, incoming })) => {
                assert_eq!(name, "auth");
                assert_eq!(existing, "auth");
                assert_eq!(incoming, "other");
            }
        );
    }

    #[test]
    fn identical_support_types_are_shared() {
        let mut registry = DirectiveRegistry::empty();
        registry
            .register_sdl("a", "directive @a(sort: SortDirection) on OBJECT enum SortDirection { ASC DESC }")
            .unwrap();

        registry
            .register_sdl("b", "directive @b(sort: SortDirection) on FIELD_DEFINITION\nenum SortDirection { ASC DESC }")
            .unwrap();

        assert_matches!(
            registry.register_sdl("c", "directive @c(sort: SortDirection) on OBJECT enum SortDirection { UP DOWN }"),
            Err(RegistryError::Conflict(ConflictError::DuplicateType(name))) if name == "SortDirection"
        );
    }

    #[test]
    fn executable_locations_are_rejected() {
        let mut registry = DirectiveRegistry::empty();

        assert_matches!(
            registry.register_sdl("x", "directive @x on FIELD"),
            Err(RegistryError::Parse(ParseError::Unsupported { .. }))
        );
    }

    #[test]
    fn builtins_are_present() {
        let registry = DirectiveRegistry::with_builtins();

        for name in ["aws_subscribe", "aws_api_key", "aws_iam", "aws_cognito_user_pools", "aws_oidc", "aws_lambda", "aws_auth", "deprecated"] {
            assert!(registry.contains(name), "{name} should be built in");
        }
        assert!(registry.is_builtin_scalar("AWSDateTime"));
        assert_eq!(
            registry.get("aws_api_key").unwrap().locations.describe(),
            "OBJECT | FIELD_DEFINITION"
        );
    }
}
