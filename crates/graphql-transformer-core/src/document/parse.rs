use async_graphql_parser::{
    types::{self as ast, TypeSystemDefinition},
    Positioned,
};

use super::{
    Directive, EnumValueDefinition, FieldDefinition, InputValueDefinition, SchemaDocument, TypeDefinition, TypeKind,
    TypeRef, Value,
};
use crate::error::ParseError;

/// Parses SDL text into a [`SchemaDocument`].
///
/// `extend type` definitions are merged into the type they extend, which must already be
/// declared above them. Root operation types are the exception: extending `Query`, `Mutation` or
/// `Subscription` creates them when missing. Directive definitions and schema directives are
/// rejected, directives are declared by transformers only.
pub fn parse(sdl: &str) -> Result<SchemaDocument, ParseError> {
    let service = async_graphql_parser::parse_schema(sdl)?;
    let mut document = SchemaDocument::new();

    // Root names first, so that extensions of renamed roots resolve regardless of order.
    for definition in &service.definitions {
        if let TypeSystemDefinition::Schema(schema) = definition {
            apply_schema_definition(&mut document, schema)?;
        }
    }

    for definition in service.definitions {
        match definition {
            TypeSystemDefinition::Schema(_) => {}
            TypeSystemDefinition::Directive(directive) => {
                return Err(ParseError::Unsupported {
                    what: format!("directive definition @{}", directive.node.name.node),
                    pos: Some(directive.pos),
                });
            }
            TypeSystemDefinition::Type(definition) => {
                let extend = definition.node.extend;
                let converted = convert_type_definition(definition)?;
                if extend {
                    merge_extension(&mut document, converted)?;
                } else if document.has_type(&converted.name) {
                    return Err(ParseError::DuplicateType {
                        name: converted.name,
                        pos: converted.pos,
                    });
                } else {
                    document.insert_parsed_type(converted);
                }
            }
        }
    }

    Ok(document)
}

fn apply_schema_definition(
    document: &mut SchemaDocument,
    schema: &Positioned<ast::SchemaDefinition>,
) -> Result<(), ParseError> {
    if let Some(directive) = schema.node.directives.first() {
        return Err(ParseError::Unsupported {
            what: format!("schema directive @{}", directive.node.name.node),
            pos: Some(directive.pos),
        });
    }

    let roots = document.roots_mut();
    if let Some(query) = &schema.node.query {
        roots.query = query.node.to_string();
    }
    if let Some(mutation) = &schema.node.mutation {
        roots.mutation = mutation.node.to_string();
    }
    if let Some(subscription) = &schema.node.subscription {
        roots.subscription = subscription.node.to_string();
    }

    Ok(())
}

fn merge_extension(document: &mut SchemaDocument, extension: TypeDefinition) -> Result<(), ParseError> {
    if !document.has_type(&extension.name) {
        if extension.kind == TypeKind::Object && document.roots().contains(&extension.name) {
            document.insert_parsed_type(extension);
            return Ok(());
        }
        return Err(ParseError::UnknownExtendedType {
            name: extension.name,
            pos: extension.pos,
        });
    }

    let Some(existing) = document.get_type_mut(&extension.name) else {
        return Ok(());
    };

    if existing.kind != extension.kind {
        return Err(ParseError::ExtensionKindMismatch {
            name: extension.name,
            expected: existing.kind,
            found: extension.kind,
        });
    }

    existing.fields.extend(extension.fields);
    existing.directives.extend(extension.directives);
    existing.implements.extend(extension.implements);
    existing.members.extend(extension.members);
    existing.values.extend(extension.values);

    Ok(())
}

pub(crate) fn convert_type_definition(definition: Positioned<ast::TypeDefinition>) -> Result<TypeDefinition, ParseError> {
    let Positioned { pos, node } = definition;

    let kind = match &node.kind {
        ast::TypeKind::Scalar => TypeKind::Scalar,
        ast::TypeKind::Object(_) => TypeKind::Object,
        ast::TypeKind::Interface(_) => TypeKind::Interface,
        ast::TypeKind::Union(_) => TypeKind::Union,
        ast::TypeKind::Enum(_) => TypeKind::Enum,
        ast::TypeKind::InputObject(_) => TypeKind::InputObject,
    };

    let mut converted = TypeDefinition::new(node.name.node.to_string(), kind);
    converted.pos = Some(pos);
    converted.description = node.description.map(|description| description.node);
    converted.directives = convert_directives(node.directives)?;

    match node.kind {
        ast::TypeKind::Scalar => {}
        ast::TypeKind::Object(ast::ObjectType { implements, fields })
        | ast::TypeKind::Interface(ast::InterfaceType { implements, fields }) => {
            converted.implements = implements.into_iter().map(|name| name.node.to_string()).collect();
            converted.fields = fields
                .into_iter()
                .map(convert_field)
                .collect::<Result<_, _>>()?;
        }
        ast::TypeKind::Union(union) => {
            converted.members = union.members.into_iter().map(|name| name.node.to_string()).collect();
        }
        ast::TypeKind::Enum(enumeration) => {
            converted.values = enumeration
                .values
                .into_iter()
                .map(convert_enum_value)
                .collect::<Result<_, _>>()?;
        }
        ast::TypeKind::InputObject(input) => {
            converted.fields = input
                .fields
                .into_iter()
                .map(|field| convert_input_value(field).map(FieldDefinition::from))
                .collect::<Result<_, _>>()?;
        }
    }

    Ok(converted)
}

fn convert_field(field: Positioned<ast::FieldDefinition>) -> Result<FieldDefinition, ParseError> {
    let Positioned { pos, node } = field;

    Ok(FieldDefinition {
        name: node.name.node.to_string(),
        description: node.description.map(|description| description.node),
        arguments: node
            .arguments
            .into_iter()
            .map(convert_input_value)
            .collect::<Result<_, _>>()?,
        ty: TypeRef::from_ast(&node.ty.node),
        directives: convert_directives(node.directives)?,
        default_value: None,
        pos: Some(pos),
    })
}

pub(crate) fn convert_input_value(
    value: Positioned<ast::InputValueDefinition>,
) -> Result<InputValueDefinition, ParseError> {
    let Positioned { pos, node } = value;

    Ok(InputValueDefinition {
        name: node.name.node.to_string(),
        description: node.description.map(|description| description.node),
        ty: TypeRef::from_ast(&node.ty.node),
        default_value: node.default_value.map(|value| Value::from(value.node)),
        directives: convert_directives(node.directives)?,
        pos: Some(pos),
    })
}

fn convert_enum_value(value: Positioned<ast::EnumValueDefinition>) -> Result<EnumValueDefinition, ParseError> {
    let Positioned { pos, node } = value;

    Ok(EnumValueDefinition {
        name: node.value.node.to_string(),
        description: node.description.map(|description| description.node),
        directives: convert_directives(node.directives)?,
        pos: Some(pos),
    })
}

fn convert_directives(directives: Vec<Positioned<ast::ConstDirective>>) -> Result<Vec<Directive>, ParseError> {
    directives
        .into_iter()
        .map(|directive| {
            let Positioned { pos, node } = directive;
            let mut converted = Directive::new(node.name.node.to_string());
            converted.pos = Some(pos);

            for (name, value) in node.arguments {
                converted
                    .set_argument(name.node.to_string(), Value::from(value.node))
                    .map_err(|_| ParseError::DuplicateArgument {
                        directive: converted.name.clone(),
                        argument: name.node.to_string(),
                        pos: Some(name.pos),
                    })?;
            }

            Ok(converted)
        })
        .collect()
}

impl From<InputValueDefinition> for FieldDefinition {
    fn from(value: InputValueDefinition) -> Self {
        FieldDefinition {
            name: value.name,
            description: value.description,
            arguments: Vec::new(),
            ty: value.ty,
            directives: value.directives,
            default_value: value.default_value,
            pos: value.pos,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use indoc::indoc;

    use super::*;

    #[test]
    fn keeps_directives_and_positions() {
        let document = parse(indoc! {r#"
            type Post @model(subscriptions: null) {
              id: ID!
              title: String @default(value: "untitled")
            }
        "#})
        .unwrap();

        let post = document.get_type("Post").unwrap();
        let model = post.directive("model").unwrap();
        assert_eq!(model.argument("subscriptions"), Some(&Value::Null));
        assert_eq!(model.pos.map(|pos| pos.line), Some(1));

        let title = post.field("title").unwrap();
        assert_eq!(
            title.directive("default").and_then(|directive| directive.argument("value")),
            Some(&Value::from("untitled"))
        );
    }

    #[test]
    fn merges_extensions() {
        let document = parse(indoc! {r#"
            type Post { id: ID! }
            extend type Post @model { title: String }
            extend type Query { posts: [Post] }
        "#})
        .unwrap();

        let post = document.get_type("Post").unwrap();
        assert_eq!(post.fields.len(), 2);
        assert!(post.has_directive("model"));
        assert!(document.field("Query", "posts").is_some());
    }

    #[test]
    fn rejects_unknown_extension() {
        assert_matches!(
            parse("extend type Comment { id: ID! }"),
            Err(ParseError::UnknownExtendedType { name, .. }) if name == "Comment"
        );
    }

    #[test]
    fn rejects_extension_of_other_kind() {
        assert_matches!(
            parse("type Post { id: ID! } extend input Post { title: String }"),
            Err(ParseError::ExtensionKindMismatch { expected: TypeKind::Object, found: TypeKind::InputObject, .. })
        );
    }

    #[test]
    fn rejects_duplicate_types() {
        assert_matches!(
            parse("type Post { id: ID! } type Post { title: String }"),
            Err(ParseError::DuplicateType { name, .. }) if name == "Post"
        );
    }

    #[test]
    fn rejects_duplicate_directive_arguments() {
        assert_matches!(
            parse("type Post @model(queries: null, queries: null) { id: ID! }"),
            Err(ParseError::DuplicateArgument { directive, argument, .. }) => {
                assert_eq!(directive, "model");
                assert_eq!(argument, "queries");
            }
        );
    }

    #[test]
    fn rejects_directive_definitions() {
        assert_matches!(
            parse("directive @model on OBJECT"),
            Err(ParseError::Unsupported { what, .. }) if what == "directive definition @model"
        );
    }

    #[test]
    fn syntax_errors_carry_a_position() {
        assert_matches!(parse("type Post {"), Err(ParseError::Syntax { pos: Some(_), .. }));
    }

    #[test]
    fn schema_definition_renames_roots() {
        let document = parse(indoc! {r#"
            schema { query: RootQuery }
            extend type RootQuery { version: String }
        "#})
        .unwrap();

        assert_eq!(document.roots().query, "RootQuery");
        assert!(document.has_type("RootQuery"));
    }
}
