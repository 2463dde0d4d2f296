//! Helpers shared by the transformers: argument parsing, model lookups and the generated input
//! types several transformers reference.

use graphql_transformer_core::{
    ConflictError, Directive, FieldDefinition, HookError, InputValueDefinition, Location, ModelInfo,
    TransformerContext, TypeDefinition, TypeKind, TypeRef,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};

use crate::{model::MODEL_DIRECTIVE, names};

/// Keeps an explicit `null` apart from an absent argument: absent is `None`, `null` is
/// `Some(None)`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Resolves a [`nullable`] setting: absent takes the default, `null` disables.
pub(crate) fn or_default<T>(setting: Option<Option<T>>, default: impl FnOnce() -> T) -> Option<T> {
    match setting {
        None => Some(default()),
        Some(value) => value,
    }
}

pub(crate) fn arguments<T: DeserializeOwned>(directive: &Directive, location: &Location) -> Result<T, HookError> {
    directive.deserialize_arguments().map_err(|err| {
        HookError::invalid_directive(
            location.clone(),
            format!("Invalid arguments for @{}: {err}", directive.name),
        )
    })
}

/// The model a directive depends on. Fails when the model transformer has not registered the
/// type, either because it is not a `@model` or because the model transformer runs later.
pub(crate) fn require_model<'a>(
    ctx: &'a TransformerContext,
    type_name: &str,
    directive: &str,
    location: &Location,
) -> Result<&'a ModelInfo, HookError> {
    if let Some(model) = ctx.model(type_name) {
        return Ok(model);
    }

    let annotated = ctx
        .document
        .get_type(type_name)
        .is_some_and(|ty| ty.has_directive(MODEL_DIRECTIVE));
    let message = if annotated {
        format!("{type_name} is not a registered model yet, @{directive} must be applied after @model")
    } else {
        format!("@{directive} can only be used on @model types, {type_name} is not a registered model")
    };
    Err(HookError::invalid_directive(location.clone(), message))
}

/// The type of a field, failing with a missing field conflict.
pub(crate) fn field_type(ctx: &TransformerContext, type_name: &str, field_name: &str) -> Result<TypeRef, ConflictError> {
    ctx.document
        .field(type_name, field_name)
        .map(|field| field.ty.clone())
        .ok_or_else(|| ConflictError::MissingField {
            ty: type_name.to_owned(),
            field: field_name.to_owned(),
        })
}

/// Whether the named field exists and holds a single scalar or enum value.
pub(crate) fn is_scalar_field(ctx: &TransformerContext, type_name: &str, field_name: &str) -> bool {
    ctx.document
        .field(type_name, field_name)
        .is_some_and(|field| !field.ty.is_list() && ctx.document.is_leaf_type(field.ty.base_name()))
}

/// Adds a generated type unless a previous model already did.
pub(crate) fn ensure_type(ctx: &mut TransformerContext, definition: TypeDefinition) -> Result<(), ConflictError> {
    if ctx.document.has_type(&definition.name) {
        return Ok(());
    }
    ctx.document.add_type(definition)
}

fn input_object(name: &str, fields: &[(&str, TypeRef)]) -> TypeDefinition {
    fields.iter().fold(TypeDefinition::input_object(name), |ty, (field, field_ty)| {
        ty.with_field(FieldDefinition::new(*field, field_ty.clone()))
    })
}

#[derive(Clone, Copy, PartialEq)]
enum Comparison {
    Text,
    Number,
    Boolean,
}

fn comparison(base: &str) -> Comparison {
    match base {
        "Int" | "Float" | "AWSTimestamp" => Comparison::Number,
        "Boolean" => Comparison::Boolean,
        _ => Comparison::Text,
    }
}

/// Filter input comparing a scalar or enum field, such as `ModelStringInput`. Returns `None`
/// for fields that cannot be filtered on.
pub(crate) fn scalar_filter_input(ctx: &mut TransformerContext, base: &str) -> Result<Option<String>, ConflictError> {
    let (name, scalar) = match ctx.document.kind_of(base) {
        Some(TypeKind::Enum) => (format!("Model{base}Input"), base),
        Some(TypeKind::Scalar) => ("ModelStringInput".to_owned(), "String"),
        Some(_) => return Ok(None),
        None => match base {
            "ID" => ("ModelIDInput".to_owned(), "ID"),
            "Int" | "AWSTimestamp" => ("ModelIntInput".to_owned(), "Int"),
            "Float" => ("ModelFloatInput".to_owned(), "Float"),
            "Boolean" => ("ModelBooleanInput".to_owned(), "Boolean"),
            _ if ctx.document.is_leaf_type(base) => ("ModelStringInput".to_owned(), "String"),
            _ => return Ok(None),
        },
    };

    let ty = TypeRef::named(scalar);
    let mut fields = vec![("ne", ty.clone()), ("eq", ty.clone())];
    let is_enum = ctx.document.kind_of(base) == Some(TypeKind::Enum);
    if !is_enum && comparison(scalar) != Comparison::Boolean {
        fields.extend([
            ("le", ty.clone()),
            ("lt", ty.clone()),
            ("ge", ty.clone()),
            ("gt", ty.clone()),
            ("between", ty.clone().list()),
        ]);
        if comparison(scalar) == Comparison::Text {
            fields.extend([
                ("contains", ty.clone()),
                ("notContains", ty.clone()),
                ("beginsWith", ty.clone()),
            ]);
        }
    }

    ensure_type(ctx, input_object(&name, &fields))?;
    Ok(Some(name))
}

fn key_condition_fields(ty: &TypeRef, text: bool) -> Vec<(&'static str, TypeRef)> {
    let mut fields = vec![
        ("eq", ty.clone()),
        ("le", ty.clone()),
        ("lt", ty.clone()),
        ("ge", ty.clone()),
        ("gt", ty.clone()),
        ("between", ty.clone().list()),
    ];
    if text {
        fields.push(("beginsWith", ty.clone()));
    }
    fields
}

/// Argument narrowing a key query on its sort keys. A single sort key is compared directly, several
/// are compared as a composite named after `label`.
pub(crate) fn sort_key_condition(
    ctx: &mut TransformerContext,
    type_name: &str,
    label: &str,
    sort_keys: &[String],
) -> Result<Option<InputValueDefinition>, ConflictError> {
    match sort_keys {
        [] => Ok(None),
        [sort_key] => {
            let base = field_type(ctx, type_name, sort_key)?.base_name().to_owned();
            let scalar = match (ctx.document.kind_of(&base), comparison(&base)) {
                (None, Comparison::Number) if base == "Float" => "Float",
                (None, Comparison::Number) => "Int",
                (None, _) if base == "ID" => "ID",
                _ => "String",
            };
            let name = format!("Model{scalar}KeyConditionInput");
            let fields = key_condition_fields(&TypeRef::named(scalar), scalar == "String" || scalar == "ID");
            ensure_type(ctx, input_object(&name, &fields))?;
            Ok(Some(InputValueDefinition::new(sort_key.clone(), TypeRef::named(name))))
        }
        _ => {
            let key_input = format!("Model{type_name}{}CompositeKeyInput", names::upper_first(label));
            let mut key_fields = Vec::with_capacity(sort_keys.len());
            for sort_key in sort_keys {
                key_fields.push((sort_key.as_str(), field_type(ctx, type_name, sort_key)?.nullable()));
            }
            ensure_type(ctx, input_object(&key_input, &key_fields))?;

            let condition = format!("Model{type_name}{}CompositeKeyConditionInput", names::upper_first(label));
            let fields = key_condition_fields(&TypeRef::named(key_input), true);
            ensure_type(ctx, input_object(&condition, &fields))?;

            let argument = sort_keys
                .iter()
                .enumerate()
                .map(|(idx, key)| if idx == 0 { key.clone() } else { names::upper_first(key) })
                .collect::<String>();
            Ok(Some(InputValueDefinition::new(argument, TypeRef::named(condition))))
        }
    }
}

pub(crate) fn sort_direction(ctx: &mut TransformerContext) -> Result<TypeRef, ConflictError> {
    ensure_type(ctx, TypeDefinition::enumeration("ModelSortDirection", ["ASC", "DESC"]))?;
    Ok(TypeRef::named("ModelSortDirection"))
}

/// `filter`, `limit` and `nextToken`, the arguments every paginated model query ends with.
pub(crate) fn pagination_arguments(type_name: &str) -> [InputValueDefinition; 3] {
    [
        InputValueDefinition::new("filter", TypeRef::named(names::filter_input(type_name))),
        InputValueDefinition::new("limit", TypeRef::named("Int")),
        InputValueDefinition::new("nextToken", TypeRef::named("String")),
    ]
}
