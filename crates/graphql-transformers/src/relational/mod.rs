//! Relations between models: `@hasOne`, `@hasMany` and `@belongsTo`.
//!
//! A relation field is resolved by reading the related table with the values of the parent's
//! source fields. When a relation does not name its fields, foreign key fields are added to the
//! side holding the reference.

mod belongs_to;
mod has_many;
mod has_one;

pub use self::{
    belongs_to::{BelongsToTransformer, BELONGS_TO_DIRECTIVE},
    has_many::{HasManyTransformer, HAS_MANY_DIRECTIVE},
    has_one::{HasOneTransformer, HAS_ONE_DIRECTIVE},
};

use graphql_transformer_core::{
    FieldDefinition, HookError, KeySchema, Location, ResolverFunction, Stage, TransformerContext, TypeKind,
};

use crate::{common, names, templates};

/// A relation field and the fields of its type the related record is looked up with.
#[derive(Debug, Clone)]
struct Relation {
    type_name: String,
    field_name: String,
    related: String,
    source_fields: Vec<String>,
}

/// The model a relation field points at. `list` is whether the field must be a list.
fn related_model(
    ctx: &TransformerContext,
    type_name: &str,
    field_name: &str,
    directive: &str,
    location: &Location,
    list: bool,
) -> Result<String, HookError> {
    common::require_model(ctx, type_name, directive, location)?;

    let ty = common::field_type(ctx, type_name, field_name)?;
    let related = ty.base_name();
    let is_object = ctx.document.kind_of(related) == Some(TypeKind::Object);

    if !is_object || ty.is_list() != list {
        let expected = if list { "a list of a @model type" } else { "a single @model type" };
        return Err(HookError::invalid_directive(
            location.clone(),
            format!("@{directive} field {type_name}.{field_name} must reference {expected}, found {ty}"),
        ));
    }

    if !ctx.is_model(related) {
        return Err(HookError::invalid_directive(
            location.clone(),
            format!("{related} is not a registered model, @{directive} on {type_name}.{field_name} requires it"),
        ));
    }

    Ok(related.to_owned())
}

/// Checks explicitly named relation fields exist on the type and hold scalar values.
fn check_fields(
    ctx: &TransformerContext,
    type_name: &str,
    fields: &[String],
    directive: &str,
    location: &Location,
) -> Result<(), HookError> {
    for field in fields {
        if !common::is_scalar_field(ctx, type_name, field) {
            return Err(HookError::invalid_directive(
                location.clone(),
                format!("field {field} named in @{directive} must be a scalar or enum field of {type_name}"),
            ));
        }
    }
    Ok(())
}

/// Adds one foreign key field to `target` per field of `key`, typed like the key fields of
/// `key_owner`. Fields already defined are kept. Returns the foreign key names.
fn add_foreign_keys(
    ctx: &mut TransformerContext,
    target: &str,
    relation_type: &str,
    relation_field: &str,
    key_owner: &str,
    key: &KeySchema,
) -> Result<Vec<String>, HookError> {
    let base = names::foreign_key_field(relation_type, relation_field);
    let mut foreign_keys = Vec::new();

    for (idx, key_field) in key.fields().enumerate() {
        let name = if idx == 0 {
            base.clone()
        } else {
            format!("{}{}", base.trim_end_matches("Id"), names::upper_first(key_field))
        };
        if ctx.document.field(target, &name).is_none() {
            let ty = common::field_type(ctx, key_owner, key_field)?.nullable();
            ctx.document.add_field(target, FieldDefinition::new(&name, ty))?;
        }
        foreign_keys.push(name);
    }

    Ok(foreign_keys)
}

/// Resolves single item relations with a read of the related table by its primary key.
fn generate_lookups(ctx: &mut TransformerContext, relations: &[Relation]) {
    for relation in relations {
        let Some(related) = ctx.model(&relation.related) else {
            continue;
        };
        let key: Vec<(String, String)> = related
            .key
            .fields()
            .zip(&relation.source_fields)
            .map(|(key, source)| (key.to_owned(), format!("$ctx.source.{source}")))
            .collect();
        let function =
            ResolverFunction::new(templates::get_item(&key), templates::RESPONSE).with_data_source(&related.data_source);

        ctx.add_pipeline_entry(&relation.type_name, &relation.field_name, Stage::Data, function);
    }
}
