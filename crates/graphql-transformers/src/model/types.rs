//! Input, filter and connection types generated for each model.

use graphql_transformer_core::{
    ConflictError, FieldDefinition, ModelInfo, ModelOperation, TransformerContext, TypeDefinition, TypeRef,
};

use crate::{common, names};

/// Scalar and enum fields of the model: the ones inputs and filters are built from.
fn stored_fields(ctx: &TransformerContext, type_name: &str) -> Vec<FieldDefinition> {
    ctx.document
        .get_type(type_name)
        .map(|ty| {
            ty.fields
                .iter()
                .filter(|field| ctx.document.is_leaf_type(field.ty.base_name()))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

pub(super) fn generate_model_types(ctx: &mut TransformerContext, model: &ModelInfo) -> Result<(), ConflictError> {
    let type_name = model.type_name.as_str();
    let fields = stored_fields(ctx, type_name);
    let is_key = |field: &FieldDefinition| model.key.fields().any(|key| key == field.name);

    ctx.document.add_type(
        TypeDefinition::object(names::connection_type(type_name))
            .with_field(FieldDefinition::new(
                "items",
                TypeRef::named(type_name).list().non_null(),
            ))
            .with_field(FieldDefinition::new("nextToken", TypeRef::named("String"))),
    )?;

    let filter = names::filter_input(type_name);
    let filter = comparison_input(ctx, &filter, fields.iter())?;
    ctx.document.add_type(filter)?;

    let has_mutation = [ModelOperation::Create, ModelOperation::Update, ModelOperation::Delete]
        .into_iter()
        .any(|operation| model.operation(operation).is_some());
    if has_mutation {
        let condition = names::condition_input(type_name);
        let condition = comparison_input(ctx, &condition, fields.iter().filter(|field| !is_key(*field)))?;
        ctx.document.add_type(condition)?;
    }

    if model.operation(ModelOperation::Create).is_some() {
        let generated_id = model.key.partition_key == "id" && model.key.sort_keys.is_empty();
        let input = fields.iter().fold(
            TypeDefinition::input_object(names::create_input(type_name)),
            |input, field| {
                let optional = (generated_id && field.name == "id") || model.timestamps.contains(&field.name);
                let ty = if optional { field.ty.clone().nullable() } else { field.ty.clone() };
                input.with_field(FieldDefinition::new(&field.name, ty))
            },
        );
        ctx.document.add_type(input)?;
    }

    if model.operation(ModelOperation::Update).is_some() {
        let input = fields.iter().fold(
            TypeDefinition::input_object(names::update_input(type_name)),
            |input, field| {
                let ty = if is_key(field) {
                    field.ty.clone().non_null()
                } else {
                    field.ty.clone().nullable()
                };
                input.with_field(FieldDefinition::new(&field.name, ty))
            },
        );
        ctx.document.add_type(input)?;
    }

    if model.operation(ModelOperation::Delete).is_some() {
        let input = fields.iter().filter(|field| is_key(*field)).fold(
            TypeDefinition::input_object(names::delete_input(type_name)),
            |input, field| input.with_field(FieldDefinition::new(&field.name, field.ty.clone().non_null())),
        );
        ctx.document.add_type(input)?;
    }

    Ok(())
}

/// A filter or condition input: one comparison per field, combined with `and`, `or` and `not`.
fn comparison_input<'a>(
    ctx: &mut TransformerContext,
    name: &str,
    fields: impl Iterator<Item = &'a FieldDefinition>,
) -> Result<TypeDefinition, ConflictError> {
    let mut input = TypeDefinition::input_object(name);

    for field in fields {
        if let Some(comparison) = common::scalar_filter_input(ctx, field.ty.base_name())? {
            input = input.with_field(FieldDefinition::new(&field.name, TypeRef::named(comparison)));
        }
    }

    Ok(input
        .with_field(FieldDefinition::new("and", TypeRef::named(name).list()))
        .with_field(FieldDefinition::new("or", TypeRef::named(name).list()))
        .with_field(FieldDefinition::new("not", TypeRef::named(name))))
}
