//! `@primaryKey`: replaces the default `id` key of a model.

use graphql_transformer_core::{Directive, HookError, KeySchema, Location, Transformer, TransformerContext};
use indexmap::IndexSet;
use serde::Deserialize;

use crate::common;

pub const PRIMARY_KEY_DIRECTIVE: &str = "primaryKey";

const DEFINITIONS: &str = r"
directive @primaryKey(sortKeyFields: [String]) on FIELD_DEFINITION
";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct KeyArguments {
    #[serde(default)]
    pub(crate) sort_key_fields: Vec<String>,
}

impl KeyArguments {
    /// Checks the annotated field and its sort key fields can be stored in a key.
    pub(crate) fn validate(
        &self,
        ctx: &TransformerContext,
        type_name: &str,
        field_name: &str,
        directive: &str,
        location: &Location,
    ) -> Result<(), HookError> {
        if !common::is_scalar_field(ctx, type_name, field_name) {
            return Err(HookError::invalid_directive(
                location.clone(),
                format!("@{directive} can only be used on scalar or enum fields, {type_name}.{field_name} is not one"),
            ));
        }

        let mut seen = IndexSet::new();
        for sort_key in &self.sort_key_fields {
            if ctx.document.field(type_name, sort_key).is_none() {
                return Err(HookError::invalid_directive(
                    location.clone(),
                    format!("sort key field {sort_key} of @{directive} does not exist on {type_name}"),
                ));
            }
            if !common::is_scalar_field(ctx, type_name, sort_key) {
                return Err(HookError::invalid_directive(
                    location.clone(),
                    format!("sort key field {type_name}.{sort_key} of @{directive} must be a scalar or enum field"),
                ));
            }
            if sort_key == field_name || !seen.insert(sort_key) {
                return Err(HookError::invalid_directive(
                    location.clone(),
                    format!("sort key field {sort_key} is used more than once in @{directive}"),
                ));
            }
        }

        Ok(())
    }
}

/// Records custom primary keys on the model. The model transformer builds the `get` query and
/// the table key from the recorded schema.
#[derive(Debug, Default)]
pub struct PrimaryKeyTransformer {
    keyed: IndexSet<String>,
}

impl PrimaryKeyTransformer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transformer for PrimaryKeyTransformer {
    fn name(&self) -> &'static str {
        "primaryKey"
    }

    fn directive_definitions(&self) -> &'static str {
        DEFINITIONS
    }

    fn on_field_definition(
        &mut self,
        ctx: &mut TransformerContext,
        type_name: &str,
        field_name: &str,
        directive: &Directive,
    ) -> Result<(), HookError> {
        let location = Location::field(type_name, field_name, directive.pos);
        common::require_model(ctx, type_name, PRIMARY_KEY_DIRECTIVE, &location)?;
        if !self.keyed.insert(type_name.to_owned()) {
            return Err(HookError::invalid_directive(
                location,
                format!("{type_name} has more than one @primaryKey field"),
            ));
        }

        let arguments: KeyArguments = common::arguments(directive, &location)?;
        arguments.validate(ctx, type_name, field_name, PRIMARY_KEY_DIRECTIVE, &location)?;

        let is_required = ctx
            .document
            .field(type_name, field_name)
            .is_some_and(|field| field.ty.is_non_null());
        if !is_required {
            return Err(HookError::invalid_directive(
                location,
                format!("the primary key field {type_name}.{field_name} must be non-null"),
            ));
        }

        let Some(model) = ctx.model_mut(type_name) else {
            return Ok(());
        };
        model.key = KeySchema {
            partition_key: field_name.to_owned(),
            sort_keys: arguments.sort_key_fields,
        };
        tracing::debug!(model = type_name, key = field_name, "custom primary key");
        Ok(())
    }
}
