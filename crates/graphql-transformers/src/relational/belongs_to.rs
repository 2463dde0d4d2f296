use graphql_transformer_core::{Directive, HookError, Location, Transformer, TransformerContext};
use serde::Deserialize;

use super::{Relation, HAS_MANY_DIRECTIVE};
use crate::{common, names};

pub const BELONGS_TO_DIRECTIVE: &str = "belongsTo";

const DEFINITIONS: &str = r"
directive @belongsTo(fields: [String]) on FIELD_DEFINITION
";

#[derive(Debug, Default, Deserialize)]
struct BelongsToArguments {
    #[serde(default)]
    fields: Vec<String>,
}

/// The child side of a relation. When the related type declares the matching `@hasMany`, the
/// foreign key it generated is reused.
#[derive(Debug, Default)]
pub struct BelongsToTransformer {
    relations: Vec<Relation>,
}

impl BelongsToTransformer {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The foreign key a `@hasMany` on the related type generated for this type, if any.
fn inverse_foreign_key(ctx: &TransformerContext, type_name: &str, related: &str) -> Option<String> {
    let related_type = ctx.document.get_type(related)?;
    related_type.fields.iter().find_map(|field| {
        let directive = field.directive(HAS_MANY_DIRECTIVE)?;
        let generated = directive.argument("indexName").is_none() && directive.argument("fields").is_none();
        (generated && field.ty.base_name() == type_name).then(|| names::foreign_key_field(related, &field.name))
    })
}

impl Transformer for BelongsToTransformer {
    fn name(&self) -> &'static str {
        "belongsTo"
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
        let related = super::related_model(ctx, type_name, field_name, BELONGS_TO_DIRECTIVE, &location, false)?;
        let arguments: BelongsToArguments = common::arguments(directive, &location)?;

        let Some(related_key) = ctx.model(&related).map(|model| model.key.clone()) else {
            return Ok(());
        };

        let source_fields = if !arguments.fields.is_empty() {
            super::check_fields(ctx, type_name, &arguments.fields, BELONGS_TO_DIRECTIVE, &location)?;
            arguments.fields
        } else if let Some(foreign_key) = inverse_foreign_key(ctx, type_name, &related)
            .filter(|foreign_key| ctx.document.field(type_name, foreign_key).is_some())
        {
            vec![foreign_key]
        } else {
            super::add_foreign_keys(ctx, type_name, type_name, field_name, &related, &related_key)?
        };

        self.relations.push(Relation {
            type_name: type_name.to_owned(),
            field_name: field_name.to_owned(),
            related,
            source_fields,
        });
        Ok(())
    }

    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
        super::generate_lookups(ctx, &self.relations);
        Ok(())
    }
}
