use graphql_transformer_core::{Directive, HookError, Location, Transformer, TransformerContext};
use serde::Deserialize;

use super::Relation;
use crate::common;

pub const HAS_ONE_DIRECTIVE: &str = "hasOne";

const DEFINITIONS: &str = r"
directive @hasOne(fields: [String]) on FIELD_DEFINITION
";

#[derive(Debug, Default, Deserialize)]
struct HasOneArguments {
    #[serde(default)]
    fields: Vec<String>,
}

/// One to one relation. The reference is held by the annotated side: either the named fields
/// or a generated `{type}{Field}Id` foreign key.
#[derive(Debug, Default)]
pub struct HasOneTransformer {
    relations: Vec<Relation>,
}

impl HasOneTransformer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transformer for HasOneTransformer {
    fn name(&self) -> &'static str {
        "hasOne"
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
        let related = super::related_model(ctx, type_name, field_name, HAS_ONE_DIRECTIVE, &location, false)?;
        let arguments: HasOneArguments = common::arguments(directive, &location)?;

        let Some(related_key) = ctx.model(&related).map(|model| model.key.clone()) else {
            return Ok(());
        };

        let source_fields = if arguments.fields.is_empty() {
            super::add_foreign_keys(ctx, type_name, type_name, field_name, &related, &related_key)?
        } else {
            super::check_fields(ctx, type_name, &arguments.fields, HAS_ONE_DIRECTIVE, &location)?;
            if arguments.fields.len() != related_key.fields().count() {
                return Err(HookError::invalid_directive(
                    location,
                    format!(
                        "the fields of @{HAS_ONE_DIRECTIVE} on {type_name}.{field_name} must match the primary key of {related}"
                    ),
                ));
            }
            arguments.fields
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
