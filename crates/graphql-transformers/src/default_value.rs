//! `@default`: fills a model field on creation when the input leaves it out.

use graphql_transformer_core::{
    Directive, HookError, Location, ModelOperation, ResolverFunction, Stage, Transformer, TransformerContext,
    TypeKind,
};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::{common, names, templates};

pub const DEFAULT_DIRECTIVE: &str = "default";

const DEFINITIONS: &str = r"
directive @default(value: String!) on FIELD_DEFINITION
";

#[derive(Debug, Deserialize)]
struct DefaultArguments {
    value: String,
}

/// Checks a default written as a string can be stored in a field of the given type, and returns
/// it as JSON for the template.
fn parse_default(ctx: &TransformerContext, base: &str, value: &str) -> Option<serde_json::Value> {
    match base {
        "Int" | "AWSTimestamp" => value.parse::<i32>().ok().map(serde_json::Value::from),
        "Float" => value
            .parse::<f64>()
            .ok()
            .filter(|number| number.is_finite())
            .map(serde_json::Value::from),
        "Boolean" => value.parse::<bool>().ok().map(serde_json::Value::from),
        "AWSJSON" => serde_json::from_str::<serde_json::Value>(value)
            .ok()
            .map(|_| serde_json::Value::from(value)),
        "AWSEmail" => value.contains('@').then(|| serde_json::Value::from(value)),
        _ => match ctx.document.get_type(base) {
            Some(ty) if ty.kind == TypeKind::Enum => ty.has_value(value).then(|| serde_json::Value::from(value)),
            _ => Some(serde_json::Value::from(value)),
        },
    }
}

#[derive(Debug, Default)]
pub struct DefaultValueTransformer {
    /// Defaults per model, by field.
    defaults: IndexMap<String, IndexMap<String, serde_json::Value>>,
}

impl DefaultValueTransformer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transformer for DefaultValueTransformer {
    fn name(&self) -> &'static str {
        "default"
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
        let model = common::require_model(ctx, type_name, DEFAULT_DIRECTIVE, &location)?;

        if model.key.fields().any(|key| key == field_name) {
            return Err(HookError::invalid_directive(
                location,
                format!("@{DEFAULT_DIRECTIVE} cannot be used on the primary key field {type_name}.{field_name}"),
            ));
        }
        if !common::is_scalar_field(ctx, type_name, field_name) {
            return Err(HookError::invalid_directive(
                location,
                format!("@{DEFAULT_DIRECTIVE} can only be used on scalar or enum fields, {type_name}.{field_name} is not one"),
            ));
        }

        let arguments: DefaultArguments = common::arguments(directive, &location)?;
        let ty = common::field_type(ctx, type_name, field_name)?;
        let Some(value) = parse_default(ctx, ty.base_name(), &arguments.value) else {
            return Err(HookError::invalid_directive(
                location,
                format!(
                    "default value \"{}\" is not a valid {} for {type_name}.{field_name}",
                    arguments.value,
                    ty.base_name()
                ),
            ));
        };

        self.defaults
            .entry(type_name.to_owned())
            .or_default()
            .insert(field_name.to_owned(), value);
        Ok(())
    }

    /// Defaulted fields become optional in the create input.
    fn transform_schema(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
        for (type_name, fields) in &self.defaults {
            let Some(input) = ctx.document.get_type_mut(&names::create_input(type_name)) else {
                continue;
            };
            for field_name in fields.keys() {
                if let Some(field) = input.field_mut(field_name) {
                    field.ty = field.ty.clone().nullable();
                }
            }
        }

        Ok(())
    }

    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
        for (type_name, fields) in &self.defaults {
            let Some(create) = ctx
                .model(type_name)
                .and_then(|model| model.operation(ModelOperation::Create))
                .cloned()
            else {
                continue;
            };

            let request: String = fields
                .iter()
                .map(|(field, value)| {
                    format!(
                        "$util.qr($ctx.args.input.put(\"{field}\", $util.defaultIfNull($ctx.args.input.{field}, {value})))\n"
                    )
                })
                .collect();
            ctx.add_pipeline_entry(
                &create.root,
                &create.name,
                Stage::Init,
                ResolverFunction::new(request + templates::PASSTHROUGH, templates::PASSTHROUGH),
            );
        }

        Ok(())
    }
}
