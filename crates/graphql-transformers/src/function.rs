//! `@function`: resolves a field by invoking Lambda functions.
//!
//! The directive is repeatable. Every occurrence becomes one `data` stage step, so functions run
//! in the order they are declared and each receives the previous result as `prev`.

use graphql_transformer_core::{
    DataSourceType, Directive, HookError, Location, ResolverFunction, ResourceKind, Stage, Transformer,
    TransformerContext, TypeKind,
};
use serde::Deserialize;

use crate::{common, names, templates};

pub const FUNCTION_DIRECTIVE: &str = "function";

const DEFINITIONS: &str = r"
directive @function(name: String!, region: String) repeatable on FIELD_DEFINITION
";

const FUNCTION_STACK: &str = "FunctionDirectiveStack";

#[derive(Debug, Deserialize)]
struct FunctionArguments {
    name: String,
    #[serde(default)]
    region: Option<String>,
}

#[derive(Debug)]
struct Invocation {
    type_name: String,
    field_name: String,
    function_name: String,
    region: Option<String>,
}

impl Invocation {
    /// The function the data source points at, qualified with its region when one is given.
    fn target(&self) -> String {
        match &self.region {
            Some(region) => format!("{region}:{}", self.function_name),
            None => self.function_name.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct FunctionTransformer {
    invocations: Vec<Invocation>,
}

impl FunctionTransformer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transformer for FunctionTransformer {
    fn name(&self) -> &'static str {
        "function"
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
        if ctx.document.kind_of(type_name) != Some(TypeKind::Object) {
            return Err(HookError::invalid_directive(
                location,
                format!("@{FUNCTION_DIRECTIVE} can only resolve fields of object types, {type_name} is not one"),
            ));
        }

        let arguments: FunctionArguments = common::arguments(directive, &location)?;
        if arguments.name.trim().is_empty() {
            return Err(HookError::invalid_directive(
                location,
                format!("@{FUNCTION_DIRECTIVE} on {type_name}.{field_name} needs a function name"),
            ));
        }

        self.invocations.push(Invocation {
            type_name: type_name.to_owned(),
            field_name: field_name.to_owned(),
            function_name: arguments.name,
            region: arguments.region,
        });
        Ok(())
    }

    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
        for invocation in &self.invocations {
            let data_source = names::lambda_data_source(&invocation.function_name);
            ctx.request_resource(
                &data_source,
                FUNCTION_STACK,
                ResourceKind::DataSource {
                    data_source_type: DataSourceType::AwsLambda,
                    target: invocation.target(),
                },
            )?;

            ctx.add_pipeline_entry(
                &invocation.type_name,
                &invocation.field_name,
                Stage::Data,
                ResolverFunction::new(templates::invoke(&invocation.function_name), templates::RESPONSE)
                    .with_data_source(data_source),
            );
        }

        Ok(())
    }
}
