#![allow(dead_code)]

use graphql_transformer_core::{
    DataSourceStrategy, GraphQLTransform, TransformConfig, TransformError, TransformOutput, Transformer,
};

/// Every listed type backed by a managed table.
pub fn managed(types: &[&str]) -> TransformConfig {
    types.iter().fold(TransformConfig::default(), |config, ty| {
        config.with_data_source(*ty, DataSourceStrategy::managed_table())
    })
}

pub fn transform(sdl: &str, config: TransformConfig) -> Result<TransformOutput, TransformError> {
    transform_with(graphql_transformers::default_transformers(), sdl, config)
}

pub fn transform_with(
    transformers: Vec<Box<dyn Transformer>>,
    sdl: &str,
    config: TransformConfig,
) -> Result<TransformOutput, TransformError> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    GraphQLTransform::new(transformers).with_config(config).transform(sdl)
}

/// Field names of a type of the output.
pub fn fields(output: &TransformOutput, type_name: &str) -> Vec<String> {
    output
        .document
        .get_type(type_name)
        .map(|ty| ty.fields.iter().map(|field| field.name.clone()).collect())
        .unwrap_or_default()
}

/// `name: Type` of every field of a type of the output.
pub fn typed_fields(output: &TransformOutput, type_name: &str) -> Vec<String> {
    output
        .document
        .get_type(type_name)
        .map(|ty| ty.fields.iter().map(|field| format!("{}: {}", field.name, field.ty)).collect())
        .unwrap_or_default()
}

/// `name: Type` of every argument of a field of the output.
pub fn arguments(output: &TransformOutput, type_name: &str, field_name: &str) -> Vec<String> {
    output
        .document
        .field(type_name, field_name)
        .map(|field| {
            field
                .arguments
                .iter()
                .map(|argument| format!("{}: {}", argument.name, argument.ty))
                .collect()
        })
        .unwrap_or_default()
}

pub fn template<'a>(output: &'a TransformOutput, name: &str) -> &'a str {
    output.resolvers.get(name).unwrap_or_default()
}
