//! The transformers of the GraphQL transform pipeline.
//!
//! Each module owns one directive (the relational module owns three) and plugs into
//! [`graphql_transformer_core::GraphQLTransform`]. Transformers communicate through the model
//! registry of the context, so their registration order matters: [`default_transformers`]
//! returns them in an order where every transformer runs after the ones it depends on.
#![cfg_attr(test, allow(unused_crate_dependencies))]

mod auth;
mod common;
mod default_value;
mod function;
mod http;
mod index;
mod model;
pub mod names;
mod primary_key;
mod relational;
mod searchable;
mod templates;

use graphql_transformer_core::Transformer;

pub use self::{
    auth::{AuthTransformer, AUTH_DIRECTIVE},
    default_value::{DefaultValueTransformer, DEFAULT_DIRECTIVE},
    function::{FunctionTransformer, FUNCTION_DIRECTIVE},
    http::{HttpTransformer, HTTP_DIRECTIVE},
    index::{IndexTransformer, INDEX_DIRECTIVE},
    model::{ModelTransformer, MODEL_DIRECTIVE},
    primary_key::{PrimaryKeyTransformer, PRIMARY_KEY_DIRECTIVE},
    relational::{
        BelongsToTransformer, HasManyTransformer, HasOneTransformer, BELONGS_TO_DIRECTIVE, HAS_MANY_DIRECTIVE,
        HAS_ONE_DIRECTIVE,
    },
    searchable::{SearchableTransformer, SEARCHABLE_DIRECTIVE},
};

/// Every transformer, in the order they depend on each other: `@model` registers models before
/// the transformers reading them, and `@hasMany` comes before `@belongsTo` so the inverse side
/// can reuse its foreign key.
pub fn default_transformers() -> Vec<Box<dyn Transformer>> {
    vec![
        Box::new(ModelTransformer::new()),
        Box::new(AuthTransformer::new()),
        Box::new(PrimaryKeyTransformer::new()),
        Box::new(IndexTransformer::new()),
        Box::new(HasOneTransformer::new()),
        Box::new(HasManyTransformer::new()),
        Box::new(BelongsToTransformer::new()),
        Box::new(DefaultValueTransformer::new()),
        Box::new(SearchableTransformer::new()),
        Box::new(FunctionTransformer::new()),
        Box::new(HttpTransformer::new()),
    ]
}
