//! `@index`: secondary indexes on model tables, optionally exposed as query fields.

use graphql_transformer_core::{
    Directive, FieldDefinition, HookError, InputValueDefinition, KeySchema, Location, ModelOperation,
    ModelRootField, ResolverFunction, RootOperation, SecondaryIndex, Stage, Transformer, TransformerContext,
    TypeRef,
};
use serde::Deserialize;

use crate::{common, names, primary_key::KeyArguments, templates};

pub const INDEX_DIRECTIVE: &str = "index";

const DEFINITIONS: &str = r"
directive @index(name: String, sortKeyFields: [String], queryField: String) repeatable on FIELD_DEFINITION
";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexArguments {
    #[serde(default)]
    name: Option<String>,
    #[serde(flatten)]
    key: KeyArguments,
    #[serde(default)]
    query_field: Option<String>,
}

#[derive(Debug)]
struct QueryIndex {
    type_name: String,
    index: SecondaryIndex,
    query_field: String,
}

#[derive(Debug, Default)]
pub struct IndexTransformer {
    queries: Vec<QueryIndex>,
}

impl IndexTransformer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transformer for IndexTransformer {
    fn name(&self) -> &'static str {
        "index"
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
        let model = common::require_model(ctx, type_name, INDEX_DIRECTIVE, &location)?;

        let arguments: IndexArguments = common::arguments(directive, &location)?;
        arguments
            .key
            .validate(ctx, type_name, field_name, INDEX_DIRECTIVE, &location)?;

        let name = arguments
            .name
            .unwrap_or_else(|| names::index_name(field_name, &arguments.key.sort_key_fields));
        if model.index(&name).is_some() {
            return Err(HookError::invalid_directive(
                location,
                format!("{type_name} already has an index named {name}"),
            ));
        }

        let index = SecondaryIndex {
            name,
            key: KeySchema {
                partition_key: field_name.to_owned(),
                sort_keys: arguments.key.sort_key_fields,
            },
            query_field: arguments.query_field.clone(),
        };
        let query_root = ctx.document.roots().name(RootOperation::Query).to_owned();

        let Some(model) = ctx.model_mut(type_name) else {
            return Ok(());
        };
        model.indexes.push(index.clone());
        if let Some(query_field) = arguments.query_field {
            model.operations.push(ModelRootField {
                operation: ModelOperation::IndexQuery,
                root: query_root,
                name: query_field.clone(),
            });
            self.queries.push(QueryIndex {
                type_name: type_name.to_owned(),
                index,
                query_field,
            });
        }

        Ok(())
    }

    fn transform_schema(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
        for query in &self.queries {
            let type_name = &query.type_name;
            let partition_key = &query.index.key.partition_key;
            let partition_type = common::field_type(ctx, type_name, partition_key)?.non_null();

            let mut field = FieldDefinition::new(&query.query_field, TypeRef::named(names::connection_type(type_name)))
                .with_argument(InputValueDefinition::new(partition_key, partition_type));
            if let Some(condition) =
                common::sort_key_condition(ctx, type_name, &query.index.name, &query.index.key.sort_keys)?
            {
                field = field.with_argument(condition);
            }
            let sort_direction = common::sort_direction(ctx)?;
            field = field.with_argument(InputValueDefinition::new("sortDirection", sort_direction));
            let field = common::pagination_arguments(type_name)
                .into_iter()
                .fold(field, FieldDefinition::with_argument);

            let root = ctx.document.get_or_insert_root(RootOperation::Query).name.clone();
            ctx.document.add_field(&root, field)?;
        }

        Ok(())
    }

    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
        for query in &self.queries {
            let Some(model) = ctx.model(&query.type_name) else {
                continue;
            };
            let data_source = model.data_source.clone();
            let partition_key = &query.index.key.partition_key;
            let request = templates::query(Some(&query.index.name), partition_key, "$ctx.args", partition_key, 100);
            let root = ctx.document.roots().name(RootOperation::Query).to_owned();

            ctx.add_pipeline_entry(
                &root,
                &query.query_field,
                Stage::Data,
                ResolverFunction::new(request, templates::RESPONSE).with_data_source(data_source),
            );
        }

        Ok(())
    }
}
