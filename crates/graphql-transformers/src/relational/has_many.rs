use graphql_transformer_core::{
    Directive, HookError, InputValueDefinition, KeySchema, Location, ResolverFunction,
    SecondaryIndex, Stage, Transformer, TransformerContext, TypeRef,
};
use serde::Deserialize;

use super::Relation;
use crate::{common, names, templates};

pub const HAS_MANY_DIRECTIVE: &str = "hasMany";

const DEFINITIONS: &str = r"
directive @hasMany(indexName: String, fields: [String], limit: Int = 100) on FIELD_DEFINITION
";

fn default_limit() -> u32 {
    100
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HasManyArguments {
    #[serde(default)]
    index_name: Option<String>,
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default = "default_limit")]
    limit: u32,
}

#[derive(Debug)]
struct ListRelation {
    relation: Relation,
    /// Index of the related table queried, `None` for its primary key.
    index: Option<String>,
    /// Partition key attribute on the related side.
    partition_key: String,
    limit: u32,
}

/// One to many relation, resolved with a query on the related table. Without `indexName` a
/// `{type}{Field}Id` foreign key and a `gsi-{Type}.{field}` index are added to the related model.
#[derive(Debug, Default)]
pub struct HasManyTransformer {
    relations: Vec<ListRelation>,
}

impl HasManyTransformer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transformer for HasManyTransformer {
    fn name(&self) -> &'static str {
        "hasMany"
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
        let related = super::related_model(ctx, type_name, field_name, HAS_MANY_DIRECTIVE, &location, true)?;
        let arguments: HasManyArguments = common::arguments(directive, &location)?;
        super::check_fields(ctx, type_name, &arguments.fields, HAS_MANY_DIRECTIVE, &location)?;

        let (Some(parent_key), Some(related_model)) = (
            ctx.model(type_name).map(|model| model.key.clone()),
            ctx.model(&related).cloned(),
        ) else {
            return Ok(());
        };

        let source_fields = if arguments.fields.is_empty() {
            parent_key.fields().map(str::to_owned).collect()
        } else {
            arguments.fields.clone()
        };

        let (index, partition_key) = match (&arguments.index_name, arguments.fields.is_empty()) {
            (Some(index_name), _) => {
                let Some(index) = related_model.index(index_name) else {
                    return Err(HookError::invalid_directive(
                        location,
                        format!("{related} has no index named {index_name}, referenced by {type_name}.{field_name}"),
                    ));
                };
                if source_fields.len() > index.key.fields().count() {
                    return Err(HookError::invalid_directive(
                        location,
                        format!("{type_name}.{field_name} names more fields than the key of index {index_name} has"),
                    ));
                }
                (Some(index_name.clone()), index.key.partition_key.clone())
            }
            (None, false) => (None, related_model.key.partition_key.clone()),
            (None, true) => {
                let foreign_keys =
                    super::add_foreign_keys(ctx, &related, type_name, field_name, type_name, &parent_key)?;
                let index_name = format!("gsi-{type_name}.{field_name}");
                let mut foreign_keys = foreign_keys.into_iter();
                let partition_key = foreign_keys.next().unwrap_or_default();

                if let Some(model) = ctx.model_mut(&related) {
                    model.indexes.push(SecondaryIndex {
                        name: index_name.clone(),
                        key: KeySchema {
                            partition_key: partition_key.clone(),
                            sort_keys: foreign_keys.collect(),
                        },
                        query_field: None,
                    });
                }
                (Some(index_name), partition_key)
            }
        };

        self.relations.push(ListRelation {
            relation: Relation {
                type_name: type_name.to_owned(),
                field_name: field_name.to_owned(),
                related,
                source_fields,
            },
            index,
            partition_key,
            limit: arguments.limit,
        });
        Ok(())
    }

    /// Relation fields return the related model's connection, which the model transformer has
    /// generated by now.
    fn transform_schema(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
        for ListRelation { relation, .. } in &self.relations {
            let related = &relation.related;
            let sort_direction = common::sort_direction(ctx)?;

            ctx.document.set_field_type(
                &relation.type_name,
                &relation.field_name,
                TypeRef::named(names::connection_type(related)),
            )?;

            let Some(field) = ctx
                .document
                .get_type_mut(&relation.type_name)
                .and_then(|ty| ty.field_mut(&relation.field_name))
            else {
                continue;
            };
            let [filter, limit, next_token] = common::pagination_arguments(related);
            field.arguments.extend([
                filter,
                InputValueDefinition::new("sortDirection", sort_direction),
                limit,
                next_token,
            ]);
        }

        Ok(())
    }

    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
        for list in &self.relations {
            let relation = &list.relation;
            let Some(related) = ctx.model(&relation.related) else {
                continue;
            };
            let source_field = relation.source_fields.first().map(String::as_str).unwrap_or("id");
            let request = templates::query(
                list.index.as_deref(),
                &list.partition_key,
                "$ctx.source",
                source_field,
                list.limit,
            );
            let function = ResolverFunction::new(request, templates::RESPONSE).with_data_source(&related.data_source);

            ctx.add_pipeline_entry(&relation.type_name, &relation.field_name, Stage::Data, function);
        }

        Ok(())
    }
}
