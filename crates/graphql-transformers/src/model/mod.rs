//! `@model`: turns an object type into a stored entity with CRUD root fields, subscriptions and
//! a backing data source.

mod types;

use graphql_transformer_core::{
    ConflictError, DataSourceStrategy, DataSourceType, Directive, FieldDefinition, HookError, InputValueDefinition,
    Location, ModelInfo, ModelOperation, ModelRootField, ResolverFunction, ResourceKind, Stage,
    TableIndex, Transformer, TransformerContext, TypeKind, TypeRef,
};
use heck::ToUpperCamelCase;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::{
    common::{self, nullable},
    names::{self, ToPlural},
    primary_key::PRIMARY_KEY_DIRECTIVE,
    templates,
};

pub const MODEL_DIRECTIVE: &str = "model";

const DEFINITIONS: &str = r"
directive @model(
  queries: ModelQueryMap
  mutations: ModelMutationMap
  subscriptions: ModelSubscriptionMap
  timestamps: TimestampConfiguration
) on OBJECT

input ModelQueryMap {
  get: String
  list: String
}

input ModelMutationMap {
  create: String
  update: String
  delete: String
}

input ModelSubscriptionMap {
  onCreate: [String]
  onUpdate: [String]
  onDelete: [String]
  level: ModelSubscriptionLevel
}

enum ModelSubscriptionLevel {
  off
  public
  on
}

input TimestampConfiguration {
  createdAt: String
  updatedAt: String
}
";

const SQL_STACK: &str = "SqlApiStack";

/// Every setting is optional: an absent setting takes the generated default, an explicit `null`
/// disables it.
#[derive(Debug, Default, Deserialize)]
struct ModelArguments {
    #[serde(default, deserialize_with = "nullable")]
    queries: Option<Option<QueryNames>>,
    #[serde(default, deserialize_with = "nullable")]
    mutations: Option<Option<MutationNames>>,
    #[serde(default, deserialize_with = "nullable")]
    subscriptions: Option<Option<SubscriptionNames>>,
    #[serde(default, deserialize_with = "nullable")]
    timestamps: Option<Option<TimestampNames>>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryNames {
    #[serde(default, deserialize_with = "nullable")]
    get: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    list: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct MutationNames {
    #[serde(default, deserialize_with = "nullable")]
    create: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    update: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    delete: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionNames {
    #[serde(default, deserialize_with = "nullable")]
    on_create: Option<Option<Vec<String>>>,
    #[serde(default, deserialize_with = "nullable")]
    on_update: Option<Option<Vec<String>>>,
    #[serde(default, deserialize_with = "nullable")]
    on_delete: Option<Option<Vec<String>>>,
    #[serde(default)]
    level: Option<SubscriptionLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SubscriptionLevel {
    Off,
    Public,
    On,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimestampNames {
    #[serde(default, deserialize_with = "nullable")]
    created_at: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    updated_at: Option<Option<String>>,
}

impl ModelArguments {
    /// Root fields in generation order. Subscriptions are only generated for enabled mutations.
    fn root_fields(&mut self, type_name: &str) -> Vec<(ModelOperation, String)> {
        let mut fields = Vec::new();

        if let Some(queries) = common::or_default(self.queries.take(), QueryNames::default) {
            let get = common::or_default(queries.get, || format!("get{type_name}"));
            let list = common::or_default(queries.list, || format!("list{}", type_name.to_plural()));
            fields.extend(get.map(|name| (ModelOperation::Get, name)));
            fields.extend(list.map(|name| (ModelOperation::List, name)));
        }

        if let Some(mutations) = common::or_default(self.mutations.take(), MutationNames::default) {
            for (operation, setting, prefix) in [
                (ModelOperation::Create, mutations.create, "create"),
                (ModelOperation::Update, mutations.update, "update"),
                (ModelOperation::Delete, mutations.delete, "delete"),
            ] {
                if let Some(name) = common::or_default(setting, || format!("{prefix}{type_name}")) {
                    fields.push((operation, name));
                }
            }
        }

        let subscriptions = common::or_default(self.subscriptions.take(), SubscriptionNames::default)
            .filter(|subscriptions| subscriptions.level != Some(SubscriptionLevel::Off));
        if let Some(subscriptions) = subscriptions {
            for (operation, mutation, setting, prefix) in [
                (ModelOperation::OnCreate, ModelOperation::Create, subscriptions.on_create, "onCreate"),
                (ModelOperation::OnUpdate, ModelOperation::Update, subscriptions.on_update, "onUpdate"),
                (ModelOperation::OnDelete, ModelOperation::Delete, subscriptions.on_delete, "onDelete"),
            ] {
                if !fields.iter().any(|(op, _)| *op == mutation) {
                    continue;
                }
                let names = common::or_default(setting, || vec![format!("{prefix}{type_name}")]).unwrap_or_default();
                fields.extend(names.into_iter().map(|name| (operation, name)));
            }
        }

        fields
    }

    fn timestamps(&mut self) -> Timestamps {
        let names = common::or_default(self.timestamps.take(), TimestampNames::default).unwrap_or(TimestampNames {
            created_at: Some(None),
            updated_at: Some(None),
        });
        Timestamps {
            created_at: common::or_default(names.created_at, || "createdAt".to_owned()),
            updated_at: common::or_default(names.updated_at, || "updatedAt".to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Timestamps {
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl Timestamps {
    fn fields(&self) -> Vec<String> {
        self.created_at.iter().chain(&self.updated_at).cloned().collect()
    }
}

/// Generates the CRUD surface of `@model` types and requests their tables.
#[derive(Debug, Default)]
pub struct ModelTransformer {
    timestamps: IndexMap<String, Timestamps>,
}

impl ModelTransformer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transformer for ModelTransformer {
    fn name(&self) -> &'static str {
        "model"
    }

    fn directive_definitions(&self) -> &'static str {
        DEFINITIONS
    }

    fn on_type_definition(
        &mut self,
        ctx: &mut TransformerContext,
        type_name: &str,
        directive: &Directive,
    ) -> Result<(), HookError> {
        let location = Location::ty(type_name, directive.pos);
        let ty = ctx
            .document
            .get_type(type_name)
            .ok_or_else(|| ConflictError::MissingType(type_name.to_owned()))?;

        if ty.kind != TypeKind::Object || ctx.document.roots().contains(type_name) {
            return Err(HookError::invalid_directive(
                location,
                format!("@model cannot be used on {type_name}, only on object types that are not root operation types"),
            ));
        }

        let strategy = ctx
            .data_source_strategy(type_name)
            .cloned()
            .ok_or_else(|| HookError::configuration(format!("no data source strategy is configured for model {type_name}")))?;

        let has_primary_key = ty.fields.iter().any(|field| field.has_directive(PRIMARY_KEY_DIRECTIVE));
        let has_id = ty.has_field("id");

        let mut arguments: ModelArguments = common::arguments(directive, &location)?;
        let timestamps = arguments.timestamps();
        let root_fields = arguments.root_fields(type_name);

        if !has_primary_key && !has_id {
            ctx.document
                .insert_field(type_name, 0, FieldDefinition::new("id", TypeRef::named("ID").non_null()))?;
        }
        for timestamp in timestamps.fields() {
            if ctx.document.field(type_name, &timestamp).is_none() {
                ctx.document
                    .add_field(type_name, FieldDefinition::new(timestamp, TypeRef::named("AWSDateTime").non_null()))?;
            }
        }

        let data_source = match &strategy {
            DataSourceStrategy::ManagedTable { .. } => names::table_data_source(type_name),
            DataSourceStrategy::ExternalDatabase { engine, .. } => {
                format!("{}DataSource", engine.to_string().to_upper_camel_case())
            }
        };

        let mut info = ModelInfo::new(type_name, data_source, strategy);
        info.timestamps = timestamps.fields();
        info.operations = root_fields
            .into_iter()
            .map(|(operation, name)| ModelRootField {
                operation,
                root: ctx.document.roots().name(operation.root()).to_owned(),
                name,
            })
            .collect();

        tracing::debug!(model = type_name, operations = info.operations.len(), "registered model");
        ctx.register_model(info)?;
        self.timestamps.insert(type_name.to_owned(), timestamps);
        Ok(())
    }

    fn transform_schema(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
        let models: Vec<ModelInfo> = ctx.models().cloned().collect();

        for model in &models {
            types::generate_model_types(ctx, model)?;
            add_root_fields(ctx, model)?;
            request_resources(ctx, model)?;
        }

        Ok(())
    }

    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
        let models: Vec<ModelInfo> = ctx.models().cloned().collect();

        for model in &models {
            let key: Vec<String> = model.key.fields().map(str::to_owned).collect();
            let updated_at = self
                .timestamps
                .get(&model.type_name)
                .and_then(|timestamps| timestamps.updated_at.as_deref());

            for field in &model.operations {
                let request = match (&model.strategy, field.operation) {
                    (_, ModelOperation::OnCreate | ModelOperation::OnUpdate | ModelOperation::OnDelete) => {
                        ctx.add_pipeline_entry(
                            &field.root,
                            &field.name,
                            Stage::Data,
                            ResolverFunction::new(templates::subscription(), templates::RESPONSE),
                        );
                        continue;
                    }
                    (_, ModelOperation::IndexQuery | ModelOperation::Search) => continue,
                    (DataSourceStrategy::ExternalDatabase { .. }, operation) => {
                        templates::sql(operation.as_ref(), &model.type_name, &key)
                    }
                    (DataSourceStrategy::ManagedTable { .. }, ModelOperation::Get) => {
                        templates::get_item(&templates::key_from(&key, "$ctx.args"))
                    }
                    (DataSourceStrategy::ManagedTable { .. }, ModelOperation::List) => templates::scan(),
                    (DataSourceStrategy::ManagedTable { .. }, ModelOperation::Create) => {
                        templates::put_item(&key, &model.timestamps)
                    }
                    (DataSourceStrategy::ManagedTable { .. }, ModelOperation::Update) => {
                        templates::update_item(&key, updated_at)
                    }
                    (DataSourceStrategy::ManagedTable { .. }, ModelOperation::Delete) => templates::delete_item(&key),
                };

                ctx.add_pipeline_entry(
                    &field.root,
                    &field.name,
                    Stage::Data,
                    ResolverFunction::new(request, templates::RESPONSE).with_data_source(&model.data_source),
                );
            }
        }

        Ok(())
    }
}

fn add_root_fields(ctx: &mut TransformerContext, model: &ModelInfo) -> Result<(), HookError> {
    let type_name = &model.type_name;

    for field in &model.operations {
        let definition = match field.operation {
            ModelOperation::Get => {
                let mut definition = FieldDefinition::new(&field.name, TypeRef::named(type_name));
                for key in model.key.fields() {
                    let ty = common::field_type(ctx, type_name, key)?.non_null();
                    definition = definition.with_argument(InputValueDefinition::new(key, ty));
                }
                definition
            }
            ModelOperation::List => {
                let mut definition = FieldDefinition::new(&field.name, TypeRef::named(names::connection_type(type_name)));
                if let Some(condition) = common::sort_key_condition(ctx, type_name, "Primary", &model.key.sort_keys)? {
                    let partition_key = &model.key.partition_key;
                    let ty = common::field_type(ctx, type_name, partition_key)?.nullable();
                    let sort_direction = common::sort_direction(ctx)?;
                    definition = definition
                        .with_argument(InputValueDefinition::new(partition_key, ty))
                        .with_argument(condition)
                        .with_argument(InputValueDefinition::new(
                            "sortDirection",
                            sort_direction,
                        ));
                }
                common::pagination_arguments(type_name)
                    .into_iter()
                    .fold(definition, FieldDefinition::with_argument)
            }
            ModelOperation::Create | ModelOperation::Update | ModelOperation::Delete => {
                let input = match field.operation {
                    ModelOperation::Create => names::create_input(type_name),
                    ModelOperation::Update => names::update_input(type_name),
                    _ => names::delete_input(type_name),
                };
                FieldDefinition::new(&field.name, TypeRef::named(type_name))
                    .with_argument(InputValueDefinition::new(
                        "input",
                        TypeRef::named(input).non_null(),
                    ))
                    .with_argument(InputValueDefinition::new(
                        "condition",
                        TypeRef::named(names::condition_input(type_name)),
                    ))
            }
            ModelOperation::OnCreate | ModelOperation::OnUpdate | ModelOperation::OnDelete => {
                let mutation = match field.operation {
                    ModelOperation::OnCreate => ModelOperation::Create,
                    ModelOperation::OnUpdate => ModelOperation::Update,
                    _ => ModelOperation::Delete,
                };
                let mutations: Vec<&str> = model
                    .operation(mutation)
                    .map(|root| root.name.as_str())
                    .into_iter()
                    .collect();
                FieldDefinition::new(&field.name, TypeRef::named(type_name))
                    .with_directive(Directive::new("aws_subscribe").with_argument("mutations", mutations))
            }
            ModelOperation::IndexQuery | ModelOperation::Search => continue,
        };

        ctx.document.get_or_insert_root(field.operation.root());
        ctx.document.add_field(&field.root, definition)?;
    }

    Ok(())
}

fn request_resources(ctx: &mut TransformerContext, model: &ModelInfo) -> Result<(), HookError> {
    let type_name = &model.type_name;

    match &model.strategy {
        DataSourceStrategy::ManagedTable { billing_mode } => {
            let table = names::table_resource(type_name);
            ctx.request_resource(
                &table,
                type_name,
                ResourceKind::Table {
                    partition_key: model.key.partition_key.clone(),
                    sort_keys: model.key.sort_keys.clone(),
                    indexes: model
                        .indexes
                        .iter()
                        .map(|index| TableIndex {
                            name: index.name.clone(),
                            partition_key: index.key.partition_key.clone(),
                            sort_keys: index.key.sort_keys.clone(),
                        })
                        .collect(),
                    billing_mode: billing_mode.to_string(),
                    stream: false,
                },
            )?;
            ctx.request_resource(
                &model.data_source,
                type_name,
                ResourceKind::DataSource {
                    data_source_type: DataSourceType::AmazonDynamodb,
                    target: table,
                },
            )?;
        }
        DataSourceStrategy::ExternalDatabase { connection, .. } => {
            ctx.request_resource(
                &model.data_source,
                SQL_STACK,
                ResourceKind::DataSource {
                    data_source_type: DataSourceType::RelationalDatabase,
                    target: connection.database.clone(),
                },
            )?;
        }
    }

    Ok(())
}
