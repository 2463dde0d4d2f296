//! `@searchable`: streams model tables into a search domain and exposes a search query.

use graphql_transformer_core::{
    DataSourceStrategy, DataSourceType, Directive, FieldDefinition, HookError, InputValueDefinition, Location,
    ModelInfo, ModelOperation, ModelRootField, ResolverFunction, ResourceKind, RootOperation, Stage, Transformer,
    TransformerContext, TypeDefinition, TypeKind, TypeRef,
};
use serde::Deserialize;

use crate::{
    common::{self, nullable},
    names::{self, ToPlural},
    templates,
};

pub const SEARCHABLE_DIRECTIVE: &str = "searchable";

const DEFINITIONS: &str = r"
directive @searchable(queries: SearchableQueryMap) on OBJECT

input SearchableQueryMap {
  search: String
}
";

const SEARCH_STACK: &str = "SearchableStack";
const SEARCH_DOMAIN: &str = "OpenSearchDomain";
const SEARCH_DATA_SOURCE: &str = "OpenSearchDataSource";
const MAPPING_ASSET: &str = "searchable-mapping.json";

#[derive(Debug, Default, Deserialize)]
struct SearchableArguments {
    #[serde(default, deserialize_with = "nullable")]
    queries: Option<Option<SearchQueryNames>>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchQueryNames {
    #[serde(default, deserialize_with = "nullable")]
    search: Option<Option<String>>,
}

#[derive(Debug, Default)]
pub struct SearchableTransformer {
    /// Searchable models, in document order.
    models: Vec<String>,
}

impl SearchableTransformer {
    pub fn new() -> Self {
        Self::default()
    }
}

fn searchable_filter(scalar: &str) -> String {
    format!("Searchable{scalar}FilterInput")
}

fn sortable_fields(type_name: &str) -> String {
    format!("Searchable{type_name}SortableFields")
}

fn search_connection(type_name: &str) -> String {
    format!("Searchable{type_name}Connection")
}

/// The shared filter input for a leaf type. Enums and custom scalars are searched as text.
fn scalar_filter(ctx: &mut TransformerContext, base: &str) -> Result<String, HookError> {
    let scalar = match base {
        "Int" | "AWSTimestamp" => "Int",
        "Float" => "Float",
        "Boolean" => "Boolean",
        "ID" => "ID",
        _ => "String",
    };
    let name = searchable_filter(scalar);
    let ty = TypeRef::named(scalar);

    let mut fields = vec![("ne", ty.clone()), ("eq", ty.clone())];
    match scalar {
        "Boolean" => {}
        "Int" | "Float" => fields.extend([
            ("gt", ty.clone()),
            ("lt", ty.clone()),
            ("gte", ty.clone()),
            ("lte", ty.clone()),
            ("range", ty.clone().list()),
        ]),
        _ => fields.extend([
            ("gt", ty.clone()),
            ("lt", ty.clone()),
            ("gte", ty.clone()),
            ("lte", ty.clone()),
            ("match", ty.clone()),
            ("matchPhrase", ty.clone()),
            ("matchPhrasePrefix", ty.clone()),
            ("multiMatch", ty.clone()),
            ("wildcard", ty.clone()),
            ("regexp", ty.clone()),
            ("range", ty.clone().list()),
        ]),
    }
    fields.push(("exists", TypeRef::named("Boolean")));

    let input = fields
        .into_iter()
        .fold(TypeDefinition::input_object(&name), |input, (field, ty)| {
            input.with_field(FieldDefinition::new(field, ty))
        });
    common::ensure_type(ctx, input)?;
    Ok(name)
}

/// Scalar and enum fields of the model, with their base type.
fn searchable_fields(ctx: &TransformerContext, type_name: &str) -> Vec<(String, String)> {
    ctx.document
        .get_type(type_name)
        .map(|ty| {
            ty.fields
                .iter()
                .filter(|field| ctx.document.is_leaf_type(field.ty.base_name()))
                .map(|field| (field.name.clone(), field.ty.base_name().to_owned()))
                .collect()
        })
        .unwrap_or_default()
}

fn generate_search_types(ctx: &mut TransformerContext, type_name: &str) -> Result<(), HookError> {
    let fields = searchable_fields(ctx, type_name);

    let filter_name = searchable_filter(type_name);
    let mut filter = TypeDefinition::input_object(&filter_name);
    for (field, base) in &fields {
        let input = scalar_filter(ctx, base)?;
        filter = filter.with_field(FieldDefinition::new(field, TypeRef::named(input)));
    }
    filter = filter
        .with_field(FieldDefinition::new("and", TypeRef::named(&filter_name).list()))
        .with_field(FieldDefinition::new("or", TypeRef::named(&filter_name).list()))
        .with_field(FieldDefinition::new("not", TypeRef::named(&filter_name)));
    ctx.document.add_type(filter)?;

    common::ensure_type(ctx, TypeDefinition::enumeration("SearchableSortDirection", ["asc", "desc"]))?;
    ctx.document.add_type(TypeDefinition::enumeration(
        sortable_fields(type_name),
        fields.iter().map(|(field, _)| field.as_str()),
    ))?;
    ctx.document.add_type(
        TypeDefinition::input_object(format!("Searchable{type_name}SortInput"))
            .with_field(FieldDefinition::new("field", TypeRef::named(sortable_fields(type_name))))
            .with_field(FieldDefinition::new("direction", TypeRef::named("SearchableSortDirection"))),
    )?;

    ctx.document.add_type(
        TypeDefinition::object(search_connection(type_name))
            .with_field(FieldDefinition::new("items", TypeRef::named(type_name).list().non_null()))
            .with_field(FieldDefinition::new("nextToken", TypeRef::named("String")))
            .with_field(FieldDefinition::new("total", TypeRef::named("Int"))),
    )?;

    Ok(())
}

fn search_field(type_name: &str, name: &str) -> FieldDefinition {
    FieldDefinition::new(name, TypeRef::named(search_connection(type_name)))
        .with_argument(InputValueDefinition::new("filter", TypeRef::named(searchable_filter(type_name))))
        .with_argument(InputValueDefinition::new(
            "sort",
            TypeRef::named(format!("Searchable{type_name}SortInput")).list(),
        ))
        .with_argument(InputValueDefinition::new("limit", TypeRef::named("Int")))
        .with_argument(InputValueDefinition::new("nextToken", TypeRef::named("String")))
        .with_argument(InputValueDefinition::new("from", TypeRef::named("Int")))
}

/// Describes, per searchable model, which table feeds which index and how fields are mapped.
fn streaming_mapping(ctx: &TransformerContext, models: &[String]) -> serde_json::Value {
    let indexes: Vec<serde_json::Value> = models
        .iter()
        .map(|type_name| {
            let fields: serde_json::Map<String, serde_json::Value> = searchable_fields(ctx, type_name)
                .into_iter()
                .map(|(field, base)| {
                    let mapping = match base.as_str() {
                        "Int" | "AWSTimestamp" => "long",
                        "Float" => "double",
                        "Boolean" => "boolean",
                        "AWSDateTime" | "AWSDate" => "date",
                        _ if ctx.document.kind_of(&base) == Some(TypeKind::Enum) => "keyword",
                        _ => "text",
                    };
                    (field, serde_json::Value::from(mapping))
                })
                .collect();
            serde_json::json!({
                "model": type_name,
                "table": names::table_resource(type_name),
                "index": names::search_index(type_name),
                "fields": fields,
            })
        })
        .collect();

    serde_json::json!({ "domain": SEARCH_DOMAIN, "indexes": indexes })
}

impl Transformer for SearchableTransformer {
    fn name(&self) -> &'static str {
        "searchable"
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
        let model = common::require_model(ctx, type_name, SEARCHABLE_DIRECTIVE, &location)?;
        if let DataSourceStrategy::ExternalDatabase { .. } = model.strategy {
            return Err(HookError::configuration(format!(
                "@{SEARCHABLE_DIRECTIVE} on {type_name} needs a managed table to stream from, but {type_name} is backed by an external database"
            )));
        }

        let arguments: SearchableArguments = common::arguments(directive, &location)?;
        let search = common::or_default(arguments.queries, SearchQueryNames::default)
            .and_then(|queries| common::or_default(queries.search, || format!("search{}", type_name.to_plural())));

        let query_root = ctx.document.roots().name(RootOperation::Query).to_owned();
        if let (Some(name), Some(model)) = (search, ctx.model_mut(type_name)) {
            model.operations.push(ModelRootField {
                operation: ModelOperation::Search,
                root: query_root,
                name,
            });
        }
        self.models.push(type_name.to_owned());
        Ok(())
    }

    fn transform_schema(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
        if self.models.is_empty() {
            return Ok(());
        }

        let models: Vec<ModelInfo> = self
            .models
            .iter()
            .filter_map(|type_name| ctx.model(type_name).cloned())
            .collect();

        for model in &models {
            generate_search_types(ctx, &model.type_name)?;
            if let Some(search) = model.operation(ModelOperation::Search) {
                ctx.document.get_or_insert_root(RootOperation::Query);
                ctx.document
                    .add_field(&search.root, search_field(&model.type_name, &search.name))?;
            }

            if let Some(resource) = ctx.resource_mut(&names::table_resource(&model.type_name)) {
                if let ResourceKind::Table { stream, .. } = &mut resource.kind {
                    *stream = true;
                }
            }
        }

        ctx.request_resource(
            SEARCH_DOMAIN,
            SEARCH_STACK,
            ResourceKind::SearchDomain {
                source_tables: self.models.iter().map(|model| names::table_resource(model)).collect(),
            },
        )?;
        ctx.request_resource(
            SEARCH_DATA_SOURCE,
            SEARCH_STACK,
            ResourceKind::DataSource {
                data_source_type: DataSourceType::AmazonOpensearchService,
                target: SEARCH_DOMAIN.to_owned(),
            },
        )?;

        let mapping = serde_json::to_vec_pretty(&streaming_mapping(ctx, &self.models)).map_err(HookError::configuration)?;
        ctx.add_asset(MAPPING_ASSET, mapping)?;

        tracing::debug!(models = self.models.len(), "search domain requested");
        Ok(())
    }

    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
        for type_name in &self.models {
            let Some(search) = ctx
                .model(type_name)
                .and_then(|model| model.operation(ModelOperation::Search))
                .cloned()
            else {
                continue;
            };

            ctx.add_pipeline_entry(
                &search.root,
                &search.name,
                Stage::Data,
                ResolverFunction::new(templates::search(&names::search_index(type_name)), templates::SEARCH_RESPONSE)
                    .with_data_source(SEARCH_DATA_SOURCE),
            );
        }

        Ok(())
    }
}
