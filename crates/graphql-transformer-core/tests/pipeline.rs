#![allow(unused_crate_dependencies)]

use assert_matches::assert_matches;
use graphql_transformer_core::{
    DataSourceType, Directive, FieldDefinition, GraphQLTransform, HookError, Location, PipelineState, ResolverFunction,
    ResolverKey, ResourceKind, RootOperation, Stage, TransformConfig, TransformErrorKind, Transformer,
    TransformerContext, TypeRef,
};
use indoc::indoc;
use pretty_assertions::assert_eq;

const NONE_DATA_SOURCE: &str = "NoneDataSource";

/// Resolves `@echo` fields locally, through a data source without a backing service.
#[derive(Default)]
struct Echo {
    fields: Vec<(String, String, String)>,
}

impl Transformer for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn directive_definitions(&self) -> &'static str {
        r#"directive @echo(prefix: String = "") on FIELD_DEFINITION"#
    }

    fn on_field_definition(
        &mut self,
        _ctx: &mut TransformerContext,
        type_name: &str,
        field_name: &str,
        directive: &Directive,
    ) -> Result<(), HookError> {
        let prefix = directive.argument("prefix").and_then(|value| value.as_str()).unwrap_or_default();
        self.fields
            .push((type_name.to_owned(), field_name.to_owned(), prefix.to_owned()));
        Ok(())
    }

    fn transform_schema(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
        ctx.document.get_or_insert_root(RootOperation::Query);
        ctx.document
            .add_field("Query", FieldDefinition::new("echoCount", TypeRef::named("Int").non_null()))?;
        Ok(())
    }

    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
        for (type_name, field_name, prefix) in &self.fields {
            ctx.request_resource(
                NONE_DATA_SOURCE,
                "EchoStack",
                ResourceKind::DataSource {
                    data_source_type: DataSourceType::None,
                    target: String::new(),
                },
            )?;
            let request = format!(r#"{{ "version": "2018-05-29", "payload": "{prefix}$ctx.args.message" }}"#);
            ctx.claim_slot(
                ResolverKey::new(type_name, field_name, Stage::Data, 0),
                ResolverFunction::new(request, "$util.toJson($ctx.result)").with_data_source(NONE_DATA_SOURCE),
            )?;
        }

        let count = serde_json::to_vec(&self.fields.len()).map_err(HookError::configuration)?;
        ctx.add_asset("echo-count.json", count)?;
        Ok(())
    }
}

/// Lowercases the result of `String` fields after the data step.
struct Lowercase;

impl Transformer for Lowercase {
    fn name(&self) -> &'static str {
        "lowercase"
    }

    fn directive_definitions(&self) -> &'static str {
        "directive @lowercase on FIELD_DEFINITION"
    }

    fn on_field_definition(
        &mut self,
        ctx: &mut TransformerContext,
        type_name: &str,
        field_name: &str,
        directive: &Directive,
    ) -> Result<(), HookError> {
        let is_string = ctx
            .document
            .field(type_name, field_name)
            .is_some_and(|field| field.ty.base_name() == "String");
        if !is_string {
            return Err(HookError::invalid_directive(
                Location::field(type_name, field_name, directive.pos),
                format!("@lowercase needs a String field, {type_name}.{field_name} is not one"),
            ));
        }

        ctx.add_pipeline_entry(
            type_name,
            field_name,
            Stage::PostDataLoad,
            ResolverFunction::new("{}", "$util.toJson($ctx.prev.result.toLowerCase())"),
        );
        Ok(())
    }
}

const SCHEMA: &str = indoc! {r#"
    type Query {
      hello(message: String): String @echo(prefix: "> ") @lowercase
      shout(message: String): String @echo
    }
"#};

fn transform(
    sdl: &str,
    config: TransformConfig,
) -> Result<graphql_transformer_core::TransformOutput, graphql_transformer_core::TransformError> {
    GraphQLTransform::new(vec![Box::new(Echo::default()), Box::new(Lowercase)])
        .with_config(config)
        .transform(sdl)
}

#[test]
fn plugins_contribute_schema_resolvers_and_resources() {
    let output = transform(SCHEMA, TransformConfig::default()).unwrap();

    assert_eq!(
        output.schema,
        indoc! {"
            type Query {
              hello(message: String): String
              shout(message: String): String
              echoCount: Int!
            }
        "}
    );
    assert_eq!(
        output.resolvers.keys().collect::<Vec<_>>(),
        [
            "Query.hello.data.1.req.vtl",
            "Query.hello.data.1.res.vtl",
            "Query.hello.postDataLoad.1.req.vtl",
            "Query.hello.postDataLoad.1.res.vtl",
            "Query.shout.data.1.req.vtl",
            "Query.shout.data.1.res.vtl",
        ]
    );
    assert!(output
        .resolvers
        .get("Query.hello.data.1.req.vtl")
        .is_some_and(|template| template.contains(r#""payload": "> $ctx.args.message""#)));
    assert_eq!(output.resolvers.data_sources.len(), 2);

    assert_eq!(output.resources.len(), 1);
    let data_source = &output.resources[NONE_DATA_SOURCE];
    assert_eq!(data_source.contributor, "echo");
    assert_eq!(data_source.stack, "EchoStack");
    assert_eq!(
        serde_json::to_value(data_source).unwrap(),
        serde_json::json!({
            "stack": "EchoStack",
            "contributor": "echo",
            "type": "dataSource",
            "dataSourceType": "NONE",
            "target": "",
        })
    );
    assert_eq!(&output.assets["echo-count.json"][..], b"2");
}

#[test]
fn stack_mapping_moves_resources() {
    let config = TransformConfig::from_toml_str(indoc! {r#"
        [stack_mapping]
        NoneDataSource = "LocalStack"
    "#})
    .unwrap();
    let output = transform(SCHEMA, config).unwrap();

    assert_eq!(output.resources[NONE_DATA_SOURCE].stack, "LocalStack");
}

#[test]
fn hook_errors_point_at_the_directive() {
    let sdl = "type Query { count: Int @lowercase }";
    let err = transform(sdl, TransformConfig::default()).unwrap_err();

    assert_eq!(err.stage, PipelineState::PerNodeTransform);
    assert_eq!(err.transformer.as_deref(), Some("lowercase"));
    assert_eq!(err.location.as_ref().map(|location| location.coordinate.as_str()), Some("Query.count"));
    assert_matches!(&err.kind, TransformErrorKind::Validation(diagnostics) => {
        assert_eq!(
            diagnostics.iter_messages().collect::<Vec<_>>(),
            ["@lowercase needs a String field, Query.count is not one"]
        );
    });
}

#[test]
fn undeclared_directives_are_reported_with_their_position() {
    let sdl = indoc! {"
        type Query {
          hello: String @uppercase
        }
    "};
    let err = transform(sdl, TransformConfig::default()).unwrap_err();

    assert_eq!(err.stage, PipelineState::Validating);
    let diagnostics = err.diagnostics().unwrap();
    let diagnostic = diagnostics.iter().next().unwrap();
    assert_eq!(diagnostic.location.coordinate, "Query.hello");
    assert_eq!(diagnostic.location.pos.map(|pos| pos.line), Some(2));
    assert_eq!(diagnostic.message, "Unknown directive @uppercase");
}

#[test]
fn unknown_configuration_keys_are_rejected() {
    assert!(TransformConfig::from_toml_str("[stack_mappings]\nPostTable = \"PostStack\"").is_err());
}
