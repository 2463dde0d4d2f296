#![allow(unused_crate_dependencies)]

mod support;

use assert_matches::assert_matches;
use graphql_transformer_core::{DataSourceType, ResourceKind, TransformConfig};
use graphql_transformers::{DefaultValueTransformer, FunctionTransformer, HttpTransformer, ModelTransformer};
use indoc::indoc;
use pretty_assertions::assert_eq;
use rstest::rstest;
use support::{arguments, fields, managed, template, transform, transform_with, typed_fields};

#[test]
fn defaults_are_filled_before_creation() {
    let sdl = indoc! {r#"
        enum Status {
          DRAFT
          PUBLISHED
        }

        type Post @model {
          title: String! @default(value: "untitled")
          views: Int! @default(value: "0")
          status: Status @default(value: "DRAFT")
        }
    "#};
    let output = transform(sdl, managed(&["Post"])).unwrap();

    assert_eq!(
        typed_fields(&output, "CreatePostInput")[1..4],
        ["title: String", "views: Int", "status: Status"]
    );
    assert_eq!(typed_fields(&output, "Post")[1], "title: String!");

    let init = template(&output, "Mutation.createPost.init.1.req.vtl");
    assert!(init.contains(r#"$util.defaultIfNull($ctx.args.input.title, "untitled")"#));
    assert!(init.contains("$util.defaultIfNull($ctx.args.input.views, 0)"));
    assert!(init.contains(r#"$util.defaultIfNull($ctx.args.input.status, "DRAFT")"#));
    assert!(output.resolvers.get("Mutation.updatePost.init.1.req.vtl").is_none());
}

#[rstest]
#[case::not_a_number(
    r#"type Post @model { views: Int @default(value: "many") }"#,
    r#"default value "many" is not a valid Int for Post.views"#
)]
#[case::unknown_enum_value(
    r#"enum Status { DRAFT } type Post @model { status: Status @default(value: "GONE") }"#,
    r#"default value "GONE" is not a valid Status for Post.status"#
)]
#[case::primary_key(
    r#"type Post @model { id: ID! @default(value: "1") }"#,
    "@default cannot be used on the primary key field Post.id"
)]
fn invalid_defaults(#[case] sdl: &str, #[case] message: &str) {
    let err = transform(sdl, managed(&["Post"])).unwrap_err();

    assert_eq!(err.transformer.as_deref(), Some("default"));
    assert_eq!(err.diagnostics().unwrap().iter_messages().collect::<Vec<_>>(), [message]);
}

#[test]
fn searchable_models_get_a_search_query() {
    let sdl = indoc! {r#"
        type Post @model @searchable {
          title: String
          rating: Float
          published: Boolean
        }
    "#};
    let output = transform(sdl, managed(&["Post"])).unwrap();

    assert_eq!(fields(&output, "Query"), ["getPost", "listPosts", "searchPosts"]);
    assert_eq!(
        arguments(&output, "Query", "searchPosts"),
        [
            "filter: SearchablePostFilterInput",
            "sort: [SearchablePostSortInput]",
            "limit: Int",
            "nextToken: String",
            "from: Int",
        ]
    );
    assert_eq!(
        typed_fields(&output, "SearchablePostConnection"),
        ["items: [Post]!", "nextToken: String", "total: Int"]
    );
    assert_eq!(fields(&output, "SearchableBooleanFilterInput"), ["ne", "eq", "exists"]);

    let request = template(&output, "Query.searchPosts.data.1.req.vtl");
    assert!(request.contains(r#""path": "/post/_search""#), "{request}");
    assert_eq!(
        output.resolvers.data_sources.get("Query.searchPosts.data.1").map(String::as_str),
        Some("OpenSearchDataSource")
    );
}

#[test]
fn searchable_tables_are_streamed() {
    let output = transform("type Post @model @searchable { title: String }", managed(&["Post"])).unwrap();

    assert_matches!(output.resources["PostTable"].kind, ResourceKind::Table { stream: true, .. });

    let domain = &output.resources["OpenSearchDomain"];
    assert_eq!(domain.stack, "SearchableStack");
    assert_eq!(
        domain.kind,
        ResourceKind::SearchDomain {
            source_tables: vec!["PostTable".to_owned()],
        }
    );
    assert_eq!(
        output.resources["OpenSearchDataSource"].kind,
        ResourceKind::DataSource {
            data_source_type: DataSourceType::AmazonOpensearchService,
            target: "OpenSearchDomain".to_owned(),
        }
    );

    let mapping: serde_json::Value = serde_json::from_slice(&output.assets["searchable-mapping.json"]).unwrap();
    assert_eq!(
        mapping["indexes"][0],
        serde_json::json!({
            "model": "Post",
            "table": "PostTable",
            "index": "post",
            "fields": {
                "id": "text",
                "title": "text",
                "createdAt": "date",
                "updatedAt": "date",
            },
        })
    );
}

#[test]
fn search_queries_can_be_disabled() {
    let sdl = "type Post @model @searchable(queries: { search: null }) { title: String }";
    let output = transform(sdl, managed(&["Post"])).unwrap();

    assert_eq!(fields(&output, "Query"), ["getPost", "listPosts"]);
    assert!(output.document.has_type("SearchablePostConnection"));
}

#[test]
fn functions_run_in_declaration_order() {
    let sdl = indoc! {r#"
        type Query {
          echo(message: String): String @function(name: "authorize") @function(name: "echo-fn", region: "us-east-1")
        }
    "#};
    let output = transform(sdl, TransformConfig::default()).unwrap();

    assert!(template(&output, "Query.echo.data.1.req.vtl").contains(r#""function": "authorize""#));
    assert!(template(&output, "Query.echo.data.2.req.vtl").contains(r#""function": "echo-fn""#));
    assert_eq!(
        output.resolvers.data_sources.get("Query.echo.data.2").map(String::as_str),
        Some("EchoFnLambdaDataSource")
    );

    let data_source = &output.resources["EchoFnLambdaDataSource"];
    assert_eq!(data_source.stack, "FunctionDirectiveStack");
    assert_eq!(
        data_source.kind,
        ResourceKind::DataSource {
            data_source_type: DataSourceType::AwsLambda,
            target: "us-east-1:echo-fn".to_owned(),
        }
    );
    assert!(!output.schema.contains("@function"));
}

#[test]
fn functions_need_a_name() {
    let err = transform(r#"type Query { echo: String @function(name: " ") }"#, TransformConfig::default()).unwrap_err();

    assert_eq!(
        err.diagnostics().unwrap().iter_messages().collect::<Vec<_>>(),
        ["@function on Query.echo needs a function name"]
    );
}

#[test]
fn http_fields_call_the_endpoint() {
    let sdl = indoc! {r#"
        type Query {
          user(id: ID!, lang: String): AWSJSON
            @http(url: "https://api.example.com/users/:id?v=2", headers: [{ key: "x-api-key", value: "secret" }])
        }

        type Mutation {
          createUser(name: String): AWSJSON @http(method: POST, url: "https://api.example.com/users")
        }
    "#};
    let output = transform(sdl, TransformConfig::default()).unwrap();

    let get = template(&output, "Query.user.data.1.req.vtl");
    assert!(get.contains(r#""method": "GET","#));
    assert!(get.contains(r#""resourcePath": "/users/${ctx.args.id}","#));
    assert!(get.contains(r#"$util.qr($values.put("v", "2"))"#));
    assert!(get.contains(r#""headers": {"x-api-key":"secret"},"#));
    assert!(get.contains(r#"$util.qr($values.put("lang", $ctx.args.lang))"#));
    assert!(!get.contains(r#"$values.put("id""#));

    let post = template(&output, "Mutation.createUser.data.1.req.vtl");
    assert!(post.contains(r#""method": "POST","#));
    assert!(post.contains(r#""body": $util.toJson($values)"#));

    assert_eq!(output.resources.len(), 1);
    assert_eq!(
        output.resources["ApiExampleComHttpDataSource"].kind,
        ResourceKind::DataSource {
            data_source_type: DataSourceType::Http,
            target: "https://api.example.com".to_owned(),
        }
    );
}

#[rstest]
#[case::relative_url(
    r#"type Query { user: AWSJSON @http(url: "/users") }"#,
    "@http url /users is not an absolute url"
)]
#[case::missing_argument(
    r#"type Query { user: AWSJSON @http(url: "https://api.example.com/users/:id") }"#,
    "Query.user has no argument id for the url parameter :id"
)]
#[case::repeated_parameter(
    r#"type Query { user(id: ID): AWSJSON @http(url: "https://api.example.com/:id/:id") }"#,
    "url parameter :id of @http on Query.user is used twice"
)]
fn invalid_endpoints(#[case] sdl: &str, #[case] message: &str) {
    let err = transform(sdl, TransformConfig::default()).unwrap_err();

    assert_eq!(err.transformer.as_deref(), Some("http"));
    let messages: Vec<&str> = err.diagnostics().unwrap().iter_messages().collect();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with(message), "{}", messages[0]);
}

#[test]
fn independent_transformers_commute() {
    let sdl = indoc! {r#"
        type Post @model {
          title: String @default(value: "untitled")
        }

        type Query {
          echo: String @function(name: "echo")
          remote: AWSJSON @http(url: "https://api.example.com/remote")
        }
    "#};
    let first = transform_with(
        vec![
            Box::new(ModelTransformer::new()),
            Box::new(DefaultValueTransformer::new()),
            Box::new(FunctionTransformer::new()),
            Box::new(HttpTransformer::new()),
        ],
        sdl,
        managed(&["Post"]),
    )
    .unwrap();
    let second = transform_with(
        vec![
            Box::new(ModelTransformer::new()),
            Box::new(DefaultValueTransformer::new()),
            Box::new(HttpTransformer::new()),
            Box::new(FunctionTransformer::new()),
        ],
        sdl,
        managed(&["Post"]),
    )
    .unwrap();

    assert_eq!(first.schema, second.schema);
    assert_eq!(first.resolvers, second.resolvers);
}
