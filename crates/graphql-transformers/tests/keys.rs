#![allow(unused_crate_dependencies)]

mod support;

use assert_matches::assert_matches;
use graphql_transformer_core::{PipelineState, ResourceKind, TableIndex};
use indoc::indoc;
use pretty_assertions::assert_eq;
use rstest::rstest;
use support::{arguments, fields, managed, template, transform, typed_fields};

const ORDER: &str = indoc! {r#"
    type Order @model {
      customerId: ID! @primaryKey(sortKeyFields: ["placedAt"])
      placedAt: AWSDateTime!
      status: String @index(name: "byStatus", sortKeyFields: ["placedAt"], queryField: "ordersByStatus")
      email: AWSEmail @index
    }
"#};

#[test]
fn primary_keys_replace_the_id() {
    let output = transform(ORDER, managed(&["Order"])).unwrap();

    assert_eq!(
        fields(&output, "Order"),
        ["customerId", "placedAt", "status", "email", "createdAt", "updatedAt"]
    );
    assert_eq!(
        arguments(&output, "Query", "getOrder"),
        ["customerId: ID!", "placedAt: AWSDateTime!"]
    );
    assert_eq!(
        arguments(&output, "Query", "listOrders"),
        [
            "customerId: ID",
            "placedAt: ModelStringKeyConditionInput",
            "sortDirection: ModelSortDirection",
            "filter: ModelOrderFilterInput",
            "limit: Int",
            "nextToken: String",
        ]
    );
    assert_eq!(
        typed_fields(&output, "DeleteOrderInput"),
        ["customerId: ID!", "placedAt: AWSDateTime!"]
    );
    assert!(!template(&output, "Mutation.createOrder.data.1.req.vtl").contains("autoId"));
}

#[test]
fn indexes_are_added_to_the_table() {
    let output = transform(ORDER, managed(&["Order"])).unwrap();

    assert_matches!(&output.resources["OrderTable"].kind, ResourceKind::Table { partition_key, sort_keys, indexes, .. } => {
        assert_eq!(partition_key, "customerId");
        assert_eq!(sort_keys, &["placedAt"]);
        assert_eq!(
            indexes,
            &[
                TableIndex {
                    name: "byStatus".to_owned(),
                    partition_key: "status".to_owned(),
                    sort_keys: vec!["placedAt".to_owned()],
                },
                TableIndex {
                    name: "byEmail".to_owned(),
                    partition_key: "email".to_owned(),
                    sort_keys: Vec::new(),
                },
            ]
        );
    });
}

#[test]
fn query_fields_expose_indexes() {
    let output = transform(ORDER, managed(&["Order"])).unwrap();

    assert_eq!(fields(&output, "Query"), ["getOrder", "listOrders", "ordersByStatus"]);
    assert_eq!(
        arguments(&output, "Query", "ordersByStatus"),
        [
            "status: String!",
            "placedAt: ModelStringKeyConditionInput",
            "sortDirection: ModelSortDirection",
            "filter: ModelOrderFilterInput",
            "limit: Int",
            "nextToken: String",
        ]
    );
    assert_eq!(
        output.document.field("Query", "ordersByStatus").unwrap().ty.to_string(),
        "ModelOrderConnection"
    );

    let request = template(&output, "Query.ordersByStatus.data.1.req.vtl");
    assert!(request.contains(r#""index": "byStatus","#));
    assert!(!template(&output, "Query.ordersByStatus.auth.1.req.vtl").is_empty());
}

#[test]
fn composite_sort_keys_get_a_composite_condition() {
    let sdl = indoc! {r#"
        type Song @model {
          album: String! @index(sortKeyFields: ["disc", "track"], queryField: "songsByAlbum")
          disc: Int!
          track: Int!
        }
    "#};
    let output = transform(sdl, managed(&["Song"])).unwrap();

    assert_eq!(
        arguments(&output, "Query", "songsByAlbum")[1],
        "discTrack: ModelSongByAlbumAndDiscAndTrackCompositeKeyConditionInput"
    );
    assert_eq!(
        typed_fields(&output, "ModelSongByAlbumAndDiscAndTrackCompositeKeyInput"),
        ["disc: Int", "track: Int"]
    );
}

#[rstest]
#[case::missing_sort_key(
    r#"type Post @model { id: ID! @primaryKey(sortKeyFields: ["missing"]) }"#,
    "sort key field missing of @primaryKey does not exist on Post"
)]
#[case::nullable_key(
    r#"type Post @model { slug: String @primaryKey }"#,
    "the primary key field Post.slug must be non-null"
)]
#[case::two_keys(
    r#"type Post @model { slug: String! @primaryKey title: String! @primaryKey }"#,
    "Post has more than one @primaryKey field"
)]
#[case::duplicate_index(
    r#"type Post @model { title: String @index(name: "byTitle") body: String @index(name: "byTitle") }"#,
    "Post already has an index named byTitle"
)]
#[case::index_without_model(
    r#"type Post { title: String @index }"#,
    "@index can only be used on @model types, Post is not a registered model"
)]
fn invalid_keys(#[case] sdl: &str, #[case] message: &str) {
    let err = transform(sdl, managed(&["Post"])).unwrap_err();

    assert_eq!(err.stage, PipelineState::PerNodeTransform);
    assert_eq!(err.diagnostics().unwrap().iter_messages().collect::<Vec<_>>(), [message]);
}
