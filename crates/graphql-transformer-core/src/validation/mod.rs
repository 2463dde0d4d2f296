//! Validation of a document against the directive registry and the GraphQL SDL rules.
//!
//! Every problem is collected. The resulting [`Diagnostics`] follow document order, so the same
//! document always produces the same list.

mod directives;
mod types;

use crate::{
    diagnostics::{Diagnostics, Location},
    directives::DirectiveRegistry,
    document::SchemaDocument,
};

/// Validate the document and produce a possibly empty collection of errors.
pub fn validate(document: &SchemaDocument, registry: &DirectiveRegistry) -> Diagnostics {
    let mut ctx = Context {
        document,
        registry,
        diagnostics: Diagnostics::default(),
    };

    for ty in document.types() {
        directives::validate_type_directives(ty, &mut ctx);
        types::validate_type(ty, &mut ctx);
    }

    ctx.diagnostics
}

pub(crate) struct Context<'a> {
    pub(crate) document: &'a SchemaDocument,
    pub(crate) registry: &'a DirectiveRegistry,
    diagnostics: Diagnostics,
}

impl Context<'_> {
    pub(crate) fn push_error(&mut self, location: Location, message: impl Into<String>) {
        self.diagnostics.push(location, message);
    }

    /// Calls `handle_duplicate` with the index of every name that already appeared earlier.
    pub(crate) fn find_duplicates<'b, F>(&mut self, names: impl Iterator<Item = &'b str>, mut handle_duplicate: F)
    where
        F: FnMut(&mut Self, usize),
    {
        let mut seen = std::collections::BTreeSet::new();
        for (idx, name) in names.enumerate() {
            if !seen.insert(name) {
                handle_duplicate(self, idx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::document::parse;

    fn registry() -> DirectiveRegistry {
        let mut registry = DirectiveRegistry::with_builtins();
        registry
            .register_sdl(
                "model",
                indoc! {r#"
                    directive @model(queries: ModelQueryMap) on OBJECT
                    input ModelQueryMap { get: String list: String }
                "#},
            )
            .unwrap();
        registry
            .register_sdl("index", "directive @index(name: String!, sortKeyFields: [String]) repeatable on FIELD_DEFINITION")
            .unwrap();
        registry
            .register_sdl("default", "directive @default(value: String!) on FIELD_DEFINITION")
            .unwrap();
        registry
    }

    macro_rules! assert_validation_errors {
        ($schema:literal, $expected:expr) => {
            let document = parse(indoc!($schema)).unwrap();
            let diagnostics = validate(&document, &registry());
            let actual: Vec<String> = diagnostics
                .iter()
                .map(|diagnostic| format!("{}: {}", diagnostic.location.coordinate, diagnostic.message))
                .collect();
            let expected: Vec<&str> = $expected;
            pretty_assertions::assert_eq!(actual, expected);
        };
    }

    #[test]
    fn valid_document() {
        assert_validation_errors!(
            r#"
            interface Node { id: ID! }
            type Post implements Node @model(queries: {get: "post"}) {
              id: ID!
              title: String @default(value: "x")
              slug: String @index(name: "bySlug") @index(name: "bySlugAndTitle", sortKeyFields: ["title"])
              createdAt: AWSDateTime
            }
            type Query { posts(first: Int = 10, order: Order = ASC): [Post] @aws_api_key }
            enum Order { ASC DESC }
            union Result = Post
            "#,
            vec![]
        );
    }

    #[test]
    fn directive_usage() {
        assert_validation_errors!(
            r#"
            type Post @model(queries: {get: 1}) @index(name: "x") @unknown {
              id: ID! @model
              title: String @default(value: "a") @default(value: "b") @default(value: "c")
              body: String @default
              slug: String @default(value: "s", other: 1)
            }
            "#,
            vec![
                "Post: Invalid value for argument `queries` of @model: expected a value of type String, found 1 (at `get`)",
                "Post: Directive @index is not allowed on OBJECT, it can be used on FIELD_DEFINITION",
                "Post: Unknown directive @unknown",
                "Post.id: Directive @model is not allowed on FIELD_DEFINITION, it can be used on OBJECT",
                "Post.title: Directive @default cannot be used more than once on Post.title",
                "Post.title: Directive @default cannot be used more than once on Post.title",
                "Post.body: Missing required argument `value` on directive @default",
                "Post.slug: Unknown argument `other` on directive @default",
            ]
        );
    }

    #[test]
    fn sdl_rules() {
        assert_validation_errors!(
            r#"
            interface Node { id: ID! }
            type Post implements Node & Comment {
              title: String
              title: String
              author: Author
              filter(input: Post): PostInput
            }
            type Comment { id: ID! }
            input PostInput { post: Post, size: Int = "big" }
            enum Empty
            enum Order { ASC ASC }
            union Result = Post | PostInput
            "#,
            vec![
                "Post: Post does not define field `id` required by interface Node",
                "Post: Comment is not an interface and cannot be implemented by Post",
                "Post.title: Duplicate field title already exists on Post",
                "Post.author: Unknown type Author",
                "Post.filter(input:): Type Post of argument input is not an input type",
                "Post.filter: Input object PostInput cannot be used as an output type",
                "PostInput.post: Type Post of input field post is not an input type",
                "PostInput.size: Invalid default value: expected a value of type Int, found \"big\"",
                "Empty: Enum Empty must define one or more values",
                "Order: Duplicate enum value ASC on Order",
                "Result: Union member PostInput of Result is not an object type",
            ]
        );
    }
}
