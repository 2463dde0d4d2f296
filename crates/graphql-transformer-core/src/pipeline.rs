//! The orchestrator driving transformers through a run.

use bytes::Bytes;
use indexmap::{IndexMap, IndexSet};

use crate::{
    config::TransformConfig,
    context::{ResourceRequest, TransformerContext},
    diagnostics::Location,
    directives::DirectiveRegistry,
    document::{self, Directive, SchemaDocument},
    error::{TransformError, TransformErrorKind},
    resolvers::ResolverMap,
    transformer::Transformer,
    validation,
};

/// States of a run. `Failed` is reachable from every state before `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum PipelineState {
    Parsing,
    Validating,
    PerNodeTransform,
    WholeSchemaTransform,
    ResolverGeneration,
    FinalValidation,
    Done,
    Failed,
}

impl PipelineState {
    /// The state reached when this one completes successfully.
    pub fn next(self) -> Option<PipelineState> {
        match self {
            PipelineState::Parsing => Some(PipelineState::Validating),
            PipelineState::Validating => Some(PipelineState::PerNodeTransform),
            PipelineState::PerNodeTransform => Some(PipelineState::WholeSchemaTransform),
            PipelineState::WholeSchemaTransform => Some(PipelineState::ResolverGeneration),
            PipelineState::ResolverGeneration => Some(PipelineState::FinalValidation),
            PipelineState::FinalValidation => Some(PipelineState::Done),
            PipelineState::Done | PipelineState::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

/// What a successful run produces.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    /// The transformed schema as SDL.
    pub schema: String,
    pub document: SchemaDocument,
    pub resolvers: ResolverMap,
    /// Resource requests keyed by logical id, in request order.
    pub resources: IndexMap<String, ResourceRequest>,
    /// Named byte blobs to be materialized next to the API.
    pub assets: IndexMap<String, Bytes>,
}

/// Runs an ordered list of transformers over a schema.
///
/// Registration order is execution order. Transformers that depend on what another
/// transformer adds to the schema must be registered after it.
pub struct GraphQLTransform {
    transformers: Vec<Box<dyn Transformer>>,
    config: TransformConfig,
}

impl GraphQLTransform {
    pub fn new(transformers: Vec<Box<dyn Transformer>>) -> Self {
        Self {
            transformers,
            config: TransformConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: TransformConfig) -> Self {
        self.config = config;
        self
    }

    /// Transforms the SDL. Each call owns a fresh context, so the transform is consumed and
    /// nothing leaks from one run into another.
    pub fn transform(self, sdl: &str) -> Result<TransformOutput, TransformError> {
        let span = tracing::info_span!("graphql_transform", transformers = self.transformers.len());
        let _guard = span.enter();

        let mut run = Run {
            state: PipelineState::Parsing,
            transformers: self.transformers,
        };

        match run.execute(sdl, self.config) {
            Ok(output) => Ok(output),
            Err(err) => {
                let failed = PipelineState::Failed;
                tracing::debug!(from = %run.state, to = %failed, error = %err, "pipeline transition");
                Err(err)
            }
        }
    }
}

struct Run {
    state: PipelineState,
    transformers: Vec<Box<dyn Transformer>>,
}

impl Run {
    fn advance(&mut self) {
        if let Some(next) = self.state.next() {
            tracing::debug!(from = %self.state, to = %next, "pipeline transition");
            self.state = next;
        }
    }

    fn fail(&self, kind: impl Into<TransformErrorKind>) -> TransformError {
        TransformError::new(self.state, kind)
    }

    fn execute(&mut self, sdl: &str, config: TransformConfig) -> Result<TransformOutput, TransformError> {
        let document = document::parse(sdl).map_err(|err| self.fail(err))?;
        self.advance();

        let (registry, owned) = self.build_registry()?;
        let diagnostics = validation::validate(&document, &registry);
        if !diagnostics.is_empty() {
            let location = diagnostics.first().map(|diagnostic| diagnostic.location.clone());
            let mut err = self.fail(TransformErrorKind::Validation(diagnostics));
            err.location = location;
            return Err(err);
        }
        self.advance();

        let mut ctx = TransformerContext::new(document, config);
        self.per_node_pass(&mut ctx, &owned)?;
        self.advance();

        for transformer in &mut self.transformers {
            let name = transformer.name();
            tracing::debug!(transformer = name, "transform_schema");
            ctx.set_current_transformer(name);
            transformer
                .transform_schema(&mut ctx)
                .map_err(|err| TransformError::from_hook(self.state, name, None, err))?;
        }
        self.advance();

        for transformer in &mut self.transformers {
            let name = transformer.name();
            tracing::debug!(transformer = name, "generate_resolvers");
            ctx.set_current_transformer(name);
            transformer
                .generate_resolvers(&mut ctx)
                .map_err(|err| TransformError::from_hook(self.state, name, None, err))?;
        }
        self.advance();

        let (mut document, resolvers, resources, assets) = ctx.into_parts();
        strip_directives(&mut document, &owned);

        let diagnostics = validation::validate(&document, &registry);
        if !diagnostics.is_empty() {
            let location = diagnostics.first().map(|diagnostic| diagnostic.location.clone());
            let mut err = self.fail(TransformErrorKind::Validation(diagnostics));
            err.location = location;
            return Err(err);
        }
        self.advance();

        Ok(TransformOutput {
            schema: document::render(&document),
            document,
            resolvers: resolvers.finalize(),
            resources,
            assets,
        })
    }

    /// The built-in AppSync directives plus the ones each transformer declares. Also returns
    /// the directive names owned by each transformer, by registration index.
    fn build_registry(&self) -> Result<(DirectiveRegistry, Vec<IndexSet<String>>), TransformError> {
        let mut registry = DirectiveRegistry::with_builtins();
        let mut owned = Vec::with_capacity(self.transformers.len());

        for transformer in &self.transformers {
            let names = registry
                .register_sdl(transformer.name(), transformer.directive_definitions())
                .map_err(|err| {
                    let mut err = self.fail(err);
                    err.transformer = Some(transformer.name().to_owned());
                    err
                })?;
            owned.push(names.into_iter().collect());
        }

        Ok((registry, owned))
    }

    fn per_node_pass(&mut self, ctx: &mut TransformerContext, owned: &[IndexSet<String>]) -> Result<(), TransformError> {
        let stage = self.state;

        for (transformer, owned) in self.transformers.iter_mut().zip(owned) {
            let name = transformer.name();
            tracing::debug!(transformer = name, "per-node pass");
            ctx.set_current_transformer(name);

            if owned.is_empty() {
                continue;
            }

            // Nodes this transformer injects are not revisited, wherever they land.
            let snapshot: Vec<(String, Vec<String>)> = ctx
                .document
                .types()
                .map(|ty| (ty.name.clone(), ty.fields.iter().map(|field| field.name.clone()).collect()))
                .collect();

            for (type_name, field_names) in snapshot {
                let Some(ty) = ctx.document.get_type(&type_name) else {
                    continue;
                };
                let type_directives = owned_directives(&ty.directives, owned);

                for directive in type_directives {
                    tracing::trace!(transformer = name, %type_name, directive = %directive.name, "on_type_definition");
                    transformer
                        .on_type_definition(ctx, &type_name, &directive)
                        .map_err(|err| {
                            TransformError::from_hook(stage, name, Some(Location::ty(&type_name, directive.pos)), err)
                        })?;
                }

                for field_name in field_names {
                    let Some(field) = ctx.document.field(&type_name, &field_name) else {
                        continue;
                    };
                    for directive in owned_directives(&field.directives, owned) {
                        tracing::trace!(transformer = name, %type_name, %field_name, directive = %directive.name, "on_field_definition");
                        transformer
                            .on_field_definition(ctx, &type_name, &field_name, &directive)
                            .map_err(|err| {
                                let location = Location::field(&type_name, &field_name, directive.pos);
                                TransformError::from_hook(stage, name, Some(location), err)
                            })?;
                    }
                }
            }
        }

        Ok(())
    }
}

fn owned_directives(directives: &[Directive], owned: &IndexSet<String>) -> Vec<Directive> {
    directives
        .iter()
        .filter(|directive| owned.contains(&directive.name))
        .cloned()
        .collect()
}

/// Removes transformer directives from the output: the deployed schema only carries the
/// directives AppSync understands.
fn strip_directives(document: &mut SchemaDocument, owned: &[IndexSet<String>]) {
    let is_owned = |directive: &Directive| owned.iter().any(|names| names.contains(&directive.name));

    for type_name in document.type_names() {
        let Some(ty) = document.get_type_mut(&type_name) else {
            continue;
        };
        ty.directives.retain(|directive| !is_owned(directive));
        for field in &mut ty.fields {
            field.directives.retain(|directive| !is_owned(directive));
            for argument in &mut field.arguments {
                argument.directives.retain(|directive| !is_owned(directive));
            }
        }
        for value in &mut ty.values {
            value.directives.retain(|directive| !is_owned(directive));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use assert_matches::assert_matches;
    use indoc::indoc;

    use super::*;
    use crate::{
        document::{FieldDefinition, RootOperation, TypeDefinition, TypeRef},
        error::{ConflictError, HookError},
        resolvers::{ResolverFunction, ResolverKey, Stage},
    };

    type Log = Rc<RefCell<Vec<String>>>;

    /// Records every hook call. Owns `@<name>`, on objects and fields.
    struct Spy {
        name: &'static str,
        definitions: &'static str,
        log: Log,
    }

    impl Spy {
        fn boxed(name: &'static str, definitions: &'static str, log: &Log) -> Box<dyn Transformer> {
            Box::new(Spy {
                name,
                definitions,
                log: log.clone(),
            })
        }
    }

    impl Transformer for Spy {
        fn name(&self) -> &'static str {
            self.name
        }

        fn directive_definitions(&self) -> &'static str {
            self.definitions
        }

        fn on_type_definition(
            &mut self,
            _ctx: &mut TransformerContext,
            type_name: &str,
            directive: &Directive,
        ) -> Result<(), HookError> {
            self.log
                .borrow_mut()
                .push(format!("{}: type {type_name} @{}", self.name, directive.name));
            Ok(())
        }

        fn on_field_definition(
            &mut self,
            _ctx: &mut TransformerContext,
            type_name: &str,
            field_name: &str,
            directive: &Directive,
        ) -> Result<(), HookError> {
            self.log
                .borrow_mut()
                .push(format!("{}: field {type_name}.{field_name} @{}", self.name, directive.name));
            Ok(())
        }

        fn transform_schema(&mut self, _ctx: &mut TransformerContext) -> Result<(), HookError> {
            self.log.borrow_mut().push(format!("{}: transform_schema", self.name));
            Ok(())
        }

        fn generate_resolvers(&mut self, _ctx: &mut TransformerContext) -> Result<(), HookError> {
            self.log.borrow_mut().push(format!("{}: generate_resolvers", self.name));
            Ok(())
        }
    }

    /// Injects `type Generated @second` and a root field when it sees `@first`.
    struct Injector;

    impl Transformer for Injector {
        fn name(&self) -> &'static str {
            "injector"
        }

        fn directive_definitions(&self) -> &'static str {
            "directive @first on OBJECT"
        }

        fn on_type_definition(
            &mut self,
            ctx: &mut TransformerContext,
            _type_name: &str,
            _directive: &Directive,
        ) -> Result<(), HookError> {
            ctx.document.add_type(
                TypeDefinition::object("Generated")
                    .with_directive(Directive::new("first"))
                    .with_directive(Directive::new("second"))
                    .with_field(FieldDefinition::new("id", TypeRef::named("ID").non_null())),
            )?;
            ctx.document
                .get_or_insert_root(RootOperation::Query)
                .fields
                .push(FieldDefinition::new("generated", TypeRef::named("Generated")));
            Ok(())
        }

        fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
            ctx.add_pipeline_entry("Query", "generated", Stage::Data, ResolverFunction::new("req", "res"));
            Ok(())
        }
    }

    /// Claims the first auth slot of `Query.generated`.
    struct SlotGrabber(&'static str);

    impl Transformer for SlotGrabber {
        fn name(&self) -> &'static str {
            self.0
        }

        fn directive_definitions(&self) -> &'static str {
            ""
        }

        fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
            ctx.claim_slot(
                ResolverKey::new("Query", "generated", Stage::Auth, 0),
                ResolverFunction::new("auth", "auth"),
            )?;
            Ok(())
        }
    }

    const SCHEMA: &str = indoc! {r#"
        type Post @alpha @beta {
          id: ID!
          title: String @beta @alpha
        }

        type Comment @beta {
          id: ID!
        }
    "#};

    fn alpha(log: &Log) -> Box<dyn Transformer> {
        Spy::boxed("alpha", "directive @alpha on OBJECT | FIELD_DEFINITION", log)
    }

    fn beta(log: &Log) -> Box<dyn Transformer> {
        Spy::boxed("beta", "directive @beta on OBJECT | FIELD_DEFINITION", log)
    }

    #[test]
    fn hooks_run_in_registration_order() {
        let log = Log::default();

        let output = GraphQLTransform::new(vec![beta(&log), alpha(&log)])
            .transform(SCHEMA)
            .unwrap();

        insta::assert_debug_snapshot!(log.borrow(), @r###"
        [
            "beta: type Post @beta",
            "beta: field Post.title @beta",
            "beta: type Comment @beta",
            "alpha: type Post @alpha",
            "alpha: field Post.title @alpha",
            "beta: transform_schema",
            "alpha: transform_schema",
            "beta: generate_resolvers",
            "alpha: generate_resolvers",
        ]
        "###);
        insta::assert_snapshot!(output.schema, @r###"
        type Post {
          id: ID!
          title: String
        }

        type Comment {
          id: ID!
        }
        "###);
    }

    #[test]
    fn undeclared_directives_stop_the_run_before_any_hook() {
        let log = Log::default();

        let err = GraphQLTransform::new(vec![alpha(&log)])
            .transform("type Post @alpha @gamma { id: ID! }")
            .unwrap_err();

        assert_eq!(err.stage, PipelineState::Validating);
        assert_eq!(
            err.diagnostics().unwrap().iter_messages().collect::<Vec<_>>(),
            ["Unknown directive @gamma"]
        );
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn injected_nodes_are_visited_by_later_transformers_only() {
        let log = Log::default();
        let second = Spy::boxed("second", "directive @second on OBJECT", &log);

        let output = GraphQLTransform::new(vec![Box::new(Injector), second])
            .transform("type Post @first { id: ID! }")
            .unwrap();

        assert_eq!(
            log.borrow().as_slice(),
            ["second: type Generated @second", "second: transform_schema", "second: generate_resolvers"]
        );
        assert!(output.document.has_type("Generated"));
        assert_eq!(output.resolvers.get("Query.generated.data.1.req.vtl"), Some("req"));
    }

    /// Owns `@mark`; while visiting a marked field of `A`, adds a marked field to `B`.
    struct Marker {
        log: Log,
    }

    impl Transformer for Marker {
        fn name(&self) -> &'static str {
            "marker"
        }

        fn directive_definitions(&self) -> &'static str {
            "directive @mark on FIELD_DEFINITION"
        }

        fn on_field_definition(
            &mut self,
            ctx: &mut TransformerContext,
            type_name: &str,
            field_name: &str,
            _directive: &Directive,
        ) -> Result<(), HookError> {
            self.log.borrow_mut().push(format!("{type_name}.{field_name}"));
            if type_name == "A" {
                ctx.document.add_field(
                    "B",
                    FieldDefinition::new("injected", TypeRef::named("String")).with_directive(Directive::new("mark")),
                )?;
            }
            Ok(())
        }
    }

    #[test]
    fn fields_injected_into_later_types_are_not_visited() {
        let log = Log::default();

        let output = GraphQLTransform::new(vec![Box::new(Marker { log: log.clone() })])
            .transform("type A { f: String @mark } type B { id: ID! }")
            .unwrap();

        assert_eq!(log.borrow().as_slice(), ["A.f"]);
        assert!(output.document.field("B", "injected").is_some());
    }

    #[test]
    fn slot_collisions_fail_the_run() {
        let log = Log::default();
        let second = Spy::boxed("second", "directive @second on OBJECT", &log);

        let err = GraphQLTransform::new(vec![
            Box::new(Injector),
            second,
            Box::new(SlotGrabber("one")),
            Box::new(SlotGrabber("two")),
        ])
        .transform("type Post @first { id: ID! }")
        .unwrap_err();

        assert_eq!(err.stage, PipelineState::ResolverGeneration);
        assert_eq!(err.transformer.as_deref(), Some("two"));
        assert_eq!(
            err.to_string(),
            "resolver_generation failed in transformer `two`: resolver slot `Query.generated.auth.1` is held by `one`, `two` cannot claim it"
        );
    }

    #[test]
    fn hook_conflicts_name_the_transformer_and_node() {
        let log = Log::default();
        let second = Spy::boxed("second", "directive @second on OBJECT", &log);

        let err = GraphQLTransform::new(vec![Box::new(Injector), second])
            .transform("type Post @first { id: ID! } type Comment @first { id: ID! }")
            .unwrap_err();

        assert_eq!(err.stage, PipelineState::PerNodeTransform);
        assert_eq!(err.transformer.as_deref(), Some("injector"));
        assert_eq!(err.location.as_ref().map(|location| location.coordinate.as_str()), Some("Comment"));
        assert_matches!(err.kind, TransformErrorKind::Conflict(ConflictError::DuplicateType(name)) if name == "Generated");
    }

    #[test]
    fn parse_errors_fail_in_parsing() {
        let err = GraphQLTransform::new(Vec::new()).transform("type {").unwrap_err();

        assert_eq!(err.stage, PipelineState::Parsing);
        assert_matches!(err.kind, TransformErrorKind::Parse(_));
    }

    #[test]
    fn conflicting_directive_declarations_fail() {
        let log = Log::default();

        let err = GraphQLTransform::new(vec![alpha(&log), Spy::boxed("other", "directive @alpha on OBJECT", &log)])
            .transform("type Post { id: ID! }")
            .unwrap_err();

        assert_eq!(err.stage, PipelineState::Validating);
        assert_eq!(err.transformer.as_deref(), Some("other"));
        assert_matches!(
            err.kind,
            TransformErrorKind::Conflict(ConflictError::DuplicateDirectiveDefinition { .. })
        );
    }

    #[test]
    fn dangling_references_fail_final_validation() {
        struct Dangling;

        impl Transformer for Dangling {
            fn name(&self) -> &'static str {
                "dangling"
            }

            fn directive_definitions(&self) -> &'static str {
                ""
            }

            fn transform_schema(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
                ctx.document
                    .add_field("Post", FieldDefinition::new("author", TypeRef::named("Author")))?;
                Ok(())
            }
        }

        let err = GraphQLTransform::new(vec![Box::new(Dangling)])
            .transform("type Post { id: ID! }")
            .unwrap_err();

        assert_eq!(err.stage, PipelineState::FinalValidation);
        assert_eq!(err.to_string(), "final_validation failed at Post.author: 1 validation error(s)\nPost.author: Unknown type Author");
    }

    #[test]
    fn states_follow_each_other() {
        let mut state = PipelineState::Parsing;
        let mut seen = vec![state];
        while let Some(next) = state.next() {
            seen.push(next);
            state = next;
        }

        assert_eq!(seen.last(), Some(&PipelineState::Done));
        assert_eq!(seen.len(), 7);
        assert!(PipelineState::Failed.is_terminal());
    }
}
