//! State shared by every transformer of a run.

mod model;
mod resources;

pub use self::{
    model::{KeySchema, ModelInfo, ModelOperation, ModelRootField, SecondaryIndex},
    resources::{DataSourceType, ResourceKind, ResourceRequest, TableIndex},
};

use bytes::Bytes;
use indexmap::IndexMap;

use crate::{
    config::{AuthConfig, DataSourceStrategy, TransformConfig},
    document::SchemaDocument,
    error::{ClaimSlotError, ConflictError},
    resolvers::{ResolverAccumulator, ResolverFunction, ResolverKey, Stage},
};

/// Everything a transformer hook can read and mutate.
///
/// Created once per run by the orchestrator and handed to each hook by mutable reference.
/// Contributions are attributed to the transformer whose hook is currently running.
#[derive(Debug)]
pub struct TransformerContext {
    pub document: SchemaDocument,
    config: TransformConfig,
    resolvers: ResolverAccumulator,
    models: IndexMap<String, ModelInfo>,
    resources: IndexMap<String, ResourceRequest>,
    assets: IndexMap<String, Bytes>,
    current_transformer: &'static str,
}

impl TransformerContext {
    pub fn new(document: SchemaDocument, config: TransformConfig) -> Self {
        Self {
            document,
            config,
            resolvers: ResolverAccumulator::new(),
            models: IndexMap::new(),
            resources: IndexMap::new(),
            assets: IndexMap::new(),
            current_transformer: "",
        }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    pub fn auth_config(&self) -> &AuthConfig {
        &self.config.auth
    }

    /// The data source strategy configured for a model type.
    pub fn data_source_strategy(&self, type_name: &str) -> Option<&DataSourceStrategy> {
        self.config.data_sources.get(type_name)
    }

    /// Name of the transformer whose hook is running.
    pub fn current_transformer(&self) -> &'static str {
        self.current_transformer
    }

    pub(crate) fn set_current_transformer(&mut self, name: &'static str) {
        self.current_transformer = name;
    }

    pub fn register_model(&mut self, info: ModelInfo) -> Result<(), ConflictError> {
        if self.models.contains_key(&info.type_name) {
            return Err(ConflictError::DuplicateModel(info.type_name));
        }
        self.models.insert(info.type_name.clone(), info);
        Ok(())
    }

    pub fn model(&self, type_name: &str) -> Option<&ModelInfo> {
        self.models.get(type_name)
    }

    pub fn model_mut(&mut self, type_name: &str) -> Option<&mut ModelInfo> {
        self.models.get_mut(type_name)
    }

    pub fn is_model(&self, type_name: &str) -> bool {
        self.models.contains_key(type_name)
    }

    /// Registered models, in registration order.
    pub fn models(&self) -> impl Iterator<Item = &ModelInfo> {
        self.models.values()
    }

    /// Requests a resource. It is placed in `default_stack` unless the configuration maps its id
    /// to another stack. Requesting the same id again with an identical definition is a no-op.
    pub fn request_resource(
        &mut self,
        id: impl Into<String>,
        default_stack: &str,
        kind: ResourceKind,
    ) -> Result<(), ConflictError> {
        let id = id.into();
        let stack = self
            .config
            .stack_mapping
            .get(&id)
            .cloned()
            .unwrap_or_else(|| default_stack.to_owned());

        if let Some(existing) = self.resources.get(&id) {
            if existing.kind == kind && existing.stack == stack {
                return Ok(());
            }
            return Err(ConflictError::DuplicateResource {
                id,
                existing: existing.contributor.clone(),
            });
        }

        tracing::trace!(resource = %id, %stack, contributor = self.current_transformer, "resource requested");
        self.resources.insert(
            id,
            ResourceRequest {
                stack,
                contributor: self.current_transformer.to_owned(),
                kind,
            },
        );
        Ok(())
    }

    pub fn resource(&self, id: &str) -> Option<&ResourceRequest> {
        self.resources.get(id)
    }

    pub fn resource_mut(&mut self, id: &str) -> Option<&mut ResourceRequest> {
        self.resources.get_mut(id)
    }

    pub fn add_asset(&mut self, name: impl Into<String>, content: impl Into<Bytes>) -> Result<(), ConflictError> {
        let name = name.into();
        if self.assets.contains_key(&name) {
            return Err(ConflictError::DuplicateAsset(name));
        }
        self.assets.insert(name, content.into());
        Ok(())
    }

    /// Appends an entry to a field's resolver pipeline, attributed to the running transformer.
    pub fn add_pipeline_entry(
        &mut self,
        type_name: &str,
        field_name: &str,
        stage: Stage,
        function: ResolverFunction,
    ) -> usize {
        let contributor = self.current_transformer;
        let slot = self
            .resolvers
            .add_pipeline_entry(type_name, field_name, stage, contributor, function);
        tracing::trace!(%type_name, %field_name, %stage, slot, contributor, "pipeline entry added");
        slot
    }

    pub fn claim_slot(&mut self, key: ResolverKey, function: ResolverFunction) -> Result<(), ClaimSlotError> {
        let contributor = self.current_transformer;
        self.resolvers.claim_slot(key, contributor, function)
    }

    pub fn resolvers(&self) -> &ResolverAccumulator {
        &self.resolvers
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        SchemaDocument,
        ResolverAccumulator,
        IndexMap<String, ResourceRequest>,
        IndexMap<String, Bytes>,
    ) {
        (self.document, self.resolvers, self.resources, self.assets)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn context() -> TransformerContext {
        let config = TransformConfig::default().with_stack("PostTable", "PostStack");
        let mut ctx = TransformerContext::new(SchemaDocument::new(), config);
        ctx.set_current_transformer("model");
        ctx
    }

    fn data_source(target: &str) -> ResourceKind {
        ResourceKind::DataSource {
            data_source_type: DataSourceType::AmazonDynamodb,
            target: target.to_owned(),
        }
    }

    #[test]
    fn resources_honor_stack_mapping() {
        let mut ctx = context();

        ctx.request_resource("PostTable", "ModelStack", data_source("Post")).unwrap();
        ctx.request_resource("CommentTable", "ModelStack", data_source("Comment"))
            .unwrap();

        assert_eq!(ctx.resource("PostTable").unwrap().stack, "PostStack");
        assert_eq!(ctx.resource("CommentTable").unwrap().stack, "ModelStack");
        assert_eq!(ctx.resource("CommentTable").unwrap().contributor, "model");
    }

    #[test]
    fn identical_resource_requests_are_merged() {
        let mut ctx = context();
        ctx.request_resource("PostTable", "ModelStack", data_source("Post")).unwrap();

        ctx.set_current_transformer("searchable");
        ctx.request_resource("PostTable", "ModelStack", data_source("Post")).unwrap();

        assert_matches!(
            ctx.request_resource("PostTable", "ModelStack", data_source("Other")),
            Err(ConflictError::DuplicateResource { id, existing }) => {
                assert_eq!(id, "PostTable");
                assert_eq!(existing, "model");
            }
        );
    }

    #[test]
    fn models_and_assets_are_unique() {
        let mut ctx = context();
        ctx.register_model(ModelInfo::new("Post", "PostTable", DataSourceStrategy::managed_table()))
            .unwrap();

        assert_matches!(
            ctx.register_model(ModelInfo::new("Post", "PostTable", DataSourceStrategy::managed_table())),
            Err(ConflictError::DuplicateModel(name)) if name == "Post"
        );

        ctx.add_asset("mapping.json", "{}").unwrap();
        assert_matches!(ctx.add_asset("mapping.json", "[]"), Err(ConflictError::DuplicateAsset(_)));
    }

    #[test]
    fn pipeline_entries_are_attributed() {
        let mut ctx = context();

        ctx.add_pipeline_entry("Query", "getPost", Stage::Data, ResolverFunction::default());
        ctx.set_current_transformer("auth");
        ctx.add_pipeline_entry("Query", "getPost", Stage::Auth, ResolverFunction::default());

        assert_eq!(ctx.resolvers().slots("Query", "getPost", Stage::Data), vec![(0, "model")]);
        assert_eq!(ctx.resolvers().slots("Query", "getPost", Stage::Auth), vec![(0, "auth")]);
    }
}
