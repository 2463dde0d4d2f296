//! Per-field resolver pipelines.
//!
//! Transformers contribute entries to a `(type, field, stage)` pipeline. Each contribution
//! occupies a slot; slots are handed out in call order, so the first contributor of a stage
//! gets slot 0. Once every transformer ran, the accumulator is finalized into a
//! [`ResolverMap`] whose keys are the template names consumed by deployment tooling.

use std::fmt;

use indexmap::IndexMap;

use crate::error::{ClaimSlotError, SlotCollisionError, SlotGapError};

/// Named phases of a field's resolver pipeline, in execution order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "camelCase")]
pub enum Stage {
    Init,
    PreAuth,
    Auth,
    PostAuth,
    PreDataLoad,
    Data,
    PostDataLoad,
    Finish,
}

/// Identifies one slot of a field's resolver pipeline.
///
/// Slots are zero based. The string form uses the one-based ordinal, as in
/// `Query.getPost.auth.1`, which is the template naming deployed resolvers rely on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResolverKey {
    pub type_name: String,
    pub field_name: String,
    pub stage: Stage,
    pub slot: usize,
}

impl ResolverKey {
    pub fn new(type_name: impl Into<String>, field_name: impl Into<String>, stage: Stage, slot: usize) -> Self {
        Self {
            type_name: type_name.into(),
            field_name: field_name.into(),
            stage,
            slot,
        }
    }

    pub fn request_template_name(&self) -> String {
        format!("{self}.req.vtl")
    }

    pub fn response_template_name(&self) -> String {
        format!("{self}.res.vtl")
    }
}

impl fmt::Display for ResolverKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.type_name,
            self.field_name,
            self.stage,
            self.slot + 1
        )
    }
}

/// The logic a transformer contributes to a pipeline slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolverFunction {
    pub request: String,
    pub response: String,
    /// Data source the entry invokes, if any.
    pub data_source: Option<String>,
}

impl ResolverFunction {
    pub fn new(request: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            response: response.into(),
            data_source: None,
        }
    }

    #[must_use]
    pub fn with_data_source(mut self, data_source: impl Into<String>) -> Self {
        self.data_source = Some(data_source.into());
        self
    }
}

#[derive(Debug, Clone)]
struct PipelineEntry {
    contributor: String,
    function: ResolverFunction,
}

/// Slots of one `(type, field, stage)`, dense from slot 0.
#[derive(Debug, Clone, Default)]
struct StagePipeline {
    entries: Vec<PipelineEntry>,
}

impl StagePipeline {
    fn next_slot(&self) -> usize {
        self.entries.len()
    }
}

/// Collects pipeline entries during a run.
#[derive(Debug, Clone, Default)]
pub struct ResolverAccumulator {
    // Fields keep the order of their first contribution.
    fields: IndexMap<(String, String), IndexMap<Stage, StagePipeline>>,
}

impl ResolverAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry to the `(type, field, stage)` pipeline and returns its slot.
    pub fn add_pipeline_entry(
        &mut self,
        type_name: &str,
        field_name: &str,
        stage: Stage,
        contributor: &str,
        function: ResolverFunction,
    ) -> usize {
        let pipeline = self.pipeline_mut(type_name, field_name, stage);
        let slot = pipeline.next_slot();
        pipeline.entries.push(PipelineEntry {
            contributor: contributor.to_owned(),
            function,
        });
        slot
    }

    /// Claims an explicit slot. Only the next free slot can be claimed: an occupied slot is a
    /// collision with its holder, and a slot past the next free one is a gap.
    pub fn claim_slot(
        &mut self,
        key: ResolverKey,
        contributor: &str,
        function: ResolverFunction,
    ) -> Result<(), ClaimSlotError> {
        let pipeline = self.pipeline_mut(&key.type_name, &key.field_name, key.stage);
        let next_slot = pipeline.next_slot();

        if let Some(existing) = pipeline.entries.get(key.slot) {
            return Err(SlotCollisionError {
                existing: existing.contributor.clone(),
                key,
                incoming: contributor.to_owned(),
            }
            .into());
        }

        if key.slot > next_slot {
            let expected = ResolverKey::new(key.type_name.clone(), key.field_name.clone(), key.stage, next_slot);
            return Err(SlotGapError {
                key,
                expected,
                incoming: contributor.to_owned(),
            }
            .into());
        }

        pipeline.entries.push(PipelineEntry {
            contributor: contributor.to_owned(),
            function,
        });
        Ok(())
    }

    /// Occupied slots of a pipeline, with their contributors.
    pub fn slots(&self, type_name: &str, field_name: &str, stage: Stage) -> Vec<(usize, &str)> {
        self.fields
            .get(&(type_name.to_owned(), field_name.to_owned()))
            .and_then(|stages| stages.get(&stage))
            .map(|pipeline| {
                pipeline
                    .entries
                    .iter()
                    .enumerate()
                    .map(|(slot, entry)| (slot, entry.contributor.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn function(&self, key: &ResolverKey) -> Option<&ResolverFunction> {
        self.fields
            .get(&(key.type_name.clone(), key.field_name.clone()))
            .and_then(|stages| stages.get(&key.stage))
            .and_then(|pipeline| pipeline.entries.get(key.slot))
            .map(|entry| &entry.function)
    }

    pub fn has_field(&self, type_name: &str, field_name: &str) -> bool {
        self.fields
            .contains_key(&(type_name.to_owned(), field_name.to_owned()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Produces the resolver map: fields in order of first contribution, then stages in
    /// execution order, then slots ascending.
    pub fn finalize(self) -> ResolverMap {
        let mut map = ResolverMap::default();

        for ((type_name, field_name), mut stages) in self.fields {
            stages.sort_keys();
            for (stage, pipeline) in stages {
                for (slot, entry) in pipeline.entries.into_iter().enumerate() {
                    let key = ResolverKey::new(type_name.clone(), field_name.clone(), stage, slot);
                    map.templates
                        .insert(key.request_template_name(), entry.function.request);
                    map.templates
                        .insert(key.response_template_name(), entry.function.response);
                    if let Some(data_source) = entry.function.data_source {
                        map.data_sources.insert(key.to_string(), data_source);
                    }
                }
            }
        }

        map
    }

    fn pipeline_mut(&mut self, type_name: &str, field_name: &str, stage: Stage) -> &mut StagePipeline {
        self.fields
            .entry((type_name.to_owned(), field_name.to_owned()))
            .or_default()
            .entry(stage)
            .or_default()
    }
}

/// Finalized resolver templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ResolverMap {
    /// `{Type}.{field}.{stage}.{ordinal}.req.vtl` and `.res.vtl` names to template text.
    pub templates: IndexMap<String, String>,
    /// `{Type}.{field}.{stage}.{ordinal}` to the data source that entry invokes.
    pub data_sources: IndexMap<String, String>,
}

impl ResolverMap {
    pub fn get(&self, template_name: &str) -> Option<&str> {
        self.templates.get(template_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Names of the templates of one field, in pipeline order.
    pub fn field_templates<'a>(&'a self, type_name: &str, field_name: &str) -> impl Iterator<Item = &'a str> + 'a {
        let prefix = format!("{type_name}.{field_name}.");
        self.templates
            .keys()
            .filter(move |key| key.starts_with(&prefix))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn function(text: &str) -> ResolverFunction {
        ResolverFunction::new(format!("{text} request"), format!("{text} response"))
    }

    #[test]
    fn stage_names() {
        assert_eq!(Stage::PostAuth.to_string(), "postAuth");
        assert_eq!("preDataLoad".parse::<Stage>().unwrap(), Stage::PreDataLoad);
        assert!(Stage::Auth < Stage::Data);
    }

    #[test]
    fn slots_are_monotonic() {
        let mut accumulator = ResolverAccumulator::new();

        let first = accumulator.add_pipeline_entry("Query", "getPost", Stage::Auth, "auth", function("a"));
        let second = accumulator.add_pipeline_entry("Query", "getPost", Stage::Auth, "owner", function("b"));
        let other_stage = accumulator.add_pipeline_entry("Query", "getPost", Stage::Data, "model", function("c"));

        assert_eq!((first, second, other_stage), (0, 1, 0));
        assert_eq!(
            accumulator.slots("Query", "getPost", Stage::Auth),
            vec![(0, "auth"), (1, "owner")]
        );
    }

    #[test]
    fn claimed_slot_collision_names_both_contributors() {
        let mut accumulator = ResolverAccumulator::new();
        accumulator.add_pipeline_entry("Query", "getPost", Stage::Auth, "auth", function("a"));

        let result = accumulator.claim_slot(
            ResolverKey::new("Query", "getPost", Stage::Auth, 0),
            "searchable",
            function("b"),
        );

        assert_matches!(result, Err(ClaimSlotError::Collision(SlotCollisionError { key, existing, incoming })) => {
            assert_eq!(key.to_string(), "Query.getPost.auth.1");
            assert_eq!(existing, "auth");
            assert_eq!(incoming, "searchable");
        });
    }

    #[test]
    fn claimed_slots_cannot_leave_gaps() {
        let mut accumulator = ResolverAccumulator::new();

        let result = accumulator.claim_slot(ResolverKey::new("Query", "getPost", Stage::Auth, 2), "auth", function("a"));
        assert_matches!(result, Err(ClaimSlotError::Gap(SlotGapError { key, expected, incoming })) => {
            assert_eq!(key.to_string(), "Query.getPost.auth.3");
            assert_eq!(expected.to_string(), "Query.getPost.auth.1");
            assert_eq!(incoming, "auth");
        });
        assert!(accumulator.slots("Query", "getPost", Stage::Auth).is_empty());

        accumulator
            .claim_slot(ResolverKey::new("Query", "getPost", Stage::Auth, 0), "auth", function("a"))
            .unwrap();
        let next = accumulator.add_pipeline_entry("Query", "getPost", Stage::Auth, "owner", function("b"));
        assert_eq!(next, 1);
        accumulator
            .claim_slot(ResolverKey::new("Query", "getPost", Stage::Auth, 2), "searchable", function("c"))
            .unwrap();

        assert_eq!(
            accumulator.slots("Query", "getPost", Stage::Auth),
            vec![(0, "auth"), (1, "owner"), (2, "searchable")]
        );
        assert_eq!(
            accumulator.finalize().keys().collect::<Vec<_>>(),
            [
                "Query.getPost.auth.1.req.vtl",
                "Query.getPost.auth.1.res.vtl",
                "Query.getPost.auth.2.req.vtl",
                "Query.getPost.auth.2.res.vtl",
                "Query.getPost.auth.3.req.vtl",
                "Query.getPost.auth.3.res.vtl",
            ]
        );
    }

    #[test]
    fn finalize_orders_by_field_then_stage_then_slot() {
        let mut accumulator = ResolverAccumulator::new();
        accumulator.add_pipeline_entry(
            "Query",
            "getPost",
            Stage::Data,
            "model",
            function("get").with_data_source("PostTable"),
        );
        accumulator.add_pipeline_entry("Mutation", "createPost", Stage::Data, "model", function("create"));
        accumulator.add_pipeline_entry("Query", "getPost", Stage::Auth, "auth", function("auth"));
        accumulator.add_pipeline_entry("Mutation", "createPost", Stage::Init, "default", function("init"));

        let map = accumulator.finalize();

        insta::assert_debug_snapshot!(map.keys().collect::<Vec<_>>(), @r###"
        [
            "Query.getPost.auth.1.req.vtl",
            "Query.getPost.auth.1.res.vtl",
            "Query.getPost.data.1.req.vtl",
            "Query.getPost.data.1.res.vtl",
            "Mutation.createPost.init.1.req.vtl",
            "Mutation.createPost.init.1.res.vtl",
            "Mutation.createPost.data.1.req.vtl",
            "Mutation.createPost.data.1.res.vtl",
        ]
        "###);
        assert_eq!(map.get("Query.getPost.auth.1.req.vtl"), Some("auth request"));
        assert_eq!(
            map.data_sources.get("Query.getPost.data.1").map(String::as_str),
            Some("PostTable")
        );
    }
}
