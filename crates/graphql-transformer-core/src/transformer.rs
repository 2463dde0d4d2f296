use crate::{context::TransformerContext, document::Directive, error::HookError};

/// A plugin owning one or more directives.
///
/// The orchestrator drives every registered transformer through the same stages, in
/// registration order:
///
/// 1. `on_type_definition` / `on_field_definition` for each occurrence of an owned directive,
///    walking the document in order. Types and fields injected by earlier transformers are
///    visited; a transformer never revisits nodes it injected itself.
/// 2. `transform_schema`, once, after every per-node hook of every transformer.
/// 3. `generate_resolvers`, once, after every `transform_schema`.
///
/// A hook may read anything earlier transformers wrote to the context but must not expect
/// contributions of transformers registered after it.
pub trait Transformer {
    /// Identifies the transformer in errors and as the contributor of resolvers and resources.
    fn name(&self) -> &'static str;

    /// SDL declaring the owned directives, plus the input and enum types their arguments use.
    fn directive_definitions(&self) -> &'static str;

    /// Called for each owned directive applied to a type.
    fn on_type_definition(
        &mut self,
        ctx: &mut TransformerContext,
        type_name: &str,
        directive: &Directive,
    ) -> Result<(), HookError> {
        let _ = (ctx, type_name, directive);
        Ok(())
    }

    /// Called for each owned directive applied to a field.
    fn on_field_definition(
        &mut self,
        ctx: &mut TransformerContext,
        type_name: &str,
        field_name: &str,
        directive: &Directive,
    ) -> Result<(), HookError> {
        let _ = (ctx, type_name, field_name, directive);
        Ok(())
    }

    /// Whole-document mutations, such as root fields and generated input types.
    fn transform_schema(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
        let _ = ctx;
        Ok(())
    }

    /// Contributes resolver pipeline entries.
    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
        let _ = ctx;
        Ok(())
    }
}
