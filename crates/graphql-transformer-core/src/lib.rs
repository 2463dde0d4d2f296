//! Directive-driven GraphQL schema transformation.
//!
//! An annotated SDL document is parsed into a mutable [`SchemaDocument`], checked against the
//! [`DirectiveRegistry`] and then handed to an ordered list of [`Transformer`] plugins by the
//! [`GraphQLTransform`] orchestrator. The result is the transformed SDL, a [`ResolverMap`] of
//! generated resolver templates and the resource requests the transformers accumulated.
#![cfg_attr(test, allow(unused_crate_dependencies))]

pub mod config;
pub mod context;
pub mod diagnostics;
pub mod directives;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod resolvers;
pub mod transformer;
pub mod validation;

pub use self::{
    config::{
        AuthConfig, AuthProvider, AuthProviderKind, BillingMode, ConfigError, ConnectionParameters, DataSourceStrategy,
        DatabaseEngine, TransformConfig,
    },
    context::{
        DataSourceType, KeySchema, ModelInfo, ModelOperation, ModelRootField, ResourceKind, ResourceRequest,
        SecondaryIndex, TableIndex, TransformerContext,
    },
    diagnostics::{Diagnostic, Diagnostics, Location},
    directives::{ArgumentSignature, CoercionError, DirectiveLocations, DirectiveRegistry, DirectiveSignature},
    document::{
        parse, render, Directive, EnumValueDefinition, FieldDefinition, InputValueDefinition, RootOperation,
        SchemaDocument, TypeDefinition, TypeKind, TypeRef, Value,
    },
    error::{
        ClaimSlotError, ConflictError, HookError, ParseError, RegistryError, SlotCollisionError, SlotGapError,
        TransformError, TransformErrorKind,
    },
    pipeline::{GraphQLTransform, PipelineState, TransformOutput},
    resolvers::{ResolverAccumulator, ResolverFunction, ResolverKey, ResolverMap, Stage},
    transformer::Transformer,
};
