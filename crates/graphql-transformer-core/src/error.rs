use std::fmt;

use crate::{
    diagnostics::{Diagnostic, Diagnostics, Location},
    document::{Pos, TypeKind},
    pipeline::PipelineState,
    resolvers::ResolverKey,
};

fn fmt_pos(pos: &Option<Pos>) -> String {
    pos.map(|pos| format!(" at {}:{}", pos.line, pos.column))
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("syntax error{}: {message}", fmt_pos(pos))]
    Syntax { message: String, pos: Option<Pos> },
    #[error("type `{name}` is defined more than once{}", fmt_pos(pos))]
    DuplicateType { name: String, pos: Option<Pos> },
    #[error("argument `{argument}` is given more than once to @{directive}{}", fmt_pos(pos))]
    DuplicateArgument {
        directive: String,
        argument: String,
        pos: Option<Pos>,
    },
    #[error("cannot extend unknown type `{name}`{}", fmt_pos(pos))]
    UnknownExtendedType { name: String, pos: Option<Pos> },
    #[error("cannot extend {expected} `{name}` with an {found} extension")]
    ExtensionKindMismatch {
        name: String,
        expected: TypeKind,
        found: TypeKind,
    },
    #[error("{what} is not supported{}", fmt_pos(pos))]
    Unsupported { what: String, pos: Option<Pos> },
}

impl From<async_graphql_parser::Error> for ParseError {
    fn from(err: async_graphql_parser::Error) -> Self {
        ParseError::Syntax {
            pos: err.positions().next(),
            message: err.to_string(),
        }
    }
}

/// A mutation of the document or of the accumulated artifacts clashed with existing state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConflictError {
    #[error("type `{0}` already exists")]
    DuplicateType(String),
    #[error("field `{field}` already exists on `{ty}`")]
    DuplicateField { ty: String, field: String },
    #[error("directive @{directive} is already applied to `{coordinate}`")]
    DuplicateDirective { coordinate: String, directive: String },
    #[error("argument `{argument}` is already set on @{directive}")]
    DuplicateArgument { directive: String, argument: String },
    #[error("directive @{name} is declared by both `{existing}` and `{incoming}`")]
    DuplicateDirectiveDefinition {
        name: String,
        existing: String,
        incoming: String,
    },
    #[error("type `{0}` does not exist")]
    MissingType(String),
    #[error("field `{field}` does not exist on `{ty}`")]
    MissingField { ty: String, field: String },
    #[error("`{0}` is already registered as a model")]
    DuplicateModel(String),
    #[error("resource `{id}` was already requested by `{existing}` with a different definition")]
    DuplicateResource { id: String, existing: String },
    #[error("asset `{0}` was already added")]
    DuplicateAsset(String),
}

/// Two transformers tried to occupy the same resolver pipeline slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("resolver slot `{key}` is held by `{existing}`, `{incoming}` cannot claim it")]
pub struct SlotCollisionError {
    pub key: ResolverKey,
    pub existing: String,
    pub incoming: String,
}

/// A transformer claimed a slot past the next free one, which would leave a hole in the
/// pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("resolver slot `{key}` skips ahead of the next free slot `{expected}`, `{incoming}` cannot claim it")]
pub struct SlotGapError {
    pub key: ResolverKey,
    pub expected: ResolverKey,
    pub incoming: String,
}

/// Why an explicit slot claim was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClaimSlotError {
    #[error(transparent)]
    Collision(#[from] SlotCollisionError),
    #[error(transparent)]
    Gap(#[from] SlotGapError),
}

/// Error returned by a transformer hook.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HookError {
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    SlotCollision(#[from] SlotCollisionError),
    #[error(transparent)]
    SlotGap(#[from] SlotGapError),
    #[error("{0}")]
    Configuration(String),
    /// A directive is used in a way its transformer cannot accept, for example on the wrong kind
    /// of type or with arguments that do not fit together.
    #[error("{message}")]
    InvalidDirective { location: Location, message: String },
}

impl From<ClaimSlotError> for HookError {
    fn from(err: ClaimSlotError) -> Self {
        match err {
            ClaimSlotError::Collision(err) => HookError::SlotCollision(err),
            ClaimSlotError::Gap(err) => HookError::SlotGap(err),
        }
    }
}

impl HookError {
    pub fn configuration(message: impl fmt::Display) -> Self {
        HookError::Configuration(message.to_string())
    }

    pub fn invalid_directive(location: Location, message: impl fmt::Display) -> Self {
        HookError::InvalidDirective {
            location,
            message: message.to_string(),
        }
    }
}

/// The directive registry could not be assembled from the transformers' declarations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformErrorKind {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("{} validation error(s)\n{0}", .0.len())]
    Validation(Diagnostics),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    SlotCollision(#[from] SlotCollisionError),
    #[error(transparent)]
    SlotGap(#[from] SlotGapError),
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<RegistryError> for TransformErrorKind {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Parse(err) => TransformErrorKind::Parse(err),
            RegistryError::Conflict(err) => TransformErrorKind::Conflict(err),
        }
    }
}

/// The error a transformation run fails with.
///
/// Records the stage the pipeline was in, the transformer whose hook failed (if any) and the
/// schema location involved.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformError {
    pub stage: PipelineState,
    pub transformer: Option<String>,
    pub location: Option<Location>,
    pub kind: TransformErrorKind,
}

impl TransformError {
    pub(crate) fn new(stage: PipelineState, kind: impl Into<TransformErrorKind>) -> Self {
        TransformError {
            stage,
            transformer: None,
            location: None,
            kind: kind.into(),
        }
    }

    pub(crate) fn from_hook(
        stage: PipelineState,
        transformer: &str,
        location: Option<Location>,
        err: HookError,
    ) -> Self {
        let (location, kind) = match err {
            HookError::Conflict(err) => (location, TransformErrorKind::Conflict(err)),
            HookError::SlotCollision(err) => (location, TransformErrorKind::SlotCollision(err)),
            HookError::SlotGap(err) => (location, TransformErrorKind::SlotGap(err)),
            HookError::Configuration(message) => (location, TransformErrorKind::Configuration(message)),
            HookError::InvalidDirective { location, message } => (
                Some(location.clone()),
                TransformErrorKind::Validation(Diagnostics::from(Diagnostic { location, message })),
            ),
        };

        TransformError {
            stage,
            transformer: Some(transformer.to_owned()),
            location,
            kind,
        }
    }

    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match &self.kind {
            TransformErrorKind::Validation(diagnostics) => Some(diagnostics),
            _ => None,
        }
    }
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed", self.stage)?;
        if let Some(transformer) = &self.transformer {
            write!(f, " in transformer `{transformer}`")?;
        }
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
        }
        write!(f, ": {}", self.kind)
    }
}

impl std::error::Error for TransformError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
