use crate::{config::DataSourceStrategy, document::RootOperation};

/// Root operations a model can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "camelCase")]
pub enum ModelOperation {
    Get,
    List,
    Create,
    Update,
    Delete,
    OnCreate,
    OnUpdate,
    OnDelete,
    /// Query field generated for a secondary index.
    IndexQuery,
    Search,
}

impl ModelOperation {
    pub fn root(self) -> RootOperation {
        match self {
            ModelOperation::Get | ModelOperation::List | ModelOperation::IndexQuery | ModelOperation::Search => {
                RootOperation::Query
            }
            ModelOperation::Create | ModelOperation::Update | ModelOperation::Delete => RootOperation::Mutation,
            ModelOperation::OnCreate | ModelOperation::OnUpdate | ModelOperation::OnDelete => {
                RootOperation::Subscription
            }
        }
    }

    /// The coarse access category authorization rules are written against.
    pub fn access(self) -> &'static str {
        match self {
            ModelOperation::Get | ModelOperation::List | ModelOperation::IndexQuery | ModelOperation::Search => "read",
            ModelOperation::Create => "create",
            ModelOperation::Update => "update",
            ModelOperation::Delete => "delete",
            ModelOperation::OnCreate | ModelOperation::OnUpdate | ModelOperation::OnDelete => "listen",
        }
    }
}

/// A root field generated for a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRootField {
    pub operation: ModelOperation,
    /// Name of the root type the field lives on.
    pub root: String,
    pub name: String,
}

/// Primary key of a model: a partition key and optional sort keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    pub partition_key: String,
    pub sort_keys: Vec<String>,
}

impl KeySchema {
    pub fn new(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_keys: Vec::new(),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.partition_key.as_str()).chain(self.sort_keys.iter().map(String::as_str))
    }
}

impl Default for KeySchema {
    fn default() -> Self {
        Self::new("id")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryIndex {
    pub name: String,
    pub key: KeySchema,
    pub query_field: Option<String>,
}

/// What the model transformer recorded about a `@model` type, for later transformers to read.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub type_name: String,
    /// Logical name of the data source backing the model.
    pub data_source: String,
    pub strategy: DataSourceStrategy,
    pub key: KeySchema,
    pub indexes: Vec<SecondaryIndex>,
    /// Generated root fields, in generation order. Disabled operations are absent.
    pub operations: Vec<ModelRootField>,
    pub timestamps: Vec<String>,
}

impl ModelInfo {
    pub fn new(type_name: impl Into<String>, data_source: impl Into<String>, strategy: DataSourceStrategy) -> Self {
        Self {
            type_name: type_name.into(),
            data_source: data_source.into(),
            strategy,
            key: KeySchema::default(),
            indexes: Vec::new(),
            operations: Vec::new(),
            timestamps: Vec::new(),
        }
    }

    pub fn operation(&self, operation: ModelOperation) -> Option<&ModelRootField> {
        self.operations.iter().find(|field| field.operation == operation)
    }

    pub fn index(&self, name: &str) -> Option<&SecondaryIndex> {
        self.indexes.iter().find(|index| index.name == name)
    }
}
