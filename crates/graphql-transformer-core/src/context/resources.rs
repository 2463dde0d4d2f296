use serde::Serialize;

/// A backing resource a transformer needs the synthesis layer to provision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ResourceKind {
    /// Managed key-value table backing a model.
    #[serde(rename_all = "camelCase")]
    Table {
        partition_key: String,
        sort_keys: Vec<String>,
        /// Global secondary indexes.
        indexes: Vec<TableIndex>,
        billing_mode: String,
        stream: bool,
    },
    /// An AppSync data source.
    #[serde(rename_all = "camelCase")]
    DataSource {
        data_source_type: DataSourceType,
        /// What the data source points at: a table name, function name, endpoint or database.
        target: String,
    },
    /// A search cluster fed from model tables.
    #[serde(rename_all = "camelCase")]
    SearchDomain { source_tables: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableIndex {
    pub name: String,
    pub partition_key: String,
    pub sort_keys: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSourceType {
    AmazonDynamodb,
    AwsLambda,
    Http,
    RelationalDatabase,
    AmazonOpensearchService,
    None,
}

/// A resource request together with its placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequest {
    /// Name of the stack the resource is placed in.
    pub stack: String,
    /// Transformer that requested the resource.
    pub contributor: String,
    #[serde(flatten)]
    pub kind: ResourceKind,
}
