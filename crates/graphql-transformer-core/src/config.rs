//! Inputs of a transformation run besides the schema: authorization providers, the data
//! source strategy of every model and stack placement overrides.

use indexmap::IndexMap;
use serde::Deserialize;
use url::Url;

#[derive(Debug, thiserror::Error)]
#[error("invalid transform configuration: {0}")]
pub struct ConfigError(#[from] toml::de::Error);

/// Configures a transformation run.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformConfig {
    pub auth: AuthConfig,
    /// Backing store of every `@model` type, by type name.
    pub data_sources: IndexMap<String, DataSourceStrategy>,
    /// Resource id to stack name overrides.
    pub stack_mapping: IndexMap<String, String>,
}

impl TransformConfig {
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml)?)
    }

    #[must_use]
    pub fn with_data_source(mut self, type_name: impl Into<String>, strategy: DataSourceStrategy) -> Self {
        self.data_sources.insert(type_name.into(), strategy);
        self
    }

    #[must_use]
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    #[must_use]
    pub fn with_stack(mut self, resource_id: impl Into<String>, stack: impl Into<String>) -> Self {
        self.stack_mapping.insert(resource_id.into(), stack.into());
        self
    }
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub default: AuthProvider,
    pub additional: Vec<AuthProvider>,
}

impl AuthConfig {
    pub fn new(default: AuthProvider) -> Self {
        Self {
            default,
            additional: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_additional(mut self, provider: AuthProvider) -> Self {
        self.additional.push(provider);
        self
    }

    /// Every configured provider, the default first.
    pub fn providers(&self) -> impl Iterator<Item = &AuthProvider> {
        std::iter::once(&self.default).chain(&self.additional)
    }

    pub fn provider(&self, kind: AuthProviderKind) -> Option<&AuthProvider> {
        self.providers().find(|provider| provider.kind() == kind)
    }

    pub fn is_configured(&self, kind: AuthProviderKind) -> bool {
        self.provider(kind).is_some()
    }

    pub fn has_multiple_providers(&self) -> bool {
        !self.additional.is_empty()
    }
}

/// An authorization mode of the API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum AuthProvider {
    ApiKey {
        #[serde(default = "default_api_key_expiration")]
        expiration_days: u32,
        #[serde(default)]
        description: Option<String>,
    },
    UserPools {
        user_pool_id: String,
    },
    Iam {
        #[serde(default)]
        authenticated_role_name: Option<String>,
        #[serde(default)]
        unauthenticated_role_name: Option<String>,
    },
    Oidc {
        name: String,
        issuer_url: Url,
        #[serde(default)]
        client_id: Option<String>,
        #[serde(default)]
        auth_ttl_seconds: Option<u64>,
        #[serde(default)]
        iat_ttl_seconds: Option<u64>,
    },
    Lambda {
        function_name: String,
        #[serde(default)]
        ttl_seconds: Option<u64>,
    },
}

fn default_api_key_expiration() -> u32 {
    7
}

impl Default for AuthProvider {
    fn default() -> Self {
        AuthProvider::ApiKey {
            expiration_days: default_api_key_expiration(),
            description: None,
        }
    }
}

impl AuthProvider {
    pub fn kind(&self) -> AuthProviderKind {
        match self {
            AuthProvider::ApiKey { .. } => AuthProviderKind::ApiKey,
            AuthProvider::UserPools { .. } => AuthProviderKind::UserPools,
            AuthProvider::Iam { .. } => AuthProviderKind::Iam,
            AuthProvider::Oidc { .. } => AuthProviderKind::Oidc,
            AuthProvider::Lambda { .. } => AuthProviderKind::Function,
        }
    }
}

/// Provider names as written in `@auth` rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum AuthProviderKind {
    ApiKey,
    UserPools,
    Iam,
    Oidc,
    /// A Lambda authorizer.
    Function,
}

impl AuthProviderKind {
    /// The AppSync directive granting this provider access to a type or field.
    pub fn appsync_directive(self) -> &'static str {
        match self {
            AuthProviderKind::ApiKey => "aws_api_key",
            AuthProviderKind::UserPools => "aws_cognito_user_pools",
            AuthProviderKind::Iam => "aws_iam",
            AuthProviderKind::Oidc => "aws_oidc",
            AuthProviderKind::Function => "aws_lambda",
        }
    }
}

/// Backing store of a model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum DataSourceStrategy {
    ManagedTable {
        #[serde(default)]
        billing_mode: BillingMode,
    },
    ExternalDatabase {
        engine: DatabaseEngine,
        connection: ConnectionParameters,
    },
}

impl DataSourceStrategy {
    pub fn managed_table() -> Self {
        DataSourceStrategy::ManagedTable {
            billing_mode: BillingMode::default(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingMode {
    #[default]
    PayPerRequest,
    Provisioned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DatabaseEngine {
    Mysql,
    Postgres,
}

/// Names of the secure parameters holding the database connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionParameters {
    pub host: String,
    pub port: String,
    pub database: String,
    pub username: String,
    pub password: String,
}
