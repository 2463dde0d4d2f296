use graphql_transformer_core::{AuthConfig, AuthProvider, AuthProviderKind, HookError, Location, ModelOperation};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum AuthStrategy {
    Owner,
    Groups,
    Private,
    Public,
    Custom,
}

impl AuthStrategy {
    fn as_str(self) -> &'static str {
        match self {
            AuthStrategy::Owner => "owner",
            AuthStrategy::Groups => "groups",
            AuthStrategy::Private => "private",
            AuthStrategy::Public => "public",
            AuthStrategy::Custom => "custom",
        }
    }

    fn default_provider(self) -> AuthProviderKind {
        match self {
            AuthStrategy::Public => AuthProviderKind::ApiKey,
            AuthStrategy::Custom => AuthProviderKind::Function,
            AuthStrategy::Owner | AuthStrategy::Groups | AuthStrategy::Private => AuthProviderKind::UserPools,
        }
    }

    fn allowed_providers(self) -> &'static [AuthProviderKind] {
        match self {
            AuthStrategy::Public => &[AuthProviderKind::ApiKey, AuthProviderKind::Iam],
            AuthStrategy::Private => &[AuthProviderKind::UserPools, AuthProviderKind::Oidc, AuthProviderKind::Iam],
            AuthStrategy::Owner | AuthStrategy::Groups => &[AuthProviderKind::UserPools, AuthProviderKind::Oidc],
            AuthStrategy::Custom => &[AuthProviderKind::Function],
        }
    }
}

/// Operations a rule can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum AuthOperation {
    Create,
    Update,
    Delete,
    Read,
    List,
    Get,
    Sync,
    Listen,
    Search,
}

impl AuthOperation {
    fn covers(self, operation: ModelOperation) -> bool {
        use ModelOperation as Op;

        match self {
            AuthOperation::Read => matches!(operation.access(), "read" | "listen"),
            AuthOperation::Get => operation == Op::Get,
            AuthOperation::List => matches!(operation, Op::List | Op::IndexQuery),
            AuthOperation::Search => operation == Op::Search,
            AuthOperation::Listen => operation.access() == "listen",
            AuthOperation::Create => operation == Op::Create,
            AuthOperation::Update => operation == Op::Update,
            AuthOperation::Delete => operation == Op::Delete,
            AuthOperation::Sync => false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthArguments {
    pub(crate) rules: Vec<AuthRule>,
}

/// One entry of `@auth(rules: [...])`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthRule {
    pub(crate) allow: AuthStrategy,
    #[serde(default)]
    provider: Option<AuthProviderKind>,
    #[serde(default)]
    owner_field: Option<String>,
    #[serde(default)]
    identity_claim: Option<String>,
    #[serde(default)]
    group_claim: Option<String>,
    #[serde(default)]
    pub(crate) groups: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) groups_field: Option<String>,
    #[serde(default)]
    operations: Option<Vec<AuthOperation>>,
}

impl AuthRule {
    /// The rule applied to models without `@auth`, derived from the default provider.
    pub(crate) fn implicit(default: &AuthProvider) -> Self {
        let allow = match default.kind() {
            AuthProviderKind::ApiKey => AuthStrategy::Public,
            AuthProviderKind::UserPools | AuthProviderKind::Oidc | AuthProviderKind::Iam => AuthStrategy::Private,
            AuthProviderKind::Function => AuthStrategy::Custom,
        };
        AuthRule {
            allow,
            provider: Some(default.kind()),
            owner_field: None,
            identity_claim: None,
            group_claim: None,
            groups: None,
            groups_field: None,
            operations: None,
        }
    }

    pub(crate) fn provider(&self) -> AuthProviderKind {
        self.provider.unwrap_or_else(|| self.allow.default_provider())
    }

    pub(crate) fn owner_field(&self) -> &str {
        self.owner_field.as_deref().unwrap_or("owner")
    }

    pub(crate) fn identity_claims(&self) -> Vec<&str> {
        self.identity_claim
            .as_deref()
            .unwrap_or("sub::username")
            .split("::")
            .collect()
    }

    pub(crate) fn group_claim(&self) -> &str {
        self.group_claim.as_deref().unwrap_or("cognito:groups")
    }

    /// Whether the rule grants access to the operation. Field rules pass `None` and apply to
    /// every access.
    pub(crate) fn grants(&self, operation: Option<ModelOperation>) -> bool {
        match (operation, &self.operations) {
            (Some(operation), Some(operations)) => operations.iter().any(|op| op.covers(operation)),
            _ => true,
        }
    }

    pub(crate) fn validate(&self, auth: &AuthConfig, location: &Location) -> Result<(), HookError> {
        let provider = self.provider();
        let strategy = self.allow.as_str();

        if !self.allow.allowed_providers().contains(&provider) {
            let allowed = self
                .allow
                .allowed_providers()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(HookError::invalid_directive(
                location.clone(),
                format!("@auth rule allow: {strategy} cannot use the {provider} provider, it supports {allowed}"),
            ));
        }

        if self.allow == AuthStrategy::Groups && self.groups.is_none() && self.groups_field.is_none() {
            return Err(HookError::invalid_directive(
                location.clone(),
                "@auth rule allow: groups needs either groups or groupsField",
            ));
        }

        let Some(configured) = auth.provider(provider) else {
            return Err(HookError::configuration(format!(
                "@auth on {} uses the {provider} provider, which is not configured",
                location.coordinate
            )));
        };

        if let AuthProvider::Iam {
            authenticated_role_name,
            unauthenticated_role_name,
        } = configured
        {
            let (role, missing) = match self.allow {
                AuthStrategy::Public => ("unauthenticated", unauthenticated_role_name.is_none()),
                _ => ("authenticated", authenticated_role_name.is_none()),
            };
            if missing {
                return Err(HookError::configuration(format!(
                    "@auth on {} allows {strategy} IAM access, but no {role} role name is configured",
                    location.coordinate
                )));
            }
        }

        Ok(())
    }
}
