//! `@auth`: authorization rules on models and fields.
//!
//! Each rule names a strategy (`owner`, `groups`, `private`, `public`, `custom`) and a provider.
//! Rules become auth stage templates on every root field of the model, and, when the API has more
//! than one provider, AppSync `@aws_*` directives on the protected types and fields. Models without
//! `@auth` get one implicit rule derived from the default provider.

mod rules;
mod vtl;

use graphql_transformer_core::{
    AuthProviderKind, Directive, FieldDefinition, HookError, InputValueDefinition, Location, ModelInfo,
    ModelOperation, ResolverFunction, Stage, Transformer, TransformerContext, TypeRef,
};
use indexmap::{IndexMap, IndexSet};

use self::{
    rules::{AuthArguments, AuthRule, AuthStrategy},
    vtl::Target,
};
use crate::{common, model::MODEL_DIRECTIVE, names, templates};

pub const AUTH_DIRECTIVE: &str = "auth";

const DEFINITIONS: &str = r"
directive @auth(rules: [AuthRule!]!) on OBJECT | FIELD_DEFINITION

input AuthRule {
  allow: AuthStrategy!
  provider: AuthProvider
  ownerField: String
  identityClaim: String
  groupClaim: String
  groups: [String]
  groupsField: String
  operations: [ModelOperation]
}

enum AuthStrategy {
  owner
  groups
  private
  public
  custom
}

enum AuthProvider {
  apiKey
  iam
  oidc
  userPools
  function
}

enum ModelOperation {
  create
  update
  delete
  read
  list
  get
  sync
  listen
  search
}
";

#[derive(Debug, Default)]
pub struct AuthTransformer {
    /// Rules of `@auth` on model types.
    type_rules: IndexMap<String, Vec<AuthRule>>,
    /// Rules of `@auth` on fields, by type and field.
    field_rules: IndexMap<(String, String), Vec<AuthRule>>,
}

impl AuthTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    fn rules_for(&self, ctx: &TransformerContext, type_name: &str) -> Vec<AuthRule> {
        match self.type_rules.get(type_name) {
            Some(rules) => rules.clone(),
            None => vec![AuthRule::implicit(&ctx.auth_config().default)],
        }
    }

    fn parse_rules(
        ctx: &TransformerContext,
        directive: &Directive,
        location: &Location,
    ) -> Result<Vec<AuthRule>, HookError> {
        let arguments: AuthArguments = common::arguments(directive, location)?;
        for rule in &arguments.rules {
            rule.validate(ctx.auth_config(), location)?;
        }
        Ok(arguments.rules)
    }
}

/// The default provider must be usable by the rule it implies, for example IAM needs a role name.
fn validate_implicit_rule(ctx: &TransformerContext, type_name: &str) -> Result<(), HookError> {
    let pos = ctx
        .document
        .get_type(type_name)
        .and_then(|ty| ty.directive(MODEL_DIRECTIVE))
        .and_then(|directive| directive.pos);
    let auth = ctx.auth_config();
    AuthRule::implicit(&auth.default).validate(auth, &Location::ty(type_name, pos))
}

/// Adds the fields owner and dynamic group rules read when the type does not define them.
fn add_rule_fields(ctx: &mut TransformerContext, type_name: &str, rules: &[AuthRule]) -> Result<(), HookError> {
    for rule in rules {
        let (field, ty) = match rule.allow {
            AuthStrategy::Owner => (rule.owner_field(), TypeRef::named("String")),
            AuthStrategy::Groups => match rule.groups_field.as_deref() {
                Some(field) => (field, TypeRef::named("String").list()),
                None => continue,
            },
            _ => continue,
        };
        if ctx.document.field(type_name, field).is_none() {
            ctx.document.add_field(type_name, FieldDefinition::new(field, ty))?;
        }
    }
    Ok(())
}

fn is_list_field<'a>(ctx: &'a TransformerContext, type_name: &'a str) -> impl Fn(&str) -> bool + 'a {
    move |field| {
        ctx.document
            .field(type_name, field)
            .is_some_and(|field| field.ty.is_list())
    }
}

/// Providers used by the rules, in rule order.
fn providers(rules: &[AuthRule]) -> IndexSet<AuthProviderKind> {
    rules.iter().map(AuthRule::provider).collect()
}

impl Transformer for AuthTransformer {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn directive_definitions(&self) -> &'static str {
        DEFINITIONS
    }

    fn on_type_definition(
        &mut self,
        ctx: &mut TransformerContext,
        type_name: &str,
        directive: &Directive,
    ) -> Result<(), HookError> {
        let location = Location::ty(type_name, directive.pos);
        common::require_model(ctx, type_name, AUTH_DIRECTIVE, &location)?;

        let rules = Self::parse_rules(ctx, directive, &location)?;
        add_rule_fields(ctx, type_name, &rules)?;
        tracing::debug!(model = type_name, rules = rules.len(), "auth rules");
        self.type_rules.insert(type_name.to_owned(), rules);
        Ok(())
    }

    fn on_field_definition(
        &mut self,
        ctx: &mut TransformerContext,
        type_name: &str,
        field_name: &str,
        directive: &Directive,
    ) -> Result<(), HookError> {
        let location = Location::field(type_name, field_name, directive.pos);
        let is_root = ctx.document.roots().contains(type_name);
        if !is_root && !ctx.is_model(type_name) {
            return Err(HookError::invalid_directive(
                location,
                format!("@{AUTH_DIRECTIVE} on fields is only supported on @model types and root types, {type_name} is neither"),
            ));
        }

        let rules = Self::parse_rules(ctx, directive, &location)?;
        if !is_root {
            add_rule_fields(ctx, type_name, &rules)?;
        }
        self.field_rules
            .insert((type_name.to_owned(), field_name.to_owned()), rules);
        Ok(())
    }

    /// Subscriptions protected by owner rules take the owner as an optional argument, so
    /// listeners can only subscribe to their own records.
    fn transform_schema(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
        let models: Vec<ModelInfo> = ctx.models().cloned().collect();

        for model in &models {
            if !self.type_rules.contains_key(&model.type_name) {
                validate_implicit_rule(ctx, &model.type_name)?;
            }

            let rules = self.rules_for(ctx, &model.type_name);
            for field in &model.operations {
                if field.operation.access() != "listen" {
                    continue;
                }
                let owner_fields: Vec<&str> = rules
                    .iter()
                    .filter(|rule| rule.allow == AuthStrategy::Owner && rule.grants(Some(field.operation)))
                    .map(AuthRule::owner_field)
                    .collect();

                let Some(definition) = ctx
                    .document
                    .get_type_mut(&field.root)
                    .and_then(|root| root.field_mut(&field.name))
                else {
                    continue;
                };
                for owner_field in owner_fields {
                    if definition.argument(owner_field).is_none() {
                        definition
                            .arguments
                            .push(InputValueDefinition::new(owner_field, TypeRef::named("String")));
                    }
                }
            }
        }

        Ok(())
    }

    /// Runs once every transformer has generated its root fields, so index and search queries are
    /// covered as well.
    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
        let models: Vec<ModelInfo> = ctx.models().cloned().collect();
        let multiple_providers = ctx.auth_config().has_multiple_providers();

        for model in &models {
            let rules = self.rules_for(ctx, &model.type_name);

            for field in &model.operations {
                let granted: Vec<&AuthRule> = rules
                    .iter()
                    .filter(|rule| rule.grants(Some(field.operation)))
                    .collect();
                let target = Target::Operation(field.operation);
                let request = vtl::request(&granted, target, &is_list_field(ctx, &model.type_name));
                tracing::trace!(field = %field.name, operation = ?target.operation(), rules = granted.len(), "auth step");

                ctx.add_pipeline_entry(
                    &field.root,
                    &field.name,
                    Stage::Auth,
                    ResolverFunction::new(request, templates::PASSTHROUGH),
                );
            }

            if multiple_providers {
                apply_provider_directives(ctx, model, &rules)?;
            }
        }

        for ((type_name, field_name), rules) in &self.field_rules {
            let granted: Vec<&AuthRule> = rules.iter().collect();
            let target = match ctx.model(type_name) {
                Some(_) => Target::Field,
                None => root_target(ctx, type_name),
            };
            let request = vtl::request(&granted, target, &is_list_field(ctx, type_name));
            ctx.add_pipeline_entry(
                type_name,
                field_name,
                Stage::Auth,
                ResolverFunction::new(request, templates::PASSTHROUGH),
            );

            if multiple_providers {
                for provider in providers(rules) {
                    let directive = provider.appsync_directive();
                    let present = ctx
                        .document
                        .field(type_name, field_name)
                        .is_some_and(|field| field.has_directive(directive));
                    if !present {
                        ctx.document
                            .add_directive(type_name, Some(field_name), Directive::new(directive))?;
                    }
                }
            }
        }

        Ok(())
    }
}

/// Custom root fields have no model operation, mutations are checked like creates and everything
/// else like reads.
fn root_target(ctx: &TransformerContext, type_name: &str) -> Target {
    let roots = ctx.document.roots();
    if roots.mutation == type_name {
        Target::Operation(ModelOperation::Create)
    } else if roots.subscription == type_name {
        Target::Operation(ModelOperation::OnCreate)
    } else {
        Target::Operation(ModelOperation::Get)
    }
}

/// With several providers, AppSync only lets the default provider through on nodes without
/// directives. Models reachable by any other provider list all of theirs.
fn apply_provider_directives(ctx: &mut TransformerContext, model: &ModelInfo, rules: &[AuthRule]) -> Result<(), HookError> {
    let providers = providers(rules);
    let default = ctx.auth_config().default.kind();
    if providers.len() == 1 && providers.contains(&default) {
        return Ok(());
    }

    let mut nodes: Vec<(String, Option<String>)> = vec![(model.type_name.clone(), None)];
    for connection in [
        names::connection_type(&model.type_name),
        format!("Searchable{}Connection", model.type_name),
    ] {
        if ctx.document.has_type(&connection) {
            nodes.push((connection, None));
        }
    }
    nodes.extend(
        model
            .operations
            .iter()
            .map(|field| (field.root.clone(), Some(field.name.clone()))),
    );

    for (type_name, field_name) in nodes {
        for provider in &providers {
            let directive = provider.appsync_directive();
            let present = match &field_name {
                Some(field_name) => ctx
                    .document
                    .field(&type_name, field_name)
                    .is_some_and(|field| field.has_directive(directive)),
                None => ctx
                    .document
                    .get_type(&type_name)
                    .is_some_and(|ty| ty.has_directive(directive)),
            };
            if !present {
                ctx.document
                    .add_directive(&type_name, field_name.as_deref(), Directive::new(directive))?;
            }
        }
    }

    Ok(())
}
