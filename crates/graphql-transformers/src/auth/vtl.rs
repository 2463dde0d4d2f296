//! Authorization step templates.
//!
//! A template evaluates every rule that applies to the operation. Rules either authorize the
//! request outright or narrow it: reads receive an `authFilter`, updates and deletes an
//! `authCondition`, both stashed for the data step.

use graphql_transformer_core::{AuthProviderKind, ModelOperation};
use indoc::indoc;

use super::rules::{AuthRule, AuthStrategy};

/// What an authorization step protects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Target {
    Operation(ModelOperation),
    /// A field of a model or a custom root field, checked against the resolved source.
    Field,
}

impl Target {
    pub(crate) fn operation(self) -> Option<ModelOperation> {
        match self {
            Target::Operation(operation) => Some(operation),
            Target::Field => None,
        }
    }
}

const HEADER: &str = indoc! {r"
    #set( $isAuthorized = false )
    #set( $authFilter = [] )
    #set( $authCondition = [] )
"};

const FOOTER: &str = indoc! {r#"
    #if( !$authFilter.isEmpty() )
      $util.qr($ctx.stash.put("authFilter", { "or": $authFilter }))
    #end
    #if( !$authCondition.isEmpty() )
      $util.qr($ctx.stash.put("authCondition", { "or": $authCondition }))
    #end
    #if( !$isAuthorized && $authFilter.isEmpty() && $authCondition.isEmpty() )
      $util.unauthorized()
    #end
    $util.toJson({})
"#};

/// Template of an operation no rule grants.
const DENY: &str = indoc! {r"
    $util.unauthorized()
    $util.toJson({})
"};

fn auth_type(provider: AuthProviderKind) -> &'static str {
    match provider {
        AuthProviderKind::ApiKey => "API Key Authorization",
        AuthProviderKind::UserPools => "User Pool Authorization",
        AuthProviderKind::Iam => "IAM Authorization",
        AuthProviderKind::Oidc => "Open ID Connect Authorization",
        AuthProviderKind::Function => "AWS Lambda Authorization",
    }
}

/// `is_list` tells whether a field of the protected type holds a list.
pub(crate) fn request(rules: &[&AuthRule], target: Target, is_list: &dyn Fn(&str) -> bool) -> String {
    if rules.is_empty() {
        return DENY.to_owned();
    }

    let mut template = String::from(HEADER);
    for (idx, rule) in rules.iter().enumerate() {
        template.push_str(&format!("#if( $util.authType() == \"{}\" )\n", auth_type(rule.provider())));
        match rule.allow {
            AuthStrategy::Public | AuthStrategy::Private | AuthStrategy::Custom => {
                template.push_str("  #set( $isAuthorized = true )\n");
            }
            AuthStrategy::Owner => owner(&mut template, idx, rule, target, is_list(rule.owner_field())),
            AuthStrategy::Groups => groups(&mut template, idx, rule, target, is_list),
        }
        template.push_str("#end\n");
    }
    template.push_str(FOOTER);
    template
}

fn owner(template: &mut String, idx: usize, rule: &AuthRule, target: Target, is_list: bool) {
    let field = rule.owner_field();
    let claim = format!("$ownerClaim{idx}");

    for (position, identity_claim) in rule.identity_claims().iter().enumerate() {
        let value = format!("$util.defaultIfNull($ctx.identity.claims.get(\"{identity_claim}\"), \"___xamznone____\")");
        if position == 0 {
            template.push_str(&format!("  #set( {claim} = {value} )\n"));
        } else {
            template.push_str(&format!("  #set( $currentClaim{idx}_{position} = {value} )\n"));
            template.push_str(&format!("  #set( {claim} = \"{claim}::$currentClaim{idx}_{position}\" )\n"));
        }
    }

    let comparison = if is_list { "contains" } else { "eq" };
    match target {
        Target::Operation(ModelOperation::Create) => {
            if is_list {
                template.push_str(&format!(
                    "  #set( $owners{idx} = $util.defaultIfNull($ctx.args.input.{field}, [{claim}]) )\n  \
                     #if( $owners{idx}.contains({claim}) )\n    \
                     $util.qr($ctx.args.input.put(\"{field}\", $owners{idx}))\n    \
                     #set( $isAuthorized = true )\n  \
                     #end\n"
                ));
            } else {
                template.push_str(&format!(
                    "  #if( $util.isNull($ctx.args.input.{field}) )\n    \
                     $util.qr($ctx.args.input.put(\"{field}\", {claim}))\n  \
                     #end\n  \
                     #if( $ctx.args.input.{field} == {claim} )\n    \
                     #set( $isAuthorized = true )\n  \
                     #end\n"
                ));
            }
        }
        Target::Operation(ModelOperation::Update | ModelOperation::Delete) => {
            template.push_str(&format!(
                "  $util.qr($authCondition.add({{ \"{field}\": {{ \"{comparison}\": {claim} }} }}))\n"
            ));
        }
        Target::Operation(ModelOperation::OnCreate | ModelOperation::OnUpdate | ModelOperation::OnDelete) => {
            template.push_str(&format!(
                "  #if( $util.isNull($ctx.args.{field}) || $ctx.args.{field} == {claim} )\n    \
                 #set( $isAuthorized = true )\n  \
                 #end\n"
            ));
        }
        Target::Operation(_) => {
            template.push_str(&format!(
                "  $util.qr($authFilter.add({{ \"{field}\": {{ \"{comparison}\": {claim} }} }}))\n"
            ));
        }
        Target::Field => {
            let check = if is_list {
                format!("$util.defaultIfNull($ctx.source.{field}, []).contains({claim})")
            } else {
                format!("$ctx.source.{field} == {claim}")
            };
            template.push_str(&format!("  #if( {check} )\n    #set( $isAuthorized = true )\n  #end\n"));
        }
    }
}

fn groups(template: &mut String, idx: usize, rule: &AuthRule, target: Target, is_list: &dyn Fn(&str) -> bool) {
    let user_groups = format!("$userGroups{idx}");
    template.push_str(&format!(
        "  #set( {user_groups} = $util.defaultIfNull($ctx.identity.claims.get(\"{}\"), []) )\n",
        rule.group_claim()
    ));

    if let Some(groups) = &rule.groups {
        let groups = serde_json::Value::from(groups.clone());
        template.push_str(&format!(
            "  #foreach( $group in {groups} )\n    \
             #if( {user_groups}.contains($group) )\n      \
             #set( $isAuthorized = true )\n    \
             #end\n  \
             #end\n"
        ));
        return;
    }

    let Some(field) = rule.groups_field.as_deref() else {
        return;
    };
    let comparison = if is_list(field) { "contains" } else { "eq" };
    match target {
        Target::Operation(ModelOperation::Create) => {
            template.push_str(&format!(
                "  #foreach( $group in {user_groups} )\n    \
                 #if( $util.defaultIfNull($ctx.args.input.{field}, []).contains($group) || $ctx.args.input.{field} == $group )\n      \
                 #set( $isAuthorized = true )\n    \
                 #end\n  \
                 #end\n"
            ));
        }
        Target::Operation(ModelOperation::Update | ModelOperation::Delete) => {
            template.push_str(&format!(
                "  #foreach( $group in {user_groups} )\n    \
                 $util.qr($authCondition.add({{ \"{field}\": {{ \"{comparison}\": $group }} }}))\n  \
                 #end\n"
            ));
        }
        Target::Operation(_) => {
            template.push_str(&format!(
                "  #foreach( $group in {user_groups} )\n    \
                 $util.qr($authFilter.add({{ \"{field}\": {{ \"{comparison}\": $group }} }}))\n  \
                 #end\n"
            ));
        }
        Target::Field => {
            template.push_str(&format!(
                "  #foreach( $group in {user_groups} )\n    \
                 #if( $util.defaultIfNull($ctx.source.{field}, []).contains($group) || $ctx.source.{field} == $group )\n      \
                 #set( $isAuthorized = true )\n    \
                 #end\n  \
                 #end\n"
            ));
        }
    }
}
