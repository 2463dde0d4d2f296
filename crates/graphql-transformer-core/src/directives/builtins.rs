use super::{ArgumentSignature, DirectiveLocations, DirectiveSignature};
use crate::document::{TypeRef, Value};

pub(super) const DECLARED_BY: &str = "appsync";

/// Directives AppSync accepts in a deployed schema.
pub(super) fn appsync_directives() -> Vec<DirectiveSignature> {
    let field_or_object = DirectiveLocations::FIELD_DEFINITION | DirectiveLocations::OBJECT;
    let string_list = || TypeRef::named("String").list();

    vec![
        DirectiveSignature::new("aws_subscribe", DirectiveLocations::FIELD_DEFINITION)
            .argument(ArgumentSignature::new("mutations", string_list())),
        DirectiveSignature::new("aws_api_key", field_or_object),
        DirectiveSignature::new("aws_iam", field_or_object),
        DirectiveSignature::new("aws_oidc", field_or_object),
        DirectiveSignature::new("aws_lambda", field_or_object),
        DirectiveSignature::new("aws_cognito_user_pools", field_or_object)
            .argument(ArgumentSignature::new("cognito_groups", string_list())),
        DirectiveSignature::new("aws_auth", DirectiveLocations::FIELD_DEFINITION)
            .argument(ArgumentSignature::new("cognito_groups", string_list())),
        DirectiveSignature::new(
            "deprecated",
            DirectiveLocations::FIELD_DEFINITION
                | DirectiveLocations::ARGUMENT_DEFINITION
                | DirectiveLocations::INPUT_FIELD_DEFINITION
                | DirectiveLocations::ENUM_VALUE,
        )
        .argument(ArgumentSignature {
            name: "reason".to_owned(),
            ty: TypeRef::named("String"),
            default_value: Some(Value::from("No longer supported")),
        }),
    ]
}
