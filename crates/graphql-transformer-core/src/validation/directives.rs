use super::Context;
use crate::{
    diagnostics::Location,
    directives::DirectiveLocations,
    document::{Directive, TypeDefinition, TypeKind},
};

pub(super) fn validate_type_directives(ty: &TypeDefinition, ctx: &mut Context<'_>) {
    let type_location = match ty.kind {
        TypeKind::Scalar => DirectiveLocations::SCALAR,
        TypeKind::Object => DirectiveLocations::OBJECT,
        TypeKind::Interface => DirectiveLocations::INTERFACE,
        TypeKind::Union => DirectiveLocations::UNION,
        TypeKind::Enum => DirectiveLocations::ENUM,
        TypeKind::InputObject => DirectiveLocations::INPUT_OBJECT,
    };
    validate_directives(&ty.directives, type_location, &ty.name, ctx, |pos| {
        Location::ty(&ty.name, pos)
    });

    let field_location = match ty.kind {
        TypeKind::InputObject => DirectiveLocations::INPUT_FIELD_DEFINITION,
        _ => DirectiveLocations::FIELD_DEFINITION,
    };
    for field in &ty.fields {
        let coordinate = format!("{}.{}", ty.name, field.name);
        validate_directives(&field.directives, field_location, &coordinate, ctx, |pos| {
            Location::field(&ty.name, &field.name, pos)
        });

        for argument in &field.arguments {
            let coordinate = format!("{}.{}({}:)", ty.name, field.name, argument.name);
            validate_directives(
                &argument.directives,
                DirectiveLocations::ARGUMENT_DEFINITION,
                &coordinate,
                ctx,
                |pos| Location::argument(&ty.name, &field.name, &argument.name, pos),
            );
        }
    }

    for value in &ty.values {
        let coordinate = format!("{}.{}", ty.name, value.name);
        validate_directives(&value.directives, DirectiveLocations::ENUM_VALUE, &coordinate, ctx, |pos| {
            Location::field(&ty.name, &value.name, pos)
        });
    }
}

fn validate_directives(
    directives: &[Directive],
    location: DirectiveLocations,
    coordinate: &str,
    ctx: &mut Context<'_>,
    locate: impl Fn(Option<crate::document::Pos>) -> Location,
) {
    for (idx, directive) in directives.iter().enumerate() {
        let directive_name = &directive.name;
        let error_location = || locate(directive.pos);

        let Some(signature) = ctx.registry.get(directive_name) else {
            ctx.push_error(error_location(), format!("Unknown directive @{directive_name}"));
            continue;
        };

        if !signature.locations.contains(location) {
            ctx.push_error(
                error_location(),
                format!(
                    "Directive @{directive_name} is not allowed on {}, it can be used on {}",
                    location.describe(),
                    signature.locations.describe()
                ),
            );
            continue;
        }

        if !signature.repeatable && directives[..idx].iter().any(|earlier| earlier.name == *directive_name) {
            ctx.push_error(
                error_location(),
                format!("Directive @{directive_name} cannot be used more than once on {coordinate}"),
            );
        }

        for name in directive.arguments.keys() {
            if signature.find_argument(name).is_none() {
                ctx.push_error(
                    error_location(),
                    format!("Unknown argument `{name}` on directive @{directive_name}"),
                );
            }
        }

        for argument in &signature.arguments {
            match directive.argument(&argument.name) {
                Some(value) => {
                    if let Err(err) = ctx.registry.coerce(ctx.document, value, &argument.ty) {
                        ctx.push_error(
                            error_location(),
                            format!(
                                "Invalid value for argument `{}` of @{directive_name}: {err}",
                                argument.name
                            ),
                        );
                    }
                }
                None if argument.is_required() => {
                    ctx.push_error(
                        error_location(),
                        format!(
                            "Missing required argument `{}` on directive @{directive_name}",
                            argument.name
                        ),
                    );
                }
                None => {}
            }
        }
    }
}
