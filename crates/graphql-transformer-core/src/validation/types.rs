use std::collections::BTreeSet;

use super::Context;
use crate::{
    diagnostics::Location,
    document::{is_builtin_scalar, FieldDefinition, TypeDefinition, TypeKind},
};

pub(super) fn validate_type(ty: &TypeDefinition, ctx: &mut Context<'_>) {
    match ty.kind {
        TypeKind::Scalar => {}
        TypeKind::Object | TypeKind::Interface => validate_object_like(ty, ctx),
        TypeKind::InputObject => validate_input_object(ty, ctx),
        TypeKind::Enum => validate_enum(ty, ctx),
        TypeKind::Union => validate_union(ty, ctx),
    }
}

enum TypeCheck {
    Ok,
    Unknown,
    WrongPosition,
}

fn check_output_type(name: &str, ctx: &Context<'_>) -> TypeCheck {
    if is_builtin_scalar(name) {
        return TypeCheck::Ok;
    }
    match ctx.document.kind_of(name) {
        None => TypeCheck::Unknown,
        Some(kind) if kind.is_output() => TypeCheck::Ok,
        Some(_) => TypeCheck::WrongPosition,
    }
}

fn check_input_type(name: &str, ctx: &Context<'_>) -> TypeCheck {
    if is_builtin_scalar(name) {
        return TypeCheck::Ok;
    }
    match ctx.document.kind_of(name) {
        None => TypeCheck::Unknown,
        Some(kind) if kind.is_input() => TypeCheck::Ok,
        Some(_) => TypeCheck::WrongPosition,
    }
}

fn validate_object_like(ty: &TypeDefinition, ctx: &mut Context<'_>) {
    let type_name = &ty.name;
    let type_location = || Location::ty(type_name, ty.pos);

    for interface_name in &ty.implements {
        match ctx.document.get_type(interface_name) {
            None => ctx.push_error(
                type_location(),
                format!("{type_name} implements unknown interface {interface_name}"),
            ),
            Some(interface) if interface.kind != TypeKind::Interface => ctx.push_error(
                type_location(),
                format!("{interface_name} is not an interface and cannot be implemented by {type_name}"),
            ),
            Some(interface) => {
                for field in &interface.fields {
                    if !ty.has_field(&field.name) {
                        ctx.push_error(
                            type_location(),
                            format!(
                                "{type_name} does not define field `{}` required by interface {interface_name}",
                                field.name
                            ),
                        );
                    }
                }
            }
        }
    }

    if ty.fields.is_empty() {
        let kind = if ty.kind == TypeKind::Interface {
            "Interface"
        } else {
            "Object type"
        };
        ctx.push_error(type_location(), format!("{kind} {type_name} must define one or more fields"));
    }

    let mut seen = BTreeSet::new();
    for field in &ty.fields {
        let field_name = &field.name;
        let location = || Location::field(type_name, field_name, field.pos);

        if !seen.insert(field_name.as_str()) {
            ctx.push_error(
                location(),
                format!("Duplicate field {field_name} already exists on {type_name}"),
            );
            continue;
        }

        validate_arguments(type_name, field, ctx);

        let base_name = field.ty.base_name();
        match check_output_type(base_name, ctx) {
            TypeCheck::Ok => {}
            TypeCheck::Unknown => ctx.push_error(location(), format!("Unknown type {base_name}")),
            TypeCheck::WrongPosition => ctx.push_error(
                location(),
                format!("Input object {base_name} cannot be used as an output type"),
            ),
        }
    }
}

fn validate_arguments(type_name: &str, field: &FieldDefinition, ctx: &mut Context<'_>) {
    let names = field.arguments.iter().map(|argument| argument.name.as_str());
    ctx.find_duplicates(names, |ctx, idx| {
        let argument = &field.arguments[idx];
        ctx.push_error(
            Location::argument(type_name, &field.name, &argument.name, argument.pos),
            format!("Duplicate argument {} on {type_name}.{}", argument.name, field.name),
        );
    });

    for argument in &field.arguments {
        let location = || Location::argument(type_name, &field.name, &argument.name, argument.pos);
        let base_name = argument.ty.base_name();

        match check_input_type(base_name, ctx) {
            TypeCheck::Ok => {
                if let Some(default_value) = &argument.default_value {
                    if let Err(err) = ctx.registry.coerce(ctx.document, default_value, &argument.ty) {
                        ctx.push_error(location(), format!("Invalid default value: {err}"));
                    }
                }
            }
            TypeCheck::Unknown => ctx.push_error(location(), format!("Unknown type {base_name}")),
            TypeCheck::WrongPosition => ctx.push_error(
                location(),
                format!("Type {base_name} of argument {} is not an input type", argument.name),
            ),
        }
    }
}

fn validate_input_object(ty: &TypeDefinition, ctx: &mut Context<'_>) {
    let type_name = &ty.name;

    if ty.fields.is_empty() {
        ctx.push_error(
            Location::ty(type_name, ty.pos),
            format!("Input object {type_name} must define one or more fields"),
        );
    }

    let mut seen = BTreeSet::new();
    for field in &ty.fields {
        let field_name = &field.name;
        let location = || Location::field(type_name, field_name, field.pos);

        if !seen.insert(field_name.as_str()) {
            ctx.push_error(
                location(),
                format!("Duplicate field {field_name} already exists on {type_name}"),
            );
            continue;
        }

        let base_name = field.ty.base_name();
        match check_input_type(base_name, ctx) {
            TypeCheck::Ok => {
                if let Some(default_value) = &field.default_value {
                    if let Err(err) = ctx.registry.coerce(ctx.document, default_value, &field.ty) {
                        ctx.push_error(location(), format!("Invalid default value: {err}"));
                    }
                }
            }
            TypeCheck::Unknown => ctx.push_error(location(), format!("Unknown type {base_name}")),
            TypeCheck::WrongPosition => ctx.push_error(
                location(),
                format!("Type {base_name} of input field {field_name} is not an input type"),
            ),
        }
    }
}

fn validate_enum(ty: &TypeDefinition, ctx: &mut Context<'_>) {
    let type_name = &ty.name;

    if ty.values.is_empty() {
        ctx.push_error(
            Location::ty(type_name, ty.pos),
            format!("Enum {type_name} must define one or more values"),
        );
    }

    let names = ty.values.iter().map(|value| value.name.as_str());
    ctx.find_duplicates(names, |ctx, idx| {
        let value = &ty.values[idx];
        ctx.push_error(
            Location::ty(type_name, ty.pos),
            format!("Duplicate enum value {} on {type_name}", value.name),
        );
    });
}

fn validate_union(ty: &TypeDefinition, ctx: &mut Context<'_>) {
    let type_name = &ty.name;

    if ty.members.is_empty() {
        ctx.push_error(
            Location::ty(type_name, ty.pos),
            format!("Union {type_name} must have one or more member types"),
        );
    }

    for member in &ty.members {
        match ctx.document.kind_of(member) {
            Some(TypeKind::Object) => {}
            Some(_) => ctx.push_error(
                Location::ty(type_name, ty.pos),
                format!("Union member {member} of {type_name} is not an object type"),
            ),
            None => ctx.push_error(
                Location::ty(type_name, ty.pos),
                format!("Unknown union member {member} of {type_name}"),
            ),
        }
    }
}
