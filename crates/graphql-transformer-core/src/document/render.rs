use std::fmt::{self, Display, Write};

use super::{
    write_quoted, Directive, EnumValueDefinition, FieldDefinition, InputValueDefinition, SchemaDocument,
    TypeDefinition, TypeKind,
};

const INDENT: &str = "  ";

/// Renders the document as SDL.
///
/// Output is deterministic: types appear in document order, fields and directives in declaration
/// order, one blank line between definitions.
pub fn render(document: &SchemaDocument) -> String {
    document.to_string()
}

impl Display for SchemaDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;

        if !self.roots().is_default() {
            let roots = self.roots();
            f.write_str("schema {\n")?;
            for (operation, name) in [
                ("query", &roots.query),
                ("mutation", &roots.mutation),
                ("subscription", &roots.subscription),
            ] {
                if self.has_type(name) {
                    writeln!(f, "{INDENT}{operation}: {name}")?;
                }
            }
            f.write_str("}\n")?;
            first = false;
        }

        for ty in self.types() {
            if !first {
                f.write_char('\n')?;
            }
            first = false;
            write_type(f, ty)?;
        }

        Ok(())
    }
}

fn write_type(f: &mut fmt::Formatter<'_>, ty: &TypeDefinition) -> fmt::Result {
    if let Some(description) = &ty.description {
        write!(f, "{}", Description(description, ""))?;
    }

    let keyword = match ty.kind {
        TypeKind::Scalar => "scalar",
        TypeKind::Object => "type",
        TypeKind::Interface => "interface",
        TypeKind::Union => "union",
        TypeKind::Enum => "enum",
        TypeKind::InputObject => "input",
    };
    write!(f, "{keyword} {}", ty.name)?;

    if !ty.implements.is_empty() {
        write!(f, " implements {}", ty.implements.join(" & "))?;
    }

    write_directives(f, &ty.directives)?;

    match ty.kind {
        TypeKind::Scalar => {}
        TypeKind::Union => {
            if !ty.members.is_empty() {
                write!(f, " = {}", ty.members.join(" | "))?;
            }
        }
        TypeKind::Enum => {
            if !ty.values.is_empty() {
                f.write_str(" {\n")?;
                for value in &ty.values {
                    write_enum_value(f, value)?;
                }
                f.write_char('}')?;
            }
        }
        TypeKind::Object | TypeKind::Interface | TypeKind::InputObject => {
            if !ty.fields.is_empty() {
                f.write_str(" {\n")?;
                for field in &ty.fields {
                    write_field(f, field)?;
                }
                f.write_char('}')?;
            }
        }
    }

    f.write_char('\n')
}

fn write_field(f: &mut fmt::Formatter<'_>, field: &FieldDefinition) -> fmt::Result {
    if let Some(description) = &field.description {
        write!(f, "{}", Description(description, INDENT))?;
    }

    write!(f, "{INDENT}{}", field.name)?;

    if !field.arguments.is_empty() {
        f.write_char('(')?;
        for (idx, argument) in field.arguments.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write_input_value(f, argument)?;
        }
        f.write_char(')')?;
    }

    write!(f, ": {}", field.ty)?;

    if let Some(default_value) = &field.default_value {
        write!(f, " = {default_value}")?;
    }

    write_directives(f, &field.directives)?;
    f.write_char('\n')
}

fn write_input_value(f: &mut fmt::Formatter<'_>, value: &InputValueDefinition) -> fmt::Result {
    if let Some(description) = &value.description {
        write_quoted(description, f)?;
        f.write_char(' ')?;
    }

    write!(f, "{}: {}", value.name, value.ty)?;

    if let Some(default_value) = &value.default_value {
        write!(f, " = {default_value}")?;
    }

    write_directives(f, &value.directives)
}

fn write_enum_value(f: &mut fmt::Formatter<'_>, value: &EnumValueDefinition) -> fmt::Result {
    if let Some(description) = &value.description {
        write!(f, "{}", Description(description, INDENT))?;
    }

    write!(f, "{INDENT}{}", value.name)?;
    write_directives(f, &value.directives)?;
    f.write_char('\n')
}

fn write_directives(f: &mut fmt::Formatter<'_>, directives: &[Directive]) -> fmt::Result {
    for directive in directives {
        write!(f, " {directive}")?;
    }
    Ok(())
}

impl Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;

        if self.arguments.is_empty() {
            return Ok(());
        }

        f.write_char('(')?;
        for (idx, (name, value)) in self.arguments.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_char(')')
    }
}

struct Description<'a>(&'a str, &'a str);

impl Display for Description<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Description(description, indentation) = self;

        writeln!(f, r#"{indentation}""""#)?;

        for line in description.trim().lines() {
            let line = line.trim();
            if line.is_empty() {
                f.write_char('\n')?;
            } else {
                writeln!(f, "{indentation}{line}")?;
            }
        }

        writeln!(f, r#"{indentation}""""#)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::super::{parse, FieldDefinition, RootOperation, TypeRef};
    use super::*;

    #[test]
    fn renders_every_kind() {
        let document = parse(indoc! {r#"
            """
            A blog post.
            """
            type Post implements Node @model(queries: {get: "post"}) {
              id: ID!
              "The title"
              title(locale: String = "en"): String @default(value: "untitled")
            }

            interface Node { id: ID! }

            union SearchResult = Post | Comment

            type Comment { id: ID! }

            enum Visibility { PUBLIC PRIVATE }

            input PostFilter { title: String = "x" }

            scalar Markdown
        "#})
        .unwrap();

        insta::assert_snapshot!(render(&document), @r###"
        """
        A blog post.
        """
        type Post implements Node @model(queries: {get: "post"}) {
          id: ID!
          """
          The title
          """
          title(locale: String = "en"): String @default(value: "untitled")
        }

        interface Node {
          id: ID!
        }

        union SearchResult = Post | Comment

        type Comment {
          id: ID!
        }

        enum Visibility {
          PUBLIC
          PRIVATE
        }

        input PostFilter {
          title: String = "x"
        }

        scalar Markdown
        "###);
    }

    #[test]
    fn rendering_is_stable() {
        let sdl = "type Post {\n  id: ID!\n}\n\ntype Query {\n  getPost(id: ID!): Post\n}\n";

        let once = render(&parse(sdl).unwrap());
        let twice = render(&parse(&once).unwrap());

        assert_eq!(once, sdl);
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_types_have_no_braces() {
        let mut document = SchemaDocument::new();
        document.get_or_insert_root(RootOperation::Mutation);

        assert_eq!(render(&document), "type Mutation\n");

        document
            .add_field("Mutation", FieldDefinition::new("ping", TypeRef::named("Boolean")))
            .unwrap();
        assert_eq!(render(&document), "type Mutation {\n  ping: Boolean\n}\n");
    }

    #[test]
    fn custom_roots_render_a_schema_block() {
        let document = parse("schema { query: RootQuery } type RootQuery { ok: Boolean }").unwrap();

        insta::assert_snapshot!(render(&document), @r###"
        schema {
          query: RootQuery
        }

        type RootQuery {
          ok: Boolean
        }
        "###);
    }
}
