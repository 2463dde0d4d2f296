use std::fmt;

use crate::document::Pos;

/// Where in the schema a diagnostic applies: a schema coordinate such as `Post`, `Post.title` or
/// `Query.getPost(id:)`, plus the source position when the node came from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub coordinate: String,
    pub pos: Option<Pos>,
}

impl Location {
    pub fn ty(type_name: &str, pos: Option<Pos>) -> Self {
        Location {
            coordinate: type_name.to_owned(),
            pos,
        }
    }

    pub fn field(type_name: &str, field_name: &str, pos: Option<Pos>) -> Self {
        Location {
            coordinate: format!("{type_name}.{field_name}"),
            pos,
        }
    }

    pub fn argument(type_name: &str, field_name: &str, argument: &str, pos: Option<Pos>) -> Self {
        Location {
            coordinate: format!("{type_name}.{field_name}({argument}:)"),
            pos,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.coordinate)?;
        if let Some(pos) = self.pos {
            write!(f, " ({}:{})", pos.line, pos.column)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub location: Location,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Validation errors, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn push(&mut self, location: Location, message: impl Into<String>) {
        self.0.push(Diagnostic {
            location,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    /// Iterate over all diagnostic messages.
    pub fn iter_messages(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|diagnostic| diagnostic.message.as_str())
    }

    pub fn first(&self) -> Option<&Diagnostic> {
        self.0.first()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Diagnostics(vec![diagnostic])
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, diagnostic) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}
