//! Names of generated types, fields and resources.

use heck::{ToSnakeCase, ToUpperCamelCase};

/// A type name with a plural form.
pub trait ToPlural {
    fn to_plural(&self) -> String;
}

impl ToPlural for str {
    /// Pluralizes the last word of a camel cased name, so `PostOwner` becomes `PostOwners` and an
    /// already plural `PostOwners` is kept.
    fn to_plural(&self) -> String {
        let (head, last) = self.split_at(last_word_start(self));
        let plural = pluralizer::pluralize(last, 2, false);
        if plural.is_empty() {
            format!("{self}s")
        } else {
            format!("{head}{plural}")
        }
    }
}

fn last_word_start(name: &str) -> usize {
    let mut start = 0;
    let mut previous_upper = true;
    for (idx, c) in name.char_indices() {
        let upper = c.is_uppercase();
        if upper && !previous_upper {
            start = idx;
        }
        previous_upper = upper;
    }
    start
}

pub fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn upper_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn connection_type(type_name: &str) -> String {
    format!("Model{type_name}Connection")
}

pub fn filter_input(type_name: &str) -> String {
    format!("Model{type_name}FilterInput")
}

pub fn condition_input(type_name: &str) -> String {
    format!("Model{type_name}ConditionInput")
}

pub fn create_input(type_name: &str) -> String {
    format!("Create{type_name}Input")
}

pub fn update_input(type_name: &str) -> String {
    format!("Update{type_name}Input")
}

pub fn delete_input(type_name: &str) -> String {
    format!("Delete{type_name}Input")
}

/// Field holding the key of the related record, added when a relation does not name its fields.
pub fn foreign_key_field(type_name: &str, field_name: &str) -> String {
    format!("{}{}Id", lower_first(type_name), field_name.to_upper_camel_case())
}

/// Default name of a secondary index: `byAuthor`, `byAuthorAndCreatedAt`.
pub fn index_name(field_name: &str, sort_keys: &[String]) -> String {
    let mut name = format!("by{}", upper_first(field_name));
    for sort_key in sort_keys {
        name.push_str("And");
        name.push_str(&upper_first(sort_key));
    }
    name
}

pub fn table_resource(type_name: &str) -> String {
    format!("{type_name}Table")
}

pub fn table_data_source(type_name: &str) -> String {
    format!("{type_name}DataSource")
}

/// Name of the search index documents of a model are written to.
pub fn search_index(type_name: &str) -> String {
    type_name.to_snake_case()
}

/// Data source name for an HTTP origin: `https://api.example.com` becomes `ApiExampleComHttpDataSource`.
pub fn http_data_source(host: &str) -> String {
    let words = host.replace(|c: char| !c.is_ascii_alphanumeric(), " ");
    format!("{}HttpDataSource", words.to_upper_camel_case())
}

pub fn lambda_data_source(function_name: &str) -> String {
    let words = function_name.replace(|c: char| !c.is_ascii_alphanumeric(), " ");
    format!("{}LambdaDataSource", words.to_upper_camel_case())
}
