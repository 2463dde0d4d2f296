//! `@http`: resolves a field with a request to an HTTP endpoint.

use graphql_transformer_core::{
    DataSourceType, Directive, HookError, Location, ResolverFunction, ResourceKind, Stage, Transformer,
    TransformerContext, TypeKind,
};
use itertools::Itertools;
use serde::Deserialize;
use url::Url;

use crate::{common, names, templates};

pub const HTTP_DIRECTIVE: &str = "http";

const DEFINITIONS: &str = r"
directive @http(method: HttpMethod = GET, url: String!, headers: [HttpHeader] = []) on FIELD_DEFINITION

enum HttpMethod {
  GET
  POST
  PUT
  DELETE
  PATCH
}

input HttpHeader {
  key: String
  value: String
}
";

const HTTP_STACK: &str = "HttpStack";

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }

    fn has_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

#[derive(Debug, Deserialize)]
struct HttpHeader {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HttpArguments {
    #[serde(default)]
    method: HttpMethod,
    url: String,
    #[serde(default)]
    headers: Vec<HttpHeader>,
}

#[derive(Debug)]
struct HttpCall {
    type_name: String,
    field_name: String,
    method: HttpMethod,
    data_source: String,
    origin: String,
    /// Request path with `:param` segments replaced by argument placeholders.
    path: String,
    static_query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    /// Arguments that are not part of the path.
    parameters: Vec<String>,
}

#[derive(Debug, Default)]
pub struct HttpTransformer {
    calls: Vec<HttpCall>,
}

impl HttpTransformer {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Splits an endpoint into its origin and path, checking it is an absolute http(s) URL.
fn parse_endpoint(raw: &str, location: &Location) -> Result<Url, HookError> {
    let url = Url::parse(raw).map_err(|err| {
        HookError::invalid_directive(
            location.clone(),
            format!("@{HTTP_DIRECTIVE} url {raw} is not an absolute url: {err}"),
        )
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(HookError::invalid_directive(
            location.clone(),
            format!("@{HTTP_DIRECTIVE} url {raw} must use http or https and name a host"),
        ));
    }

    Ok(url)
}

/// Names of the `:param` segments of a path, in order.
fn path_parameters(url: &Url) -> Vec<String> {
    url.path_segments()
        .into_iter()
        .flatten()
        .filter_map(|segment| segment.strip_prefix(':'))
        .map(str::to_owned)
        .collect()
}

fn resource_path(url: &Url) -> String {
    let segments = url
        .path_segments()
        .into_iter()
        .flatten()
        .map(|segment| match segment.strip_prefix(':') {
            Some(parameter) => format!("${{ctx.args.{parameter}}}"),
            None => segment.to_owned(),
        })
        .join("/");
    format!("/{segments}")
}

impl Transformer for HttpTransformer {
    fn name(&self) -> &'static str {
        "http"
    }

    fn directive_definitions(&self) -> &'static str {
        DEFINITIONS
    }

    fn on_field_definition(
        &mut self,
        ctx: &mut TransformerContext,
        type_name: &str,
        field_name: &str,
        directive: &Directive,
    ) -> Result<(), HookError> {
        let location = Location::field(type_name, field_name, directive.pos);
        if ctx.document.kind_of(type_name) != Some(TypeKind::Object) {
            return Err(HookError::invalid_directive(
                location,
                format!("@{HTTP_DIRECTIVE} can only resolve fields of object types, {type_name} is not one"),
            ));
        }

        let arguments: HttpArguments = common::arguments(directive, &location)?;
        let url = parse_endpoint(&arguments.url, &location)?;
        let host = url.host_str().unwrap_or_default();

        let field = ctx
            .document
            .field(type_name, field_name)
            .ok_or_else(|| HookError::invalid_directive(location.clone(), format!("{type_name}.{field_name} does not exist")))?;

        let path_parameters = path_parameters(&url);
        if let Some(parameter) = path_parameters
            .iter()
            .find(|parameter| field.argument(parameter).is_none())
        {
            return Err(HookError::invalid_directive(
                location,
                format!("{type_name}.{field_name} has no argument {parameter} for the url parameter :{parameter}"),
            ));
        }
        if let Some(duplicate) = path_parameters.iter().duplicates().next() {
            return Err(HookError::invalid_directive(
                location,
                format!("url parameter :{duplicate} of @{HTTP_DIRECTIVE} on {type_name}.{field_name} is used twice"),
            ));
        }

        let parameters = field
            .arguments
            .iter()
            .map(|argument| argument.name.clone())
            .filter(|argument| !path_parameters.contains(argument))
            .collect();
        let headers = arguments
            .headers
            .into_iter()
            .filter_map(|header| Some((header.key?, header.value.unwrap_or_default())))
            .collect();

        self.calls.push(HttpCall {
            type_name: type_name.to_owned(),
            field_name: field_name.to_owned(),
            method: arguments.method,
            data_source: names::http_data_source(host),
            origin: url.origin().ascii_serialization(),
            path: resource_path(&url),
            static_query: url.query_pairs().into_owned().collect(),
            headers,
            parameters,
        });
        Ok(())
    }

    fn generate_resolvers(&mut self, ctx: &mut TransformerContext) -> Result<(), HookError> {
        for call in &self.calls {
            ctx.request_resource(
                &call.data_source,
                HTTP_STACK,
                ResourceKind::DataSource {
                    data_source_type: DataSourceType::Http,
                    target: call.origin.clone(),
                },
            )?;

            let request = templates::http_request(
                call.method.as_str(),
                &call.path,
                &call.static_query,
                &call.headers,
                &call.parameters,
                call.method.has_body(),
            );
            ctx.add_pipeline_entry(
                &call.type_name,
                &call.field_name,
                Stage::Data,
                ResolverFunction::new(request, templates::HTTP_RESPONSE).with_data_source(&call.data_source),
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn location() -> Location {
        Location::field("Query", "post", None)
    }

    #[rstest]
    #[case::relative("/posts")]
    #[case::ftp("ftp://example.com/posts")]
    #[case::no_host("https://")]
    fn endpoints_must_be_absolute_http(#[case] raw: &str) {
        assert!(parse_endpoint(raw, &location()).is_err());
    }

    #[test]
    fn path_parameters_become_placeholders() {
        let url = parse_endpoint("https://api.example.com/users/:userId/posts/:id?v=2", &location()).unwrap();

        assert_eq!(path_parameters(&url), ["userId", "id"]);
        assert_eq!(resource_path(&url), "/users/${ctx.args.userId}/posts/${ctx.args.id}");
        assert_eq!(url.origin().ascii_serialization(), "https://api.example.com");
    }
}
