//! Request and response mapping templates for the data sources the transformers target.

use indoc::{formatdoc, indoc};

/// Forwards the data source result, or raises its error.
pub(crate) const RESPONSE: &str = indoc! {r#"
    #if( $ctx.error )
      $util.error($ctx.error.message, $ctx.error.type)
    #else
      $util.toJson($ctx.result)
    #end
"#};

/// Response of a step that only prepares the stash.
pub(crate) const PASSTHROUGH: &str = "$util.toJson({})\n";

/// Pairs every key field with the same named value of `source`.
pub(crate) fn key_from(fields: &[String], source: &str) -> Vec<(String, String)> {
    fields
        .iter()
        .map(|field| (field.clone(), format!("{source}.{field}")))
        .collect()
}

fn key_object(key: &[(String, String)]) -> String {
    let entries: Vec<String> = key
        .iter()
        .map(|(field, value)| format!(r#""{field}": $util.dynamodb.toDynamoDBJson({value})"#))
        .collect();
    format!("{{ {} }}", entries.join(", "))
}

/// Reads a single item. `key` pairs each key attribute with the expression holding its value.
pub(crate) fn get_item(key: &[(String, String)]) -> String {
    formatdoc! {r#"
        {{
          "version": "2018-05-29",
          "operation": "GetItem",
          "key": {key}
        }}
    "#, key = key_object(key)}
}

pub(crate) fn scan() -> String {
    indoc! {r#"
        #set( $limit = $util.defaultIfNull($ctx.args.limit, 100) )
        #set( $scan = {
          "version": "2018-05-29",
          "operation": "Scan",
          "limit": $limit
        } )
        #if( $ctx.args.nextToken )
          $util.qr($scan.put("nextToken", $ctx.args.nextToken))
        #end
        #if( $ctx.stash.authFilter || $ctx.args.filter )
          $util.qr($scan.put("filter", $util.parseJson($util.transform.toDynamoDBFilterExpression($util.defaultIfNull($ctx.stash.authFilter, $ctx.args.filter)))))
        #end
        $util.toJson($scan)
    "#}
    .to_owned()
}

/// Query on the partition key of the table or of one of its indexes. `source` is where the key
/// value is read from, `$ctx.args` for root queries or `$ctx.source` for relations.
pub(crate) fn query(index: Option<&str>, partition_key: &str, source: &str, source_field: &str, limit: u32) -> String {
    let index = index
        .map(|index| format!("\n  \"index\": \"{index}\","))
        .unwrap_or_default();
    formatdoc! {r##"
        #set( $limit = $util.defaultIfNull($ctx.args.limit, {limit}) )
        #set( $query = {{
          "version": "2018-05-29",
          "operation": "Query",{index}
          "query": {{
            "expression": "#partitionKey = :partitionKey",
            "expressionNames": {{ "#partitionKey": "{partition_key}" }},
            "expressionValues": {{ ":partitionKey": $util.dynamodb.toDynamoDBJson({source}.{source_field}) }}
          }},
          "scanIndexForward": #if( $ctx.args.sortDirection == "DESC" ) false #else true #end,
          "limit": $limit
        }} )
        #if( $ctx.args.nextToken )
          $util.qr($query.put("nextToken", $ctx.args.nextToken))
        #end
        #if( $ctx.args.filter )
          $util.qr($query.put("filter", $util.parseJson($util.transform.toDynamoDBFilterExpression($ctx.args.filter))))
        #end
        $util.toJson($query)
    "##}
}

pub(crate) fn put_item(key: &[String], timestamps: &[String]) -> String {
    let timestamps: String = timestamps
        .iter()
        .map(|field| format!("$util.qr($ctx.args.input.put(\"{field}\", $util.defaultIfNull($ctx.args.input.{field}, $util.time.nowISO8601())))\n"))
        .collect();
    let auto_id = if key.first().is_some_and(|field| field == "id") {
        "#if( $util.isNullOrEmpty($ctx.args.input.id) )\n  $util.qr($ctx.args.input.put(\"id\", $util.autoId()))\n#end\n"
    } else {
        ""
    };
    formatdoc! {r##"
        {timestamps}{auto_id}{{
          "version": "2018-05-29",
          "operation": "PutItem",
          "key": {key},
          "attributeValues": $util.dynamodb.toMapValuesJson($ctx.args.input),
          "condition": {{ "expression": "attribute_not_exists(#id)", "expressionNames": {{ "#id": "{partition_key}" }} }}
        }}
    "##, key = key_object(&key_from(key, "$ctx.args.input")), partition_key = key.first().map(String::as_str).unwrap_or("id")}
}

pub(crate) fn update_item(key: &[String], updated_at: Option<&str>) -> String {
    let updated_at = updated_at
        .map(|field| format!("$util.qr($ctx.args.input.put(\"{field}\", $util.time.nowISO8601()))\n"))
        .unwrap_or_default();
    formatdoc! {r#"
        {updated_at}{{
          "version": "2018-05-29",
          "operation": "UpdateItem",
          "key": {key},
          "update": $util.transform.toDynamoDBUpdateExpression($ctx.args.input)
        }}
    "#, key = key_object(&key_from(key, "$ctx.args.input"))}
}

pub(crate) fn delete_item(key: &[String]) -> String {
    formatdoc! {r#"
        {{
          "version": "2018-05-29",
          "operation": "DeleteItem",
          "key": {key}
        }}
    "#, key = key_object(&key_from(key, "$ctx.args.input"))}
}

/// Subscriptions resolve against the `NONE` data source and forward nothing.
pub(crate) fn subscription() -> String {
    indoc! {r#"
        {
          "version": "2018-05-29",
          "payload": {}
        }
    "#}
    .to_owned()
}

/// Statement against an external relational database.
pub(crate) fn sql(operation: &str, table: &str, key: &[String]) -> String {
    formatdoc! {r#"
        #set( $lambdaInput = {{
          "table": "{table}",
          "operation": "{operation}",
          "operationName": "$ctx.info.fieldName",
          "args": $ctx.args,
          "keys": {keys}
        }} )
        {{
          "version": "2018-05-29",
          "operation": "Invoke",
          "payload": $util.toJson($lambdaInput)
        }}
    "#, keys = serde_json::Value::from(key.to_vec())}
}

pub(crate) fn invoke(function_name: &str) -> String {
    formatdoc! {r#"
        {{
          "version": "2018-05-29",
          "operation": "Invoke",
          "payload": {{
            "function": "{function_name}",
            "typeName": $util.toJson($ctx.info.parentTypeName),
            "fieldName": $util.toJson($ctx.info.fieldName),
            "arguments": $util.toJson($ctx.arguments),
            "identity": $util.toJson($ctx.identity),
            "source": $util.toJson($ctx.source),
            "prev": $util.toJson($ctx.prev)
          }}
        }}
    "#}
}

/// Full text search against the model's index, narrowed by the auth filter when one is stashed.
pub(crate) fn search(index: &str) -> String {
    formatdoc! {r#"
        #set( $limit = $util.defaultIfNull($ctx.args.limit, 100) )
        #set( $filter = $util.defaultIfNull($util.transform.toElasticsearchQueryDSL($ctx.args.filter), {{ "match_all": {{}} }}) )
        #if( $ctx.stash.authFilter )
          #set( $filter = {{ "bool": {{ "must": [$filter, $util.transform.toElasticsearchQueryDSL($ctx.stash.authFilter)] }} }} )
        #end
        #set( $sort = [] )
        #foreach( $item in $util.defaultIfNull($ctx.args.sort, []) )
          $util.qr($sort.add({{ "$item.field": {{ "order": "$util.defaultIfNull($item.direction, 'asc')" }} }}))
        #end
        {{
          "version": "2018-05-29",
          "operation": "GET",
          "path": "/{index}/_search",
          "params": {{
            "body": {{
              "from": $util.defaultIfNull($ctx.args.from, 0),
              "size": $limit,
              "query": $util.toJson($filter),
              "sort": $util.toJson($sort),
              "track_total_hits": true
            }}
          }}
        }}
    "#}
}

pub(crate) const SEARCH_RESPONSE: &str = indoc! {r#"
    #if( $ctx.error )
      $util.error($ctx.error.message, $ctx.error.type)
    #end
    #set( $items = [] )
    #foreach( $hit in $ctx.result.hits.hits )
      $util.qr($items.add($hit.get("_source")))
    #end
    $util.toJson({ "items": $items, "total": $ctx.result.hits.total.value, "nextToken": $util.toJson(null) })
"#};

/// Request against an HTTP data source. `path` already carries the argument placeholders,
/// `parameters` are the arguments sent as query string or, with `with_body`, as JSON body.
pub(crate) fn http_request(
    method: &str,
    path: &str,
    static_query: &[(String, String)],
    headers: &[(String, String)],
    parameters: &[String],
    with_body: bool,
) -> String {
    let mut values = String::from("#set( $values = {} )\n");
    for (name, value) in static_query {
        values.push_str(&format!("$util.qr($values.put(\"{name}\", \"{value}\"))\n"));
    }
    for parameter in parameters {
        values.push_str(&format!(
            "#if( !$util.isNull($ctx.args.{parameter}) )\n  $util.qr($values.put(\"{parameter}\", $ctx.args.{parameter}))\n#end\n"
        ));
    }

    let headers = serde_json::Value::Object(
        headers
            .iter()
            .map(|(key, value)| (key.clone(), serde_json::Value::from(value.as_str())))
            .collect(),
    );
    let payload = if with_body { "body" } else { "query" };
    formatdoc! {r#"
        {values}{{
          "version": "2018-05-29",
          "method": "{method}",
          "resourcePath": "{path}",
          "params": {{
            "headers": {headers},
            "{payload}": $util.toJson($values)
          }}
        }}
    "#}
}

/// Parses successful responses as JSON, everything else is an error.
pub(crate) const HTTP_RESPONSE: &str = indoc! {r#"
    #if( $ctx.error )
      $util.error($ctx.error.message, $ctx.error.type)
    #end
    #if( $ctx.result.statusCode >= 200 && $ctx.result.statusCode < 300 )
      $util.toJson($util.parseJson($ctx.result.body))
    #else
      $util.error($ctx.result.body, "HttpError", null, { "statusCode": $ctx.result.statusCode })
    #end
"#};
