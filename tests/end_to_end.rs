//! End-to-end scenarios: Cypher text in, rows out of the embedded graph.

use cygnet::core::IdentifierKind;
use cygnet::{ClientConfig, EmbeddedClient, Error, Flavor, Graph, ParameterMap, Translator, Value};
use std::sync::Arc;

fn modern(flavor: &str) -> EmbeddedClient {
    let graph = Arc::new(Graph::modern().unwrap());
    EmbeddedClient::embedded(ClientConfig::new(flavor), graph).unwrap()
}

fn params(pairs: &[(&str, Value)]) -> ParameterMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn strings(values: &[&str]) -> Vec<Value> {
    values.iter().map(|s| Value::from(*s)).collect()
}

async fn column(client: &EmbeddedClient, query: &str, params: &ParameterMap, name: &str) -> Vec<Value> {
    client.submit(query, params).await.unwrap().column(name)
}

#[tokio::test]
async fn test_match_by_parameter_returns_age() {
    let client = modern("native");
    let params = params(&[("name", Value::from("marko"))]);
    let query = "MATCH (n:person) WHERE n.name = $name RETURN n.age AS age";

    let program = client.translate(query, &params).unwrap();
    let text = program.display_text();
    assert!(text.contains("hasLabel('person')"));
    assert!(text.contains("has('name', P.eq(name))"));
    assert!(text.contains("project('age')"));

    assert_eq!(column(&client, query, &params, "age").await, vec![Value::from(29)]);
}

#[tokio::test]
async fn test_unwind_with_skip_and_limit() {
    let client = modern("native");
    let result = column(
        &client,
        "UNWIND [1, 2, 3, 4, 5] AS i WITH i SKIP 1 LIMIT 3 RETURN i",
        &ParameterMap::new(),
        "i",
    )
    .await;
    assert_eq!(result, vec![Value::from(2), Value::from(3), Value::from(4)]);
}

#[tokio::test]
async fn test_exists_on_null_map_entry() {
    let client = modern("native");
    let result = column(
        &client,
        "WITH {notName: 0, notName2: null} AS map RETURN exists(map.notName2) AS result",
        &ParameterMap::new(),
        "result",
    )
    .await;
    assert_eq!(result, vec![Value::Boolean(false)]);
}

#[tokio::test]
async fn test_with_shadows_previous_scope() {
    let client = modern("native");
    let err = client
        .submit("MATCH (p) WITH p.name AS x RETURN p", &ParameterMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnboundVariable { ref name, .. } if name == "p"));

    let names = column(
        &client,
        "MATCH (s:software) WITH s.name AS s RETURN s ORDER BY s",
        &ParameterMap::new(),
        "s",
    )
    .await;
    assert_eq!(names, strings(&["lop", "ripple"]));
}

#[tokio::test]
async fn test_skip_limit_order_is_normalised() {
    let translator = Translator::new(Flavor::Native);
    let none = ParameterMap::new();
    let a = translator
        .translate("MATCH (n) RETURN n.name AS name SKIP 1 LIMIT 2", &none)
        .unwrap();
    let b = translator
        .translate("MATCH (n) RETURN n.name AS name LIMIT 2 SKIP 1", &none)
        .unwrap();
    assert_eq!(a, b);

    let text = a.display_text();
    let skip = text.find("skip(1)").unwrap();
    let limit = text.find("limit(2)").unwrap();
    assert!(skip < limit);
}

#[tokio::test]
async fn test_comparison_with_null_never_matches() {
    let gremlin = Translator::default();
    let program = gremlin
        .translate("MATCH (n) WHERE n.age < null RETURN n", &ParameterMap::new())
        .unwrap();
    assert!(program.text().unwrap().contains("not(__.identity())"));

    let client = modern("native");
    let result = client
        .submit("MATCH (n) WHERE n.age < null RETURN n", &ParameterMap::new())
        .await
        .unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_invalid_parameter_names() {
    let client = modern("native");
    for name in ["🐼", "a$b", "0"] {
        let err = client
            .submit("RETURN 1 AS one", &params(&[(name, Value::from(1))]))
            .await
            .unwrap_err();
        assert_eq!(err, Error::InvalidParameterName(name.to_string()));
        assert!(err.to_string().contains(&format!("Invalid parameter name: {}", name)));
    }
}

#[tokio::test]
async fn test_reserved_parameter_name_under_script_flavor() {
    let err = Translator::default()
        .translate(
            "MATCH (n) WHERE n.name = $goto RETURN n",
            &params(&[("goto", Value::from("marko"))]),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ReservedIdentifier {
            kind: IdentifierKind::Parameter,
            ..
        }
    ));
    assert!(err.to_string().contains("Invalid parameter name: goto"));
}

#[tokio::test]
async fn test_with_then_where() {
    let client = modern("native");
    let names = column(
        &client,
        "MATCH (n:person) WITH n.name AS name, n.age AS age WHERE age > 30 RETURN name ORDER BY name",
        &ParameterMap::new(),
        "name",
    )
    .await;
    assert_eq!(names, strings(&["josh", "peter"]));
}

#[tokio::test]
async fn test_in_parameter_list() {
    let client = modern("native");
    let params = params(&[(
        "names",
        Value::List(strings(&["marko", "josh", "nobody"])),
    )]);
    let ages = column(
        &client,
        "MATCH (n:person) WHERE n.name IN $names RETURN n.age AS age ORDER BY age",
        &params,
        "age",
    )
    .await;
    assert_eq!(ages, vec![Value::from(29), Value::from(32)]);
}

#[tokio::test]
async fn test_pattern_properties_from_parameter() {
    let client = modern("native");
    let friends = column(
        &client,
        "MATCH (n:person {name: $name})-[:knows]->(f) RETURN f.name AS friend ORDER BY friend",
        &params(&[("name", Value::from("marko"))]),
        "friend",
    )
    .await;
    assert_eq!(friends, strings(&["josh", "vadas"]));
}

#[tokio::test]
async fn test_starts_with_parameter() {
    let client = modern("native");
    let names = column(
        &client,
        "MATCH (n) WHERE n.name STARTS WITH $prefix RETURN n.name AS name",
        &params(&[("prefix", Value::from("ma"))]),
        "name",
    )
    .await;
    assert_eq!(names, strings(&["marko"]));
}

#[tokio::test]
async fn test_chained_comparison() {
    let client = modern("native");
    let query = "MATCH (p:person) WHERE 27 <= p.age < 32 RETURN p.name AS name ORDER BY p.age";

    let program = Translator::default().translate(query, &ParameterMap::new()).unwrap();
    assert!(program.text().unwrap().contains("P.between(27, 32)"));

    let names = column(&client, query, &ParameterMap::new(), "name").await;
    assert_eq!(names, strings(&["vadas", "marko"]));
}

#[tokio::test]
async fn test_repeated_return_is_stable() {
    let client = modern("native");
    for _ in 0..3 {
        let result = client.submit("RETURN 1 AS x, 1 AS x", &ParameterMap::new()).await.unwrap();
        assert_eq!(result.columns, vec!["x".to_string()]);
        assert_eq!(result.column("x"), vec![Value::from(1)]);
    }
}

#[tokio::test]
async fn test_create_then_match_on_empty_graph() {
    let graph = Arc::new(Graph::new("empty"));
    let client = EmbeddedClient::embedded(ClientConfig::new("native"), graph.clone()).unwrap();

    let created = client
        .submit(
            "CREATE (a:person {name: 'alice', nick: null})-[:knows {since: 2020}]->(b:person {name: 'bob'})",
            &ParameterMap::new(),
        )
        .await
        .unwrap();
    assert!(created.is_empty());
    assert_eq!(graph.vertex_count().unwrap(), 2);
    assert_eq!(graph.edge_count().unwrap(), 1);

    let result = client
        .submit(
            "MATCH (a:person)-[r:knows]->(b) RETURN a.name AS a, r.since AS since, b.name AS b",
            &ParameterMap::new(),
        )
        .await
        .unwrap();
    assert_eq!(result.len(), 1);
    let row = &result.rows_as_maps()[0];
    assert_eq!(row.get("a"), Some(&Value::from("alice")));
    assert_eq!(row.get("since"), Some(&Value::from(2020)));
    assert_eq!(row.get("b"), Some(&Value::from("bob")));

    let nick = column(&client, "MATCH (a {name: 'alice'}) RETURN a.nick AS nick", &ParameterMap::new(), "nick").await;
    assert_eq!(nick, vec![Value::Null]);
}

#[tokio::test]
async fn test_aggregation_with_grouping_keys() {
    let client = modern("native");
    let result = client
        .submit(
            "MATCH (p:person)-[:created]->(s) RETURN s.name AS name, count(*) AS c ORDER BY name",
            &ParameterMap::new(),
        )
        .await
        .unwrap();
    assert_eq!(result.column("name"), strings(&["lop", "ripple"]));
    assert_eq!(result.column("c"), vec![Value::from(3), Value::from(1)]);
}

#[tokio::test]
async fn test_aggregation_null_rules() {
    let client = modern("native");
    let result = client
        .submit(
            "MATCH (n) RETURN count(*) AS rows, count(n.age) AS aged, sum(n.age) AS total, \
             min(n.age) AS youngest, collect(DISTINCT n.lang) AS langs",
            &ParameterMap::new(),
        )
        .await
        .unwrap();
    assert_eq!(result.column("rows"), vec![Value::from(6)]);
    assert_eq!(result.column("aged"), vec![Value::from(4)]);
    assert_eq!(result.column("total"), vec![Value::from(123)]);
    assert_eq!(result.column("youngest"), vec![Value::from(27)]);
    assert_eq!(result.column("langs"), vec![Value::List(strings(&["java"]))]);

    let empty = client
        .submit(
            "MATCH (n:robot) RETURN sum(n.age) AS total, max(n.age) AS oldest",
            &ParameterMap::new(),
        )
        .await
        .unwrap();
    assert_eq!(empty.column("total"), vec![Value::from(0)]);
    assert_eq!(empty.column("oldest"), vec![Value::Null]);
}

#[tokio::test]
async fn test_union_and_union_all() {
    let client = modern("native");
    let distinct = column(&client, "RETURN 1 AS x UNION RETURN 1 AS x", &ParameterMap::new(), "x").await;
    assert_eq!(distinct, vec![Value::from(1)]);

    let all = column(&client, "RETURN 1 AS x UNION ALL RETURN 1 AS x", &ParameterMap::new(), "x").await;
    assert_eq!(all, vec![Value::from(1), Value::from(1)]);
}

#[tokio::test]
async fn test_cosmosdb_program_executes() {
    let client = modern("cosmosdb");
    let query = "MATCH (n:person) WHERE n.age > 30 RETURN n.name AS name ORDER BY name SKIP 0 LIMIT 5";

    let program = client.translate(query, &ParameterMap::new()).unwrap();
    let text = program.text().unwrap();
    assert!(text.contains("properties('name').value()"));
    assert!(text.contains("range(0, -1)"));
    assert!(!text.contains("skip("));

    let names = column(&client, query, &ParameterMap::new(), "name").await;
    assert_eq!(names, strings(&["josh", "peter"]));
}

#[tokio::test]
async fn test_cosmosdb_rejects_unwound_maps() {
    let client = modern("cosmosdb");
    let err = client
        .translate("UNWIND [{a: 1}] AS row RETURN row", &ParameterMap::new())
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedInFlavor { .. }));
}

#[tokio::test]
async fn test_with_variable_named_like_its_map_key() {
    let client = modern("native");
    let result = column(&client, "WITH {map: 5} AS map RETURN map AS r", &ParameterMap::new(), "r").await;
    let expected = Value::Map([("map".to_string(), Value::from(5))].into_iter().collect());
    assert_eq!(result, vec![expected]);
}

#[tokio::test]
async fn test_map_keys_do_not_shadow_variables() {
    let client = modern("native");
    let after_unwind = column(
        &client,
        "WITH 1 AS a UNWIND [{a: 2}] AS row RETURN a AS r",
        &ParameterMap::new(),
        "r",
    )
    .await;
    assert_eq!(after_unwind, vec![Value::from(1)]);

    let after_with = column(&client, "WITH 1 AS a, {a: 2} AS m RETURN a AS r", &ParameterMap::new(), "r").await;
    assert_eq!(after_with, vec![Value::from(1)]);
}

#[tokio::test]
async fn test_pattern_property_refers_to_earlier_node() {
    let client = modern("native");
    let names = column(
        &client,
        "MATCH (a:person {name: 'marko'}), (b:person {age: a.age}) RETURN b.name AS r",
        &ParameterMap::new(),
        "r",
    )
    .await;
    assert_eq!(names, strings(&["marko"]));
}

#[tokio::test]
async fn test_negative_limit_is_rejected() {
    let client = modern("native");
    let err = client
        .submit("MATCH (n) RETURN n LIMIT $n", &params(&[("n", Value::from(-1))]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRange { .. }));
}

#[test]
fn test_translation_is_deterministic_across_flavors() {
    let params = params(&[("name", Value::from("marko")), ("limit", Value::from(2))]);
    let query = "MATCH (a:person {name: $name})-[:knows]->(b) \
                 WITH b, b.age AS age ORDER BY age DESC LIMIT $limit \
                 RETURN b.name AS name, age";
    for flavor in Flavor::all() {
        let translator = Translator::new(flavor);
        let first = translator.translate(query, &params).unwrap();
        let second = translator.translate(query, &params).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.display_text(), second.display_text());
        assert_eq!(first.columns(), ["name".to_string(), "age".to_string()]);
    }
}
