#![cfg(not(target_arch = "wasm32"))]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use firestore_collections::collections::{
    collections_builder, Collection, CollectionsErrorCode, CollectionsOptions, QuerySpec, Schema,
    SchemaNode, Validator,
};
use firestore_collections::firestore::{DocumentData, Filter, FilterOperator, Firestore, OrderDirection};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
struct City {
    name: String,
    state: String,
    population: u64,
}

/// Deserializes cities and counts how many documents it has seen.
#[derive(Clone, Default)]
struct CountingValidator {
    calls: Arc<AtomicUsize>,
}

impl Validator for CountingValidator {
    type Output = City;
    type Error = serde_json::Error;

    fn validate(&self, data: DocumentData) -> Result<City, serde_json::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        serde_json::from_value(Value::Object(data))
    }
}

async fn seeded() -> (Collection<CountingValidator>, Arc<AtomicUsize>) {
    let validator = CountingValidator::default();
    let calls = Arc::clone(&validator.calls);
    let schema = Schema::new().collection("cities", SchemaNode::new(validator));
    let tree = collections_builder(&schema, CollectionsOptions::with_database(Firestore::in_memory()))
        .unwrap();
    let cities = tree.collection::<CountingValidator>("cities").unwrap().clone();

    let rows = [
        ("sf", "San Francisco", "CA", 860_000),
        ("la", "Los Angeles", "CA", 3_900_000),
        ("sd", "San Diego", "CA", 1_400_000),
        ("dc", "Washington", "DC", 680_000),
        ("tok", "Tokyo", "TK", 14_000_000),
    ];
    for (id, name, state, population) in rows {
        cities
            .create(id, &json!({"name": name, "state": state, "population": population}))
            .await
            .unwrap();
    }
    (cities, calls)
}

fn names(records: &[firestore_collections::collections::Record<CountingValidator>]) -> Vec<&str> {
    records.iter().map(|record| record.name.as_str()).collect()
}

#[tokio::test]
async fn find_unique_returns_one_none_or_fails() {
    let (cities, _) = seeded().await;

    let dc = QuerySpec::new("inDC").where_field("state", FilterOperator::Equal, "DC");
    let record = cities.find_unique(&dc).await.unwrap().unwrap();
    assert_eq!(record.id.as_deref(), Some("dc"));

    let nowhere = QuerySpec::new("inNY").where_field("state", FilterOperator::Equal, "NY");
    assert!(cities.find_unique(&nowhere).await.unwrap().is_none());
    let err = cities.find_unique_or_throw(&nowhere).await.unwrap_err();
    assert_eq!(err.code, CollectionsErrorCode::DocumentNotFound);
    assert!(err.message().contains("inNY"));

    let california = QuerySpec::new("inCA").where_field("state", FilterOperator::Equal, "CA");
    let err = cities.find_unique_or_throw(&california).await.unwrap_err();
    assert_eq!(err.code, CollectionsErrorCode::MultipleResults);
    assert!(err.message().contains("inCA"));
}

#[tokio::test]
async fn find_first_validates_only_the_first_match() {
    let (cities, calls) = seeded().await;
    let largest = QuerySpec::new("largestInCA")
        .where_field("state", FilterOperator::Equal, "CA")
        .order_by("population", OrderDirection::Descending);

    calls.store(0, Ordering::SeqCst);
    let first = cities.find_first_or_throw(&largest).await.unwrap();
    assert_eq!(first.name, "Los Angeles");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    calls.store(0, Ordering::SeqCst);
    assert_eq!(cities.find_many(&largest).await.unwrap().len(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn ordering_limits_and_cursors() {
    let (cities, _) = seeded().await;
    let by_population = QuerySpec::new("byPopulation").order_by("population", None);

    let smallest_two = cities
        .find_many(&by_population.clone().limit(2))
        .await
        .unwrap();
    assert_eq!(names(&smallest_two), vec!["Washington", "San Francisco"]);

    let largest_two = cities
        .find_many(&by_population.clone().limit_to_last(2))
        .await
        .unwrap();
    assert_eq!(names(&largest_two), vec!["Los Angeles", "Tokyo"]);

    let page = cities
        .find_many(
            &by_population
                .clone()
                .start_after(vec![json!(860_000)])
                .end_at(vec![json!(3_900_000)]),
        )
        .await
        .unwrap();
    assert_eq!(names(&page), vec!["San Diego", "Los Angeles"]);

    let skipped = cities
        .find_many(&by_population.clone().offset(3))
        .await
        .unwrap();
    assert_eq!(names(&skipped), vec!["Los Angeles", "Tokyo"]);
}

#[tokio::test]
async fn filter_expressions_and_count() {
    let (cities, _) = seeded().await;
    let expression = Filter::or([
        Filter::field("state", FilterOperator::Equal, "DC").unwrap(),
        Filter::field("population", FilterOperator::GreaterThan, 10_000_000).unwrap(),
    ]);
    let spec = QuerySpec::new("capitalsOrHuge")
        .where_filter(expression)
        .order_by("name", None);
    let records = cities.find_many(&spec).await.unwrap();
    assert_eq!(names(&records), vec!["Tokyo", "Washington"]);
    assert_eq!(cities.count(&spec).await.unwrap(), 2);

    let in_states = QuerySpec::new("westOrCapital").where_field(
        "state",
        FilterOperator::In,
        json!(["CA", "DC"]),
    );
    assert_eq!(cities.count(&in_states).await.unwrap(), 4);
}

#[tokio::test]
async fn invalid_combinations_fail_when_executed() {
    let (cities, _) = seeded().await;
    let spec = QuerySpec::new("tooManyCursorValues")
        .order_by("population", None)
        .start_at(vec![json!(1), json!("x"), json!(true)]);
    assert!(cities.prepare(&spec).is_ok());
    let err = cities.find_many(&spec).await.unwrap_err();
    assert!(matches!(err.code, CollectionsErrorCode::Firestore(_)));
}

#[tokio::test]
async fn prepared_queries_run_on_the_client() {
    let (cities, _) = seeded().await;
    let spec = QuerySpec::new("inCA").where_field("state", FilterOperator::Equal, "CA");
    let prepared = cities.prepare(&spec).unwrap();
    let snapshot = cities
        .database()
        .get_docs_with_converter(&prepared)
        .await
        .unwrap();
    assert_eq!(snapshot.len(), 3);
    assert!(snapshot
        .documents()
        .iter()
        .all(|document| document.data().unwrap().unwrap().state == "CA"));
}
