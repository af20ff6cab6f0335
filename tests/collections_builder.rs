#![cfg(not(target_arch = "wasm32"))]

use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use firestore_collections::collections::{
    collections_builder, document_path, CollectionTree, CollectionsError, CollectionsErrorCode,
    CollectionsOptions, MetadataOptions, Schema, SchemaNode, SerdeValidator,
};
use firestore_collections::firestore::api::{
    DocumentSnapshot, Precondition, QueryDefinition, SetOptions, WriteResult,
};
use firestore_collections::firestore::error::{unavailable, FirestoreErrorCode, FirestoreResult};
use firestore_collections::firestore::model::{DocumentKey, FieldPath};
use firestore_collections::firestore::remote::Datastore;
use firestore_collections::firestore::{DocumentData, Firestore};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
struct User {
    name: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
struct Post {
    title: String,
    #[serde(default)]
    likes: u32,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
struct Settings {
    theme: String,
}

type Users = SerdeValidator<User>;
type Posts = SerdeValidator<Post>;
type AppSettings = SerdeValidator<Settings>;

fn schema() -> Schema {
    Schema::new()
        .collection(
            "users",
            SchemaNode::new(Users::new()).sub_collection("posts", SchemaNode::new(Posts::new())),
        )
        .collection(
            "settings",
            SchemaNode::new(AppSettings::new()).single_document_key("global"),
        )
}

fn build(firestore: &Firestore) -> CollectionTree {
    collections_builder(&schema(), CollectionsOptions::with_database(firestore.clone()))
        .expect("valid schema")
}

#[tokio::test]
async fn create_read_delete_scenario() {
    let firestore = Firestore::in_memory();
    let tree = build(&firestore);
    let users = tree.collection::<Users>("users").unwrap();

    users
        .create("u1", &User { name: "Ann".into() })
        .await
        .unwrap();
    let record = users.find_by_id_or_throw("u1").await.unwrap();
    assert_eq!(
        serde_json::to_value(&record).unwrap(),
        json!({"_id": "u1", "name": "Ann"})
    );

    users.delete("u1", None).await.unwrap();
    assert!(users.find_by_id("u1").await.unwrap().is_none());
    let err = users.find_by_id_or_throw("u1").await.unwrap_err();
    assert_eq!(err.code, CollectionsErrorCode::DocumentNotFound);
}

#[tokio::test]
async fn round_trip_adds_only_requested_metadata() {
    let firestore = Firestore::in_memory();
    let tree = build(&firestore);
    let users = tree.collection::<Users>("users").unwrap();
    let document = json!({"name": "Ann"});
    users.set("u1", &document, SetOptions::default()).await.unwrap();

    let plain = users.find_by_id_or_throw("u1").await.unwrap();
    assert_eq!(
        Value::Object(plain.to_document_data().unwrap()),
        json!({"_id": "u1", "name": "Ann"})
    );

    let timed = users
        .with_metadata(MetadataOptions::all())
        .find_by_id_or_throw("u1")
        .await
        .unwrap();
    let fields = timed.to_document_data().unwrap();
    let mut keys: Vec<&str> = fields.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec!["_createTime", "_id", "_readTime", "_updateTime", "name"]
    );

    let anonymous = users
        .read()
        .with_metadata(MetadataOptions::default().without_id())
        .doc("u1")
        .unwrap();
    let snapshot = firestore.get_doc_with_converter(&anonymous).await.unwrap();
    let record = snapshot.data().unwrap().unwrap();
    assert_eq!(serde_json::to_value(&record).unwrap(), document);
}

#[tokio::test]
async fn validation_failures_surface() {
    let firestore = Firestore::in_memory();
    let tree = build(&firestore);
    let users = tree.collection::<Users>("users").unwrap();
    users
        .set("bad", &json!({"name": 42}), SetOptions::default())
        .await
        .unwrap();

    let err = users.find_by_id_or_throw("bad").await.unwrap_err();
    assert_eq!(err.code, CollectionsErrorCode::Validation);
    assert!(err
        .source()
        .and_then(|source| source.downcast_ref::<serde_json::Error>())
        .is_some());
    assert!(users.find_by_id("bad").await.is_err());
}

#[tokio::test]
async fn validation_handler_substitutes_the_error() {
    let firestore = Firestore::in_memory();
    let options = CollectionsOptions::with_database(firestore.clone()).with_validation_error_handler(
        |failure| {
            CollectionsError::new(
                CollectionsErrorCode::InvalidArgument,
                format!("corrupt document {}", failure.document_path()),
            )
        },
    );
    let tree = collections_builder(&schema(), options).unwrap();
    let users = tree.collection::<Users>("users").unwrap();
    users
        .set("bad", &json!({"nickname": "x"}), SetOptions::default())
        .await
        .unwrap();

    let err = users.find_by_id_or_throw("bad").await.unwrap_err();
    assert_eq!(err.code, CollectionsErrorCode::InvalidArgument);
    assert_eq!(err.message(), "corrupt document users/bad");
}

#[tokio::test]
async fn sub_collections_resolve_under_parent_documents() {
    let firestore = Firestore::in_memory();
    let tree = build(&firestore);
    let users = tree.node("users").unwrap();
    let u1 = users.doc("u1").unwrap();
    let posts = u1.collection::<Posts>("posts").unwrap();

    assert_eq!(posts.resolved_path(), "users/u1/posts");
    assert_eq!(posts.document_path("p1"), document_path(("users", "u1", "posts"), "p1"));
    assert_eq!(document_path("users", "u1"), "users/u1");

    posts
        .create("p1", &Post { title: "Hello".into(), likes: 0 })
        .await
        .unwrap();
    let stored = firestore
        .get_doc(&firestore.doc("users/u1/posts/p1").unwrap())
        .await
        .unwrap();
    assert_eq!(stored.data().unwrap().get("title"), Some(&json!("Hello")));

    let other = users.doc("u2").unwrap();
    let other_posts = other.collection::<Posts>("posts").unwrap();
    assert!(other_posts.find_by_id("p1").await.unwrap().is_none());
}

#[tokio::test]
async fn single_document_matches_keyed_calls() {
    let firestore = Firestore::in_memory();
    let tree = build(&firestore);
    let settings = tree.single_document::<AppSettings>("settings").unwrap();
    let keyed = tree.collection::<AppSettings>("settings").unwrap();

    assert_eq!(settings.document_path(), keyed.document_path("global"));
    assert_eq!(
        settings.read_doc().unwrap().path(),
        keyed.read().doc("global").unwrap().path()
    );

    settings
        .create(&Settings { theme: "dark".into() })
        .await
        .unwrap();
    assert_eq!(keyed.find_by_id_or_throw("global").await.unwrap().theme, "dark");

    keyed
        .update("global", &json!({"theme": "light"}), None)
        .await
        .unwrap();
    assert_eq!(settings.find_or_throw().await.unwrap().theme, "light");

    settings.delete(None).await.unwrap();
    assert!(keyed.find_by_id("global").await.unwrap().is_none());
}

#[tokio::test]
async fn update_preconditions_pass_through() {
    let firestore = Firestore::in_memory();
    let tree = build(&firestore);
    let users = tree.collection::<Users>("users").unwrap();
    let written = users
        .create("u1", &User { name: "Ann".into() })
        .await
        .unwrap();

    users
        .update(
            "u1",
            &json!({"name": "Bea"}),
            Some(Precondition::UpdateTime(written.write_time)),
        )
        .await
        .unwrap();
    let err = users
        .update(
            "u1",
            &json!({"name": "Cy"}),
            Some(Precondition::UpdateTime(written.write_time)),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err.code,
        CollectionsErrorCode::Firestore(FirestoreErrorCode::FailedPrecondition)
    );
    assert_eq!(users.find_by_id_or_throw("u1").await.unwrap().name, "Bea");
}

struct OfflineDatastore;

#[async_trait]
impl Datastore for OfflineDatastore {
    async fn get_document(&self, _key: &DocumentKey) -> FirestoreResult<DocumentSnapshot> {
        Err(unavailable("backend offline"))
    }

    async fn create_document(&self, _key: &DocumentKey, _data: DocumentData) -> FirestoreResult<WriteResult> {
        Err(unavailable("backend offline"))
    }

    async fn set_document(
        &self,
        _key: &DocumentKey,
        _data: DocumentData,
        _mask: Option<Vec<FieldPath>>,
    ) -> FirestoreResult<WriteResult> {
        Err(unavailable("backend offline"))
    }

    async fn update_document(
        &self,
        _key: &DocumentKey,
        _data: DocumentData,
        _field_paths: Vec<FieldPath>,
        _precondition: Precondition,
    ) -> FirestoreResult<WriteResult> {
        Err(unavailable("backend offline"))
    }

    async fn delete_document(
        &self,
        _key: &DocumentKey,
        _precondition: Option<Precondition>,
    ) -> FirestoreResult<WriteResult> {
        Err(unavailable("backend offline"))
    }

    async fn run_query(&self, _query: &QueryDefinition) -> FirestoreResult<Vec<DocumentSnapshot>> {
        Err(unavailable("backend offline"))
    }
}

#[tokio::test]
async fn client_errors_pass_through_unchanged() {
    let firestore = Firestore::new(Arc::new(OfflineDatastore));
    let tree = build(&firestore);
    let users = tree.collection::<Users>("users").unwrap();
    let expected = CollectionsErrorCode::Firestore(FirestoreErrorCode::Unavailable);

    let err = users.find_by_id("u1").await.unwrap_err();
    assert_eq!(err.code, expected);
    assert_eq!(err.firestore_error().unwrap().message(), "backend offline");

    let err = users
        .create("u1", &User { name: "Ann".into() })
        .await
        .unwrap_err();
    assert_eq!(err.code, expected);

    let err = users.delete("u1", None).await.unwrap_err();
    assert_eq!(err.code, expected);

    let spec = firestore_collections::QuerySpec::new("everyone");
    assert_eq!(users.find_many(&spec).await.unwrap_err().code, expected);
    assert_eq!(users.count(&spec).await.unwrap_err().code, expected);
}
