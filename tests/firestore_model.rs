use firestore_collections::collections::CollectionPath;
use firestore_collections::firestore::model::{DocumentKey, FieldPath, ResourcePath};

fn resource_path(path: &str) -> ResourcePath {
    ResourcePath::from_string(path).expect("valid path")
}

#[test]
fn indexes_into_segments() {
    let path = ResourcePath::from_segments(["rooms", "Eros", "messages"]);
    assert_eq!(path.get(0), Some("rooms"));
    assert_eq!(path.get(2), Some("messages"));
    assert_eq!(path.get(3), None);
}

#[test]
fn rejects_empty_segments() {
    assert!(ResourcePath::from_string("rooms//messages").is_err());
    assert!(ResourcePath::from_string("").unwrap().is_empty());
}

#[test]
fn pops_and_extends() {
    let base = resource_path("rooms");
    assert_eq!(base.child(["eros"]).child(["1"]), resource_path("rooms/eros/1"));
    assert_eq!(base, resource_path("rooms"));

    let path = resource_path("rooms/Eros/messages");
    assert_eq!(path.last_segment(), Some("messages"));
    assert_eq!(path.without_last().last_segment(), Some("Eros"));
    assert!(path.without_last().without_last().without_last().is_empty());
}

#[test]
fn orders_segment_by_segment() {
    assert!(resource_path("a") < resource_path("b"));
    assert!(resource_path("a") < resource_path("a/b"));
    assert!(ResourcePath::root() < resource_path("a"));
    assert_eq!(resource_path("a/b/c"), ResourcePath::from_segments(["a", "b", "c"]));
}

#[test]
fn determines_prefix() {
    let empty = ResourcePath::root();
    let a = resource_path("a");
    let ab = resource_path("a/b");
    let ba = resource_path("b/a");

    assert!(empty.is_prefix_of(&a));
    assert!(a.is_prefix_of(&ab));
    assert!(ab.is_prefix_of(&ab));
    assert!(!ab.is_prefix_of(&a));
    assert!(!a.is_prefix_of(&ba));
}

#[test]
fn document_keys_need_even_paths() {
    let key = DocumentKey::from_string("users/u1/posts/p1").unwrap();
    assert_eq!(key.id(), "p1");
    assert_eq!(key.collection_id(), "posts");
    assert_eq!(key.collection_path(), resource_path("users/u1/posts"));
    assert!(DocumentKey::from_string("users/u1/posts").is_err());
}

#[test]
fn field_paths_split_on_dots() {
    let path = FieldPath::from_dot_separated("address.city").unwrap();
    assert_eq!(path.segments(), ["address", "city"]);
    assert!(FieldPath::from_dot_separated("address..city").is_err());
    assert!(FieldPath::document_id().is_document_id());
}

#[test]
fn collection_paths_resolve_to_odd_lengths() {
    let comments = CollectionPath::root("users")
        .child("u1", "posts")
        .child("p1", "comments");
    let resolved = comments.resolve();
    assert_eq!(resolved, "users/u1/posts/p1/comments");
    assert_eq!(resource_path(&resolved).len() % 2, 1);
    assert_eq!(
        CollectionPath::from(("users", "u1", "posts")).to_string(),
        "users/u1/posts"
    );
}
