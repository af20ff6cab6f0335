use std::fmt::{Display, Formatter};

/// Location of a collection: a root collection name, or a sub-collection
/// under a document of a parent collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CollectionPath {
    Root(String),
    Sub {
        /// Resolved path of the parent collection.
        parent: String,
        document_id: String,
        name: String,
    },
}

impl CollectionPath {
    pub fn root(name: impl Into<String>) -> Self {
        CollectionPath::Root(name.into())
    }

    pub fn sub(
        parent: impl Into<String>,
        document_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        CollectionPath::Sub {
            parent: parent.into(),
            document_id: document_id.into(),
            name: name.into(),
        }
    }

    /// Path of the sub-collection `name` under document `document_id` of this collection.
    pub fn child(&self, document_id: impl Into<String>, name: impl Into<String>) -> Self {
        CollectionPath::sub(self.resolve(), document_id, name)
    }

    /// Slash-joined path, e.g. `users/u1/posts`.
    pub fn resolve(&self) -> String {
        match self {
            CollectionPath::Root(name) => name.clone(),
            CollectionPath::Sub {
                parent,
                document_id,
                name,
            } => format!("{parent}/{document_id}/{name}"),
        }
    }

    /// Name of the collection itself (the last segment).
    pub fn name(&self) -> &str {
        match self {
            CollectionPath::Root(name) => name,
            CollectionPath::Sub { name, .. } => name,
        }
    }
}

impl Display for CollectionPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.resolve())
    }
}

impl From<&str> for CollectionPath {
    fn from(name: &str) -> Self {
        CollectionPath::root(name)
    }
}

impl From<String> for CollectionPath {
    fn from(name: String) -> Self {
        CollectionPath::Root(name)
    }
}

impl<A, B, C> From<(A, B, C)> for CollectionPath
where
    A: Into<String>,
    B: Into<String>,
    C: Into<String>,
{
    fn from((parent, document_id, name): (A, B, C)) -> Self {
        CollectionPath::sub(parent, document_id, name)
    }
}

/// Path of document `document_id` inside `collection`.
pub fn document_path(collection: impl Into<CollectionPath>, document_id: &str) -> String {
    format!("{}/{}", collection.into().resolve(), document_id)
}
