use std::any::{type_name, Any};
use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, LazyLock};

use crate::firestore::api::operations::validate_document_id;
use crate::logger::Logger;

use super::collection::Collection;
use super::error::{invalid_argument, invalid_schema, CollectionsError, CollectionsResult};
use super::options::CollectionsOptions;
use super::path::CollectionPath;
use super::schema::{is_reserved_schema_key, ErasedSchema, Schema, SchemaNode, Validator};
use super::single::SingleDocumentCollection;

static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@firestore-collections/builder"));

type SchemaEntries = Vec<(String, Arc<dyn ErasedSchema>)>;

/// Builds the collection tree described by `schema`.
///
/// # Errors
/// Returns `collections/invalid-schema` when a collection name is empty,
/// contains `/`, is used twice at one level, or a sub-collection uses a
/// reserved schema key, and when a single-document key is not a valid
/// document id.
pub fn collections_builder(schema: &Schema, options: CollectionsOptions) -> CollectionsResult<CollectionTree> {
    check_entries(&schema.collections, None)?;
    let tree = build_level(&schema.collections, None, &options);
    LOGGER.debug(format!(
        "Built collection tree with {} root collections",
        tree.len()
    ));
    Ok(tree)
}

fn check_entries(entries: &[(String, Arc<dyn ErasedSchema>)], parent: Option<&str>) -> CollectionsResult<()> {
    let mut seen = HashSet::new();
    for (name, node) in entries {
        let location = match parent {
            Some(parent) => format!("{parent}/{{id}}/{name}"),
            None => name.clone(),
        };
        if name.is_empty() || name.contains('/') {
            return Err(invalid_schema(format!(
                "Collection name '{location}' must be non-empty and must not contain '/'"
            )));
        }
        if parent.is_some() && is_reserved_schema_key(name) {
            return Err(invalid_schema(format!(
                "Sub-collection '{location}' uses the reserved schema key '{name}'"
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(invalid_schema(format!(
                "Collection '{location}' is declared more than once"
            )));
        }
        if let Some(key) = node.single_document_key() {
            validate_document_id(key).map_err(|err| {
                invalid_schema(format!(
                    "Single document key of '{location}' is invalid: {}",
                    err.message()
                ))
            })?;
        }
        check_entries(node.sub_collections(), Some(&location))?;
    }
    Ok(())
}

fn build_level(
    entries: &[(String, Arc<dyn ErasedSchema>)],
    parent: Option<(&CollectionPath, &str)>,
    options: &CollectionsOptions,
) -> CollectionTree {
    let nodes = entries
        .iter()
        .map(|(name, schema)| {
            let path = match parent {
                Some((parent, document_id)) => parent.child(document_id, name.as_str()),
                None => CollectionPath::root(name.as_str()),
            };
            (name.clone(), schema.build_node(path, options))
        })
        .collect();
    CollectionTree { nodes }
}

impl<V> ErasedSchema for SchemaNode<V>
where
    V: Validator,
{
    fn single_document_key(&self) -> Option<&str> {
        self.single_document_key.as_deref()
    }

    fn sub_collections(&self) -> &[(String, Arc<dyn ErasedSchema>)] {
        &self.sub_collections
    }

    fn build_node(&self, path: CollectionPath, options: &CollectionsOptions) -> CollectionNode {
        let collection = Collection::new(path.clone(), self, options.clone());
        let single = self.single_document_key.as_ref().map(|key| {
            Arc::new(SingleDocumentCollection::new(collection.clone(), key.clone()))
                as Arc<dyn Any + Send + Sync>
        });
        let handle = CollectionHandle {
            path,
            validator: type_name::<V>(),
            collection: Arc::new(collection),
            single,
        };
        if self.sub_collections.is_empty() {
            CollectionNode::Leaf(handle)
        } else {
            CollectionNode::WithSubCollections {
                handle,
                sub_collections: SubCollections {
                    schemas: self.sub_collections.clone(),
                    options: options.clone(),
                },
            }
        }
    }
}

/// Collections of one level of the tree, by name, in declaration order.
#[derive(Clone, Debug)]
pub struct CollectionTree {
    nodes: Vec<(String, CollectionNode)>,
}

impl CollectionTree {
    pub fn get(&self, name: &str) -> Option<&CollectionNode> {
        self.nodes
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, node)| node)
    }

    /// Like [`CollectionTree::get`], failing with `invalid-argument` for
    /// names the schema does not declare.
    pub fn node(&self, name: &str) -> CollectionsResult<&CollectionNode> {
        self.get(name).ok_or_else(|| {
            invalid_argument(format!("Collection '{name}' is not declared in the schema"))
        })
    }

    pub fn collection<V>(&self, name: &str) -> CollectionsResult<&Collection<V>>
    where
        V: Validator,
    {
        self.node(name)?.collection::<V>()
    }

    pub fn single_document<V>(&self, name: &str) -> CollectionsResult<&SingleDocumentCollection<V>>
    where
        V: Validator,
    {
        self.node(name)?.single_document::<V>()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A collection in the tree. Nodes whose schema declares sub-collections
/// can also descend into them through [`CollectionNode::doc`].
#[derive(Clone, Debug)]
pub enum CollectionNode {
    Leaf(CollectionHandle),
    WithSubCollections {
        handle: CollectionHandle,
        sub_collections: SubCollections,
    },
}

impl CollectionNode {
    pub fn handle(&self) -> &CollectionHandle {
        match self {
            CollectionNode::Leaf(handle) => handle,
            CollectionNode::WithSubCollections { handle, .. } => handle,
        }
    }

    pub fn path(&self) -> &CollectionPath {
        &self.handle().path
    }

    pub fn has_sub_collections(&self) -> bool {
        matches!(self, CollectionNode::WithSubCollections { .. })
    }

    pub fn collection<V>(&self) -> CollectionsResult<&Collection<V>>
    where
        V: Validator,
    {
        self.handle().collection::<V>()
    }

    pub fn single_document<V>(&self) -> CollectionsResult<&SingleDocumentCollection<V>>
    where
        V: Validator,
    {
        self.handle().single_document::<V>()
    }

    /// Sub-collections of document `document_id` of this collection.
    pub fn doc(&self, document_id: &str) -> CollectionsResult<CollectionTree> {
        match self {
            CollectionNode::Leaf(handle) => Err(invalid_argument(format!(
                "Collection '{}' has no sub-collections",
                handle.path
            ))),
            CollectionNode::WithSubCollections {
                handle,
                sub_collections,
            } => {
                validate_document_id(document_id)?;
                Ok(build_level(
                    &sub_collections.schemas,
                    Some((&handle.path, document_id)),
                    &sub_collections.options,
                ))
            }
        }
    }
}

/// Type-erased collection built for one schema node.
#[derive(Clone)]
pub struct CollectionHandle {
    path: CollectionPath,
    validator: &'static str,
    collection: Arc<dyn Any + Send + Sync>,
    single: Option<Arc<dyn Any + Send + Sync>>,
}

impl CollectionHandle {
    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Type name of the validator the schema declared.
    pub fn validator_type(&self) -> &'static str {
        self.validator
    }

    pub fn is_single_document(&self) -> bool {
        self.single.is_some()
    }

    pub fn collection<V>(&self) -> CollectionsResult<&Collection<V>>
    where
        V: Validator,
    {
        self.collection
            .downcast_ref::<Collection<V>>()
            .ok_or_else(|| self.type_mismatch::<V>())
    }

    pub fn single_document<V>(&self) -> CollectionsResult<&SingleDocumentCollection<V>>
    where
        V: Validator,
    {
        let single = self.single.as_ref().ok_or_else(|| {
            invalid_argument(format!(
                "Collection '{}' has no single document key",
                self.path
            ))
        })?;
        single
            .downcast_ref::<SingleDocumentCollection<V>>()
            .ok_or_else(|| self.type_mismatch::<V>())
    }

    fn type_mismatch<V>(&self) -> CollectionsError {
        invalid_argument(format!(
            "Collection '{}' is validated by {}, not {}",
            self.path,
            self.validator,
            type_name::<V>()
        ))
    }
}

impl Debug for CollectionHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionHandle")
            .field("path", &self.path.resolve())
            .field("validator", &self.validator)
            .field("single_document", &self.single.is_some())
            .finish()
    }
}

/// Schemas of the sub-collections below each document of a collection.
#[derive(Clone)]
pub struct SubCollections {
    schemas: SchemaEntries,
    options: CollectionsOptions,
}

impl SubCollections {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.iter().map(|(name, _)| name.as_str())
    }
}

impl Debug for SubCollections {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
