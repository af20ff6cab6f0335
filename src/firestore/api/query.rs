use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde_json::Value;

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{DocumentKey, FieldPath, IntoFieldPath, ResourcePath, Timestamp};

use super::snapshot::{DocumentSnapshot, TypedDocumentSnapshot};
use super::{Firestore, FirestoreDataConverter};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    ArrayContains,
    ArrayContainsAny,
    In,
    NotIn,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equal => "==",
            FilterOperator::NotEqual => "!=",
            FilterOperator::LessThan => "<",
            FilterOperator::LessThanOrEqual => "<=",
            FilterOperator::GreaterThan => ">",
            FilterOperator::GreaterThanOrEqual => ">=",
            FilterOperator::ArrayContains => "array-contains",
            FilterOperator::ArrayContainsAny => "array-contains-any",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "not-in",
        }
    }

    fn requires_array_operand(&self) -> bool {
        matches!(
            self,
            FilterOperator::ArrayContainsAny | FilterOperator::In | FilterOperator::NotIn
        )
    }
}

impl Display for FilterOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldFilter {
    field: FieldPath,
    operator: FilterOperator,
    value: Value,
}

impl FieldFilter {
    pub fn new<P>(field: P, operator: FilterOperator, value: impl Into<Value>) -> FirestoreResult<Self>
    where
        P: IntoFieldPath,
    {
        let field = field.into_field_path()?;
        let value = value.into();
        if operator.requires_array_operand() && !value.is_array() {
            return Err(invalid_argument(format!(
                "Filter '{field} {operator}' requires an array value"
            )));
        }
        Ok(Self {
            field,
            operator,
            value,
        })
    }

    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// A single field filter or a composite of filters.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Field(FieldFilter),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn field<P>(field: P, operator: FilterOperator, value: impl Into<Value>) -> FirestoreResult<Self>
    where
        P: IntoFieldPath,
    {
        FieldFilter::new(field, operator, value).map(Filter::Field)
    }

    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }
}

impl From<FieldFilter> for Filter {
    fn from(filter: FieldFilter) -> Self {
        Filter::Field(filter)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OrderDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    field: FieldPath,
    direction: OrderDirection,
}

impl OrderBy {
    pub fn new(field: FieldPath, direction: OrderDirection) -> Self {
        Self { field, direction }
    }

    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn direction(&self) -> OrderDirection {
        self.direction
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LimitType {
    #[default]
    First,
    Last,
}

/// Cursor position expressed as values for the query's `order_by` clauses.
#[derive(Clone, Debug, PartialEq)]
pub struct Bound {
    values: Vec<Value>,
    inclusive: bool,
}

impl Bound {
    pub fn new(values: Vec<Value>, inclusive: bool) -> Self {
        Self { values, inclusive }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn inclusive(&self) -> bool {
        self.inclusive
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryTarget {
    Collection(ResourcePath),
    CollectionGroup(String),
}

/// Backend-facing description of a query.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryDefinition {
    pub(crate) target: QueryTarget,
    pub(crate) filters: Vec<Filter>,
    pub(crate) order_by: Vec<OrderBy>,
    pub(crate) limit: Option<u32>,
    pub(crate) limit_type: LimitType,
    pub(crate) offset: Option<u32>,
    pub(crate) start_at: Option<Bound>,
    pub(crate) end_at: Option<Bound>,
}

impl QueryDefinition {
    fn new(target: QueryTarget) -> Self {
        Self {
            target,
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            limit_type: LimitType::First,
            offset: None,
            start_at: None,
            end_at: None,
        }
    }

    pub fn target(&self) -> &QueryTarget {
        &self.target
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn order_by(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn limit_type(&self) -> LimitType {
        self.limit_type
    }

    pub fn offset(&self) -> Option<u32> {
        self.offset
    }

    pub fn start_at(&self) -> Option<&Bound> {
        self.start_at.as_ref()
    }

    pub fn end_at(&self) -> Option<&Bound> {
        self.end_at.as_ref()
    }

    /// Whether `key` lives in the collection (or collection group) this query targets.
    pub fn matches_target(&self, key: &DocumentKey) -> bool {
        match &self.target {
            QueryTarget::Collection(path) => key.collection_path() == *path,
            QueryTarget::CollectionGroup(id) => key.collection_id() == id,
        }
    }
}

/// Declarative form of a single query builder call.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryConstraint {
    Where(Filter),
    OrderBy(OrderBy),
    Limit(u32),
    LimitToLast(u32),
    Offset(u32),
    StartAt(Vec<Value>),
    StartAfter(Vec<Value>),
    EndAt(Vec<Value>),
    EndBefore(Vec<Value>),
}

/// An immutable query over a collection or a collection group.
///
/// Every builder method returns a new query, leaving the receiver untouched.
#[derive(Clone, Debug)]
pub struct Query {
    firestore: Firestore,
    definition: QueryDefinition,
}

impl Query {
    /// Caller guarantees `collection_path` has an odd number of segments.
    pub(crate) fn for_collection(firestore: Firestore, collection_path: ResourcePath) -> Self {
        Self {
            firestore,
            definition: QueryDefinition::new(QueryTarget::Collection(collection_path)),
        }
    }

    pub(crate) fn new_collection_group(firestore: Firestore, collection_id: String) -> FirestoreResult<Self> {
        if collection_id.is_empty() || collection_id.contains('/') {
            return Err(invalid_argument(format!(
                "Collection group id '{collection_id}' must be a non-empty id without '/'"
            )));
        }
        Ok(Self {
            firestore,
            definition: QueryDefinition::new(QueryTarget::CollectionGroup(collection_id)),
        })
    }

    /// Returns the Firestore instance that created this query.
    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    pub fn definition(&self) -> &QueryDefinition {
        &self.definition
    }

    pub fn where_field<P>(&self, field: P, operator: FilterOperator, value: impl Into<Value>) -> FirestoreResult<Self>
    where
        P: IntoFieldPath,
    {
        let filter = Filter::field(field, operator, value)?;
        Ok(self.where_filter(filter))
    }

    pub fn where_filter(&self, filter: Filter) -> Self {
        let mut next = self.clone();
        next.definition.filters.push(filter);
        next
    }

    pub fn order_by<P>(&self, field: P, direction: OrderDirection) -> FirestoreResult<Self>
    where
        P: IntoFieldPath,
    {
        let field = field.into_field_path()?;
        let mut next = self.clone();
        next.definition.order_by.push(OrderBy::new(field, direction));
        Ok(next)
    }

    pub fn limit(&self, limit: u32) -> FirestoreResult<Self> {
        self.with_limit(limit, LimitType::First)
    }

    pub fn limit_to_last(&self, limit: u32) -> FirestoreResult<Self> {
        self.with_limit(limit, LimitType::Last)
    }

    pub fn offset(&self, offset: u32) -> Self {
        let mut next = self.clone();
        next.definition.offset = Some(offset);
        next
    }

    pub fn start_at(&self, values: Vec<Value>) -> Self {
        self.with_start(Bound::new(values, true))
    }

    pub fn start_after(&self, values: Vec<Value>) -> Self {
        self.with_start(Bound::new(values, false))
    }

    pub fn end_at(&self, values: Vec<Value>) -> Self {
        self.with_end(Bound::new(values, true))
    }

    pub fn end_before(&self, values: Vec<Value>) -> Self {
        self.with_end(Bound::new(values, false))
    }

    /// Applies one declarative constraint.
    pub fn apply(&self, constraint: QueryConstraint) -> FirestoreResult<Self> {
        match constraint {
            QueryConstraint::Where(filter) => Ok(self.where_filter(filter)),
            QueryConstraint::OrderBy(order) => {
                let mut next = self.clone();
                next.definition.order_by.push(order);
                Ok(next)
            }
            QueryConstraint::Limit(limit) => self.limit(limit),
            QueryConstraint::LimitToLast(limit) => self.limit_to_last(limit),
            QueryConstraint::Offset(offset) => Ok(self.offset(offset)),
            QueryConstraint::StartAt(values) => Ok(self.start_at(values)),
            QueryConstraint::StartAfter(values) => Ok(self.start_after(values)),
            QueryConstraint::EndAt(values) => Ok(self.end_at(values)),
            QueryConstraint::EndBefore(values) => Ok(self.end_before(values)),
        }
    }

    /// Attaches a converter to this query.
    pub fn with_converter<C>(&self, converter: C) -> ConvertedQuery<C>
    where
        C: FirestoreDataConverter,
    {
        self.with_shared_converter(Arc::new(converter))
    }

    /// Attaches a converter that is already shared with other references.
    pub fn with_shared_converter<C>(&self, converter: Arc<C>) -> ConvertedQuery<C>
    where
        C: FirestoreDataConverter,
    {
        ConvertedQuery::new(self.clone(), converter)
    }

    fn with_limit(&self, limit: u32, limit_type: LimitType) -> FirestoreResult<Self> {
        if limit == 0 {
            return Err(invalid_argument("Query limit must be greater than zero"));
        }
        let mut next = self.clone();
        next.definition.limit = Some(limit);
        next.definition.limit_type = limit_type;
        Ok(next)
    }

    fn with_start(&self, bound: Bound) -> Self {
        let mut next = self.clone();
        next.definition.start_at = Some(bound);
        next
    }

    fn with_end(&self, bound: Bound) -> Self {
        let mut next = self.clone();
        next.definition.end_at = Some(bound);
        next
    }
}

/// A query with an attached data converter for typed access.
pub struct ConvertedQuery<C>
where
    C: FirestoreDataConverter,
{
    inner: Query,
    converter: Arc<C>,
}

impl<C> Clone for ConvertedQuery<C>
where
    C: FirestoreDataConverter,
{
    fn clone(&self) -> Self {
        Self::new(self.inner.clone(), Arc::clone(&self.converter))
    }
}

impl<C> ConvertedQuery<C>
where
    C: FirestoreDataConverter,
{
    pub(crate) fn new(inner: Query, converter: Arc<C>) -> Self {
        Self { inner, converter }
    }

    /// Returns the untyped query backing this converted query.
    pub fn raw(&self) -> &Query {
        &self.inner
    }

    pub fn converter(&self) -> Arc<C> {
        Arc::clone(&self.converter)
    }

    /// Applies one declarative constraint, keeping the converter.
    pub fn apply(&self, constraint: QueryConstraint) -> FirestoreResult<Self> {
        Ok(Self::new(self.inner.apply(constraint)?, Arc::clone(&self.converter)))
    }
}

/// A snapshot containing the results of executing a query.
#[derive(Clone, Debug)]
pub struct QuerySnapshot {
    documents: Vec<DocumentSnapshot>,
    read_time: Timestamp,
}

impl QuerySnapshot {
    pub fn new(documents: Vec<DocumentSnapshot>, read_time: Timestamp) -> Self {
        Self {
            documents,
            read_time,
        }
    }

    /// Returns all document snapshots returned by the query.
    pub fn documents(&self) -> &[DocumentSnapshot] {
        &self.documents
    }

    pub fn read_time(&self) -> Timestamp {
        self.read_time
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Consumes the snapshot, returning the underlying document snapshots.
    pub fn into_documents(self) -> Vec<DocumentSnapshot> {
        self.documents
    }
}

impl IntoIterator for QuerySnapshot {
    type Item = DocumentSnapshot;
    type IntoIter = std::vec::IntoIter<DocumentSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}

/// Typed wrapper around a `QuerySnapshot`. Documents are decoded only when
/// their `data()` is requested.
pub struct TypedQuerySnapshot<C>
where
    C: FirestoreDataConverter,
{
    base: QuerySnapshot,
    converter: Arc<C>,
}

impl<C> Clone for TypedQuerySnapshot<C>
where
    C: FirestoreDataConverter,
{
    fn clone(&self) -> Self {
        Self::new(self.base.clone(), Arc::clone(&self.converter))
    }
}

impl<C> TypedQuerySnapshot<C>
where
    C: FirestoreDataConverter,
{
    pub(crate) fn new(base: QuerySnapshot, converter: Arc<C>) -> Self {
        Self { base, converter }
    }

    /// Returns the underlying untyped snapshot.
    pub fn raw(&self) -> &QuerySnapshot {
        &self.base
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    /// Returns typed document snapshots for every document in the query result.
    pub fn documents(&self) -> Vec<TypedDocumentSnapshot<C>> {
        self.base
            .documents
            .iter()
            .cloned()
            .map(|snapshot| snapshot.into_typed(Arc::clone(&self.converter)))
            .collect()
    }

    /// Decodes every document, failing on the first conversion error.
    pub fn data(&self) -> Result<Vec<C::Model>, C::Error> {
        self.base
            .documents
            .iter()
            .map(|snapshot| self.converter.from_firestore(snapshot))
            .collect()
    }
}

impl<C> IntoIterator for TypedQuerySnapshot<C>
where
    C: FirestoreDataConverter,
{
    type Item = TypedDocumentSnapshot<C>;
    type IntoIter = std::vec::IntoIter<TypedDocumentSnapshot<C>>;

    fn into_iter(self) -> Self::IntoIter {
        let converter = self.converter;
        self.base
            .into_documents()
            .into_iter()
            .map(|snapshot| snapshot.into_typed(Arc::clone(&converter)))
            .collect::<Vec<_>>()
            .into_iter()
    }
}
