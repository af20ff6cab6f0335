use serde_json::Value;

use crate::firestore::api::{
    ConvertedQuery, Filter, FilterOperator, FirestoreDataConverter, OrderBy, Query,
    QueryConstraint,
};
use crate::firestore::error::FirestoreResult;
use crate::firestore::model::FieldPath;
use crate::firestore::OrderDirection;

/// One `(field, operator, value)` filter.
pub type Condition = (String, FilterOperator, Value);

/// Filters of a query: either a list of conditions applied one by one, or a
/// single prebuilt filter expression.
#[derive(Clone, Debug, PartialEq)]
pub enum WhereClause {
    Conditions(Vec<Condition>),
    Expression(Filter),
}

/// A named, declarative query.
///
/// The name is only used in error messages and logs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuerySpec {
    pub name: String,
    pub where_clause: Option<WhereClause>,
    /// Ordering clauses; `None` uses the database default (ascending).
    pub order_by: Vec<(String, Option<OrderDirection>)>,
    pub limit: Option<u32>,
    pub limit_to_last: Option<u32>,
    pub offset: Option<u32>,
    pub start_at: Option<Vec<Value>>,
    pub start_after: Option<Vec<Value>>,
    pub end_at: Option<Vec<Value>>,
    pub end_before: Option<Vec<Value>>,
}

impl QuerySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a condition. Replaces a filter expression set earlier.
    pub fn where_field(
        mut self,
        field: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<Value>,
    ) -> Self {
        let condition = (field.into(), operator, value.into());
        match &mut self.where_clause {
            Some(WhereClause::Conditions(conditions)) => conditions.push(condition),
            _ => self.where_clause = Some(WhereClause::Conditions(vec![condition])),
        }
        self
    }

    /// Uses `filter` as the whole where clause.
    pub fn where_filter(mut self, filter: Filter) -> Self {
        self.where_clause = Some(WhereClause::Expression(filter));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: impl Into<Option<OrderDirection>>) -> Self {
        self.order_by.push((field.into(), direction.into()));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn limit_to_last(mut self, limit: u32) -> Self {
        self.limit_to_last = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn start_at(mut self, values: Vec<Value>) -> Self {
        self.start_at = Some(values);
        self
    }

    pub fn start_after(mut self, values: Vec<Value>) -> Self {
        self.start_after = Some(values);
        self
    }

    pub fn end_at(mut self, values: Vec<Value>) -> Self {
        self.end_at = Some(values);
        self
    }

    pub fn end_before(mut self, values: Vec<Value>) -> Self {
        self.end_before = Some(values);
        self
    }

    /// Builder calls this query stands for, in application order: filters,
    /// ordering, limit, limit-to-last, offset, then cursors.
    ///
    /// Field names are parsed by the client; combinations are not checked here.
    pub fn constraints(&self) -> FirestoreResult<Vec<QueryConstraint>> {
        let mut constraints = Vec::new();
        match &self.where_clause {
            Some(WhereClause::Conditions(conditions)) => {
                for (field, operator, value) in conditions {
                    let filter = Filter::field(field.as_str(), *operator, value.clone())?;
                    constraints.push(QueryConstraint::Where(filter));
                }
            }
            Some(WhereClause::Expression(filter)) => {
                constraints.push(QueryConstraint::Where(filter.clone()));
            }
            None => {}
        }
        for (field, direction) in &self.order_by {
            let field = FieldPath::from_dot_separated(field)?;
            constraints.push(QueryConstraint::OrderBy(OrderBy::new(
                field,
                direction.unwrap_or_default(),
            )));
        }
        constraints.extend(self.limit.map(QueryConstraint::Limit));
        constraints.extend(self.limit_to_last.map(QueryConstraint::LimitToLast));
        constraints.extend(self.offset.map(QueryConstraint::Offset));
        constraints.extend(self.start_at.clone().map(QueryConstraint::StartAt));
        constraints.extend(self.start_after.clone().map(QueryConstraint::StartAfter));
        constraints.extend(self.end_at.clone().map(QueryConstraint::EndAt));
        constraints.extend(self.end_before.clone().map(QueryConstraint::EndBefore));
        Ok(constraints)
    }

    pub fn apply(&self, query: &Query) -> FirestoreResult<Query> {
        self.constraints()?
            .into_iter()
            .try_fold(query.clone(), |query, constraint| query.apply(constraint))
    }

    pub fn apply_converted<C>(&self, query: &ConvertedQuery<C>) -> FirestoreResult<ConvertedQuery<C>>
    where
        C: FirestoreDataConverter,
    {
        self.constraints()?
            .into_iter()
            .try_fold(query.clone(), |query, constraint| query.apply(constraint))
    }
}
