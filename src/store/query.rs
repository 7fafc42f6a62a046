use std::cmp::Ordering;

use super::path::DocumentPath;
use super::value::{Fields, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocumentPath,
    pub fields: Fields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Filters, a single ordering field and a limit. Evaluated in-process by
/// every backend so that they agree on semantics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_field(mut self, field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters.iter().all(|filter| {
            let Some(ordering) = fields
                .get(&filter.field)
                .and_then(|value| value.compare(&filter.value))
            else {
                return false;
            };
            match filter.op {
                FilterOp::Eq => ordering == Ordering::Equal,
                FilterOp::Lt => ordering == Ordering::Less,
                FilterOp::Le => ordering != Ordering::Greater,
                FilterOp::Gt => ordering == Ordering::Greater,
                FilterOp::Ge => ordering != Ordering::Less,
            }
        })
    }

    /// Filters, orders and truncates a candidate set.
    ///
    /// Documents missing the ordering field are excluded. Equal ordering
    /// values fall back to the document path in the same direction, so the
    /// result order is total and independent of candidate order.
    pub fn apply(&self, candidates: Vec<Document>) -> Vec<Document> {
        let mut docs: Vec<Document> = candidates
            .into_iter()
            .filter(|doc| self.matches(&doc.fields))
            .collect();

        match &self.order_by {
            Some(order) => {
                docs.retain(|doc| doc.fields.contains_key(&order.field));
                sort_documents(&mut docs, order);
            }
            None => docs.sort_by(|a, b| a.path.cmp(&b.path)),
        }

        if let Some(limit) = self.limit {
            docs.truncate(limit);
        }
        docs
    }
}

pub fn sort_documents(docs: &mut [Document], order: &OrderBy) {
    docs.sort_by(|a, b| {
        let by_field = match (a.fields.get(&order.field), b.fields.get(&order.field)) {
            (Some(x), Some(y)) => x.compare(y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        };
        let ordering = by_field.then_with(|| a.path.cmp(&b.path));
        match order.direction {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    });
}
