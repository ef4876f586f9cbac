/// Query-node data model.
///
/// A query is a tree of nodes: table leaves, clause-bearing `Select` nodes
/// wrapping exactly one source, and binary set operations. Nodes that have
/// been closed by a projection are only ever referenced (through `Arc`) as
/// the source of a newer node, never mutated again.
pub mod builder;

use std::sync::Arc;

use crate::ast::{Expression, Lambda, ModelType, ValueType};

pub use builder::{Query, QueryBuilder};

#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    /// A table bound to a model type.
    Table(ModelType),
    Select(Box<SelectNode>),
    SetOp(SetOperation),
}

impl QueryNode {
    /// Type of the rows this node produces.
    pub fn row_type(&self) -> ValueType {
        match self {
            QueryNode::Table(model) => ValueType::Model(model.clone()),
            QueryNode::Select(select) => select.row_type(),
            QueryNode::SetOp(set) => set.first.row_type(),
        }
    }
}

/// Staging state of a `Select` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Open,
    /// A projection has been installed; structural calls wrap the node.
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectNode {
    pub from: Arc<QueryNode>,
    /// Row type of `from`, the type lambda parameters bind to.
    pub model_type: ValueType,
    pub clauses: Clauses,
    pub stage: Stage,
}

impl SelectNode {
    /// A fresh open node reading from `from`.
    pub fn over(from: Arc<QueryNode>) -> Self {
        let model_type = from.row_type();
        Self {
            from,
            model_type,
            clauses: Clauses::default(),
            stage: Stage::Open,
        }
    }

    /// Row type before grouping and projection: the last join result, or the
    /// source rows.
    pub fn joined_type(&self) -> ValueType {
        self.clauses
            .joins
            .last()
            .map(|join| join.result.body.ty())
            .unwrap_or_else(|| self.model_type.clone())
    }

    pub fn row_type(&self) -> ValueType {
        if let Some(projection) = &self.clauses.projection {
            return projection.body.ty();
        }
        if let Some(key) = &self.clauses.group_key {
            let element = self
                .clauses
                .group_element
                .as_ref()
                .map(|e| e.body.ty())
                .unwrap_or_else(|| self.joined_type());
            return ValueType::group(key.body.ty(), element);
        }
        self.joined_type()
    }

    /// True when the node adds nothing to its source, so it can be rendered
    /// as the source itself.
    pub fn is_trivial(&self) -> bool {
        let c = &self.clauses;
        c.filters.is_empty()
            && c.having.is_empty()
            && c.projection.is_none()
            && c.group_key.is_none()
            && c.joins.is_empty()
            && c.order_by.is_empty()
            && c.skip == 0
            && c.take == 0
            && !c.distinct
    }
}

/// Clauses accumulated on a `Select` node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clauses {
    /// Pre-aggregation predicates, AND-combined in call order.
    pub filters: Vec<Lambda>,
    /// Post-aggregation predicates, AND-combined in call order.
    pub having: Vec<Lambda>,
    pub projection: Option<Lambda>,
    pub group_key: Option<Lambda>,
    pub group_element: Option<Lambda>,
    pub joins: Vec<JoinSpec>,
    pub order_by: Vec<OrderSpec>,
    pub skip: u64,
    /// 0 means unset.
    pub take: u64,
    pub distinct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    /// Keyword placed before `JOIN`. Inner joins have none.
    pub fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    pub kind: JoinKind,
    pub source: Arc<QueryNode>,
    pub outer_key: Lambda,
    /// Must select a single member of the joined rows.
    pub inner_key: Lambda,
    /// Two-parameter lambda `(outer, inner) => row`.
    pub result: Lambda,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    pub expr: Lambda,
    pub ascending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    Intersect,
    Except,
}

impl SetOperator {
    pub fn keyword(self) -> &'static str {
        match self {
            SetOperator::Union => "UNION",
            SetOperator::Intersect => "INTERSECT",
            SetOperator::Except => "EXCEPT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetOperation {
    pub first: Arc<QueryNode>,
    pub second: Arc<QueryNode>,
    pub op: SetOperator,
}

/// Single-member access used as a join's inner key.
pub(crate) fn key_member(lambda: &Lambda) -> Option<&crate::ast::MemberRef> {
    match &lambda.body {
        Expression::Member { member, .. } => Some(member),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Param, ValueType};

    fn user() -> ModelType {
        ModelType::builder("User")
            .field("Id", ValueType::Int)
            .field("Login", ValueType::String)
            .build()
    }

    fn select_over_user() -> SelectNode {
        SelectNode::over(Arc::new(QueryNode::Table(user())))
    }

    #[test]
    fn test_new_select_is_open_and_trivial() {
        let node = select_over_user();
        assert_eq!(node.stage, Stage::Open);
        assert!(node.is_trivial());
        assert_eq!(node.row_type(), ValueType::Model(user()));
    }

    #[test]
    fn test_projection_sets_row_type() {
        let mut node = select_over_user();
        let u = Param::new("u", node.model_type.clone());
        node.clauses.projection = Some(Lambda::unary(&u, u.field("Login")));
        assert_eq!(node.row_type(), ValueType::String);
        assert!(!node.is_trivial());
    }

    #[test]
    fn test_group_row_type_defaults_element_to_rows() {
        let mut node = select_over_user();
        let u = Param::new("u", node.model_type.clone());
        node.clauses.group_key = Some(Lambda::unary(&u, u.field("Login")));
        assert_eq!(
            node.row_type(),
            ValueType::group(ValueType::String, ValueType::Model(user()))
        );
    }

    #[test]
    fn test_row_modifiers_make_node_non_trivial() {
        let mut node = select_over_user();
        node.clauses.take = 10;
        assert!(!node.is_trivial());
        let mut node = select_over_user();
        node.clauses.distinct = true;
        assert!(!node.is_trivial());
    }

    #[test]
    fn test_set_operation_takes_first_row_type() {
        let first = Arc::new(QueryNode::Table(user()));
        let other = ModelType::builder("Role").field("Id", ValueType::Int).build();
        let set = QueryNode::SetOp(SetOperation {
            first,
            second: Arc::new(QueryNode::Table(other)),
            op: SetOperator::Union,
        });
        assert_eq!(set.row_type(), ValueType::Model(user()));
    }
}
