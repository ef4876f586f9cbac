/// Fluent query API.
///
/// Every call consumes the handle and returns the next one. A handle owns its
/// current node exclusively, so open nodes are mutated in place; closed nodes
/// and set operations are wrapped as the source of a fresh open node.
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::{JoinKind, JoinSpec, OrderSpec, QueryNode, SelectNode, SetOperation, SetOperator, Stage};
use crate::ast::{Closure, Expression, Lambda, Model, ModelType, Param, Value, ValueType};
use crate::compiler::{ParameterizedSql, SqlCompiler};
use crate::error::{Error, Result};
use crate::execute::CommandExecutor;
use crate::naming::{DefaultNameResolver, NameResolver};

/// Entry point: creates table queries sharing one name resolver.
#[derive(Clone)]
pub struct QueryBuilder {
    resolver: Arc<dyn NameResolver>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(DefaultNameResolver))
    }

    pub fn with_resolver(resolver: Arc<dyn NameResolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Arc<dyn NameResolver> {
        &self.resolver
    }

    /// Query over the table mapped by `M`.
    pub fn table<M: Model>(&self) -> Query {
        self.table_of(M::model_type())
    }

    pub fn table_of(&self, model: ModelType) -> Query {
        let leaf = Arc::new(QueryNode::Table(model));
        Query {
            node: QueryNode::Select(Box::new(SelectNode::over(leaf))),
            resolver: self.resolver.clone(),
        }
    }
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder").finish_non_exhaustive()
    }
}

/// A query under construction.
#[derive(Clone)]
pub struct Query {
    node: QueryNode,
    resolver: Arc<dyn NameResolver>,
}

fn is_open(select: &SelectNode) -> bool {
    select.stage == Stage::Open
}

fn is_open_ungrouped(select: &SelectNode) -> bool {
    is_open(select) && select.clauses.group_key.is_none()
}

fn any_stage(_: &SelectNode) -> bool {
    true
}

fn expect_arity(name: &'static str, lambda: &Lambda, arity: usize) -> Result<()> {
    if lambda.params.len() != arity {
        return Err(Error::invalid_argument(
            name,
            format!(
                "expected a lambda with {} parameter(s), got {}",
                arity,
                lambda.params.len()
            ),
        ));
    }
    Ok(())
}

fn row_count(name: &'static str, count: i64) -> Result<u64> {
    u64::try_from(count)
        .map_err(|_| Error::invalid_argument(name, format!("must not be negative, got {}", count)))
}

impl Query {
    pub fn node(&self) -> &QueryNode {
        &self.node
    }

    /// Type of the rows produced at this point of the chain.
    pub fn row_type(&self) -> ValueType {
        self.node.row_type()
    }

    /// A lambda parameter bound to this query's rows.
    pub fn param(&self, name: &str) -> Param {
        Param::new(name, self.row_type())
    }

    /// Apply `apply` to the node that should receive the next clause,
    /// wrapping the current node unless `reuse` accepts it.
    fn staged(self, reuse: fn(&SelectNode) -> bool, apply: impl FnOnce(&mut SelectNode)) -> Self {
        let Query { node, resolver } = self;
        let mut select = match node {
            QueryNode::Select(select) if reuse(&select) => select,
            other => {
                trace!("wrapping node as derived table source");
                Box::new(SelectNode::over(Arc::new(other)))
            }
        };
        apply(&mut select);
        Query {
            node: QueryNode::Select(select),
            resolver,
        }
    }

    /// Filter rows. After `group_by` the predicate filters groups instead.
    pub fn filter(self, predicate: Lambda) -> Result<Self> {
        expect_arity("predicate", &predicate, 1)?;
        Ok(self.staged(is_open, |select| {
            if select.clauses.group_key.is_some() {
                select.clauses.having.push(predicate);
            } else {
                select.clauses.filters.push(predicate);
            }
        }))
    }

    /// Install the projection. Closes the node.
    pub fn select(self, projection: Lambda) -> Result<Self> {
        expect_arity("projection", &projection, 1)?;
        Ok(self.staged(is_open, |select| {
            select.clauses.projection = Some(projection);
            select.stage = Stage::Closed;
        }))
    }

    fn order(self, name: &'static str, expr: Lambda, ascending: bool) -> Result<Self> {
        expect_arity(name, &expr, 1)?;
        Ok(self.staged(is_open, |select| {
            select.clauses.order_by.push(OrderSpec { expr, ascending })
        }))
    }

    pub fn order_by(self, selector: Lambda) -> Result<Self> {
        self.order("selector", selector, true)
    }

    pub fn order_by_descending(self, selector: Lambda) -> Result<Self> {
        self.order("selector", selector, false)
    }

    pub fn then_by(self, selector: Lambda) -> Result<Self> {
        self.order_by(selector)
    }

    pub fn then_by_descending(self, selector: Lambda) -> Result<Self> {
        self.order_by_descending(selector)
    }

    pub fn take(self, count: i64) -> Result<Self> {
        let count = row_count("count", count)?;
        Ok(self.staged(any_stage, |select| select.clauses.take = count))
    }

    pub fn skip(self, count: i64) -> Result<Self> {
        let count = row_count("count", count)?;
        Ok(self.staged(any_stage, |select| select.clauses.skip = count))
    }

    pub fn distinct(self) -> Self {
        self.staged(any_stage, |select| select.clauses.distinct = true)
    }

    fn add_join(
        self,
        kind: JoinKind,
        inner: Query,
        outer_key: Lambda,
        inner_key: Lambda,
        result: Lambda,
    ) -> Result<Self> {
        expect_arity("outer_key", &outer_key, 1)?;
        expect_arity("inner_key", &inner_key, 1)?;
        expect_arity("result", &result, 2)?;
        let source = Arc::new(inner.node);
        Ok(self.staged(is_open, |select| {
            select.clauses.joins.push(JoinSpec {
                kind,
                source,
                outer_key,
                inner_key,
                result,
            })
        }))
    }

    /// Inner join. `result` maps `(outer, inner)` to the joined row.
    pub fn join(self, inner: Query, outer_key: Lambda, inner_key: Lambda, result: Lambda) -> Result<Self> {
        self.add_join(JoinKind::Inner, inner, outer_key, inner_key, result)
    }

    pub fn left_join(
        self,
        inner: Query,
        outer_key: Lambda,
        inner_key: Lambda,
        result: Lambda,
    ) -> Result<Self> {
        self.add_join(JoinKind::Left, inner, outer_key, inner_key, result)
    }

    pub fn right_join(
        self,
        inner: Query,
        outer_key: Lambda,
        inner_key: Lambda,
        result: Lambda,
    ) -> Result<Self> {
        self.add_join(JoinKind::Right, inner, outer_key, inner_key, result)
    }

    /// Group rows by `key`. Later `filter` calls become HAVING predicates.
    pub fn group_by(self, key: Lambda) -> Result<Self> {
        expect_arity("key", &key, 1)?;
        Ok(self.staged(is_open_ungrouped, |select| {
            select.clauses.group_key = Some(key);
        }))
    }

    /// Group rows by `key`, keeping `element` of each row in the group.
    pub fn group_by_element(self, key: Lambda, element: Lambda) -> Result<Self> {
        expect_arity("key", &key, 1)?;
        expect_arity("element", &element, 1)?;
        Ok(self.staged(is_open_ungrouped, |select| {
            select.clauses.group_key = Some(key);
            select.clauses.group_element = Some(element);
        }))
    }

    fn set_op(self, other: Query, op: SetOperator) -> Self {
        Query {
            node: QueryNode::SetOp(SetOperation {
                first: Arc::new(self.node),
                second: Arc::new(other.node),
                op,
            }),
            resolver: self.resolver,
        }
    }

    pub fn union(self, other: Query) -> Self {
        self.set_op(other, SetOperator::Union)
    }

    pub fn intersect(self, other: Query) -> Self {
        self.set_op(other, SetOperator::Intersect)
    }

    pub fn except(self, other: Query) -> Self {
        self.set_op(other, SetOperator::Except)
    }

    /// Membership marker. Only meaningful inside a predicate, built with
    /// `query.as_expr().contains(item)`; calling it directly is an error.
    pub fn contains(&self, _element: impl Into<Value>) -> Result<bool> {
        Err(Error::Misuse(
            "contains() can only be used as part of a predicate".to_string(),
        ))
    }

    /// This query captured as a sub-query expression.
    pub fn as_expr(&self) -> Expression {
        Closure::new().capture_query("query", self).var("query")
    }

    /// Compile to a parameterized command.
    pub fn to_sql(&self) -> Result<ParameterizedSql> {
        SqlCompiler::new(self.resolver.clone()).compile(&self.node)
    }

    /// Compile and hand the command to `executor`.
    pub fn execute_with<E>(&self, executor: &E) -> anyhow::Result<Vec<E::Row>>
    where
        E: CommandExecutor + ?Sized,
    {
        let command = self.to_sql()?;
        executor.execute(&command)
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query").field("node", &self.node).finish_non_exhaustive()
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}
