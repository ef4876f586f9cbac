/// Query tree → parameterized T-SQL.
///
/// ```text
/// command.rs    ParameterizedSql and its parameter map
/// tables.rs     operator / cast / method / property mappings
/// alias.rs      table alias discovery
/// translate.rs  clause assembly and expression translation
/// ```
///
/// All mutable state lives in a [`Session`] created per `compile` call, so a
/// single `SqlCompiler` can be shared between threads.
pub mod command;

mod alias;
mod tables;
mod translate;

use std::sync::Arc;

use tracing::{debug, trace};

pub use command::{ParameterizedSql, Parameters};

use crate::ast::{MemberRef, ModelType};
use crate::error::Result;
use crate::naming::NameResolver;
use crate::query::QueryNode;
use translate::Translator;

#[derive(Clone)]
pub struct SqlCompiler {
    resolver: Arc<dyn NameResolver>,
}

impl SqlCompiler {
    pub fn new(resolver: Arc<dyn NameResolver>) -> Self {
        Self { resolver }
    }

    /// Compile `node` into a complete command.
    pub fn compile(&self, node: &QueryNode) -> Result<ParameterizedSql> {
        let mut session = Session::new(self.resolver.as_ref());
        let sql = session.command(node, "")?;
        debug!(
            len = sql.text.len(),
            parameters = sql.parameters.len(),
            "compiled query"
        );
        Ok(sql)
    }
}

impl std::fmt::Debug for SqlCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlCompiler").finish_non_exhaustive()
    }
}

/// State of one top-level compilation.
pub(crate) struct Session<'r> {
    resolver: &'r dyn NameResolver,
    next_subquery: usize,
}

impl<'r> Session<'r> {
    pub fn new(resolver: &'r dyn NameResolver) -> Self {
        Self {
            resolver,
            next_subquery: 0,
        }
    }

    /// Allocate the next derived-table prefix under `prefix`.
    pub fn subquery_prefix(&mut self, prefix: &str) -> String {
        let id = self.next_subquery;
        self.next_subquery += 1;
        format!("{}sq{}_", prefix, id)
    }

    pub fn table_name(&self, model: &ModelType) -> String {
        self.resolver.table_name(model)
    }

    pub fn column_name(&self, member: &MemberRef) -> String {
        self.resolver.column_name(member)
    }

    /// Full command for `node`, with aliases and parameters under `prefix`.
    pub fn command(&mut self, node: &QueryNode, prefix: &str) -> Result<ParameterizedSql> {
        match node {
            QueryNode::Table(model) => Ok(ParameterizedSql::text_only(format!(
                "SELECT * FROM [{}]",
                self.table_name(model)
            ))),
            QueryNode::Select(select) => Translator::new(self, prefix).select_command(select),
            QueryNode::SetOp(set) => {
                let first_prefix = format!("{}so0_", prefix);
                let second_prefix = format!("{}so1_", prefix);
                trace!(prefix = %first_prefix, "compiling set operand");
                let first = self.command(&set.first, &first_prefix)?;
                trace!(prefix = %second_prefix, "compiling set operand");
                let second = self.command(&set.second, &second_prefix)?;
                let text = format!("({} {} {})", first.text, set.op.keyword(), second.text);
                let mut parameters = first.parameters;
                parameters.merge(second.parameters);
                Ok(ParameterizedSql::new(text, parameters))
            }
        }
    }

    /// `node` as a FROM/JOIN source: a bare table when nothing is added on
    /// top of it, a parenthesised command otherwise.
    pub fn source(&mut self, node: &QueryNode, prefix: &str) -> Result<ParameterizedSql> {
        match node {
            QueryNode::Table(model) => Ok(ParameterizedSql::text_only(format!(
                "[{}]",
                self.table_name(model)
            ))),
            QueryNode::Select(select) if select.is_trivial() => self.source(&select.from, prefix),
            QueryNode::Select(select) => {
                trace!(prefix, "compiling derived table");
                let mut sql = Translator::new(self, prefix).select_command(select)?;
                sql.text = format!("({})", sql.text);
                Ok(sql)
            }
            QueryNode::SetOp(_) => self.command(node, prefix),
        }
    }
}
