/// Table alias discovery.
///
/// Aliases come from the names of the lambda parameters that range over a
/// source, prefixed with the current path prefix. Joins additionally register
/// the record fields their result selectors assign whole rows to, so that
/// `t.link.RoleId` resolves to `[link].[RoleId]`.
use std::collections::HashMap;

use tracing::debug;

use crate::ast::{Constructor, Expression, Lambda, MemberRef, Param, ValueType};
use crate::error::{Error, Result};
use crate::query::{JoinSpec, SelectNode};

/// Field-expansion levels tried after a direct type match fails.
const EXPANSION_LEVELS: usize = 1;

pub(crate) struct AliasBinder {
    prefix: String,
    registered: HashMap<MemberRef, String>,
    last: Option<String>,
}

impl AliasBinder {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            registered: HashMap::new(),
            last: None,
        }
    }

    fn prefixed(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Alias of the node's FROM source, or `None` when no clause names it.
    pub fn bind_main(&mut self, select: &SelectNode) -> Result<Option<String>> {
        if let Some(join) = select.clauses.joins.first() {
            let alias = self.prefixed(&result_param(join, 0)?.name);
            if let Some(member) = member_set_by_param(&join.result, 0) {
                self.registered.insert(member, alias.clone());
                self.last = Some(alias.clone());
            }
            return Ok(Some(alias));
        }

        let clauses = &select.clauses;
        let lambdas = clauses
            .projection
            .iter()
            .chain(&clauses.group_key)
            .chain(&clauses.group_element)
            .chain(&clauses.filters)
            .chain(clauses.order_by.iter().map(|order| &order.expr));

        let mut scope: Vec<(ValueType, String)> = Vec::new();
        for param in lambdas.flat_map(|lambda| &lambda.params) {
            if !scope.iter().any(|(ty, _)| *ty == param.ty) {
                scope.push((param.ty.clone(), self.prefixed(&param.name)));
            }
        }

        let mut levels = EXPANSION_LEVELS + clauses.joins.len();
        loop {
            if let Some((_, alias)) = scope.iter().find(|(ty, _)| *ty == select.model_type) {
                self.last = Some(alias.clone());
                return Ok(Some(alias.clone()));
            }
            if levels == 0 || scope.is_empty() {
                break;
            }
            levels -= 1;
            scope = self.expand(&scope);
        }

        debug!(model = %select.model_type, prefix = %self.prefix, "no alias for source");
        Ok(None)
    }

    /// Replace every entry by the fields of its type, first-seen per type.
    fn expand(&self, scope: &[(ValueType, String)]) -> Vec<(ValueType, String)> {
        let mut next: Vec<(ValueType, String)> = Vec::new();
        for field in scope.iter().flat_map(|(ty, _)| ty.fields()) {
            if !next.iter().any(|(ty, _)| *ty == field.ty) {
                let alias = self.prefixed(&field.name);
                next.push((field.ty, alias));
            }
        }
        next
    }

    /// Alias of a join's inner source.
    pub fn bind_join(&mut self, join: &JoinSpec) -> Result<String> {
        let alias = self.prefixed(&result_param(join, 1)?.name);
        if let Some(member) = member_set_by_param(&join.result, 1) {
            self.registered.insert(member, alias.clone());
        }
        Ok(alias)
    }

    /// Called after a join has been rendered.
    pub fn advance(&mut self, alias: &str) {
        if self.last.is_some() {
            self.last = Some(alias.to_string());
        }
    }

    pub fn param_alias(&self, param: &Param) -> String {
        self.last
            .clone()
            .unwrap_or_else(|| self.prefixed(&param.name))
    }

    /// Alias for a field read through a composite member such as `t.user`.
    pub fn member_alias(&self, member: &MemberRef) -> Option<String> {
        self.registered
            .get(member)
            .or(self.last.as_ref())
            .cloned()
    }
}

fn result_param(join: &JoinSpec, index: usize) -> Result<&Param> {
    join.result.params.get(index).ok_or_else(|| {
        Error::invalid_argument("result", "join result selector must take two parameters")
    })
}

/// The record field a join result assigns the `index`-th parameter to,
/// e.g. `user` in `(user, link) => new { user, link }`.
fn member_set_by_param(result: &Lambda, index: usize) -> Option<MemberRef> {
    let param = result.params.get(index)?;
    let Expression::Construct {
        ctor: Constructor::Record(names),
        args,
        ty,
    } = &result.body
    else {
        return None;
    };
    let position = args
        .iter()
        .take_while(|arg| !matches!(arg, Expression::Parameter(p) if p == param))
        .count();
    names
        .get(position)
        .map(|name| MemberRef::new(ty.clone(), name.as_str()))
}
