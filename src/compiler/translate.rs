/// Expression and clause translation for a single `Select` node.
///
/// One `Translator` renders one SELECT command. Literals become numbered
/// parameters in the order they are met; nested sources and captured
/// sub-queries are compiled through the shared [`Session`] so prefixes stay
/// unique across the whole command.
use super::alias::AliasBinder;
use super::command::{ParameterizedSql, Parameters};
use super::{tables, Session};
use crate::ast::{
    BinaryOperator, Captured, Closure, Constant, Constructor, Expression, Lambda, MemberRef, TypeTag, UnaryOperator,
    Value, ValueType,
};
use crate::error::{Error, Result};
use crate::query::{key_member, JoinSpec, OrderSpec, QueryNode, SelectNode};

/// Arguments accepted by `DATETIMEFROMPARTS`.
const DATETIME_PARTS: usize = 7;

pub(crate) struct Translator<'s, 'r> {
    session: &'s mut Session<'r>,
    prefix: String,
    params: Parameters,
    aliases: AliasBinder,
    group_key_sql: Option<String>,
}

fn untranslatable(expr: &Expression) -> Error {
    Error::unsupported(format!("Can not translate expression: {}.", expr))
}

impl<'s, 'r> Translator<'s, 'r> {
    pub fn new(session: &'s mut Session<'r>, prefix: &str) -> Self {
        Self {
            session,
            prefix: prefix.to_string(),
            params: Parameters::new(),
            aliases: AliasBinder::new(prefix),
            group_key_sql: None,
        }
    }

    pub fn select_command(mut self, select: &SelectNode) -> Result<ParameterizedSql> {
        let clauses = &select.clauses;

        // FROM
        let alias = self.aliases.bind_main(select)?;
        let mut from = self.nested_source(&select.from)?;
        if let Some(alias) = alias {
            from = format!("{} [{}]", from, alias);
        }

        // JOINs
        let mut joins = String::new();
        for join in &clauses.joins {
            joins.push_str(&self.join_clause(join)?);
        }

        let where_clause = self.predicates(" WHERE ", &clauses.filters)?;
        let group_clause = match &clauses.group_key {
            Some(key) => self.group_clause(&key.body)?,
            None => String::new(),
        };
        let having_clause = self.predicates(" HAVING ", &clauses.having)?;
        let order_clause = self.order_clause(&clauses.order_by)?;

        // SELECT list
        let distinct = if clauses.distinct { "DISTINCT " } else { "" };
        let columns = self.select_list(select)?;

        // OFFSET / FETCH
        let mut paging = String::new();
        if clauses.skip != 0 || clauses.take != 0 {
            paging.push_str(&format!(" OFFSET {} ROWS", clauses.skip));
        }
        if clauses.take != 0 {
            paging.push_str(&format!(" FETCH NEXT {} ROWS ONLY", clauses.take));
        }

        let text = format!(
            "SELECT {}{} FROM {}{}{}{}{}{}{}",
            distinct,
            columns,
            from,
            joins,
            where_clause,
            group_clause,
            having_clause,
            order_clause,
            paging
        );
        Ok(ParameterizedSql::new(text, self.params))
    }

    /// Render a FROM or JOIN source under the next sub-query prefix.
    fn nested_source(&mut self, node: &QueryNode) -> Result<String> {
        let prefix = self.session.subquery_prefix(&self.prefix);
        let sql = self.session.source(node, &prefix)?;
        self.params.merge(sql.parameters);
        Ok(sql.text)
    }

    fn join_clause(&mut self, join: &JoinSpec) -> Result<String> {
        let alias = self.aliases.bind_join(join)?;
        let source = self.nested_source(&join.source)?;
        let outer = self.translate(&join.outer_key.body, false)?;
        let member = key_member(&join.inner_key).ok_or_else(|| untranslatable(&join.inner_key.body))?;
        let inner = format!("[{}].[{}]", alias, self.session.column_name(member));
        self.aliases.advance(&alias);
        Ok(format!(
            " {} JOIN {} [{}] ON {} = {}",
            join.kind.keyword(),
            source,
            alias,
            outer,
            inner
        ))
    }

    fn predicates(&mut self, keyword: &str, predicates: &[Lambda]) -> Result<String> {
        if predicates.is_empty() {
            return Ok(String::new());
        }
        let mut parts = Vec::with_capacity(predicates.len());
        for predicate in predicates {
            let sql = self.translate(&predicate.body, true)?;
            // AND binds tighter than OR.
            let disjunction = matches!(
                predicate.body,
                Expression::Binary {
                    op: BinaryOperator::Or | BinaryOperator::BitOr,
                    ..
                }
            );
            parts.push(if disjunction { format!("({})", sql) } else { sql });
        }
        Ok(format!("{}{}", keyword, parts.join(" AND ")))
    }

    fn group_clause(&mut self, key: &Expression) -> Result<String> {
        // A composite key groups by each of its fields.
        if let Expression::Construct {
            ctor: Constructor::Record(_),
            args,
            ..
        } = key
        {
            let columns = self.translate_all(args)?;
            return Ok(format!(" GROUP BY {}", columns.join(", ")));
        }
        let sql = self.translate(key, false)?;
        self.group_key_sql = Some(sql.clone());
        Ok(format!(" GROUP BY {}", sql))
    }

    fn order_clause(&mut self, order_by: &[OrderSpec]) -> Result<String> {
        if order_by.is_empty() {
            return Ok(String::new());
        }
        let mut parts = Vec::with_capacity(order_by.len());
        for order in order_by {
            let sql = self.translate(&order.expr.body, false)?;
            parts.push(if order.ascending { sql } else { format!("{} DESC", sql) });
        }
        Ok(format!(" ORDER BY {}", parts.join(", ")))
    }

    fn select_list(&mut self, select: &SelectNode) -> Result<String> {
        let clauses = &select.clauses;
        let projection = clauses
            .projection
            .as_ref()
            .or_else(|| clauses.joins.last().map(|join| &join.result));
        let Some(projection) = projection else {
            return Ok("*".to_string());
        };
        let sql = self.translate(&projection.body, false)?;
        if matches!(projection.body, Expression::Parameter(_)) {
            return Ok(format!("{}.*", sql));
        }
        Ok(sql)
    }

    fn translate_all(&mut self, exprs: &[Expression]) -> Result<Vec<String>> {
        exprs.iter().map(|expr| self.translate(expr, false)).collect()
    }

    /// Translate `expr`. `cond` marks a position where a boolean column must
    /// be compared explicitly (`[t].[Flag] = 1`).
    pub fn translate(&mut self, expr: &Expression, cond: bool) -> Result<String> {
        match expr {
            Expression::Binary {
                op,
                left,
                right,
                ty,
            } => {
                let left = self.translate(left, ty.is_bool())?;
                let right = self.translate(right, ty.is_bool())?;
                let op = tables::binary_operator(*op, left == "NULL" || right == "NULL")?;
                Ok(format!("({}) {} ({})", left, op, right))
            }
            Expression::Unary { op, operand, ty } => {
                let operand = self.translate(operand, ty.is_bool())?;
                if *op == UnaryOperator::Convert {
                    let target = tables::cast_type(ty).ok_or_else(|| {
                        Error::unsupported(format!("Can not translate conversion to {}.", ty))
                    })?;
                    return Ok(format!("CONVERT({}, {})", target, operand));
                }
                Ok(format!("{} ({})", tables::unary_operator(*op)?, operand))
            }
            Expression::Conditional {
                test,
                if_true,
                if_false,
                ..
            } => {
                let test = self.translate(test, true)?;
                let if_true = self.translate(if_true, false)?;
                let if_false = self.translate(if_false, false)?;
                Ok(format!("IIF({}, {}, {})", test, if_true, if_false))
            }
            Expression::Member { target, member, .. } => {
                self.member(expr, target.as_deref(), member, cond)
            }
            Expression::Call {
                target,
                method,
                args,
                ..
            } => {
                let mut slots = Vec::with_capacity(args.len() + 1);
                slots.push(self.callee(target.as_deref())?);
                slots.extend(self.translate_all(args)?);
                let template = tables::method(method).ok_or_else(|| {
                    Error::unsupported(format!("Can not translate method {}", method))
                })?;
                Ok(tables::fill(template, &slots))
            }
            Expression::Construct { ctor, args, .. } => {
                let mut args = self.translate_all(args)?;
                match ctor {
                    Constructor::Record(names) => {
                        let columns: Vec<String> = args
                            .iter()
                            .zip(names)
                            .map(|(sql, name)| format!("{} AS [{}]", sql, name))
                            .collect();
                        Ok(columns.join(", "))
                    }
                    Constructor::DateTime => {
                        if args.len() < DATETIME_PARTS {
                            args.resize(DATETIME_PARTS, "0".to_string());
                        }
                        Ok(format!("DATETIMEFROMPARTS({})", args.join(", ")))
                    }
                    Constructor::Random => Ok(String::new()),
                    Constructor::Named(name) => Err(Error::unsupported(format!(
                        "Can not translate object creation: {}",
                        name
                    ))),
                }
            }
            Expression::Constant {
                value: Constant::Value(Value::Null),
                ..
            } => Ok("NULL".to_string()),
            Expression::Constant {
                value: Constant::Value(value),
                ..
            } => Ok(self.add_parameter(value.clone())),
            Expression::Constant {
                value: Constant::Closure(_),
                ..
            } => Err(untranslatable(expr)),
            Expression::Parameter(param) => Ok(format!("[{}]", self.aliases.param_alias(param))),
            Expression::Lambda(lambda) => self.translate(&lambda.body, false),
        }
    }

    fn callee(&mut self, target: Option<&Expression>) -> Result<String> {
        match target {
            Some(target) => self.translate(target, false),
            None => Ok(String::new()),
        }
    }

    fn member(
        &mut self,
        expr: &Expression,
        target: Option<&Expression>,
        member: &MemberRef,
        cond: bool,
    ) -> Result<String> {
        if member.name == "Key" && matches!(member.owner, ValueType::Group { .. }) {
            if let Some(key) = &self.group_key_sql {
                return Ok(key.clone());
            }
        }
        if member.owner == ValueType::TimeSpan {
            return self.duration(expr, target, member);
        }
        if let Some(Expression::Constant {
            value: Constant::Closure(closure),
            ..
        }) = target
        {
            return self.captured(closure, &member.name);
        }
        if let Some(template) = tables::property(member.owner.tag(), &member.name) {
            let callee = self.callee(target)?;
            return Ok(tables::fill(template, &[callee]));
        }
        match target {
            Some(Expression::Parameter(param)) => {
                let suffix = if cond && expr.ty().is_bool() { " = 1" } else { "" };
                Ok(format!(
                    "[{}].[{}]{}",
                    self.aliases.param_alias(param),
                    self.session.column_name(member),
                    suffix
                ))
            }
            Some(Expression::Member { member: inner, .. }) => {
                let alias = self
                    .aliases
                    .member_alias(inner)
                    .ok_or_else(|| untranslatable(expr))?;
                Ok(format!("[{}].[{}]", alias, self.session.column_name(member)))
            }
            _ => Err(untranslatable(expr)),
        }
    }

    /// Duration accessors read the unit into the subtraction they wrap:
    /// `(a - b).TotalHours` becomes `CONVERT(FLOAT, DATEDIFF(hour, b, a))`.
    fn duration(
        &mut self,
        expr: &Expression,
        target: Option<&Expression>,
        member: &MemberRef,
    ) -> Result<String> {
        let unit = tables::property(TypeTag::TimeSpan, &member.name).ok_or_else(|| untranslatable(expr))?;
        let Some(Expression::Call {
            target: callee,
            method,
            args,
            ..
        }) = target
        else {
            return Err(untranslatable(expr));
        };
        let template = tables::method(method)
            .ok_or_else(|| Error::unsupported(format!("Can not translate method {}", method)))?;
        let mut slots = vec![unit.to_string(), self.callee(callee.as_deref())?];
        slots.extend(self.translate_all(args)?);
        let sql = tables::fill(template, &slots);
        if expr.ty() == ValueType::Double {
            return Ok(format!("CONVERT(FLOAT, {})", sql));
        }
        Ok(sql)
    }

    /// Resolve a captured variable: values bind a parameter, queries are
    /// compiled in place as sub-queries.
    fn captured(&mut self, closure: &Closure, name: &str) -> Result<String> {
        match closure.get(name) {
            Some(Captured::Value(value)) => Ok(self.add_parameter(value.clone())),
            Some(Captured::Query(node)) => {
                let prefix = self.session.subquery_prefix(&self.prefix);
                let sql = self.session.command(node, &prefix)?;
                self.params.merge(sql.parameters);
                Ok(sql.text)
            }
            None => Err(Error::unsupported(format!(
                "Can not access closure member {}.",
                name
            ))),
        }
    }

    fn add_parameter(&mut self, value: Value) -> String {
        let name = format!("@{}p{}", self.prefix, self.params.len());
        self.params.insert(name.clone(), value);
        name
    }
}
