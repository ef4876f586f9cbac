/// Predicate / projection expression trees.
///
/// Callers build these explicitly (see `functions.rs` for the combinators)
/// and hand them to the fluent query API wrapped in a [`Lambda`]. The
/// compiler walks them to produce SQL fragments.
use std::fmt;
use std::sync::Arc;

use super::types::{ModelType, TypeTag, Value, ValueType};
use crate::query::QueryNode;

/// A node of an expression tree. Every node knows its static result type.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Field or property access. `target` is `None` for static members
    /// such as `DateTime.Now`.
    Member {
        target: Option<Box<Expression>>,
        member: MemberRef,
        ty: ValueType,
    },
    Constant {
        value: Constant,
        ty: ValueType,
    },
    Parameter(Param),
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
        ty: ValueType,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        ty: ValueType,
    },
    Conditional {
        test: Box<Expression>,
        if_true: Box<Expression>,
        if_false: Box<Expression>,
        ty: ValueType,
    },
    Call {
        target: Option<Box<Expression>>,
        method: MethodRef,
        args: Vec<Expression>,
        ty: ValueType,
    },
    Construct {
        ctor: Constructor,
        args: Vec<Expression>,
        ty: ValueType,
    },
    Lambda(Box<Lambda>),
}

impl Expression {
    /// Static result type of this node.
    pub fn ty(&self) -> ValueType {
        match self {
            Expression::Member { ty, .. }
            | Expression::Constant { ty, .. }
            | Expression::Unary { ty, .. }
            | Expression::Binary { ty, .. }
            | Expression::Conditional { ty, .. }
            | Expression::Call { ty, .. }
            | Expression::Construct { ty, .. } => ty.clone(),
            Expression::Parameter(param) => param.ty.clone(),
            Expression::Lambda(lambda) => lambda.body.ty(),
        }
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        let value = value.into();
        let ty = value.value_type();
        Expression::Constant {
            value: Constant::Value(value),
            ty,
        }
    }

    pub fn null() -> Self {
        Expression::Constant {
            value: Constant::Value(Value::Null),
            ty: ValueType::Object,
        }
    }

    /// Anonymous record construction, e.g. `new { UserName = .., Email = .. }`.
    pub fn record<N: Into<String>>(fields: impl IntoIterator<Item = (N, Expression)>) -> Self {
        let (names, args): (Vec<String>, Vec<Expression>) =
            fields.into_iter().map(|(n, e)| (n.into(), e)).unzip();
        let ty = ModelType::record(
            names
                .iter()
                .zip(&args)
                .map(|(name, arg)| super::types::Field::new(name.clone(), arg.ty()))
                .collect(),
        );
        Expression::Construct {
            ctor: Constructor::Record(names),
            args,
            ty: ValueType::Model(ty),
        }
    }

    /// Initialisation of a named result model, field by field.
    pub fn init<N: Into<String>>(
        model: ModelType,
        fields: impl IntoIterator<Item = (N, Expression)>,
    ) -> Self {
        let (names, args) = fields.into_iter().map(|(n, e)| (n.into(), e)).unzip();
        Expression::Construct {
            ctor: Constructor::Record(names),
            args,
            ty: ValueType::Model(model),
        }
    }

    pub fn is_null_constant(&self) -> bool {
        matches!(
            self,
            Expression::Constant {
                value: Constant::Value(Value::Null),
                ..
            }
        )
    }
}

/// A literal: either a plain value or a captured environment.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Value(Value),
    Closure(Closure),
}

/// The member being accessed and the type that declares it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub owner: ValueType,
    pub name: String,
}

impl MemberRef {
    pub fn new(owner: ValueType, name: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
        }
    }
}

/// Types that declare translatable methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclaringType {
    String,
    Int,
    Long,
    Double,
    Decimal,
    DateTime,
    Math,
    Random,
    Group,
    Query,
}

impl DeclaringType {
    /// Generic declarations match by name and arity only.
    pub fn is_generic(self) -> bool {
        matches!(self, DeclaringType::Group | DeclaringType::Query)
    }
}

/// A method signature: declaring type, name and parameter shapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub owner: DeclaringType,
    pub name: String,
    pub params: Vec<TypeTag>,
}

impl MethodRef {
    pub fn new(owner: DeclaringType, name: impl Into<String>, params: Vec<TypeTag>) -> Self {
        Self {
            owner,
            name: name.into(),
            params,
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.params.iter().map(|p| format!("{:?}", p)).collect();
        write!(f, "{:?}.{}({})", self.owner, self.name, params.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constructor {
    /// Record or result-model initialisation; holds the field names in
    /// argument order.
    Record(Vec<String>),
    DateTime,
    Random,
    /// Any other object creation. Not translatable.
    Named(String),
}

impl fmt::Display for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constructor::Record(names) => write!(f, "{{ {} }}", names.join(", ")),
            Constructor::DateTime => write!(f, "DateTime"),
            Constructor::Random => write!(f, "Random"),
            Constructor::Named(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Negate,
    /// Type conversion to the node's result type.
    Convert,
    /// Marks a lambda passed as an argument (aggregate selectors).
    Quote,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    BitAnd,
    BitOr,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    BitXor,
    Coalesce,
}

impl BinaryOperator {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Eq => "==",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::BitXor => "^",
            BinaryOperator::Coalesce => "??",
        }
    }
}

/// A named, typed lambda parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    pub name: String,
    pub ty: ValueType,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// A parameter bound to a mapped model.
    pub fn of<M: super::types::Model>(name: impl Into<String>) -> Self {
        Self::new(name, ValueType::Model(M::model_type()))
    }

    pub fn expr(&self) -> Expression {
        Expression::Parameter(self.clone())
    }

    /// Shorthand for `self.expr().field(name)`.
    pub fn field(&self, name: &str) -> Expression {
        self.expr().field(name)
    }
}

/// A lambda: parameters plus a body expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub params: Vec<Param>,
    pub body: Expression,
}

impl Lambda {
    pub fn new(params: Vec<Param>, body: impl Into<Expression>) -> Self {
        Self {
            params,
            body: body.into(),
        }
    }

    pub fn unary(param: &Param, body: impl Into<Expression>) -> Self {
        Self::new(vec![param.clone()], body)
    }

    pub fn binary(first: &Param, second: &Param, body: impl Into<Expression>) -> Self {
        Self::new(vec![first.clone(), second.clone()], body)
    }

    /// Wrap as a quoted argument, the way aggregate selectors are passed.
    pub fn quote(self) -> Expression {
        Expression::Unary {
            op: UnaryOperator::Quote,
            operand: Box::new(Expression::Lambda(Box::new(self))),
            ty: ValueType::Object,
        }
    }
}

/// A value captured from the enclosing scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Captured {
    Value(Value),
    /// A query used as a sub-query, e.g. for membership tests.
    Query(Arc<QueryNode>),
}

impl Captured {
    pub fn ty(&self) -> ValueType {
        match self {
            Captured::Value(value) => value.value_type(),
            Captured::Query(node) => ValueType::Query(Box::new(node.row_type())),
        }
    }
}

/// An environment of named captured values.
///
/// Accessing a variable produces a member expression rooted in the closure;
/// the compiler resolves it immediately, binding a parameter for plain values
/// and splicing a sub-query for captured queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Closure {
    vars: Arc<Vec<(String, Captured)>>,
}

impl Closure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(name.into(), Captured::Value(value.into()))
    }

    pub fn capture_query(self, name: impl Into<String>, query: &crate::query::Query) -> Self {
        self.with(name.into(), Captured::Query(Arc::new(query.node().clone())))
    }

    fn with(self, name: String, value: Captured) -> Self {
        let mut vars = Arc::try_unwrap(self.vars).unwrap_or_else(|shared| (*shared).clone());
        vars.retain(|(existing, _)| *existing != name);
        vars.push((name, value));
        Self {
            vars: Arc::new(vars),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Captured> {
        self.vars
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    /// Reference a captured variable inside an expression.
    pub fn var(&self, name: &str) -> Expression {
        let ty = self.get(name).map(Captured::ty).unwrap_or(ValueType::Object);
        Expression::Member {
            target: Some(Box::new(Expression::Constant {
                value: Constant::Closure(self.clone()),
                ty: ValueType::Closure,
            })),
            member: MemberRef::new(ValueType::Closure, name),
            ty,
        }
    }
}

impl From<Param> for Expression {
    fn from(param: Param) -> Self {
        Expression::Parameter(param)
    }
}

impl From<&Param> for Expression {
    fn from(param: &Param) -> Self {
        Expression::Parameter(param.clone())
    }
}

impl From<Lambda> for Expression {
    fn from(lambda: Lambda) -> Self {
        Expression::Lambda(Box::new(lambda))
    }
}

macro_rules! literal_into_expression {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Expression {
                fn from(v: $t) -> Self {
                    Expression::constant(v)
                }
            }
        )*
    };
}

literal_into_expression!(
    bool,
    i32,
    i64,
    f32,
    f64,
    &str,
    String,
    rust_decimal::Decimal,
    chrono::NaiveDateTime,
    Value
);

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Member { target, member, .. } => match target {
                Some(target) => match target.as_ref() {
                    Expression::Constant {
                        value: Constant::Closure(_),
                        ..
                    } => write!(f, "value(closure).{}", member.name),
                    other => write!(f, "{}.{}", other, member.name),
                },
                None => write!(f, "{}.{}", member.owner, member.name),
            },
            Expression::Constant { value, .. } => match value {
                Constant::Value(v) => write!(f, "{}", v),
                Constant::Closure(_) => write!(f, "value(closure)"),
            },
            Expression::Parameter(param) => write!(f, "{}", param.name),
            Expression::Unary { op, operand, ty } => match op {
                UnaryOperator::Not => write!(f, "Not({})", operand),
                UnaryOperator::Negate => write!(f, "-{}", operand),
                UnaryOperator::Plus => write!(f, "+{}", operand),
                UnaryOperator::Convert => write!(f, "Convert({}, {})", operand, ty),
                UnaryOperator::Quote => write!(f, "{}", operand),
            },
            Expression::Binary {
                op, left, right, ..
            } => write!(f, "({} {} {})", left, op.symbol(), right),
            Expression::Conditional {
                test,
                if_true,
                if_false,
                ..
            } => write!(f, "IIF({}, {}, {})", test, if_true, if_false),
            Expression::Call {
                target,
                method,
                args,
                ..
            } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                match target {
                    Some(target) => write!(f, "{}.{}({})", target, method.name, args.join(", ")),
                    None => write!(f, "{:?}.{}({})", method.owner, method.name, args.join(", ")),
                }
            }
            Expression::Construct { ctor, args, .. } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                match ctor {
                    Constructor::Record(names) => {
                        let fields: Vec<String> = names
                            .iter()
                            .zip(&args)
                            .map(|(n, a)| format!("{} = {}", n, a))
                            .collect();
                        write!(f, "new {{ {} }}", fields.join(", "))
                    }
                    other => write!(f, "new {}({})", other, args.join(", ")),
                }
            }
            Expression::Lambda(lambda) => {
                let names: Vec<&str> = lambda.params.iter().map(|p| p.name.as_str()).collect();
                if names.len() == 1 {
                    write!(f, "{} => {}", names[0], lambda.body)
                } else {
                    write!(f, "({}) => {}", names.join(", "), lambda.body)
                }
            }
        }
    }
}
