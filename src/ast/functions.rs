/// AST-builder combinators.
///
/// Comparisons, boolean connectives and member access are inherent methods on
/// [`Expression`]; arithmetic and negation go through the `std::ops` traits.
/// Static members (`now()`, `today()`, parsing, math) are free functions.
///
/// ```ignore
/// let u = users.param("u");
/// let pred = Lambda::unary(&u, u.field("Login").starts_with("jac") & !u.field("Disabled"));
/// ```
use std::ops;

use super::expr::{
    BinaryOperator, Constructor, DeclaringType, Expression, Lambda, MemberRef, MethodRef,
    UnaryOperator,
};
use super::types::{TypeTag, ValueType};

fn binary(op: BinaryOperator, left: Expression, right: Expression, ty: ValueType) -> Expression {
    Expression::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
        ty,
    }
}

fn unary(op: UnaryOperator, operand: Expression, ty: ValueType) -> Expression {
    Expression::Unary {
        op,
        operand: Box::new(operand),
        ty,
    }
}

fn call(
    target: Option<Expression>,
    owner: DeclaringType,
    name: &str,
    params: Vec<TypeTag>,
    args: Vec<Expression>,
    ty: ValueType,
) -> Expression {
    Expression::Call {
        target: target.map(Box::new),
        method: MethodRef::new(owner, name, params),
        args,
        ty,
    }
}

fn property(target: Option<Expression>, owner: ValueType, name: &str, ty: ValueType) -> Expression {
    Expression::Member {
        target: target.map(Box::new),
        member: MemberRef::new(owner, name),
        ty,
    }
}

impl Expression {
    /// Access a named field of a model, record or group.
    pub fn field(self, name: &str) -> Expression {
        let owner = self.ty();
        let ty = owner.field_type(name);
        property(Some(self), owner, name, ty)
    }

    pub fn equals(self, other: impl Into<Expression>) -> Expression {
        binary(BinaryOperator::Eq, self, other.into(), ValueType::Bool)
    }

    pub fn not_equals(self, other: impl Into<Expression>) -> Expression {
        binary(BinaryOperator::NotEq, self, other.into(), ValueType::Bool)
    }

    pub fn less_than(self, other: impl Into<Expression>) -> Expression {
        binary(BinaryOperator::Lt, self, other.into(), ValueType::Bool)
    }

    pub fn less_or_equal(self, other: impl Into<Expression>) -> Expression {
        binary(BinaryOperator::LtEq, self, other.into(), ValueType::Bool)
    }

    pub fn greater_than(self, other: impl Into<Expression>) -> Expression {
        binary(BinaryOperator::Gt, self, other.into(), ValueType::Bool)
    }

    pub fn greater_or_equal(self, other: impl Into<Expression>) -> Expression {
        binary(BinaryOperator::GtEq, self, other.into(), ValueType::Bool)
    }

    pub fn and(self, other: impl Into<Expression>) -> Expression {
        binary(BinaryOperator::And, self, other.into(), ValueType::Bool)
    }

    pub fn or(self, other: impl Into<Expression>) -> Expression {
        binary(BinaryOperator::Or, self, other.into(), ValueType::Bool)
    }

    /// `left ?? right`. Has no SQL translation.
    pub fn coalesce(self, other: impl Into<Expression>) -> Expression {
        let ty = self.ty();
        binary(BinaryOperator::Coalesce, self, other.into(), ty)
    }

    /// Explicit conversion to `ty`.
    pub fn cast(self, ty: ValueType) -> Expression {
        unary(UnaryOperator::Convert, self, ty)
    }

    // String

    pub fn starts_with(self, prefix: impl Into<Expression>) -> Expression {
        call(
            Some(self),
            DeclaringType::String,
            "StartsWith",
            vec![TypeTag::String],
            vec![prefix.into()],
            ValueType::Bool,
        )
    }

    /// Substring match on strings, membership test on captured queries.
    pub fn contains(self, item: impl Into<Expression>) -> Expression {
        match self.ty() {
            ValueType::Query(_) => call(
                Some(self),
                DeclaringType::Query,
                "Contains",
                vec![TypeTag::Object],
                vec![item.into()],
                ValueType::Bool,
            ),
            _ => call(
                Some(self),
                DeclaringType::String,
                "Contains",
                vec![TypeTag::String],
                vec![item.into()],
                ValueType::Bool,
            ),
        }
    }

    /// Zero-based `start`, like the model's string API.
    pub fn substring(self, start: impl Into<Expression>, length: impl Into<Expression>) -> Expression {
        call(
            Some(self),
            DeclaringType::String,
            "Substring",
            vec![TypeTag::Int, TypeTag::Int],
            vec![start.into(), length.into()],
            ValueType::String,
        )
    }

    pub fn replace(self, from: impl Into<Expression>, to: impl Into<Expression>) -> Expression {
        call(
            Some(self),
            DeclaringType::String,
            "Replace",
            vec![TypeTag::String, TypeTag::String],
            vec![from.into(), to.into()],
            ValueType::String,
        )
    }

    pub fn trim(self) -> Expression {
        call(Some(self), DeclaringType::String, "Trim", vec![], vec![], ValueType::String)
    }

    pub fn trim_start(self) -> Expression {
        call(
            Some(self),
            DeclaringType::String,
            "TrimStart",
            vec![TypeTag::Chars],
            vec![],
            ValueType::String,
        )
    }

    pub fn trim_end(self) -> Expression {
        call(
            Some(self),
            DeclaringType::String,
            "TrimEnd",
            vec![TypeTag::Chars],
            vec![],
            ValueType::String,
        )
    }

    pub fn to_upper(self) -> Expression {
        call(Some(self), DeclaringType::String, "ToUpper", vec![], vec![], ValueType::String)
    }

    pub fn to_lower(self) -> Expression {
        call(Some(self), DeclaringType::String, "ToLower", vec![], vec![], ValueType::String)
    }

    /// Zero-based position of `needle`, -1 when absent.
    pub fn index_of(self, needle: impl Into<Expression>) -> Expression {
        call(
            Some(self),
            DeclaringType::String,
            "IndexOf",
            vec![TypeTag::String],
            vec![needle.into()],
            ValueType::Int,
        )
    }

    pub fn len(self) -> Expression {
        property(Some(self), ValueType::String, "Length", ValueType::Int)
    }

    /// Textual form of a number.
    pub fn to_text(self) -> Expression {
        let owner = match self.ty() {
            ValueType::Int => DeclaringType::Int,
            ValueType::Long => DeclaringType::Long,
            ValueType::Double => DeclaringType::Double,
            ValueType::Decimal => DeclaringType::Decimal,
            _ => DeclaringType::String,
        };
        call(Some(self), owner, "ToString", vec![], vec![], ValueType::String)
    }

    // DateTime

    fn date_part(self, name: &str) -> Expression {
        property(Some(self), ValueType::DateTime, name, ValueType::Int)
    }

    pub fn year(self) -> Expression {
        self.date_part("Year")
    }

    pub fn month(self) -> Expression {
        self.date_part("Month")
    }

    pub fn day(self) -> Expression {
        self.date_part("Day")
    }

    /// Sunday is 0.
    pub fn day_of_week(self) -> Expression {
        self.date_part("DayOfWeek")
    }

    pub fn day_of_year(self) -> Expression {
        self.date_part("DayOfYear")
    }

    pub fn hour(self) -> Expression {
        self.date_part("Hour")
    }

    pub fn minute(self) -> Expression {
        self.date_part("Minute")
    }

    pub fn second(self) -> Expression {
        self.date_part("Second")
    }

    pub fn millisecond(self) -> Expression {
        self.date_part("Millisecond")
    }

    /// Difference between two dates, read through one of the duration
    /// accessors (`days()`, `total_hours()`, ...).
    pub fn subtract(self, other: impl Into<Expression>) -> Expression {
        call(
            Some(self),
            DeclaringType::DateTime,
            "Subtract",
            vec![TypeTag::DateTime],
            vec![other.into()],
            ValueType::TimeSpan,
        )
    }

    fn date_add(self, name: &str, amount: Expression) -> Expression {
        call(
            Some(self),
            DeclaringType::DateTime,
            name,
            vec![TypeTag::Int],
            vec![amount],
            ValueType::DateTime,
        )
    }

    pub fn add_days(self, n: impl Into<Expression>) -> Expression {
        self.date_add("AddDays", n.into())
    }

    pub fn add_months(self, n: impl Into<Expression>) -> Expression {
        self.date_add("AddMonths", n.into())
    }

    pub fn add_years(self, n: impl Into<Expression>) -> Expression {
        self.date_add("AddYears", n.into())
    }

    pub fn add_hours(self, n: impl Into<Expression>) -> Expression {
        self.date_add("AddHours", n.into())
    }

    pub fn add_minutes(self, n: impl Into<Expression>) -> Expression {
        self.date_add("AddMinutes", n.into())
    }

    pub fn add_seconds(self, n: impl Into<Expression>) -> Expression {
        self.date_add("AddSeconds", n.into())
    }

    pub fn add_milliseconds(self, n: impl Into<Expression>) -> Expression {
        self.date_add("AddMilliseconds", n.into())
    }

    // TimeSpan

    pub fn days(self) -> Expression {
        property(Some(self), ValueType::TimeSpan, "Days", ValueType::Int)
    }

    fn total(self, name: &str) -> Expression {
        property(Some(self), ValueType::TimeSpan, name, ValueType::Double)
    }

    pub fn total_days(self) -> Expression {
        self.total("TotalDays")
    }

    pub fn total_hours(self) -> Expression {
        self.total("TotalHours")
    }

    pub fn total_minutes(self) -> Expression {
        self.total("TotalMinutes")
    }

    pub fn total_seconds(self) -> Expression {
        self.total("TotalSeconds")
    }

    pub fn total_milliseconds(self) -> Expression {
        self.total("TotalMilliseconds")
    }

    // Random

    pub fn next_double(self) -> Expression {
        call(Some(self), DeclaringType::Random, "NextDouble", vec![], vec![], ValueType::Double)
    }

    /// Random integer in `[0, max)`.
    pub fn next(self, max: impl Into<Expression>) -> Expression {
        call(
            Some(self),
            DeclaringType::Random,
            "Next",
            vec![TypeTag::Int],
            vec![max.into()],
            ValueType::Int,
        )
    }

    // Groups

    /// The grouping key.
    pub fn key(self) -> Expression {
        self.field("Key")
    }

    pub fn count(self) -> Expression {
        call(Some(self), DeclaringType::Group, "Count", vec![], vec![], ValueType::Int)
    }

    pub fn count_of(self, selector: Lambda) -> Expression {
        self.aggregate("Count", selector, Some(ValueType::Int))
    }

    pub fn sum(self, selector: Lambda) -> Expression {
        self.aggregate("Sum", selector, None)
    }

    pub fn average(self, selector: Lambda) -> Expression {
        self.aggregate("Average", selector, None)
    }

    pub fn min(self, selector: Lambda) -> Expression {
        self.aggregate("Min", selector, None)
    }

    pub fn max(self, selector: Lambda) -> Expression {
        self.aggregate("Max", selector, None)
    }

    fn aggregate(self, name: &str, selector: Lambda, ty: Option<ValueType>) -> Expression {
        let ty = ty.unwrap_or_else(|| selector.body.ty());
        call(
            Some(self),
            DeclaringType::Group,
            name,
            vec![TypeTag::Lambda],
            vec![selector.quote()],
            ty,
        )
    }
}

/// `test ? if_true : if_false`.
pub fn iif(
    test: impl Into<Expression>,
    if_true: impl Into<Expression>,
    if_false: impl Into<Expression>,
) -> Expression {
    let if_true = if_true.into();
    let ty = if_true.ty();
    Expression::Conditional {
        test: Box::new(test.into()),
        if_true: Box::new(if_true),
        if_false: Box::new(if_false.into()),
        ty,
    }
}

pub fn now() -> Expression {
    property(None, ValueType::DateTime, "Now", ValueType::DateTime)
}

pub fn utc_now() -> Expression {
    property(None, ValueType::DateTime, "UtcNow", ValueType::DateTime)
}

pub fn today() -> Expression {
    property(None, ValueType::DateTime, "Today", ValueType::DateTime)
}

/// `new DateTime(year, month, day[, hour, minute, second, millisecond])`.
pub fn new_datetime(parts: impl IntoIterator<Item = Expression>) -> Expression {
    Expression::Construct {
        ctor: Constructor::DateTime,
        args: parts.into_iter().collect(),
        ty: ValueType::DateTime,
    }
}

pub fn new_random() -> Expression {
    Expression::Construct {
        ctor: Constructor::Random,
        args: Vec::new(),
        ty: ValueType::Random,
    }
}

fn parse(owner: DeclaringType, text: Expression, ty: ValueType) -> Expression {
    call(None, owner, "Parse", vec![TypeTag::String], vec![text], ty)
}

pub fn parse_int(text: impl Into<Expression>) -> Expression {
    parse(DeclaringType::Int, text.into(), ValueType::Int)
}

pub fn parse_long(text: impl Into<Expression>) -> Expression {
    parse(DeclaringType::Long, text.into(), ValueType::Long)
}

pub fn parse_double(text: impl Into<Expression>) -> Expression {
    parse(DeclaringType::Double, text.into(), ValueType::Double)
}

pub fn parse_decimal(text: impl Into<Expression>) -> Expression {
    parse(DeclaringType::Decimal, text.into(), ValueType::Decimal)
}

pub fn parse_datetime(text: impl Into<Expression>) -> Expression {
    parse(DeclaringType::DateTime, text.into(), ValueType::DateTime)
}

/// Static math functions.
///
/// Functions defined only for doubles convert other numeric arguments first,
/// so `math::sqrt(u.field("Id"))` renders `SQRT(CONVERT(FLOAT, [u].[Id]))`.
pub mod math {
    use super::*;

    const ANY_NUMBER: &[TypeTag] = &[
        TypeTag::Int,
        TypeTag::Long,
        TypeTag::Float,
        TypeTag::Double,
        TypeTag::Decimal,
    ];
    const ROUNDABLE: &[TypeTag] = &[TypeTag::Double, TypeTag::Decimal];

    fn numeric(x: Expression, accepted: &[TypeTag]) -> (Expression, TypeTag) {
        let tag = x.ty().tag();
        if accepted.contains(&tag) {
            (x, tag)
        } else {
            (x.cast(ValueType::Double), TypeTag::Double)
        }
    }

    fn result_type(tag: TypeTag) -> ValueType {
        match tag {
            TypeTag::Int => ValueType::Int,
            TypeTag::Long => ValueType::Long,
            TypeTag::Float => ValueType::Float,
            TypeTag::Decimal => ValueType::Decimal,
            _ => ValueType::Double,
        }
    }

    fn overloaded(name: &str, x: Expression, accepted: &[TypeTag]) -> Expression {
        let (x, tag) = numeric(x, accepted);
        call(None, DeclaringType::Math, name, vec![tag], vec![x], result_type(tag))
    }

    fn double(name: &str, args: Vec<Expression>) -> Expression {
        let args: Vec<Expression> = args.into_iter().map(|a| numeric(a, &[TypeTag::Double]).0).collect();
        let params = vec![TypeTag::Double; args.len()];
        call(None, DeclaringType::Math, name, params, args, ValueType::Double)
    }

    pub fn abs(x: impl Into<Expression>) -> Expression {
        overloaded("Abs", x.into(), ANY_NUMBER)
    }

    pub fn sign(x: impl Into<Expression>) -> Expression {
        let (x, tag) = numeric(x.into(), ANY_NUMBER);
        call(None, DeclaringType::Math, "Sign", vec![tag], vec![x], ValueType::Int)
    }

    pub fn ceiling(x: impl Into<Expression>) -> Expression {
        overloaded("Ceiling", x.into(), ROUNDABLE)
    }

    pub fn floor(x: impl Into<Expression>) -> Expression {
        overloaded("Floor", x.into(), ROUNDABLE)
    }

    /// Decimal rounding to `digits` places.
    pub fn round(x: impl Into<Expression>, digits: impl Into<Expression>) -> Expression {
        let x = x.into();
        let x = if x.ty() == ValueType::Decimal {
            x
        } else {
            x.cast(ValueType::Decimal)
        };
        call(
            None,
            DeclaringType::Math,
            "Round",
            vec![TypeTag::Decimal, TypeTag::Int],
            vec![x, digits.into()],
            ValueType::Decimal,
        )
    }

    pub fn acos(x: impl Into<Expression>) -> Expression {
        double("Acos", vec![x.into()])
    }

    pub fn asin(x: impl Into<Expression>) -> Expression {
        double("Asin", vec![x.into()])
    }

    pub fn atan(x: impl Into<Expression>) -> Expression {
        double("Atan", vec![x.into()])
    }

    pub fn atan2(y: impl Into<Expression>, x: impl Into<Expression>) -> Expression {
        double("Atan2", vec![y.into(), x.into()])
    }

    pub fn cos(x: impl Into<Expression>) -> Expression {
        double("Cos", vec![x.into()])
    }

    pub fn tan(x: impl Into<Expression>) -> Expression {
        double("Tan", vec![x.into()])
    }

    pub fn exp(x: impl Into<Expression>) -> Expression {
        double("Exp", vec![x.into()])
    }

    pub fn log(x: impl Into<Expression>) -> Expression {
        double("Log", vec![x.into()])
    }

    pub fn log10(x: impl Into<Expression>) -> Expression {
        double("Log10", vec![x.into()])
    }

    pub fn pow(x: impl Into<Expression>, y: impl Into<Expression>) -> Expression {
        double("Pow", vec![x.into(), y.into()])
    }

    pub fn sqrt(x: impl Into<Expression>) -> Expression {
        double("Sqrt", vec![x.into()])
    }
}

impl ops::Not for Expression {
    type Output = Expression;

    fn not(self) -> Expression {
        let ty = self.ty();
        unary(UnaryOperator::Not, self, ty)
    }
}

impl ops::Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Expression {
        let ty = self.ty();
        unary(UnaryOperator::Negate, self, ty)
    }
}

macro_rules! arithmetic {
    ($($trait:ident, $method:ident => $op:ident;)*) => {
        $(
            impl<R: Into<Expression>> ops::$trait<R> for Expression {
                type Output = Expression;

                fn $method(self, rhs: R) -> Expression {
                    let ty = self.ty();
                    binary(BinaryOperator::$op, self, rhs.into(), ty)
                }
            }
        )*
    };
}

arithmetic! {
    Add, add => Plus;
    Sub, sub => Minus;
    Mul, mul => Multiply;
    Div, div => Divide;
    Rem, rem => Modulo;
    BitAnd, bitand => BitAnd;
    BitOr, bitor => BitOr;
    BitXor, bitxor => BitXor;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::expr::Param;
    use crate::ast::types::ModelType;

    fn user() -> Param {
        let ty = ModelType::builder("User")
            .field("Id", ValueType::Int)
            .field("Login", ValueType::String)
            .field("BirthDate", ValueType::DateTime)
            .build();
        Param::new("u", ValueType::Model(ty))
    }

    #[test]
    fn test_comparisons_are_boolean() {
        let u = user();
        assert_eq!(u.field("Id").greater_than(3).ty(), ValueType::Bool);
        assert_eq!((!u.field("Login").equals("x")).ty(), ValueType::Bool);
    }

    #[test]
    fn test_arithmetic_keeps_left_type() {
        let u = user();
        assert_eq!((u.field("Login") + " ").ty(), ValueType::String);
        assert_eq!((-u.field("Id")).ty(), ValueType::Int);
    }

    #[test]
    fn test_contains_dispatches_on_target_type() {
        let u = user();
        match u.field("Login").contains("cent") {
            Expression::Call { method, .. } => assert_eq!(method.owner, DeclaringType::String),
            other => panic!("unexpected {:?}", other),
        }
        let query = Expression::Member {
            target: None,
            member: MemberRef::new(ValueType::Closure, "q"),
            ty: ValueType::Query(Box::new(ValueType::Int)),
        };
        match query.contains(u.field("Id")) {
            Expression::Call { method, .. } => assert_eq!(method.owner, DeclaringType::Query),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_total_durations_are_floating() {
        let u = user();
        let span = today().subtract(u.field("BirthDate"));
        assert_eq!(span.ty(), ValueType::TimeSpan);
        assert_eq!(span.clone().days().ty(), ValueType::Int);
        assert_eq!(span.total_hours().ty(), ValueType::Double);
    }

    #[test]
    fn test_math_converts_integers_for_double_functions() {
        let u = user();
        match math::sqrt(u.field("Id")) {
            Expression::Call { args, method, .. } => {
                assert_eq!(method.params, vec![TypeTag::Double]);
                assert!(matches!(
                    args[0],
                    Expression::Unary {
                        op: UnaryOperator::Convert,
                        ..
                    }
                ));
            }
            other => panic!("unexpected {:?}", other),
        }
        match math::abs(u.field("Id")) {
            Expression::Call { method, ty, .. } => {
                assert_eq!(method.params, vec![TypeTag::Int]);
                assert_eq!(ty, ValueType::Int);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_aggregate_quotes_selector() {
        let u = user();
        let g = Param::new("g", ValueType::group(ValueType::String, u.ty.clone()));
        match g.expr().sum(Lambda::unary(&u, u.field("Id"))) {
            Expression::Call { args, ty, .. } => {
                assert_eq!(ty, ValueType::Int);
                assert!(matches!(
                    args[0],
                    Expression::Unary {
                        op: UnaryOperator::Quote,
                        ..
                    }
                ));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
