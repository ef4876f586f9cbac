/// Fixed T-SQL mapping tables.
///
/// Templates use positional slots: `{0}` is the callee (empty for static
/// calls), `{1}`.. are the arguments. Property templates only use `{0}`.
/// TimeSpan properties map to a DATEDIFF unit instead of a template.
use crate::ast::{BinaryOperator, DeclaringType, MethodRef, TypeTag, UnaryOperator, ValueType};
use crate::error::{Error, Result};

pub(crate) fn binary_operator(op: BinaryOperator, any_operand_null: bool) -> Result<&'static str> {
    let sql = match op {
        BinaryOperator::Eq if any_operand_null => "IS",
        BinaryOperator::NotEq if any_operand_null => "IS NOT",
        BinaryOperator::Eq => "=",
        BinaryOperator::NotEq => "<>",
        BinaryOperator::Lt => "<",
        BinaryOperator::LtEq => "<=",
        BinaryOperator::Gt => ">",
        BinaryOperator::GtEq => ">=",
        BinaryOperator::And | BinaryOperator::BitAnd => "AND",
        BinaryOperator::Or | BinaryOperator::BitOr => "OR",
        BinaryOperator::Plus => "+",
        BinaryOperator::Minus => "-",
        BinaryOperator::Multiply => "*",
        BinaryOperator::Divide => "/",
        BinaryOperator::Modulo | BinaryOperator::BitXor | BinaryOperator::Coalesce => {
            return Err(Error::unsupported(format!(
                "Operator {:?} is not supported.",
                op
            )))
        }
    };
    Ok(sql)
}

pub(crate) fn unary_operator(op: UnaryOperator) -> Result<&'static str> {
    match op {
        UnaryOperator::Not => Ok("NOT"),
        UnaryOperator::Negate => Ok("-"),
        UnaryOperator::Quote => Ok(""),
        UnaryOperator::Convert | UnaryOperator::Plus => Err(Error::unsupported(format!(
            "Operator {:?} is not supported.",
            op
        ))),
    }
}

/// SQL type used by conversions to `ty`.
pub(crate) fn cast_type(ty: &ValueType) -> Option<&'static str> {
    match ty {
        ValueType::Int => Some("INT"),
        ValueType::Long => Some("BIGINT"),
        ValueType::Float => Some("REAL"),
        ValueType::Double => Some("FLOAT"),
        ValueType::String => Some("VARCHAR(MAX)"),
        ValueType::DateTime => Some("DATETIME"),
        ValueType::Decimal => Some("DECIMAL(10, 8)"),
        _ => None,
    }
}

struct MethodEntry {
    owner: DeclaringType,
    name: &'static str,
    params: &'static [TypeTag],
    template: &'static str,
}

const fn m(
    owner: DeclaringType,
    name: &'static str,
    params: &'static [TypeTag],
    template: &'static str,
) -> MethodEntry {
    MethodEntry {
        owner,
        name,
        params,
        template,
    }
}

use DeclaringType as D;
use TypeTag as T;

#[rustfmt::skip]
static METHODS: &[MethodEntry] = &[
    // String
    m(D::String, "StartsWith", &[T::String], "({0}) LIKE (({1}) + '%')"),
    m(D::String, "Contains", &[T::String], "({0}) LIKE ('%' + ({1}) + '%')"),
    m(D::String, "Substring", &[T::Int, T::Int], "SUBSTRING({0}, {1} + 1, {2})"),
    m(D::String, "Replace", &[T::String, T::String], "REPLACE({0}, {1}, {2})"),
    m(D::String, "TrimStart", &[T::Chars], "LTRIM({0})"),
    m(D::String, "TrimEnd", &[T::Chars], "RTRIM({0})"),
    m(D::String, "Trim", &[], "LTRIM(RTRIM({0}))"),
    m(D::String, "ToUpper", &[], "UPPER({0})"),
    m(D::String, "ToLower", &[], "LOWER({0})"),
    m(D::String, "IndexOf", &[T::String], "CHARINDEX({1}, {0}) - 1"),
    m(D::Int, "ToString", &[], "CONVERT(VARCHAR(MAX), {0})"),
    m(D::Long, "ToString", &[], "CONVERT(VARCHAR(MAX), {0})"),
    m(D::Double, "ToString", &[], "CONVERT(VARCHAR(MAX), {0})"),
    m(D::Decimal, "ToString", &[], "CONVERT(VARCHAR(MAX), {0})"),
    m(D::Int, "Parse", &[T::String], "CONVERT(INT, {1})"),
    m(D::Long, "Parse", &[T::String], "CONVERT(BIGINT, {1})"),
    m(D::Double, "Parse", &[T::String], "CONVERT(FLOAT, {1})"),
    m(D::Decimal, "Parse", &[T::String], "CONVERT(DECIMAL, {1})"),

    // DateTime
    m(D::DateTime, "Parse", &[T::String], "CONVERT(DATETIME, {1})"),
    m(D::DateTime, "Subtract", &[T::DateTime], "DATEDIFF({0}, {2}, {1})"),
    m(D::DateTime, "AddDays", &[T::Int], "DATEADD(day, {1}, {0})"),
    m(D::DateTime, "AddMonths", &[T::Int], "DATEADD(month, {1}, {0})"),
    m(D::DateTime, "AddYears", &[T::Int], "DATEADD(year, {1}, {0})"),
    m(D::DateTime, "AddHours", &[T::Int], "DATEADD(hour, {1}, {0})"),
    m(D::DateTime, "AddMinutes", &[T::Int], "DATEADD(minute, {1}, {0})"),
    m(D::DateTime, "AddSeconds", &[T::Int], "DATEADD(second, {1}, {0})"),
    m(D::DateTime, "AddMilliseconds", &[T::Int], "DATEADD(millisecond, {1}, {0})"),

    // Numbers / Math
    m(D::Math, "Abs", &[T::Int], "ABS({1})"),
    m(D::Math, "Abs", &[T::Long], "ABS({1})"),
    m(D::Math, "Abs", &[T::Float], "ABS({1})"),
    m(D::Math, "Abs", &[T::Double], "ABS({1})"),
    m(D::Math, "Abs", &[T::Decimal], "ABS({1})"),
    m(D::Math, "Acos", &[T::Double], "ACOS({1})"),
    m(D::Math, "Asin", &[T::Double], "ASIN({1})"),
    m(D::Math, "Atan", &[T::Double], "ATAN({1})"),
    m(D::Math, "Atan2", &[T::Double, T::Double], "ATN2({1}, {2})"),
    m(D::Math, "Ceiling", &[T::Decimal], "CEILING({1})"),
    m(D::Math, "Ceiling", &[T::Double], "CEILING({1})"),
    m(D::Math, "Cos", &[T::Double], "COS({1})"),
    m(D::Math, "Exp", &[T::Double], "EXP({1})"),
    m(D::Math, "Floor", &[T::Decimal], "FLOOR({1})"),
    m(D::Math, "Floor", &[T::Double], "FLOOR({1})"),
    m(D::Math, "Log", &[T::Double], "LOG({1})"),
    m(D::Math, "Log10", &[T::Double], "LOG10({1})"),
    m(D::Math, "Pow", &[T::Double, T::Double], "POWER({1}, {2})"),
    m(D::Math, "Round", &[T::Decimal, T::Int], "ROUND({1}, {2})"),
    m(D::Math, "Sign", &[T::Int], "SIGN({1})"),
    m(D::Math, "Sign", &[T::Long], "SIGN({1})"),
    m(D::Math, "Sign", &[T::Float], "SIGN({1})"),
    m(D::Math, "Sign", &[T::Double], "SIGN({1})"),
    m(D::Math, "Sign", &[T::Decimal], "SIGN({1})"),
    m(D::Math, "Sqrt", &[T::Double], "SQRT({1})"),
    m(D::Math, "Tan", &[T::Double], "TAN({1})"),
    m(D::Random, "NextDouble", &[], "RAND()"),
    m(D::Random, "Next", &[T::Int], "FLOOR(RAND()*{1})"),

    // Aggregates / sub-queries
    m(D::Group, "Count", &[], "COUNT(*)"),
    m(D::Group, "Count", &[T::Lambda], "COUNT({1})"),
    m(D::Group, "Sum", &[T::Lambda], "SUM({1})"),
    m(D::Group, "Average", &[T::Lambda], "AVG({1})"),
    m(D::Group, "Min", &[T::Lambda], "MIN({1})"),
    m(D::Group, "Max", &[T::Lambda], "MAX({1})"),
    m(D::Query, "Contains", &[T::Object], "{1} IN ({0})"),
];

/// Template for `method`. Generic declarations (groups, queries) match by
/// name and arity.
pub(crate) fn method(method: &MethodRef) -> Option<&'static str> {
    METHODS
        .iter()
        .find(|entry| {
            entry.owner == method.owner
                && entry.name == method.name
                && (entry.params == method.params.as_slice()
                    || (method.owner.is_generic() && entry.params.len() == method.params.len()))
        })
        .map(|entry| entry.template)
}

#[rustfmt::skip]
static PROPERTIES: &[(TypeTag, &str, &str)] = &[
    // String
    (T::String, "Length", "LEN({0})"),

    // DateTime
    (T::DateTime, "Year", "YEAR({0})"),
    (T::DateTime, "Month", "MONTH({0})"),
    (T::DateTime, "Day", "DAY({0})"),
    (T::DateTime, "DayOfWeek", "DATEPART(weekday, {0}) - 1"),
    (T::DateTime, "DayOfYear", "DATEPART(dayofyear, {0})"),
    (T::DateTime, "Hour", "DATEPART(hour, {0})"),
    (T::DateTime, "Minute", "DATEPART(minute, {0})"),
    (T::DateTime, "Second", "DATEPART(second, {0})"),
    (T::DateTime, "Millisecond", "DATEPART(millisecond, {0})"),
    (T::DateTime, "Now", "GETDATE()"),
    (T::DateTime, "UtcNow", "GETUTCDATE()"),
    (T::DateTime, "Today", "GETDATE()"),

    // TimeSpan units
    (T::TimeSpan, "Days", "day"),
    (T::TimeSpan, "TotalDays", "day"),
    (T::TimeSpan, "TotalHours", "hour"),
    (T::TimeSpan, "TotalMinutes", "minute"),
    (T::TimeSpan, "TotalSeconds", "second"),
    (T::TimeSpan, "TotalMilliseconds", "millisecond"),
];

pub(crate) fn property(owner: TypeTag, name: &str) -> Option<&'static str> {
    PROPERTIES
        .iter()
        .find(|(ty, prop, _)| *ty == owner && *prop == name)
        .map(|(_, _, template)| *template)
}

/// Substitute `{i}` slots with `args[i]`; missing arguments render empty.
pub(crate) fn fill(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len() + args.iter().map(String::len).sum::<usize>());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let slot = after
            .find('}')
            .and_then(|close| after[..close].parse::<usize>().ok().map(|index| (close, index)));
        match slot {
            Some((close, index)) => {
                if let Some(arg) = args.get(index) {
                    out.push_str(arg);
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
