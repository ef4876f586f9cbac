/// Query expression AST.
///
/// ```text
/// types.rs      value types, model descriptors, literals
/// expr.rs       expression tree, lambdas, captured closures
/// functions.rs  combinators that build expression trees
/// ```
pub mod expr;
pub mod functions;
pub mod types;

pub use expr::{
    BinaryOperator, Captured, Closure, Constant, Constructor, DeclaringType, Expression, Lambda,
    MemberRef, MethodRef, Param, UnaryOperator,
};
pub use functions::{
    iif, math, new_datetime, new_random, now, parse_datetime, parse_decimal, parse_double,
    parse_int, parse_long, today, utc_now,
};
pub use types::{Field, Model, ModelType, ModelTypeBuilder, TypeTag, Value, ValueType};
