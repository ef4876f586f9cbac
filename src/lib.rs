//! Typed, fluent query descriptions compiled to parameterized T-SQL.
//!
//! ```ignore
//! let users = QueryBuilder::new().table::<User>();
//! let u = users.param("u");
//! let command = users
//!     .filter(Lambda::unary(&u, u.field("Login").starts_with("jac")))?
//!     .select(Lambda::unary(&u, u.field("Email")))?
//!     .to_sql()?;
//! // SELECT [u].[Email] FROM [User] [u] WHERE ([u].[Login]) LIKE ((@p0) + '%')
//! ```
pub mod ast;
pub mod compiler;
pub mod config;
pub mod error;
pub mod execute;
pub mod naming;
pub mod query;

pub use ast::{Closure, Expression, Lambda, Model, ModelType, Param, Value, ValueType};
pub use compiler::{ParameterizedSql, Parameters, SqlCompiler};
pub use config::NamingConfig;
pub use error::{Error, Result};
pub use execute::CommandExecutor;
pub use naming::{Case, ConventionNameResolver, DefaultNameResolver, NameResolver};
pub use query::{Query, QueryBuilder};
