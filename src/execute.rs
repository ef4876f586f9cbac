/// Hand-off point to whatever actually runs commands.
///
/// The crate never talks to a database itself. A driver integration
/// implements [`CommandExecutor`] and receives fully compiled commands.
use anyhow::Result;

use crate::compiler::ParameterizedSql;

/// Runs a compiled command and materialises its rows.
///
/// # Example
///
/// ```ignore
/// struct Logged;
///
/// impl CommandExecutor for Logged {
///     type Row = serde_json::Value;
///     fn execute(&self, command: &ParameterizedSql) -> Result<Vec<Self::Row>> {
///         println!("{}", serde_json::to_string(command)?);
///         Ok(vec![])
///     }
/// }
/// ```
pub trait CommandExecutor {
    type Row;

    fn execute(&self, command: &ParameterizedSql) -> Result<Vec<Self::Row>>;
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for &E {
    type Row = E::Row;

    fn execute(&self, command: &ParameterizedSql) -> Result<Vec<Self::Row>> {
        (**self).execute(command)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::ast::{Lambda, ModelType, Value, ValueType};
    use crate::query::QueryBuilder;

    #[derive(Default)]
    struct Recording {
        seen: RefCell<Vec<ParameterizedSql>>,
    }

    impl CommandExecutor for Recording {
        type Row = String;

        fn execute(&self, command: &ParameterizedSql) -> Result<Vec<String>> {
            self.seen.borrow_mut().push(command.clone());
            Ok(vec!["jacenty".to_string()])
        }
    }

    fn user() -> ModelType {
        ModelType::builder("User")
            .field("Login", ValueType::String)
            .build()
    }

    #[test]
    fn test_execute_with_passes_compiled_command() -> Result<()> {
        let query = QueryBuilder::new().table_of(user());
        let u = query.param("u");
        let query = query.filter(Lambda::unary(&u, u.field("Login").starts_with("jac")))?;

        let executor = Recording::default();
        let rows = query.execute_with(&executor)?;
        assert_eq!(rows, vec!["jacenty".to_string()]);

        let seen = executor.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].text,
            "SELECT * FROM [User] [u] WHERE ([u].[Login]) LIKE ((@p0) + '%')"
        );
        assert_eq!(seen[0].parameters.get("@p0"), Some(&Value::from("jac")));
        Ok(())
    }

    #[test]
    fn test_compile_errors_reach_caller() {
        let query = QueryBuilder::new().table_of(user());
        let u = query.param("u");
        let query = query
            .filter(Lambda::unary(&u, u.field("Login").coalesce("x").equals("x")))
            .unwrap();
        let executor = Recording::default();
        let err = query.execute_with(&executor).unwrap_err();
        assert!(err.to_string().contains("Coalesce"));
        assert!(executor.seen.borrow().is_empty());
    }
}
