/// Naming-convention configuration.
///
/// Stored as TOML in `<config_dir>/typesafe-sql/naming.toml`:
///
/// ```toml
/// table_prefix = "TBL_"
/// column_prefix = ""
/// table_case = "snake"
/// column_case = "preserve"
/// ```
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::naming::{Case, ConventionNameResolver};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    pub table_prefix: String,
    pub column_prefix: String,
    pub table_case: Case,
    pub column_case: Case,
}

impl NamingConfig {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("typesafe-sql")
            .join("naming.toml")
    }

    /// Load from the default location. A missing file yields the identity
    /// configuration.
    pub fn load_default() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            debug!(path = %path.display(), "no naming config, using defaults");
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("{}: {}", parent.display(), e)))?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn resolver(&self) -> ConventionNameResolver {
        ConventionNameResolver::new()
            .with_table_prefix(self.table_prefix.clone())
            .with_column_prefix(self.column_prefix.clone())
            .with_table_case(self.table_case)
            .with_column_case(self.column_case)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{MemberRef, ModelType, ValueType};
    use crate::naming::NameResolver;

    #[test]
    fn test_parse_partial_config() -> Result<()> {
        let config = NamingConfig::from_toml_str("table_prefix = \"TBL_\"\ncolumn_case = \"snake\"\n")?;
        assert_eq!(config.table_prefix, "TBL_");
        assert_eq!(config.column_prefix, "");
        assert_eq!(config.table_case, Case::Preserve);
        assert_eq!(config.column_case, Case::Snake);
        Ok(())
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let err = NamingConfig::from_toml_str("table_case = \"camel\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = NamingConfig::load(Path::new("/nonexistent/typesafe-sql/naming.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let path = std::env::temp_dir()
            .join(format!("typesafe-sql-{}", std::process::id()))
            .join("naming.toml");
        let config = NamingConfig {
            table_prefix: "TBL_".into(),
            column_prefix: "col_".into(),
            table_case: Case::Upper,
            column_case: Case::Lower,
        };
        config.save(&path)?;
        assert_eq!(NamingConfig::load(&path)?, config);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
        Ok(())
    }

    #[test]
    fn test_resolver_from_config() -> Result<()> {
        let config = NamingConfig::from_toml_str(
            "table_prefix = \"TBL_\"\ncolumn_prefix = \"col_\"\ntable_case = \"snake\"\n",
        )?;
        let resolver = config.resolver();
        let model = ModelType::builder("UserRoleLink")
            .field("RoleId", ValueType::Int)
            .build();
        let member = MemberRef::new(ValueType::Model(model.clone()), "RoleId");
        assert_eq!(resolver.table_name(&model), "TBL_user_role_link");
        assert_eq!(resolver.column_name(&member), "col_RoleId");
        Ok(())
    }

    #[test]
    fn test_config_path_location() {
        let path = NamingConfig::config_path();
        assert!(path.ends_with("typesafe-sql/naming.toml"));
    }
}
