/// Table and column naming.
///
/// The compiler never emits an identifier without going through a
/// [`NameResolver`], so naming conventions can be swapped without touching
/// the translation rules.
use serde::{Deserialize, Serialize};

use crate::ast::{MemberRef, ModelType};

/// Maps models to table names and members to column names.
///
/// Implementations must be pure: the same input always yields the same name.
pub trait NameResolver: Send + Sync {
    fn table_name(&self, model: &ModelType) -> String;

    fn column_name(&self, member: &MemberRef) -> String;
}

/// Identity mapping: model name is the table name, member name the column.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNameResolver;

impl NameResolver for DefaultNameResolver {
    fn table_name(&self, model: &ModelType) -> String {
        model.name().to_string()
    }

    fn column_name(&self, member: &MemberRef) -> String {
        member.name.clone()
    }
}

/// Letter case applied to a resolved identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Case {
    #[default]
    Preserve,
    Lower,
    Upper,
    /// `LoginAttempts` becomes `login_attempts`.
    Snake,
}

impl Case {
    pub fn apply(self, name: &str) -> String {
        match self {
            Case::Preserve => name.to_string(),
            Case::Lower => name.to_lowercase(),
            Case::Upper => name.to_uppercase(),
            Case::Snake => to_snake_case(name),
        }
    }
}

fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p == '_' => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Prefix + case convention, usually built from a `NamingConfig`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConventionNameResolver {
    pub table_prefix: String,
    pub column_prefix: String,
    pub table_case: Case,
    pub column_case: Case,
}

impl ConventionNameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    pub fn with_column_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.column_prefix = prefix.into();
        self
    }

    pub fn with_table_case(mut self, case: Case) -> Self {
        self.table_case = case;
        self
    }

    pub fn with_column_case(mut self, case: Case) -> Self {
        self.column_case = case;
        self
    }
}

impl NameResolver for ConventionNameResolver {
    fn table_name(&self, model: &ModelType) -> String {
        format!("{}{}", self.table_prefix, self.table_case.apply(model.name()))
    }

    fn column_name(&self, member: &MemberRef) -> String {
        format!("{}{}", self.column_prefix, self.column_case.apply(&member.name))
    }
}
