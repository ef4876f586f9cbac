//! Static types and literal values of the query AST.
//!
//! Every expression node carries a [`ValueType`]. The compiler needs it for
//! three things: deciding whether a boolean member renders as a condition,
//! picking the SQL type of a cast, and discovering table aliases by matching
//! lambda parameter types against the model type of a query node.
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

/// Static result type of an expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Int,
    Long,
    Float,
    Double,
    Decimal,
    String,
    DateTime,
    TimeSpan,
    /// Pseudo-random generator; only its methods translate.
    Random,
    /// A mapped model or an ad-hoc record (projection / transparent join row).
    Model(ModelType),
    /// A group produced by `group_by`, exposing `Key` and aggregates.
    Group {
        key: Box<ValueType>,
        element: Box<ValueType>,
    },
    /// A query whose rows have the given type (used for membership tests).
    Query(Box<ValueType>),
    /// An environment of captured values.
    Closure,
    Object,
}

impl ValueType {
    pub fn group(key: ValueType, element: ValueType) -> Self {
        ValueType::Group {
            key: Box::new(key),
            element: Box::new(element),
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, ValueType::Bool)
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, ValueType::Float | ValueType::Double)
    }

    /// Named members visible on values of this type.
    ///
    /// Models and records expose their declared fields; a group exposes only
    /// its `Key`. Everything else has no fields.
    pub fn fields(&self) -> Vec<Field> {
        match self {
            ValueType::Model(model) => model.fields().to_vec(),
            ValueType::Group { key, .. } => vec![Field::new("Key", (**key).clone())],
            _ => Vec::new(),
        }
    }

    /// Type of the named member, or [`ValueType::Object`] when unknown.
    pub fn field_type(&self, name: &str) -> ValueType {
        self.fields()
            .into_iter()
            .find(|f| f.name == name)
            .map(|f| f.ty)
            .unwrap_or(ValueType::Object)
    }

    pub fn tag(&self) -> TypeTag {
        match self {
            ValueType::Bool => TypeTag::Bool,
            ValueType::Int => TypeTag::Int,
            ValueType::Long => TypeTag::Long,
            ValueType::Float => TypeTag::Float,
            ValueType::Double => TypeTag::Double,
            ValueType::Decimal => TypeTag::Decimal,
            ValueType::String => TypeTag::String,
            ValueType::DateTime => TypeTag::DateTime,
            ValueType::TimeSpan => TypeTag::TimeSpan,
            ValueType::Random => TypeTag::Random,
            ValueType::Model(_) => TypeTag::Model,
            ValueType::Group { .. } => TypeTag::Group,
            ValueType::Query(_) => TypeTag::Query,
            ValueType::Closure => TypeTag::Closure,
            ValueType::Object => TypeTag::Object,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Model(model) => write!(f, "{}", model.name()),
            ValueType::Group { key, element } => write!(f, "Group<{}, {}>", key, element),
            ValueType::Query(row) => write!(f, "Query<{}>", row),
            other => write!(f, "{:?}", other.tag()),
        }
    }
}

/// Shape-only view of a [`ValueType`], used to key method signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Bool,
    Int,
    Long,
    Float,
    Double,
    Decimal,
    String,
    Chars,
    DateTime,
    TimeSpan,
    Random,
    Model,
    Group,
    Query,
    Closure,
    Lambda,
    Object,
}

/// A named member of a model or record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub ty: ValueType,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct ModelDef {
    name: String,
    fields: Vec<Field>,
    record: bool,
}

/// Descriptor of a model type (mapped to a table) or an ad-hoc record.
///
/// Cheap to clone; equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelType(Arc<ModelDef>);

impl ModelType {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self(Arc::new(ModelDef {
            name: name.into(),
            fields,
            record: false,
        }))
    }

    /// Start describing a model field by field.
    pub fn builder(name: impl Into<String>) -> ModelTypeBuilder {
        ModelTypeBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// An anonymous record type, as produced by a projection or a join result.
    pub fn record(fields: Vec<Field>) -> Self {
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        let name = format!("{{ {} }}", names.join(", "));
        Self(Arc::new(ModelDef {
            name,
            fields,
            record: true,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.0.fields
    }

    pub fn is_record(&self) -> bool {
        self.0.record
    }
}

pub struct ModelTypeBuilder {
    name: String,
    fields: Vec<Field>,
}

impl ModelTypeBuilder {
    pub fn field(mut self, name: impl Into<String>, ty: ValueType) -> Self {
        self.fields.push(Field::new(name, ty));
        self
    }

    pub fn build(self) -> ModelType {
        ModelType::new(self.name, self.fields)
    }
}

/// Implemented by Rust types that describe a mapped table.
///
/// ```ignore
/// struct User;
///
/// impl Model for User {
///     fn model_type() -> ModelType {
///         ModelType::builder("User")
///             .field("Id", ValueType::Int)
///             .field("Login", ValueType::String)
///             .build()
///     }
/// }
/// ```
pub trait Model {
    fn model_type() -> ModelType;
}

/// A literal bound as a command parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    String(String),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Object,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Long(_) => ValueType::Long,
            Value::Float(_) => ValueType::Float,
            Value::Double(_) => ValueType::Double,
            Value::Decimal(_) => ValueType::Decimal,
            Value::String(_) => ValueType::String,
            Value::DateTime(_) => ValueType::DateTime,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}", l),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::DateTime(dt) => write!(f, "{}", dt),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> ModelType {
        ModelType::builder("User")
            .field("Id", ValueType::Int)
            .field("Login", ValueType::String)
            .field("Disabled", ValueType::Bool)
            .build()
    }

    #[test]
    fn test_model_fields_and_lookup() {
        let ty = ValueType::Model(user());
        assert_eq!(ty.fields().len(), 3);
        assert_eq!(ty.field_type("Login"), ValueType::String);
        assert_eq!(ty.field_type("Missing"), ValueType::Object);
    }

    #[test]
    fn test_model_equality_is_structural() {
        assert_eq!(user(), user());
        let other = ModelType::builder("User").field("Id", ValueType::Int).build();
        assert_ne!(user(), other);
    }

    #[test]
    fn test_record_name_lists_fields() {
        let rec = ModelType::record(vec![
            Field::new("u", ValueType::Model(user())),
            Field::new("l", ValueType::Int),
        ]);
        assert_eq!(rec.name(), "{ u, l }");
        assert!(rec.is_record());
        assert!(!user().is_record());
    }

    #[test]
    fn test_group_exposes_only_key() {
        let group = ValueType::group(ValueType::String, ValueType::Model(user()));
        let fields = group.fields();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "Key");
        assert_eq!(group.field_type("Key"), ValueType::String);
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from("x"), Value::String("x".into()));
        assert_eq!(Value::from(3), Value::Int(3));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(2.5f64).value_type(), ValueType::Double);
    }

    #[test]
    fn test_value_serializes_untagged() {
        let json = serde_json::to_string(&vec![Value::Int(1), Value::Null, Value::from("a")])
            .unwrap();
        assert_eq!(json, r#"[1,null,"a"]"#);
    }
}
