//! Field metadata: column mapping, coercion, nullability and defaults.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::value::{SqlValue, ToSqlValue};

/// Canonical text layout for `DateTime` fields.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A caster converts an input value into the value that is persisted.
pub type Caster = Arc<dyn Fn(SqlValue) -> Result<SqlValue, String> + Send + Sync>;

/// The logical type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// 64-bit integer.
    Int,
    /// Double precision float.
    Float,
    /// UTF-8 text.
    Text,
    /// Boolean.
    Bool,
    /// Raw bytes.
    Blob,
    /// Timestamp stored as UTC text in [`DATETIME_FORMAT`].
    DateTime,
}

impl FieldType {
    /// Coerces `value` into this type.
    ///
    /// `NULL` always passes through; nullability is checked separately.
    pub fn cast(self, value: SqlValue) -> Result<SqlValue, String> {
        match (self, value) {
            (_, SqlValue::Null) => Ok(SqlValue::Null),

            (Self::Int, v @ SqlValue::Int(_)) => Ok(v),
            (Self::Int, SqlValue::Bool(b)) => Ok(SqlValue::Int(i64::from(b))),
            #[allow(clippy::cast_possible_truncation)]
            (Self::Int, SqlValue::Float(f)) if f.fract() == 0.0 && f.is_finite() => {
                Ok(SqlValue::Int(f as i64))
            }
            (Self::Int, SqlValue::Text(s)) => s
                .trim()
                .parse::<i64>()
                .map(SqlValue::Int)
                .map_err(|_| format!("'{s}' is not an integer")),

            (Self::Float, v @ SqlValue::Float(_)) => Ok(v),
            #[allow(clippy::cast_precision_loss)]
            (Self::Float, SqlValue::Int(n)) => Ok(SqlValue::Float(n as f64)),
            (Self::Float, SqlValue::Text(s)) => s
                .trim()
                .parse::<f64>()
                .map(SqlValue::Float)
                .map_err(|_| format!("'{s}' is not a number")),

            (Self::Text, v @ SqlValue::Text(_)) => Ok(v),
            (Self::Text, SqlValue::Int(n)) => Ok(SqlValue::Text(n.to_string())),
            (Self::Text, SqlValue::Float(f)) => Ok(SqlValue::Text(f.to_string())),
            (Self::Text, SqlValue::Blob(b)) => String::from_utf8(b)
                .map(SqlValue::Text)
                .map_err(|_| String::from("blob is not valid UTF-8")),

            (Self::Bool, v @ SqlValue::Bool(_)) => Ok(v),
            (Self::Bool, SqlValue::Int(0)) => Ok(SqlValue::Bool(false)),
            (Self::Bool, SqlValue::Int(1)) => Ok(SqlValue::Bool(true)),
            (Self::Bool, SqlValue::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Ok(SqlValue::Bool(true)),
                "false" | "f" | "0" => Ok(SqlValue::Bool(false)),
                _ => Err(format!("'{s}' is not a boolean")),
            },

            (Self::Blob, v @ SqlValue::Blob(_)) => Ok(v),
            (Self::Blob, SqlValue::Text(s)) => Ok(SqlValue::Blob(s.into_bytes())),

            (Self::DateTime, SqlValue::Text(s)) => parse_datetime(&s)
                .map(|dt| SqlValue::Text(dt.format(DATETIME_FORMAT).to_string()))
                .ok_or_else(|| format!("'{s}' is not a timestamp")),
            (Self::DateTime, SqlValue::Int(secs)) => DateTime::from_timestamp(secs, 0)
                .map(|dt| SqlValue::Text(dt.naive_utc().format(DATETIME_FORMAT).to_string()))
                .ok_or_else(|| format!("{secs} is out of range for a timestamp")),

            (ty, other) => Err(format!("expected {ty:?}, got {}", other.kind())),
        }
    }
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    for layout in [DATETIME_FORMAT, "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// How an absent field gets its value on insert.
#[derive(Clone)]
pub enum FieldDefault {
    /// A fixed value.
    Value(SqlValue),
    /// A factory invoked every time a default is needed.
    Factory(Arc<dyn Fn() -> SqlValue + Send + Sync>),
}

impl FieldDefault {
    /// A factory producing the current UTC time in [`DATETIME_FORMAT`].
    #[must_use]
    pub fn now() -> Self {
        Self::Factory(Arc::new(|| {
            SqlValue::Text(Utc::now().naive_utc().format(DATETIME_FORMAT).to_string())
        }))
    }

    /// Produces the default value.
    #[must_use]
    pub fn produce(&self) -> SqlValue {
        match self {
            Self::Value(v) => v.clone(),
            Self::Factory(f) => f(),
        }
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// A column of a schema.
#[derive(Clone)]
pub struct Field {
    name: String,
    column: String,
    ty: FieldType,
    caster: Option<Caster>,
    nullable: bool,
    default: Option<FieldDefault>,
    primary_key: bool,
}

impl Field {
    /// Creates a nullable field whose column name equals its field name.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            name,
            ty,
            caster: None,
            nullable: true,
            default: None,
            primary_key: false,
        }
    }

    /// Sets the database column name.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Sets whether the field accepts `NULL`.
    #[must_use]
    pub const fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    /// Marks the field as the schema's primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Sets a static default.
    #[must_use]
    pub fn default_value(mut self, value: impl ToSqlValue) -> Self {
        self.default = Some(FieldDefault::Value(value.to_sql_value()));
        self
    }

    /// Sets a default factory, invoked at changeset time.
    #[must_use]
    pub fn default_with<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> SqlValue + Send + Sync + 'static,
    {
        self.default = Some(FieldDefault::Factory(Arc::new(factory)));
        self
    }

    /// Sets a prebuilt default.
    #[must_use]
    pub fn default(mut self, default: FieldDefault) -> Self {
        self.default = Some(default);
        self
    }

    /// Replaces the type caster.
    #[must_use]
    pub fn caster<F>(mut self, caster: F) -> Self
    where
        F: Fn(SqlValue) -> Result<SqlValue, String> + Send + Sync + 'static,
    {
        self.caster = Some(Arc::new(caster));
        self
    }

    /// Logical field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Database column name.
    #[must_use]
    pub fn column_name(&self) -> &str {
        &self.column
    }

    /// Logical type.
    #[must_use]
    pub const fn ty(&self) -> FieldType {
        self.ty
    }

    /// Whether `NULL` is accepted.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether this is the primary key.
    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// The configured default.
    #[must_use]
    pub const fn default_spec(&self) -> Option<&FieldDefault> {
        self.default.as_ref()
    }

    /// Runs the caster (custom, or the type's own) on a value.
    pub fn cast(&self, value: SqlValue) -> Result<SqlValue, String> {
        if value.is_null() {
            return Ok(value);
        }
        match &self.caster {
            Some(caster) => caster(value),
            None => self.ty.cast(value),
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("ty", &self.ty)
            .field("custom_caster", &self.caster.is_some())
            .field("nullable", &self.nullable)
            .field("default", &self.default)
            .field("primary_key", &self.primary_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_cast() {
        assert_eq!(FieldType::Int.cast(SqlValue::Int(3)), Ok(SqlValue::Int(3)));
        assert_eq!(
            FieldType::Int.cast(SqlValue::Text(String::from(" 42 "))),
            Ok(SqlValue::Int(42))
        );
        assert_eq!(FieldType::Int.cast(SqlValue::Float(2.0)), Ok(SqlValue::Int(2)));
        assert!(FieldType::Int.cast(SqlValue::Float(2.5)).is_err());
        assert!(FieldType::Int.cast(SqlValue::Text(String::from("x"))).is_err());
    }

    #[test]
    fn test_bool_cast() {
        assert_eq!(FieldType::Bool.cast(SqlValue::Int(1)), Ok(SqlValue::Bool(true)));
        assert_eq!(
            FieldType::Bool.cast(SqlValue::Text(String::from("False"))),
            Ok(SqlValue::Bool(false))
        );
        assert!(FieldType::Bool.cast(SqlValue::Int(2)).is_err());
    }

    #[test]
    fn test_text_rejects_bool() {
        let err = FieldType::Text.cast(SqlValue::Bool(true)).unwrap_err();
        assert_eq!(err, "expected Text, got bool");
    }

    #[test]
    fn test_datetime_cast_normalizes() {
        let cast = FieldType::DateTime
            .cast(SqlValue::Text(String::from("2024-03-01T10:20:30+02:00")))
            .unwrap();
        assert_eq!(cast, SqlValue::Text(String::from("2024-03-01 08:20:30")));

        let from_date = FieldType::DateTime
            .cast(SqlValue::Text(String::from("2024-03-01")))
            .unwrap();
        assert_eq!(from_date, SqlValue::Text(String::from("2024-03-01 00:00:00")));

        let from_epoch = FieldType::DateTime.cast(SqlValue::Int(0)).unwrap();
        assert_eq!(from_epoch, SqlValue::Text(String::from("1970-01-01 00:00:00")));
    }

    #[test]
    fn test_cast_is_idempotent() {
        let inputs = [
            (FieldType::Int, SqlValue::Text(String::from("7"))),
            (FieldType::Float, SqlValue::Int(3)),
            (FieldType::Bool, SqlValue::Text(String::from("t"))),
            (FieldType::DateTime, SqlValue::Text(String::from("2020-01-02T03:04:05.250Z"))),
        ];
        for (ty, input) in inputs {
            let once = ty.cast(input).unwrap();
            assert_eq!(ty.cast(once.clone()).unwrap(), once);
        }
    }

    #[test]
    fn test_custom_caster_overrides_type() {
        let field = Field::new("name", FieldType::Text).caster(|v| match v {
            SqlValue::Text(s) => Ok(SqlValue::Text(s.to_uppercase())),
            other => Err(format!("unexpected {}", other.kind())),
        });
        assert_eq!(
            field.cast(SqlValue::Text(String::from("ab"))),
            Ok(SqlValue::Text(String::from("AB")))
        );
        assert_eq!(field.cast(SqlValue::Null), Ok(SqlValue::Null));
    }

    #[test]
    fn test_default_factory_runs_each_time() {
        use std::sync::atomic::{AtomicI64, Ordering};

        let counter = Arc::new(AtomicI64::new(0));
        let c = Arc::clone(&counter);
        let field = Field::new("seq", FieldType::Int)
            .default_with(move || SqlValue::Int(c.fetch_add(1, Ordering::SeqCst)));

        let default = field.default_spec().unwrap();
        assert_eq!(default.produce(), SqlValue::Int(0));
        assert_eq!(default.produce(), SqlValue::Int(1));
    }
}
