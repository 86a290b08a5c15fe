use crate::schema::{ColumnDescriptor, ColumnType};

/// Sentinel text that sources use for an explicit SQL null.
pub const NULL_SENTINEL: &str = "NULL";

/// A field as read from the source, before the target column type is known.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
}

impl RawValue {
    /// Infers the narrowest representation of a textual field.
    pub fn infer(field: &str) -> Self {
        if field.is_empty() {
            return RawValue::Null;
        }
        if let Ok(value) = field.parse::<i64>() {
            return RawValue::Integer(value);
        }
        match field.parse::<f64>() {
            Ok(value) if value.is_finite() => RawValue::Float(value),
            _ => RawValue::Text(field.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Text(text) => text == NULL_SENTINEL,
            _ => false,
        }
    }
}

/// One source field: the decoded text exactly as read, and its inferred value.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    text: String,
    value: RawValue,
}

impl Field {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let value = RawValue::infer(&text);
        Self { text, value }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> &RawValue {
        &self.value
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }
}

/// A value ready to be rendered as a SQL literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Text(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

/// Returned when a value cannot be represented in an integral column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMismatch {
    pub value: String,
    pub declared_type: String,
}

/// Integral columns take any whole number and reject the rest. Text-like
/// columns keep the field text unless it is written as a plain whole number
/// (`42`, `-7`, `45.0`), which is loaded as an integer.
pub fn coerce(field: Option<&Field>, column: &ColumnDescriptor) -> Result<SqlValue, TypeMismatch> {
    let field = match field {
        Some(field) if !field.is_null() => field,
        _ => return Ok(SqlValue::Null),
    };
    let mismatch = || TypeMismatch {
        value: field.text.clone(),
        declared_type: column.declared_type.clone(),
    };
    match (column.column_type(), &field.value) {
        (_, RawValue::Null) => Ok(SqlValue::Null),
        (ColumnType::Integral, RawValue::Integer(value)) => Ok(SqlValue::Integer(*value)),
        (ColumnType::Integral, RawValue::Float(value)) => {
            whole_number(*value).map(SqlValue::Integer).ok_or_else(mismatch)
        }
        (ColumnType::Integral, RawValue::Text(text)) => text
            .trim()
            .parse::<i64>()
            .map(SqlValue::Integer)
            .map_err(|_| mismatch()),
        (ColumnType::TextLike, RawValue::Integer(value)) if is_plain_decimal(&field.text) => {
            Ok(SqlValue::Integer(*value))
        }
        (ColumnType::TextLike, RawValue::Float(value)) if is_plain_decimal(&field.text) => {
            Ok(whole_number(*value)
                .map(SqlValue::Integer)
                .unwrap_or_else(|| SqlValue::Text(field.text.clone())))
        }
        (ColumnType::TextLike, _) => Ok(SqlValue::Text(field.text.clone())),
    }
}

fn whole_number(value: f64) -> Option<i64> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if value.is_finite() && value.fract() == 0.0 && (-LIMIT..LIMIT).contains(&value) {
        Some(value as i64)
    } else {
        None
    }
}

// Optional minus, integer part without leading zeros, optional `.digits`.
fn is_plain_decimal(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned, None),
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    digits(int_part)
        && (int_part == "0" || !int_part.starts_with('0'))
        && frac_part.is_none_or(digits)
}
