//! Column data types and sample-based inference

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Data type of a column node
///
/// Deserialization is lenient: common synonyms emitted by models
/// (`integer`, `float`, `timestamp`, `bool`, ...) map onto the closed set,
/// and anything unrecognised becomes [`DataType::String`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum DataType {
    /// Free text
    String,
    /// Integer or decimal
    Number,
    /// `true` / `false`
    Boolean,
    /// Calendar date or timestamp
    Date,
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

impl DataType {
    /// Get the data type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Number => "number",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
        }
    }

    /// Infer a data type from sample values
    ///
    /// Rules are applied in order: all numeric → `number`, all matching a
    /// common date pattern → `date`, all boolean literals → `boolean`,
    /// otherwise `string`. An empty sample set is `string`.
    ///
    /// # Examples
    ///
    /// ```
    /// use lineage_domain::DataType;
    ///
    /// assert_eq!(DataType::infer(&["100", "250"]), DataType::Number);
    /// assert_eq!(DataType::infer(&["INV001", "INV002"]), DataType::String);
    /// ```
    pub fn infer<S: AsRef<str>>(samples: &[S]) -> Self {
        if samples.is_empty() {
            return DataType::String;
        }

        let values: Vec<&str> = samples.iter().map(|s| s.as_ref().trim()).collect();

        if values.iter().all(|v| is_numeric(v)) {
            DataType::Number
        } else if values.iter().all(|v| is_date(v)) {
            DataType::Date
        } else if values.iter().all(|v| is_boolean(v)) {
            DataType::Boolean
        } else {
            DataType::String
        }
    }
}

impl From<String> for DataType {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "number" | "numeric" | "integer" | "int" | "float" | "double" | "decimal" => {
                DataType::Number
            }
            "boolean" | "bool" => DataType::Boolean,
            "date" | "datetime" | "timestamp" => DataType::Date,
            _ => DataType::String,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_numeric(value: &str) -> bool {
    let starts_like_number = value
        .chars()
        .next()
        .map(|c| c.is_ascii_digit() || c == '-' || c == '+' || c == '.')
        .unwrap_or(false);

    // f64 parsing also accepts "inf" and "NaN", which are not sample numbers
    starts_like_number && value.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

fn is_date(value: &str) -> bool {
    DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(value, fmt).is_ok())
        || DATETIME_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
        || DateTime::parse_from_rfc3339(value).is_ok()
}

fn is_boolean(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_number() {
        assert_eq!(DataType::infer(&["100", "250"]), DataType::Number);
        assert_eq!(DataType::infer(&["1.5", "-2", "3e2"]), DataType::Number);
    }

    #[test]
    fn test_infer_date() {
        assert_eq!(DataType::infer(&["2025-07-17", "2025-07-18"]), DataType::Date);
        assert_eq!(DataType::infer(&["07/17/2025"]), DataType::Date);
        assert_eq!(DataType::infer(&["2025-07-17T08:32:49Z"]), DataType::Date);
    }

    #[test]
    fn test_infer_boolean() {
        assert_eq!(DataType::infer(&["true", "false"]), DataType::Boolean);
        assert_eq!(DataType::infer(&["TRUE", "False"]), DataType::Boolean);
    }

    #[test]
    fn test_infer_string() {
        assert_eq!(DataType::infer(&["INV001", "INV002"]), DataType::String);
        assert_eq!(DataType::infer(&["100", "abc"]), DataType::String);
        assert_eq!(DataType::infer(&["NaN", "inf"]), DataType::String);
    }

    #[test]
    fn test_infer_empty_is_string() {
        let empty: [&str; 0] = [];
        assert_eq!(DataType::infer(&empty), DataType::String);
    }

    #[test]
    fn test_lenient_deserialize() {
        let dt: DataType = serde_json::from_str("\"integer\"").unwrap();
        assert_eq!(dt, DataType::Number);
        let dt: DataType = serde_json::from_str("\"timestamp\"").unwrap();
        assert_eq!(dt, DataType::Date);
        let dt: DataType = serde_json::from_str("\"varchar\"").unwrap();
        assert_eq!(dt, DataType::String);
        assert_eq!(serde_json::to_string(&DataType::Boolean).unwrap(), "\"boolean\"");
    }
}
