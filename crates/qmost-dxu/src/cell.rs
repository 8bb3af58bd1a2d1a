//! Cell-level rules of a header keyword or column: datatype, null
//! handling, pattern, length and range, plus joining of multi-valued
//! string cells.

use std::cmp::Ordering;

use regex::Regex;

use crate::datatype::Datatype;
use crate::definition::{ColumnSpec, Field};
use crate::error::{Error, Result};
use crate::mapper::ColumnForm;
use crate::value::Value;

/// Compiled value constraints of one field.
#[derive(Debug, Clone)]
pub struct CellRules {
    name: String,
    datatype: Option<Datatype>,
    regexp: Option<Regex>,
    min: Option<Value>,
    max: Option<Value>,
    maybenull: bool,
    maxlength: Option<usize>,
    delimiter: Option<String>,
}

impl CellRules {
    pub fn for_field<F: Field + ?Sized>(field: &F) -> Result<CellRules> {
        let regexp = field
            .regexp()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    Error::definition(format!("{}.regexp", field.name()), e.to_string())
                })
            })
            .transpose()?;
        let range = field.range();
        Ok(CellRules {
            name: field.name().to_string(),
            datatype: field.datatype(),
            regexp,
            min: range.and_then(|r| r.min_value()),
            max: range.and_then(|r| r.max_value()),
            maybenull: field.maybenull(),
            maxlength: None,
            delimiter: field.delimiter().map(String::from),
        })
    }

    /// Rules of a column stored as `form`. String cells are limited to
    /// the width of one element.
    pub fn for_column(spec: &ColumnSpec, form: &ColumnForm) -> Result<CellRules> {
        let mut rules = Self::for_field(spec)?;
        if spec.datatype == Datatype::Str {
            rules.maxlength = Some(form.tform.repeat / spec.arraysize.unwrap_or(1).max(1));
        }
        Ok(rules)
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::definition(self.name.as_str(), reason)
    }

    fn is_null(value: &Value) -> bool {
        match value {
            Value::Undefined => true,
            Value::String(s) => s.is_empty(),
            Value::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Check one cell or header value.
    pub fn check(&self, value: &Value) -> Result<()> {
        if Self::is_null(value) {
            return if self.maybenull {
                Ok(())
            } else {
                Err(self.error("empty value, but the field may not be null"))
            };
        }
        if let Some(dt) = self.datatype {
            if !dt.accepts(value) {
                return Err(self.error(format!("{value:?} is not a valid {dt}")));
            }
        }
        if let Value::String(s) = value {
            self.check_pattern(s)?;
            self.check_length(s)?;
        }
        let below = self.min.as_ref().and_then(|min| value.numeric_cmp(min)) == Some(Ordering::Less);
        let above = self.max.as_ref().and_then(|max| value.numeric_cmp(max)) == Some(Ordering::Greater);
        if below || above {
            return Err(self.error(format!("{value} is out of range")));
        }
        Ok(())
    }

    fn check_pattern(&self, s: &str) -> Result<()> {
        match &self.regexp {
            Some(re) if !re.is_match(s) => {
                Err(self.error(format!("{s:?} does not match {:?}", re.as_str())))
            }
            _ => Ok(()),
        }
    }

    fn check_length(&self, s: &str) -> Result<()> {
        match self.maxlength {
            Some(max) if s.chars().count() > max => {
                Err(self.error(format!("{s:?} is longer than {max} characters")))
            }
            _ => Ok(()),
        }
    }

    /// Join several string values into one cell.
    ///
    /// Each part must match the pattern and must not contain the
    /// delimiter; the joined cell must fit the length limit.
    pub fn join<S: AsRef<str>>(&self, parts: &[S]) -> Result<String> {
        let joined = match (parts, &self.delimiter) {
            ([], _) => String::new(),
            ([single], _) => {
                self.check_pattern(single.as_ref())?;
                single.as_ref().to_string()
            }
            (_, None) => return Err(self.error("multiple values require a delimiter")),
            (_, Some(delimiter)) => {
                for part in parts {
                    let part = part.as_ref();
                    if part.contains(delimiter.as_str()) {
                        return Err(self.error(format!(
                            "{part:?} contains the delimiter {delimiter:?}"
                        )));
                    }
                    self.check_pattern(part)?;
                }
                parts
                    .iter()
                    .map(AsRef::as_ref)
                    .collect::<Vec<&str>>()
                    .join(delimiter)
            }
        };
        if joined.is_empty() && !self.maybenull {
            return Err(self.error("empty value, but the field may not be null"));
        }
        self.check_length(&joined)?;
        Ok(joined)
    }

    /// Split a joined cell back into its values.
    pub fn split<'a>(&self, cell: &'a str) -> Vec<&'a str> {
        match &self.delimiter {
            _ if cell.is_empty() => Vec::new(),
            Some(delimiter) => cell.split(delimiter.as_str()).collect(),
            None => vec![cell],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::HeaderSpec;
    use crate::mapper::derive_column_form;

    fn column(yaml: &str) -> CellRules {
        let spec: ColumnSpec = serde_yaml::from_str(yaml).unwrap();
        CellRules::for_column(&spec, &derive_column_form(&spec).unwrap()).unwrap()
    }

    fn text(s: &str) -> Value {
        Value::String(s.to_string())
    }

    #[test]
    fn joins_with_delimiter() {
        let rules = column(
            "{name: SURVEYS, description: s, ucd: meta.id, datatype: str, maxlength: 20, delimiter: ','}",
        );
        assert_eq!(rules.join(&["WAVES", "CRS", "4HS"]).unwrap(), "WAVES,CRS,4HS");
        assert_eq!(rules.split("WAVES,CRS,4HS"), ["WAVES", "CRS", "4HS"]);
        assert!(rules.join(&["A,B", "C"]).is_err());
        assert!(rules.join(&["a".repeat(15), "b".repeat(10)]).is_err());
    }

    #[test]
    fn multiple_values_need_delimiter() {
        let rules = column("{name: TAG, description: t, ucd: meta.id, datatype: str}");
        assert_eq!(rules.join(&["one"]).unwrap(), "one");
        assert!(rules.join(&["one", "two"]).is_err());
        assert_eq!(rules.split("one"), ["one"]);
    }

    #[test]
    fn empty_cells_follow_maybenull() {
        let strict = column("{name: TAG, description: t, ucd: meta.id, datatype: str}");
        assert!(strict.check(&text("")).is_err());
        assert!(strict.join::<&str>(&[]).is_err());
        let lenient =
            column("{name: TAG, description: t, ucd: meta.id, datatype: str, maybenull: true}");
        assert!(lenient.check(&text("")).is_ok());
        assert_eq!(lenient.join::<&str>(&[]).unwrap(), "");
        assert!(lenient.split("").is_empty());
    }

    #[test]
    fn pattern_and_length() {
        let rules = column(
            "{name: ID, description: i, ucd: meta.id, datatype: str, maxlength: 6, regexp: '^[A-Z]+[0-9]*$'}",
        );
        assert!(rules.check(&text("ABC12")).is_ok());
        assert!(rules.check(&text("abc")).is_err());
        assert!(rules.check(&text("ABCDEFG")).is_err());
    }

    #[test]
    fn range_and_datatype() {
        let rules = column(
            "{name: Z, description: z, ucd: src.redshift, datatype: float, range: {min: 0, max: 7}, maybenull: true}",
        );
        assert!(rules.check(&Value::Float(0.5)).is_ok());
        assert!(rules.check(&Value::Integer(7)).is_ok());
        assert!(rules.check(&Value::Float(7.5)).is_err());
        assert!(rules.check(&Value::Float(f64::NAN)).is_ok());
        assert!(rules.check(&text("high")).is_err());
    }

    #[test]
    fn header_rules_take_the_type_of_the_value() {
        let spec: HeaderSpec =
            serde_yaml::from_str("{name: OBJECT, description: o, value: NGC 253}").unwrap();
        let rules = CellRules::for_field(&spec).unwrap();
        assert!(rules.check(&text("M 31")).is_ok());
        assert!(rules.check(&Value::Integer(3)).is_err());
        assert!(rules.check(&Value::Undefined).is_err());
    }

    #[test]
    fn integer_bounds_are_exact() {
        let rules = column(&format!(
            "{{name: ID, description: i, ucd: meta.id, datatype: int64, range: {{max: {}}}}}",
            i64::MAX - 1
        ));
        assert!(rules.check(&Value::Integer(i64::MAX - 1)).is_ok());
        assert!(rules.check(&Value::Integer(i64::MAX)).is_err());
    }

    #[test]
    fn bad_pattern_is_a_definition_error() {
        let spec: ColumnSpec = serde_yaml::from_str(
            "{name: ID, description: i, ucd: meta.id, datatype: str, regexp: '(open'}",
        )
        .unwrap();
        match CellRules::for_field(&spec) {
            Err(Error::Definition { field, .. }) => assert_eq!(field, "ID.regexp"),
            other => panic!("expected definition error, got {other:?}"),
        }
    }
}
