//! Mapping of column and header definitions onto FITS keywords.
//!
//! Columns become the `TTYPEn`/`TFORMn`/... keyword group of a binary
//! table; header definitions become one or more keyword entries whose
//! values are fixed by the definition, supplied at run time, or left as
//! typed placeholders.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_yaml::Value as YamlValue;
use tracing::{debug, warn};

use crate::block::MAX_STRING_VALUE_LEN;
use crate::cell::CellRules;
use crate::datatype::{Datatype, FormCode, NullSentinel};
use crate::definition::{ColumnSpec, Field, HeaderSpec};
use crate::error::{Error, Result};
use crate::header::{
    ascii_text, fit_string_value, is_card_text, is_reserved_keyword, is_valid_keyword, quoted_len,
    Card,
};
use crate::value::Value;

// ── Columns ──

/// The storage layout of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnForm {
    /// `TFORMn`.
    pub tform: FormCode,
    /// `TDIMn` as (string width, array size), for arrays of strings.
    pub tdim: Option<(usize, usize)>,
    /// `TZEROn`, always paired with `TSCALn = 1`.
    pub tzero: Option<Value>,
}

impl ColumnForm {
    pub fn tdim_text(&self) -> Option<String> {
        self.tdim.map(|(width, count)| format!("({width}, {count})"))
    }
}

/// Derive `TFORMn`, `TDIMn` and `TZEROn` for a column.
///
/// String columns are as wide as `maxlength` or their longest enumerated
/// value, whichever is larger; `arraysize` multiplies the width. Other
/// datatypes repeat their element `arraysize` times.
pub fn derive_column_form(spec: &ColumnSpec) -> Result<ColumnForm> {
    let datatype = spec.datatype;
    let count = spec.arraysize.unwrap_or(1);
    if count == 0 {
        return Err(Error::definition(
            format!("{}.arraysize", spec.name),
            "arraysize must be at least 1",
        ));
    }

    let (repeat, tdim) = if datatype == Datatype::Str {
        let longest = spec
            .values
            .iter()
            .flat_map(|values| values.keys())
            .map(|key| value_text(key).chars().count())
            .max()
            .unwrap_or(0);
        let width = spec.maxlength.unwrap_or(1).max(longest).max(1);
        let tdim = (width > 1 && count > 1).then_some((width, count));
        (width * count, tdim)
    } else {
        if spec.maxlength.is_some() {
            let reason = if spec.arraysize.is_some() {
                format!("maxlength and arraysize cannot be combined for {datatype}")
            } else {
                format!("maxlength is only allowed for str, not {datatype}")
            };
            return Err(Error::definition(format!("{}.maxlength", spec.name), reason));
        }
        (count, None)
    };

    Ok(ColumnForm {
        tform: FormCode {
            repeat,
            code: datatype.type_code(),
        },
        tdim,
        tzero: datatype.zero_offset(),
    })
}

/// The complete keyword group of column `index` (1-based).
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnKeywords {
    pub index: usize,
    pub ttype: String,
    /// The description, cut to the FITS string value limit.
    pub tcomm: String,
    pub form: ColumnForm,
    pub tunit: Option<String>,
    pub tucd: String,
    pub tlmin: Option<Value>,
    pub tlmax: Option<Value>,
    pub tnull: Option<i64>,
    /// How nulls are stored, for columns that may be null.
    pub null: Option<NullSentinel>,
}

/// Check a column and derive its keyword group.
pub fn derive_column_keywords(index: usize, spec: &ColumnSpec) -> Result<ColumnKeywords> {
    check_field(spec)?;
    let form = derive_column_form(spec)?;
    check_enumeration(spec, &form)?;

    let null = spec.maybenull.then(|| spec.datatype.null_sentinel());
    let tnull = match null {
        Some(NullSentinel::Tnull(raw)) => Some(raw),
        _ => None,
    };

    let (tcomm, truncated) = fit_string_value(&ascii_text(&spec.description));
    if truncated {
        warn!(
            column = %spec.name,
            "description truncated to {MAX_STRING_VALUE_LEN} characters in TCOMM{index}"
        );
    }

    let range = spec.range.as_ref();
    let keywords = ColumnKeywords {
        index,
        ttype: spec.name.clone(),
        tcomm,
        form,
        tunit: spec.unit.clone(),
        tucd: spec.ucd.clone(),
        tlmin: range.and_then(|r| r.min_value()),
        tlmax: range.and_then(|r| r.max_value()),
        tnull,
        null,
    };
    debug!(
        column = %keywords.ttype,
        index,
        tform = %keywords.form.tform,
        "derived column keywords"
    );
    Ok(keywords)
}

impl ColumnKeywords {
    /// The cards of this column, in `TTYPE`, `TCOMM`, `TFORM`, `TDIM`,
    /// `TZERO`, `TSCAL`, `TUNIT`, `TUCD`, `TLMIN`, `TLMAX`, `TNULL` order.
    pub fn cards(&self) -> Result<Vec<Card>> {
        let n = self.index;
        let text = |s: &str| Value::String(s.to_string());
        let mut cards = vec![Card::new(&format!("TTYPE{n}"), text(&self.ttype), None)?];
        if !self.tcomm.is_empty() {
            cards.push(Card::new(&format!("TCOMM{n}"), text(&self.tcomm), None)?);
        }
        cards.push(Card::new(
            &format!("TFORM{n}"),
            Value::String(self.form.tform.to_string()),
            None,
        )?);
        if let Some(tdim) = self.form.tdim_text() {
            cards.push(Card::new(&format!("TDIM{n}"), Value::String(tdim), None)?);
        }
        if let Some(tzero) = &self.form.tzero {
            cards.push(Card::new(&format!("TZERO{n}"), tzero.clone(), None)?);
            cards.push(Card::new(&format!("TSCAL{n}"), Value::Integer(1), None)?);
        }
        if let Some(unit) = &self.tunit {
            cards.push(Card::new(&format!("TUNIT{n}"), text(unit), None)?);
        }
        cards.push(Card::new(&format!("TUCD{n}"), text(&self.tucd), None)?);
        if let Some(min) = &self.tlmin {
            cards.push(Card::new(&format!("TLMIN{n}"), min.clone(), None)?);
        }
        if let Some(max) = &self.tlmax {
            cards.push(Card::new(&format!("TLMAX{n}"), max.clone(), None)?);
        }
        if let Some(tnull) = self.tnull {
            cards.push(Card::new(&format!("TNULL{n}"), Value::Integer(tnull), None)?);
        }
        Ok(cards)
    }
}

// ── Header keywords ──

/// Where the value of a header entry comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryValue {
    /// Declared in the definition.
    Fixed(Value),
    /// Provided at run time.
    Supplied(Value),
    /// Not known yet; only the datatype is.
    Placeholder,
}

/// One concrete header keyword derived from a [`HeaderSpec`].
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderEntry {
    pub keyword: String,
    pub value: EntryValue,
    /// The declared datatype, or that of the literal value.
    pub datatype: Option<Datatype>,
}

impl HeaderEntry {
    pub fn value(&self) -> Option<&Value> {
        match &self.value {
            EntryValue::Fixed(v) | EntryValue::Supplied(v) => Some(v),
            EntryValue::Placeholder => None,
        }
    }
}

/// Semantic checks of a header definition that do not depend on run-time
/// values.
pub fn check_header(spec: &HeaderSpec) -> Result<()> {
    let keyword = if spec.array {
        format!("{}1", spec.name)
    } else {
        spec.name.clone()
    };
    if !is_valid_keyword(&keyword) {
        return Err(Error::definition(
            spec.name.as_str(),
            format!("{keyword:?} is not a valid FITS keyword"),
        ));
    }
    if is_reserved_keyword(&keyword) {
        return Err(Error::definition(
            spec.name.as_str(),
            format!("{keyword} is a structural keyword written automatically"),
        ));
    }

    let fixed = spec.fixed_values()?;
    if spec.resolved_datatype().is_none() {
        return Err(Error::definition(
            spec.name.as_str(),
            "neither datatype nor value is given",
        ));
    }
    if let Some(datatype) = spec.datatype {
        if let Some(bad) = fixed.iter().find(|v| !datatype.accepts(v)) {
            return Err(Error::definition(
                format!("{}.value", spec.name),
                format!("{bad:?} does not match datatype {datatype}"),
            ));
        }
    }
    for value in &fixed {
        check_card_string(&format!("{}.value", spec.name), value)?;
    }
    check_field(spec)
}

/// String header values must be printable ASCII and fit one card.
fn check_card_string(field: &str, value: &Value) -> Result<()> {
    let Value::String(s) = value else {
        return Ok(());
    };
    if !is_card_text(s) {
        return Err(Error::definition(
            field,
            format!("{s:?} contains characters outside printable ASCII"),
        ));
    }
    if quoted_len(s) > MAX_STRING_VALUE_LEN {
        return Err(Error::definition(
            field,
            format!("{s:?} is longer than {MAX_STRING_VALUE_LEN} characters"),
        ));
    }
    Ok(())
}

/// Expand a header definition into keyword entries.
///
/// Values come from `supplied` if given, else from the fixed `value`. A
/// required header left without a value is an error. An optional one
/// yields a placeholder of its declared datatype, or nothing if it is an
/// array. Array headers produce `NAME1..NAMEn`, one per value. Several
/// values for a single header with a `delimiter` are joined into one.
pub fn derive_header_entries(
    spec: &HeaderSpec,
    supplied: Option<&[Value]>,
) -> Result<Vec<HeaderEntry>> {
    check_header(spec)?;
    let fixed = spec.fixed_values()?;

    let entries = match supplied.filter(|s| !s.is_empty()) {
        Some(values) => {
            if !fixed.is_empty() && fixed != values {
                return Err(Error::definition(
                    spec.name.as_str(),
                    "supplied value conflicts with the static value",
                ));
            }
            let rules = CellRules::for_field(spec)?;
            let values = match &spec.delimiter {
                Some(_) if !spec.array => vec![Value::String(joined(&rules, values)?)],
                _ => {
                    for value in values {
                        rules.check(value)?;
                    }
                    values.to_vec()
                }
            };
            for value in &values {
                check_card_string(spec.name.as_str(), value)?;
            }
            numbered(spec, values.into_iter().map(EntryValue::Supplied))?
        }
        None if !fixed.is_empty() => numbered(spec, fixed.into_iter().map(EntryValue::Fixed))?,
        None if spec.required => {
            let reason = if spec.array {
                "required array header has no values"
            } else {
                "required header has no value and none was supplied"
            };
            return Err(Error::definition(spec.name.as_str(), reason));
        }
        None if spec.array => Vec::new(),
        None => numbered(spec, std::iter::once(EntryValue::Placeholder))?,
    };
    debug!(header = %spec.name, entries = entries.len(), "derived header entries");
    Ok(entries)
}

/// One delimited cell from supplied values. A supplied value that already
/// holds the delimiter is split first, so `A,B` and `A`, `B` agree.
fn joined(rules: &CellRules, values: &[Value]) -> Result<String> {
    let texts: Vec<String> = values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    let parts: Vec<&str> = texts.iter().flat_map(|t| rules.split(t)).collect();
    rules.join(&parts)
}

/// Header entries for an empty template: fixed values where declared,
/// otherwise one placeholder (`NAME1` for array headers).
pub fn header_plan(spec: &HeaderSpec) -> Result<Vec<HeaderEntry>> {
    check_header(spec)?;
    let fixed = spec.fixed_values()?;
    if fixed.is_empty() {
        numbered(spec, std::iter::once(EntryValue::Placeholder))
    } else {
        numbered(spec, fixed.into_iter().map(EntryValue::Fixed))
    }
}

fn numbered(
    spec: &HeaderSpec,
    values: impl Iterator<Item = EntryValue>,
) -> Result<Vec<HeaderEntry>> {
    let values: Vec<EntryValue> = values.collect();
    if !spec.array && values.len() != 1 {
        return Err(Error::definition(
            spec.name.as_str(),
            format!("expects a single value, got {}", values.len()),
        ));
    }

    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            let keyword = if spec.array {
                format!("{}{}", spec.name, i + 1)
            } else {
                spec.name.clone()
            };
            if !is_valid_keyword(&keyword) {
                return Err(Error::definition(
                    spec.name.as_str(),
                    format!("generated keyword {keyword:?} is longer than 8 characters"),
                ));
            }
            let datatype = match &value {
                EntryValue::Fixed(v) | EntryValue::Supplied(v) => {
                    spec.datatype.or_else(|| Datatype::of_literal(v))
                }
                EntryValue::Placeholder => spec.datatype,
            };
            Ok(HeaderEntry {
                keyword,
                value,
                datatype,
            })
        })
        .collect()
}

// ── Shared checks ──

/// Attribute combinations that are schema-valid but meaningless.
fn check_field<F: Field>(field: &F) -> Result<()> {
    let name = field.name();
    let datatype = field.datatype();

    if field.maybenull() && datatype == Some(Datatype::Bool) {
        return Err(Error::definition(
            format!("{name}.maybenull"),
            "bool has no null representation",
        ));
    }

    if let Some(range) = field.range() {
        let dt = datatype.filter(|dt| dt.is_numeric()).ok_or_else(|| {
            Error::definition(
                format!("{name}.range"),
                format!(
                    "range requires a numeric datatype, not {}",
                    datatype.map_or("an untyped value", Datatype::name)
                ),
            )
        })?;
        let (min, max) = (range.min_value(), range.max_value());
        for bound in [&min, &max].into_iter().flatten() {
            if !dt.accepts(bound) {
                return Err(Error::definition(
                    format!("{name}.range"),
                    format!("bound {bound} is not a valid {dt}"),
                ));
            }
        }
        if let (Some(lo), Some(hi)) = (&min, &max) {
            if lo.numeric_cmp(hi) == Some(Ordering::Greater) {
                return Err(Error::definition(
                    format!("{name}.range"),
                    format!("min {lo} is greater than max {hi}"),
                ));
            }
        }
    }

    if let Some(dt) = datatype.filter(|dt| *dt != Datatype::Str) {
        for (attr, present) in [
            ("regexp", field.regexp().is_some()),
            ("delimiter", field.delimiter().is_some()),
        ] {
            if present {
                return Err(Error::definition(
                    format!("{name}.{attr}"),
                    format!("{attr} only applies to str, not {dt}"),
                ));
            }
        }
    }

    if let Some(values) = field.values() {
        for key in values.keys() {
            let value = Value::from_yaml(key).ok_or_else(|| {
                Error::definition(format!("{name}.values"), format!("{key:?} is not a scalar"))
            })?;
            if let Some(dt) = datatype.filter(|dt| *dt != Datatype::Str) {
                if !dt.accepts(&value) {
                    return Err(Error::definition(
                        format!("{name}.values"),
                        format!("{value} is not a valid {dt}"),
                    ));
                }
            }
        }
    }

    // compiles the regexp
    CellRules::for_field(field).map(|_| ())
}

/// Enumerated column values must be valid cells of the column.
fn check_enumeration(spec: &ColumnSpec, form: &ColumnForm) -> Result<()> {
    let Some(values) = &spec.values else {
        return Ok(());
    };
    let rules = CellRules::for_column(spec, form)?;
    for key in values.keys() {
        let cell = match spec.datatype {
            Datatype::Str => Value::String(value_text(key)),
            _ => Value::from_yaml(key).unwrap_or(Value::Undefined),
        };
        rules.check(&cell).map_err(|e| match e {
            Error::Definition { reason, .. } => {
                Error::definition(format!("{}.values", spec.name), reason)
            }
            other => other,
        })?;
    }
    Ok(())
}

/// Text of a scalar YAML node as it appears in documentation.
pub(crate) fn value_text(node: &YamlValue) -> String {
    Value::from_yaml(node)
        .map(|v| v.to_string())
        .unwrap_or_default()
}

// ── Run-time values ──

/// Header values supplied when rendering, keyed by header name.
#[derive(Debug, Clone, Default)]
pub struct RuntimeValues {
    values: BTreeMap<String, Vec<Value>>,
}

impl RuntimeValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value; array headers take one value per call.
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.values.entry(name.into()).or_default().push(value);
    }

    pub fn get(&self, name: &str) -> Option<&[Value]> {
        self.values.get(name).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse a `NAME=VALUE` assignment. The value is read as a YAML
    /// scalar, so `42`, `2.5`, `true` and `text` keep their types.
    pub fn parse_assignment(&mut self, text: &str) -> Result<()> {
        let (name, raw) = text.split_once('=').ok_or_else(|| {
            Error::definition(text, "expected NAME=VALUE")
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::definition(text, "empty header name"));
        }
        let raw = raw.trim();
        let value = if raw.is_empty() {
            Value::String(String::new())
        } else {
            let node: YamlValue = serde_yaml::from_str(raw)?;
            Value::from_yaml(&node).ok_or_else(|| {
                Error::definition(name, format!("{raw:?} is not a scalar value"))
            })?
        };
        self.push(name, value);
        Ok(())
    }
}
