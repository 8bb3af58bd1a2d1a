//! Typed DXU definition records.
//!
//! A [`DxuDefinition`] is read once from its YAML source, checked
//! structurally and semantically, and never mutated afterwards.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Number, Value as YamlValue};
use tracing::info;

use crate::block::{MAX_STRING_VALUE_LEN, MAX_TFIELDS};
use crate::datatype::Datatype;
use crate::error::{Error, Result};
use crate::header::{is_card_text, quoted_len};
use crate::loader;
use crate::mapper;
use crate::schema::DxuSchema;
use crate::value::Value;

/// A complete Data eXchange Unit definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DxuDefinition {
    pub name: String,
    #[serde(deserialize_with = "version_text")]
    pub version: String,
    pub creators: Vec<Creator>,
    pub description: String,
    /// The first extension describes the primary header.
    pub extensions: Vec<Extension>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Creator {
    #[serde(rename = "first-name", alias = "first_name")]
    pub first_name: String,
    #[serde(rename = "last-name", alias = "last_name")]
    pub last_name: String,
    pub email: Option<String>,
    pub affiliation: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Extension {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub header: Vec<HeaderSpec>,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
}

/// One header keyword of an extension.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderSpec {
    pub name: String,
    pub description: String,
    pub datatype: Option<Datatype>,
    /// Fixed literal; a sequence for `array` headers.
    pub value: Option<YamlValue>,
    pub unit: Option<String>,
    pub range: Option<Range>,
    pub values: Option<Mapping>,
    #[serde(default)]
    pub maybenull: bool,
    pub regexp: Option<String>,
    pub delimiter: Option<String>,
    #[serde(default)]
    pub array: bool,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub internal: bool,
    pub notes: Option<String>,
}

/// One binary-table column of an extension.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnSpec {
    pub name: String,
    pub description: String,
    pub ucd: String,
    pub datatype: Datatype,
    pub unit: Option<String>,
    pub maxlength: Option<usize>,
    pub arraysize: Option<usize>,
    pub range: Option<Range>,
    pub values: Option<Mapping>,
    #[serde(default)]
    pub maybenull: bool,
    pub regexp: Option<String>,
    pub delimiter: Option<String>,
    #[serde(default)]
    pub internal: bool,
    pub notes: Option<String>,
}

/// Inclusive value range; either bound may be open.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Range {
    pub min: Option<Number>,
    pub max: Option<Number>,
}

fn default_true() -> bool {
    true
}

/// Versions are written as `0.1` as often as `"0.1"`.
fn version_text<'de, D: Deserializer<'de>>(deserializer: D) -> core::result::Result<String, D::Error> {
    match YamlValue::deserialize(deserializer)? {
        YamlValue::String(s) => Ok(s),
        YamlValue::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "version must be a string or number, got {other:?}"
        ))),
    }
}

impl Range {
    pub fn min_value(&self) -> Option<Value> {
        self.min.as_ref().and_then(number_value)
    }

    pub fn max_value(&self) -> Option<Value> {
        self.max.as_ref().and_then(number_value)
    }
}

fn number_value(n: &Number) -> Option<Value> {
    Value::from_yaml(&YamlValue::Number(n.clone()))
}

/// Attributes shared by header keywords and columns.
pub trait Field {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// The declared datatype; headers may leave it to their fixed value.
    fn datatype(&self) -> Option<Datatype>;
    fn unit(&self) -> Option<&str>;
    fn range(&self) -> Option<&Range>;
    fn values(&self) -> Option<&Mapping>;
    fn maybenull(&self) -> bool;
    fn regexp(&self) -> Option<&str>;
    fn delimiter(&self) -> Option<&str>;
    fn internal(&self) -> bool;
    fn notes(&self) -> Option<&str>;
}

macro_rules! impl_field {
    ($ty:ty, $datatype:ident) => {
        impl Field for $ty {
            fn name(&self) -> &str {
                &self.name
            }
            fn description(&self) -> &str {
                &self.description
            }
            fn datatype(&self) -> Option<Datatype> {
                self.$datatype()
            }
            fn unit(&self) -> Option<&str> {
                self.unit.as_deref()
            }
            fn range(&self) -> Option<&Range> {
                self.range.as_ref()
            }
            fn values(&self) -> Option<&Mapping> {
                self.values.as_ref()
            }
            fn maybenull(&self) -> bool {
                self.maybenull
            }
            fn regexp(&self) -> Option<&str> {
                self.regexp.as_deref()
            }
            fn delimiter(&self) -> Option<&str> {
                self.delimiter.as_deref()
            }
            fn internal(&self) -> bool {
                self.internal
            }
            fn notes(&self) -> Option<&str> {
                self.notes.as_deref()
            }
        }
    };
}

impl_field!(HeaderSpec, resolved_datatype);
impl_field!(ColumnSpec, declared_datatype);

impl HeaderSpec {
    /// The fixed literal(s) of this keyword, in order. Empty when no
    /// `value` is declared.
    pub fn fixed_values(&self) -> Result<Vec<Value>> {
        let literal = |node: &YamlValue| {
            Value::from_yaml(node).ok_or_else(|| {
                Error::definition(
                    format!("{}.value", self.name),
                    format!("{node:?} is not a scalar literal"),
                )
            })
        };
        match &self.value {
            None | Some(YamlValue::Null) => Ok(Vec::new()),
            Some(YamlValue::Sequence(items)) if self.array => items.iter().map(literal).collect(),
            Some(YamlValue::Sequence(_)) => Err(Error::definition(
                format!("{}.value", self.name),
                "a list of values requires array: true",
            )),
            Some(node) => Ok(vec![literal(node)?]),
        }
    }

    /// The declared datatype, or the one implied by the fixed value.
    pub fn resolved_datatype(&self) -> Option<Datatype> {
        self.datatype.or_else(|| {
            let fixed = self.fixed_values().ok()?;
            fixed.first().and_then(Datatype::of_literal)
        })
    }
}

impl ColumnSpec {
    fn declared_datatype(&self) -> Option<Datatype> {
        Some(self.datatype)
    }
}

impl Extension {
    /// Check name uniqueness and every header and column mapping.
    pub fn check(&self) -> Result<()> {
        if !is_card_text(&self.name) || quoted_len(&self.name) > MAX_STRING_VALUE_LEN {
            return Err(Error::definition(
                self.name.as_str(),
                "extension name must be printable ASCII and fit in EXTNAME",
            ));
        }
        unique_names(self.header.iter().map(|h| h.name.as_str()), || {
            format!("header of {}", self.name)
        })?;
        unique_names(self.columns.iter().map(|c| c.name.as_str()), || {
            format!("columns of {}", self.name)
        })?;
        if self.columns.len() > MAX_TFIELDS {
            return Err(Error::definition(
                self.name.as_str(),
                format!("{} columns exceed the FITS limit of {MAX_TFIELDS}", self.columns.len()),
            ));
        }
        for spec in &self.header {
            mapper::check_header(spec)?;
        }
        for (i, spec) in self.columns.iter().enumerate() {
            mapper::derive_column_keywords(i + 1, spec)?;
        }
        Ok(())
    }
}

fn unique_names<'a>(
    names: impl Iterator<Item = &'a str>,
    scope: impl Fn() -> String,
) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(Error::DuplicateName {
                scope: scope(),
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

impl DxuDefinition {
    /// Load, include, validate and check a definition file.
    pub fn from_path(path: &Path) -> Result<DxuDefinition> {
        Self::from_path_with(path, &DxuSchema::builtin()?)
    }

    /// [`DxuDefinition::from_path`] against another schema.
    pub fn from_path_with(path: &Path, schema: &DxuSchema) -> Result<DxuDefinition> {
        let node = loader::load_yaml(path)?;
        let def = Self::from_value_with(node, schema)?;
        info!(
            path = %path.display(),
            name = %def.name,
            extensions = def.extensions.len(),
            "loaded DXU definition"
        );
        Ok(def)
    }

    /// Parse definition text whose includes resolve against `root`.
    pub fn from_yaml_str(text: &str, root: &Path) -> Result<DxuDefinition> {
        Self::from_value(loader::parse_yaml(text, root)?)
    }

    /// Validate an include-resolved YAML tree and build the records.
    pub fn from_value(node: YamlValue) -> Result<DxuDefinition> {
        Self::from_value_with(node, &DxuSchema::builtin()?)
    }

    pub fn from_value_with(node: YamlValue, schema: &DxuSchema) -> Result<DxuDefinition> {
        schema.validate(&node)?;
        let def: DxuDefinition = serde_yaml::from_value(node)?;
        def.check()?;
        Ok(def)
    }

    fn check(&self) -> Result<()> {
        if let Some(primary) = self.extensions.first() {
            if !primary.columns.is_empty() {
                return Err(Error::definition(
                    primary.name.as_str(),
                    "the primary extension cannot have columns",
                ));
            }
        }
        unique_names(self.extensions.iter().map(|e| e.name.as_str()), || {
            String::from("extensions")
        })?;
        self.extensions.iter().try_for_each(Extension::check)
    }

    /// The primary header description (the first extension).
    pub fn primary(&self) -> &Extension {
        // the schema requires at least one extension
        &self.extensions[0]
    }

    /// The table extensions following the primary one.
    pub fn tables(&self) -> &[Extension] {
        self.extensions.get(1..).unwrap_or_default()
    }

    /// Look up a table extension by name.
    pub fn table(&self, name: &str) -> Option<&Extension> {
        self.tables().iter().find(|e| e.name == name)
    }

    /// `First Last` of all creators, comma separated.
    pub fn creator_names(&self) -> String {
        self.creators
            .iter()
            .map(|c| format!("{} {}", c.first_name, c.last_name))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
