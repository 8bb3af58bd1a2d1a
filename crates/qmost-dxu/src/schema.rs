//! Structural validation of raw DXU definitions.
//!
//! The schema is a JSON Schema (draft 7) written in YAML. The built-in
//! one lives in `schema/dxu_schema.yml`, which includes the header and
//! column fragments `dxu_header.yml` and `dxu_columns.yml`; a schema file
//! loaded at run time may replace it. Besides the standard formats the
//! validator checks `fitsunit`, `vo_ucd` and `regexp` strings.
//! [`DxuSchema::write_doc`] renders the schema document itself as
//! reference documentation.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::OnceLock;

use jsonschema::{Draft, JSONSchema};
use regex::Regex;
use serde_json::Value as JsonValue;
use serde_yaml::{Mapping, Value as YamlValue};
use tracing::debug;

use crate::error::{Error, Result};
use crate::loader;

const BUILTIN: &str = include_str!("../schema/dxu_schema.yml");

const FRAGMENTS: [(&str, &str); 2] = [
    ("dxu_header.yml", include_str!("../schema/dxu_header.yml")),
    ("dxu_columns.yml", include_str!("../schema/dxu_columns.yml")),
];

// ── Formats ──

const UCD: &str = r"^(?:[A-Za-z]+:)?[A-Za-z0-9_-]+(?:\.[A-Za-z0-9_-]+)*(?:;(?:[A-Za-z]+:)?[A-Za-z0-9_-]+(?:\.[A-Za-z0-9_-]+)*)*$";
const FITS_UNIT: &str = r"^[A-Za-z0-9.*/()^+\-\[\]']+(?: [A-Za-z0-9.*/()^+\-\[\]']+)*$";

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// IVOA Unified Content Descriptor: `;`-separated words of `.`-separated
/// atoms, each with an optional namespace prefix.
fn is_ucd(s: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, UCD).is_some_and(|re| re.is_match(s))
}

/// FITS unit string, e.g. `km/s`, `10**(-17) erg/s/cm**2`, `mag`.
fn is_fits_unit(s: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, FITS_UNIT).is_some_and(|re| re.is_match(s))
}

/// A pattern the `regex` crate accepts.
fn is_regexp(s: &str) -> bool {
    Regex::new(s).is_ok()
}

// ── Schema ──

/// A compiled DXU schema together with the document it came from.
pub struct DxuSchema {
    document: YamlValue,
    validator: JSONSchema,
}

impl fmt::Debug for DxuSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DxuSchema")
            .field("title", &self.document.get("title"))
            .finish_non_exhaustive()
    }
}

impl DxuSchema {
    /// The schema shipped with the crate.
    pub fn builtin() -> Result<DxuSchema> {
        Self::from_document(loader::parse_embedded(BUILTIN, &FRAGMENTS)?)
    }

    /// Read a schema file; its `!include`s resolve relative to it.
    pub fn from_path(path: &Path) -> Result<DxuSchema> {
        debug!(path = %path.display(), "loading schema");
        Self::from_document(loader::load_yaml(path)?)
    }

    /// Compile an include-resolved schema document.
    pub fn from_document(document: YamlValue) -> Result<DxuSchema> {
        let json = to_json(&document);
        let validator = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .with_format("fitsunit", is_fits_unit)
            .with_format("vo_ucd", is_ucd)
            .with_format("regexp", is_regexp)
            .compile(&json)
            .map_err(|e| Error::InvalidSchema(e.to_string()))?;
        Ok(DxuSchema {
            document,
            validator,
        })
    }

    /// Validate a raw definition tree (includes already resolved). The
    /// first violation is reported with the path of the offending node.
    pub fn validate(&self, root: &YamlValue) -> Result<()> {
        let mut instance = to_json(root);
        canonical_creators(&mut instance);
        if let Err(mut errors) = self.validator.validate(&instance) {
            if let Some(error) = errors.next() {
                let path = error.instance_path.to_string();
                return Err(Error::schema(at(&path), error.to_string()));
            }
        }
        Ok(())
    }

    /// Write the attribute reference of the schema as RestructuredText.
    pub fn write_doc<W: Write>(&self, out: &mut W) -> Result<()> {
        let mut text = String::new();
        describe(&self.document, None, 0, &mut text)?;
        out.write_all(text.as_bytes())?;
        Ok(())
    }
}

// ── Instance conversion ──

/// JSON view of a YAML tree. Mapping keys become their YAML text, so
/// enumerations keyed by numbers validate like any other object.
fn to_json(node: &YamlValue) -> JsonValue {
    match node {
        YamlValue::Null => JsonValue::Null,
        YamlValue::Bool(b) => JsonValue::Bool(*b),
        YamlValue::Number(n) => serde_json::to_value(n).unwrap_or(JsonValue::Null),
        YamlValue::String(s) => JsonValue::String(s.clone()),
        YamlValue::Sequence(items) => JsonValue::Array(items.iter().map(to_json).collect()),
        YamlValue::Mapping(map) => JsonValue::Object(
            map.iter()
                .map(|(key, value)| (scalar_text(key), to_json(value)))
                .collect(),
        ),
        YamlValue::Tagged(tagged) => to_json(&tagged.value),
    }
}

/// Creators may spell their keys `first_name`/`last_name`.
fn canonical_creators(root: &mut JsonValue) {
    let Some(creators) = root.get_mut("creators").and_then(JsonValue::as_array_mut) else {
        return;
    };
    for creator in creators.iter_mut().filter_map(JsonValue::as_object_mut) {
        for (alias, key) in [("first_name", "first-name"), ("last_name", "last-name")] {
            if let Some(value) = creator.remove(alias) {
                creator.entry(key).or_insert(value);
            }
        }
    }
}

fn at(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

// ── Documentation ──

const UNDERLINES: [char; 5] = ['-', '*', '+', '.', '#'];

fn malformed(what: &str) -> Error {
    Error::InvalidSchema(format!("cannot document schema: {what}"))
}

fn text_of<'a>(node: &'a YamlValue, key: &str) -> &'a str {
    node.get(key).and_then(YamlValue::as_str).unwrap_or_default()
}

/// `string`, or `string / number` for a list of types.
fn type_text(node: &YamlValue) -> String {
    match node.get("type") {
        Some(YamlValue::Sequence(types)) => types
            .iter()
            .filter_map(YamlValue::as_str)
            .collect::<Vec<_>>()
            .join(" / "),
        Some(YamlValue::String(t)) => t.clone(),
        _ => String::new(),
    }
}

/// A scalar as written in YAML, without quotes.
fn scalar_text(node: &YamlValue) -> String {
    match node {
        YamlValue::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn describe(doc: &YamlValue, name: Option<&str>, depth: usize, text: &mut String) -> Result<()> {
    if let Some(name) = name {
        let heading = format!("*{name}*: {}", text_of(doc, "description"));
        let underline = UNDERLINES[depth.min(UNDERLINES.len() - 1)];
        text.push_str(&format!(
            "{heading}\n{}\n\n",
            underline.to_string().repeat(heading.chars().count())
        ));
    }

    let doc = if text_of(doc, "type") == "array" {
        text.push_str("Attributes of each item:\n\n");
        doc.get("items").ok_or_else(|| malformed("array without items"))?
    } else {
        text.push_str("Attributes:\n\n");
        doc
    };
    let properties: &Mapping = doc
        .get("properties")
        .and_then(YamlValue::as_mapping)
        .ok_or_else(|| malformed("object without properties"))?;
    let required: Vec<&str> = doc
        .get("required")
        .and_then(YamlValue::as_sequence)
        .map(|keys| keys.iter().filter_map(YamlValue::as_str).collect())
        .unwrap_or_default();

    let mut subsections = Vec::new();
    for (key, prop) in properties {
        let key = key.as_str().ok_or_else(|| malformed("non-string property name"))?;
        let req = if required.contains(&key) { "*required*, " } else { "" };
        text.push_str(&format!("**{key}**\n  {}", text_of(prop, "description")));

        let kind = text_of(prop, "type");
        if kind == "object" || kind == "array" {
            if prop.get("properties").is_some() || prop.get("items").is_some() {
                text.push_str(&format!(" ({req}see below)\n\n"));
                subsections.push((prop, key));
            } else {
                text.push_str("\n\n");
            }
            continue;
        }

        text.push_str(&format!(" ({req}{}", type_text(prop)));
        if let Some(YamlValue::Sequence(choices)) = prop.get("enum") {
            let choices: Vec<String> = choices.iter().map(scalar_text).collect();
            text.push_str(&format!(", one of ``{}``", choices.join("`` / ``")));
        }
        if let Some(default) = prop.get("default") {
            text.push_str(&format!(", default: {}", scalar_text(default)));
        }
        text.push_str(")\n\n");
    }

    for (prop, key) in subsections {
        describe(prop, Some(key), depth + 1, text)?;
    }
    Ok(())
}
