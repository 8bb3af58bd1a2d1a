//! RestructuredText rendering of DXU definitions.
//!
//! Two documents are produced: the FITS keyword reference of each
//! extension ([`render_reference_table`]), and the human-oriented
//! description of the whole definition ([`render_rst`]). Both are built
//! in memory and written in one piece, so a failure leaves the sink
//! untouched.

use std::io::Write;

use tracing::info;

use crate::config::Config;
use crate::datatype::NullSentinel;
use crate::definition::{ColumnSpec, DxuDefinition, Extension, Field, HeaderSpec, Range};
use crate::error::Result;
use crate::mapper::{self, value_text, EntryValue, HeaderEntry, RuntimeValues};
use crate::value::Value;

const SOFT_BREAK: char = '\u{200B}';

const REFERENCE_KEYS: [&str; 9] = [
    "TTYPE", "TFORM", "TDIM", "TZERO", "TUNIT", "TUCD", "TLMIN", "TLMAX", "TNULL",
];

// ── Building blocks ──

fn heading(text: &mut String, title: &str, underline: char) {
    text.push_str(title);
    text.push('\n');
    text.extend(std::iter::repeat(underline).take(title.chars().count()));
    text.push_str("\n\n");
}

fn list_table(text: &mut String, options: &[&str], header: &[&str]) {
    text.push_str(".. list-table::\n");
    for option in options {
        text.push_str("   ");
        text.push_str(option);
        text.push('\n');
    }
    text.push('\n');
    row(text, header);
}

fn row<S: AsRef<str>>(text: &mut String, cells: &[S]) {
    for (i, cell) in cells.iter().enumerate() {
        text.push_str(if i == 0 { "   * -" } else { "     -" });
        let cell = cell.as_ref();
        if !cell.is_empty() {
            text.push(' ');
            text.push_str(cell);
        }
        text.push('\n');
    }
}

/// Allow line breaks after each `sep` in narrow table cells.
fn soften(s: &str, sep: char, config: &Config) -> String {
    if config.soft_breaks {
        s.replace(sep, &format!("{sep}{SOFT_BREAK}"))
    } else {
        s.to_string()
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) if !s.is_empty() => format!("``{s}``"),
        other => other.to_string(),
    }
}

fn range_text(range: &Range) -> String {
    let bound = |v: Option<Value>| v.map(|v| v.to_string());
    match (bound(range.min_value()), bound(range.max_value())) {
        (Some(min), Some(max)) => format!("{min} to {max}"),
        (Some(min), None) => format!("≥ {min}"),
        (None, Some(max)) => format!("≤ {max}"),
        (None, None) => String::new(),
    }
}

/// `NAME\ *n*` for array headers.
fn header_label(spec: &HeaderSpec) -> String {
    if spec.array {
        format!("{}\\ *n*", spec.name)
    } else {
        spec.name.clone()
    }
}

/// Value enumerations too long for a table cell, listed after the table.
struct ValueLists<'a> {
    extension: &'a str,
    /// Noun used in the list caption (`column`, `keyword`).
    kind: &'static str,
    lists: Vec<(String, Vec<String>)>,
}

impl<'a> ValueLists<'a> {
    fn new(extension: &'a str, kind: &'static str) -> Self {
        ValueLists {
            extension,
            kind,
            lists: Vec::new(),
        }
    }

    fn label(&self, name: &str) -> String {
        format!("{} {name} values", self.extension)
    }

    /// The note for `field`'s enumeration: inline, or a reference to the
    /// list written by [`ValueLists::write`].
    fn note<F: Field>(&mut self, field: &F, config: &Config) -> Option<String> {
        let items: Vec<String> = field
            .values()?
            .iter()
            .map(|(value, desc)| match desc.as_str() {
                Some(desc) => format!("{} ({desc})", value_text(value)),
                None => value_text(value),
            })
            .collect();
        if items.len() <= config.max_inline_values {
            Some(format!("Possible values: {}", items.join(", ")))
        } else {
            let note = format!(
                "See :ref:`below <{}>` for possible values",
                self.label(field.name())
            );
            self.lists.push((field.name().to_string(), items));
            Some(note)
        }
    }

    fn write(&self, text: &mut String) {
        if self.lists.is_empty() {
            return;
        }
        text.push_str("Notes\n.....\n");
        for (name, items) in &self.lists {
            let widest = items.iter().map(|s| s.chars().count()).max().unwrap_or(1).max(1);
            let columns = (60 / widest + 1).min(4);
            text.push_str(&format!(
                "\n.. _{}:\n\nList of values for {} **{name}**:\n\n.. hlist::\n   :columns: {columns}\n\n",
                self.label(name),
                self.kind,
            ));
            for item in items {
                text.push_str(&format!("   * {item}\n"));
            }
        }
        text.push('\n');
    }
}

/// Notes shared by headers and columns: user notes, range, values.
fn common_notes<F: Field>(field: &F, lists: &mut ValueLists<'_>, config: &Config) -> Vec<String> {
    let mut notes = Vec::new();
    if let Some(user) = field.notes() {
        notes.push(user.to_string());
    }
    if let Some(range) = field.range() {
        notes.push(format!("Range: {}", range_text(range)));
    }
    if let Some(values) = lists.note(field, config) {
        notes.push(values);
    }
    notes
}

fn described<F: Field>(field: &F) -> String {
    match field.unit() {
        Some(unit) => format!("{} [{}]", field.description(), unicode_unit(unit)),
        None => field.description().to_string(),
    }
}

const SUPERSCRIPTS: [char; 10] = ['⁰', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];

/// A FITS unit string as it reads in prose: exponents (`cm**2`, `cm^2`,
/// `cm2`, `10**(-17)`) become superscripts and `.` between factors a
/// space. Anything else is kept as written.
fn unicode_unit(unit: &str) -> String {
    let chars: Vec<char> = unit.chars().collect();
    let mut out = String::with_capacity(unit.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let after_letter = i > 0 && chars[i - 1].is_ascii_alphabetic();
        let marker = if chars[i..].starts_with(&['*', '*']) {
            2
        } else if c == '^' {
            1
        } else {
            0
        };
        if marker > 0 {
            if let Some((sup, used)) = superscript(&chars[i + marker..]) {
                out.push_str(&sup);
                i += marker + used;
                continue;
            }
        }
        if after_letter && matches!(c, '0'..='9' | '+' | '-') {
            if let Some((sup, used)) = superscript(&chars[i..]) {
                out.push_str(&sup);
                i += used;
                continue;
            }
        }
        let factor_end = out
            .chars()
            .last()
            .is_some_and(|p| p.is_ascii_alphabetic() || p == '⁻' || SUPERSCRIPTS.contains(&p));
        if c == '.' && factor_end && chars.get(i + 1).is_some_and(char::is_ascii_alphabetic) {
            out.push(' ');
        } else {
            out.push(c);
        }
        i += 1;
    }
    out
}

/// A signed integer exponent, optionally parenthesised, and the number of
/// characters it spans.
fn superscript(chars: &[char]) -> Option<(String, usize)> {
    let paren = chars.first() == Some(&'(');
    let mut i = usize::from(paren);
    let mut sup = String::new();
    match chars.get(i) {
        Some('-') => {
            sup.push('⁻');
            i += 1;
        }
        Some('+') => i += 1,
        _ => {}
    }
    let start = i;
    while let Some(digit) = chars.get(i).and_then(|c| c.to_digit(10)) {
        sup.push(SUPERSCRIPTS[digit as usize]);
        i += 1;
    }
    if i == start {
        return None;
    }
    if paren {
        if chars.get(i) != Some(&')') {
            return None;
        }
        i += 1;
    }
    Some((sup, i))
}

// ── Reference table ──

fn null_marker(null: Option<NullSentinel>) -> String {
    match null {
        Some(NullSentinel::Tnull(raw)) => raw.to_string(),
        Some(NullSentinel::NaN) => String::from("NaN"),
        Some(NullSentinel::EmptyString) => String::from("*empty*"),
        Some(NullSentinel::Undefined) | None => String::new(),
    }
}

fn entry_value(entry: &HeaderEntry) -> String {
    match &entry.value {
        EntryValue::Fixed(v) | EntryValue::Supplied(v) => literal(v),
        EntryValue::Placeholder => entry
            .datatype
            .map(|dt| format!("*{dt}*"))
            .unwrap_or_default(),
    }
}

fn reference_header_rows(
    ext: &Extension,
    runtime: &RuntimeValues,
    config: &Config,
    text: &mut String,
) -> Result<()> {
    let specs: Vec<&HeaderSpec> = ext
        .header
        .iter()
        .filter(|h| config.internal_docs.admits(h.internal))
        .collect();
    if specs.is_empty() {
        return Ok(());
    }

    list_table(
        text,
        &[":header-rows: 1", ":stub-columns: 1"],
        &["Keyword", "Value/*Type*", "Unit", "Range", "Null", "Notes"],
    );
    let mut lists = ValueLists::new(&ext.name, "keyword");
    let mut rows = Vec::new();
    for spec in specs {
        let entries = mapper::derive_header_entries(spec, runtime.get(&spec.name))?;
        let unit = spec
            .unit
            .as_deref()
            .map(|u| soften(u, '.', config))
            .unwrap_or_default();
        let range = spec.range.as_ref().map(range_text).unwrap_or_default();
        let null = null_marker(
            Field::datatype(spec)
                .filter(|_| spec.maybenull)
                .map(|dt| dt.null_sentinel()),
        );
        let mut notes = common_notes(spec, &mut lists, config);
        if !spec.required {
            notes.push(String::from("Optional"));
        }
        if spec.internal {
            notes.push(String::from("Internal"));
        }
        let notes = notes.join(". ");

        if entries.is_empty() {
            let placeholder = spec
                .datatype
                .map(|dt| format!("*{dt}*"))
                .unwrap_or_default();
            rows.push([header_label(spec), placeholder, unit, range, null, notes]);
        } else {
            for entry in &entries {
                rows.push([
                    entry.keyword.clone(),
                    entry_value(entry),
                    unit.clone(),
                    range.clone(),
                    null.clone(),
                    notes.clone(),
                ]);
            }
        }
    }
    for cells in &rows {
        row(text, cells);
    }
    text.push('\n');
    lists.write(text);
    Ok(())
}

fn reference_column_rows(ext: &Extension, config: &Config, text: &mut String) -> Result<()> {
    let specs: Vec<&ColumnSpec> = ext
        .columns
        .iter()
        .filter(|c| config.internal_docs.admits(c.internal))
        .collect();
    if specs.is_empty() {
        return Ok(());
    }

    let mut header = vec![String::from("*n*")];
    header.extend(REFERENCE_KEYS.iter().map(|key| format!("{key}\\ *n*")));
    header.push(String::from("Notes"));
    let header: Vec<&str> = header.iter().map(String::as_str).collect();
    list_table(text, &[":header-rows: 1", ":stub-columns: 2"], &header);

    let mut lists = ValueLists::new(&ext.name, "column");
    for (i, spec) in specs.into_iter().enumerate() {
        let kw = mapper::derive_column_keywords(i + 1, spec)?;
        let text_of = |v: &Option<Value>| v.as_ref().map(Value::to_string).unwrap_or_default();
        let tnull = match kw.tnull {
            Some(raw) => raw.to_string(),
            None => null_marker(kw.null),
        };
        let mut notes = common_notes(spec, &mut lists, config);
        if spec.internal {
            notes.push(String::from("Internal"));
        }
        row(
            text,
            &[
                kw.index.to_string(),
                kw.ttype.clone(),
                kw.form.tform.to_string(),
                kw.form.tdim_text().unwrap_or_default(),
                text_of(&kw.form.tzero),
                kw.tunit
                    .as_deref()
                    .map(|u| soften(u, '.', config))
                    .unwrap_or_default(),
                soften(&kw.tucd, ';', config),
                text_of(&kw.tlmin),
                text_of(&kw.tlmax),
                tnull,
                notes.join(". "),
            ],
        );
    }
    text.push('\n');
    lists.write(text);
    Ok(())
}

/// Write the FITS keyword reference of one extension: a table of its
/// header keywords and a table of its column keywords. `TCOMMn` is left
/// out to keep the table narrow.
pub fn render_reference_table<W: Write>(
    ext: &Extension,
    runtime: &RuntimeValues,
    config: &Config,
    out: &mut W,
) -> Result<()> {
    let mut text = String::new();
    heading(&mut text, &format!("{} FITS extension", ext.name), '-');
    text.push_str(&ext.description);
    text.push_str("\n\n");
    reference_header_rows(ext, runtime, config, &mut text)?;
    reference_column_rows(ext, config, &mut text)?;

    out.write_all(text.as_bytes())?;
    info!(
        extension = %ext.name,
        bytes = text.len(),
        "rendered FITS reference table"
    );
    Ok(())
}

/// The FITS keyword reference of every extension of a definition.
pub fn render_fits_reference<W: Write>(
    def: &DxuDefinition,
    runtime: &RuntimeValues,
    config: &Config,
    out: &mut W,
) -> Result<()> {
    // render everything first so nothing is written on error
    let mut buf = Vec::new();
    for ext in &def.extensions {
        render_reference_table(ext, runtime, config, &mut buf)?;
    }
    out.write_all(&buf)?;
    Ok(())
}

// ── Full documentation ──

fn fixed_text(spec: &HeaderSpec) -> Option<String> {
    let fixed = spec.fixed_values().ok().filter(|v| !v.is_empty())?;
    Some(fixed.iter().map(literal).collect::<Vec<_>>().join(", "))
}

fn describe_headers(ext: &Extension, config: &Config, text: &mut String) {
    let specs: Vec<&HeaderSpec> = ext
        .header
        .iter()
        .filter(|h| config.internal_docs.admits(h.internal))
        .collect();
    if specs.is_empty() {
        return;
    }

    list_table(
        text,
        &[":widths: 1 10 40 40", ":header-rows: 1", ":stub-columns: 1"],
        &["Header keyword", "Value/*Type*", "Description", "Notes"],
    );
    let mut lists = ValueLists::new(&ext.name, "keyword");
    for spec in specs {
        let fixed = fixed_text(spec);
        let mut notes = common_notes(spec, &mut lists, config);
        if spec.array {
            notes.push(String::from("*n* = 1…"));
        }
        if !spec.required {
            notes.push(String::from("Optional"));
        }
        if fixed.is_some() {
            notes.push(String::from("Static value"));
        }
        if spec.maybenull {
            notes.push(String::from("May be empty"));
        }
        let value = fixed.unwrap_or_else(|| {
            Field::datatype(spec)
                .map(|dt| format!("*{dt}*"))
                .unwrap_or_default()
        });
        row(
            text,
            &[header_label(spec), value, described(spec), notes.join(". ")],
        );
    }
    text.push('\n');
    lists.write(text);
}

fn describe_columns(ext: &Extension, config: &Config, text: &mut String) {
    let specs: Vec<&ColumnSpec> = ext
        .columns
        .iter()
        .filter(|c| config.internal_docs.admits(c.internal))
        .collect();
    if specs.is_empty() {
        return;
    }

    list_table(
        text,
        &[":widths: 1 10 40 40", ":header-rows: 1", ":stub-columns: 1"],
        &["Column name", "Type", "Description", "Notes"],
    );
    let mut lists = ValueLists::new(&ext.name, "column");
    for spec in specs {
        let datatype = match spec.arraysize {
            Some(n) => format!("{}[{n}]", spec.datatype),
            None => spec.datatype.to_string(),
        };
        let mut notes = common_notes(spec, &mut lists, config);
        if spec.maybenull {
            notes.push(String::from("May be empty"));
        }
        if let Some(max) = spec.maxlength {
            notes.push(format!("Max length: {max}"));
        }
        row(
            text,
            &[spec.name.clone(), datatype, described(spec), notes.join(". ")],
        );
    }
    text.push('\n');
    lists.write(text);
}

/// Write the human-readable documentation of a definition: title,
/// authors, version, description, then one section per extension.
pub fn render_rst<W: Write>(def: &DxuDefinition, config: &Config, out: &mut W) -> Result<()> {
    let mut text = String::new();
    heading(&mut text, &def.name, '=');
    text.push_str(&format!(
        "**Author(s)**\n  {}\n\n**Version**\n  {}\n\n{}\n\n",
        def.creator_names(),
        def.version,
        def.description
    ));

    for ext in &def.extensions {
        heading(&mut text, &format!("{} extension", ext.name), '-');
        text.push_str(&ext.description);
        text.push_str("\n\n");
        describe_headers(ext, config, &mut text);
        describe_columns(ext, config, &mut text);
        info!(extension = %ext.name, "rendered extension documentation");
    }

    out.write_all(text.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::path::Path;

    const DEF: &str = r#"
name: Example DXU
version: "1.2"
creators:
  - {first-name: Ada, last-name: Lovelace}
description: Test catalogue
extensions:
  - name: Primary
    description: Primary header
    header:
      - name: ORIGIN
        description: Observatory
        value: ESO-PARANAL
      - name: EXPTIME
        description: Exposure time
        datatype: double
        unit: s
        range: {min: 0}
      - name: FLAG
        description: Quality flags
        datatype: int16
        array: true
        required: false
  - name: QXP-Z
    description: Redshift catalogue
    columns:
      - name: OBJ_NME
        description: Object name
        ucd: meta.id;meta.main
        datatype: str
        maxlength: 24
      - name: CLASS
        description: Spectral class
        ucd: src.class
        datatype: str
        values: {GALAXY: galaxy, QSO: quasar, STAR: ~, UNKNOWN: not classified}
      - name: Z
        description: Redshift
        ucd: src.redshift
        datatype: float
        range: {min: 0, max: 7}
        maybenull: true
      - name: NPIX
        description: Pixel count
        ucd: meta.number
        datatype: uint16
        maybenull: true
      - name: DEBUG
        description: Internal diagnostics
        ucd: meta.code
        datatype: int32
        internal: true
"#;

    fn definition() -> DxuDefinition {
        DxuDefinition::from_yaml_str(DEF, Path::new(".")).unwrap()
    }

    fn reference(ext: &Extension, config: &Config) -> String {
        let mut out = Vec::new();
        render_reference_table(ext, &RuntimeValues::new(), config, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn reference_table_is_deterministic() {
        let def = definition();
        let config = Config::default();
        let first = reference(&def.tables()[0], &config);
        let second = reference(&definition().tables()[0], &config);
        assert_eq!(first, second);
    }

    #[test]
    fn reference_table_columns() {
        let def = definition();
        let text = reference(&def.tables()[0], &Config::default());
        assert!(text.starts_with("QXP-Z FITS extension\n--------------------\n\nRedshift catalogue\n\n"));
        assert!(text.contains("   * - *n*\n     - TTYPE\\ *n*\n     - TFORM\\ *n*\n"));
        assert!(text.contains("   * - 1\n     - OBJ_NME\n     - 24A\n     -\n     -\n     -\n     - meta.id;\u{200B}meta.main\n"));
        assert!(text.contains("   * - 4\n     - NPIX\n     - I\n     -\n     - 32768\n"));
        assert!(text.contains("     - 32767\n"));
        assert!(text.contains("     - 0\n     - 7\n     - NaN\n"));
        assert!(text.contains("   * - 5\n     - DEBUG\n"));
        assert!(text.contains("See :ref:`below <QXP-Z CLASS values>` for possible values"));
        assert!(text.contains(".. _QXP-Z CLASS values:\n"));
        assert!(text.contains("   * STAR\n"));
        // descriptions stay out of the reference table
        assert!(!text.contains("Object name"));
        assert!(!text.contains("TCOMM"));
    }

    #[test]
    fn soft_breaks_can_be_disabled() {
        let def = definition();
        let config = Config {
            soft_breaks: false,
            ..Config::default()
        };
        let text = reference(&def.tables()[0], &config);
        assert!(text.contains("     - meta.id;meta.main\n"));
        assert!(!text.contains('\u{200B}'));
    }

    #[test]
    fn internal_columns_follow_policy() {
        let def = definition();
        let config = Config {
            internal_docs: crate::config::InternalPolicy::Exclude,
            ..Config::default()
        };
        let text = reference(&def.tables()[0], &config);
        assert!(!text.contains("DEBUG"));
    }

    fn exposure() -> RuntimeValues {
        let mut runtime = RuntimeValues::new();
        runtime.push("EXPTIME", Value::Float(1200.0));
        runtime
    }

    #[test]
    fn reference_header_rows() {
        let def = definition();
        let mut out = Vec::new();
        render_reference_table(def.primary(), &exposure(), &Config::default(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("   * - ORIGIN\n     - ``ESO-PARANAL``\n"));
        assert!(text.contains("   * - EXPTIME\n     - 1200.0\n     - s\n     - ≥ 0\n"));
        assert!(text.contains("   * - FLAG\\ *n*\n     - *int16*\n"));
    }

    #[test]
    fn header_null_marker_follows_datatype() {
        let text = DEF.replace(
            "        unit: s\n",
            "        unit: s\n        maybenull: true\n",
        );
        let def = DxuDefinition::from_yaml_str(&text, Path::new(".")).unwrap();
        let mut out = Vec::new();
        render_reference_table(def.primary(), &exposure(), &Config::default(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("   * - EXPTIME\n     - 1200.0\n     - s\n     - ≥ 0\n     - NaN\n"));
        assert!(!text.contains("*empty*"));
    }

    #[test]
    fn units_read_as_unicode_in_prose() {
        assert_eq!(unicode_unit("deg"), "deg");
        assert_eq!(unicode_unit("km/s"), "km/s");
        assert_eq!(unicode_unit("cm**2"), "cm²");
        assert_eq!(unicode_unit("m^-1"), "m⁻¹");
        assert_eq!(unicode_unit("erg.s-1.cm-2"), "erg s⁻¹ cm⁻²");
        assert_eq!(unicode_unit("10**(-17) erg/s/cm**2/Angstrom"), "10⁻¹⁷ erg/s/cm²/Angstrom");
        assert_eq!(unicode_unit("1.5 mag"), "1.5 mag");
    }

    #[test]
    fn required_header_needs_a_value() {
        let def = definition();
        let mut out = Vec::new();
        match render_reference_table(def.primary(), &RuntimeValues::new(), &Config::default(), &mut out) {
            Err(Error::Definition { field, .. }) => assert_eq!(field, "EXPTIME"),
            other => panic!("expected definition error, got {other:?}"),
        }
        assert!(out.is_empty());
    }

    #[test]
    fn supplied_values_expand_array_headers() {
        let def = definition();
        let mut runtime = exposure();
        runtime.push("FLAG", Value::Integer(1));
        runtime.push("FLAG", Value::Integer(4));
        let mut out = Vec::new();
        render_reference_table(def.primary(), &runtime, &Config::default(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("   * - FLAG1\n     - 1\n"));
        assert!(text.contains("   * - FLAG2\n     - 4\n"));
    }

    #[test]
    fn failed_render_writes_nothing() {
        let mut def = definition();
        def.extensions[1].columns[3].maxlength = Some(4);
        let mut out = Vec::new();
        let result = render_fits_reference(&def, &exposure(), &Config::default(), &mut out);
        assert!(matches!(result, Err(Error::Definition { .. })));
        assert!(out.is_empty());
    }

    #[test]
    fn full_rst() {
        let def = definition();
        let mut out = Vec::new();
        render_rst(&def, &Config::default(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with(
            "Example DXU\n===========\n\n**Author(s)**\n  Ada Lovelace\n\n**Version**\n  1.2\n\nTest catalogue\n\n"
        ));
        assert!(text.contains("Primary extension\n-----------------\n"));
        assert!(text.contains("   * - ORIGIN\n     - ``ESO-PARANAL``\n     - Observatory\n     - Static value\n"));
        assert!(text.contains("   * - EXPTIME\n     - *double*\n     - Exposure time [s]\n     - Range: ≥ 0\n"));
        assert!(text.contains("   * - FLAG\\ *n*\n     - *int16*\n     - Quality flags\n     - *n* = 1…. Optional\n"));
        assert!(text.contains("   * - OBJ_NME\n     - str\n     - Object name\n     - Max length: 24\n"));
        assert!(text.contains("   * - Z\n     - float\n     - Redshift\n     - Range: 0 to 7. May be empty\n"));
        assert!(text.contains("List of values for column **CLASS**:"));
        assert!(text.contains("   * GALAXY (galaxy)\n   * QSO (quasar)\n   * STAR\n"));
    }

    #[test]
    fn short_value_lists_stay_inline() {
        let def = definition();
        let config = Config {
            max_inline_values: 4,
            ..Config::default()
        };
        let mut out = Vec::new();
        render_rst(&def, &config, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(
            "Possible values: GALAXY (galaxy), QSO (quasar), STAR, UNKNOWN (not classified)"
        ));
        assert!(!text.contains(".. hlist::"));
    }
}
