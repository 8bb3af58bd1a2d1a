//! Empty FITS files built from a definition: a primary HDU with the
//! declared keywords and one zero-row binary table per table extension.

use std::io::Write;

use tracing::{debug, info};

use crate::block::{header_blocks_for_cards, padded_byte_len, BLOCK_SIZE};
use crate::config::Config;
use crate::definition::{DxuDefinition, Extension};
use crate::error::{Error, Result};
use crate::header::{parse_header_blocks, serialize_header, validate_required_keywords, Card, HduType};
use crate::mapper::{self, EntryValue, RuntimeValues};
use crate::value::Value;

/// The header of one HDU of a template file.
#[derive(Debug, Clone, PartialEq)]
pub struct HduTemplate {
    pub name: String,
    pub hdu_type: HduType,
    pub cards: Vec<Card>,
}

impl HduTemplate {
    pub fn card(&self, keyword: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.keyword_str() == keyword)
    }

    pub fn value(&self, keyword: &str) -> Option<&Value> {
        self.card(keyword).and_then(|c| c.value.as_ref())
    }
}

fn card(keyword: &str, value: Value, comment: &str) -> Result<Card> {
    Card::new(keyword, value, Some(comment))
}

/// Cards of the declared header keywords of `ext`.
///
/// Optional keywords without a value, and optional empty strings, are
/// left out; required keywords without a value are written with an
/// undefined value.
fn header_cards(ext: &Extension, runtime: &RuntimeValues, config: &Config) -> Result<Vec<Card>> {
    let mut cards = Vec::new();
    for spec in &ext.header {
        if !config.internal_fits.admits(spec.internal) {
            debug!(header = %spec.name, "internal header left out of template");
            continue;
        }
        let entries = match runtime.get(&spec.name) {
            Some(values) => mapper::derive_header_entries(spec, Some(values))?,
            None => mapper::header_plan(spec)?,
        };
        for entry in entries {
            let value = match entry.value {
                EntryValue::Fixed(Value::String(s)) | EntryValue::Supplied(Value::String(s))
                    if s.is_empty() && !spec.required =>
                {
                    continue
                }
                EntryValue::Fixed(v) | EntryValue::Supplied(v) => v,
                EntryValue::Placeholder if spec.required => Value::Undefined,
                EntryValue::Placeholder => continue,
            };
            cards.push(card(&entry.keyword, value, &spec.description)?);
        }
    }
    Ok(cards)
}

fn declares(ext: &Extension, keyword: &str) -> bool {
    ext.header.iter().any(|h| h.name == keyword)
}

/// Header of the primary HDU.
pub fn primary_template(
    ext: &Extension,
    has_extensions: bool,
    runtime: &RuntimeValues,
    config: &Config,
) -> Result<HduTemplate> {
    let mut cards = vec![
        card("SIMPLE", Value::Logical(true), "conforms to FITS standard")?,
        card("BITPIX", Value::Integer(8), "array data type")?,
        card("NAXIS", Value::Integer(0), "number of array dimensions")?,
    ];
    if has_extensions {
        cards.push(card("EXTEND", Value::Logical(true), "")?);
    }
    cards.extend(header_cards(ext, runtime, config)?);
    Ok(HduTemplate {
        name: ext.name.clone(),
        hdu_type: HduType::Primary,
        cards,
    })
}

/// Header of a zero-row binary table with the full column keyword set.
pub fn table_template(ext: &Extension, runtime: &RuntimeValues, config: &Config) -> Result<HduTemplate> {
    let mut columns = Vec::new();
    for spec in ext.columns.iter() {
        if config.internal_fits.admits(spec.internal) {
            columns.push(mapper::derive_column_keywords(columns.len() + 1, spec)?);
        } else {
            debug!(column = %spec.name, "internal column left out of template");
        }
    }
    let naxis1: usize = columns.iter().map(|c| c.form.tform.byte_width()).sum();

    let mut cards = vec![
        card("XTENSION", Value::String(String::from("BINTABLE")), "binary table extension")?,
        card("BITPIX", Value::Integer(8), "array data type")?,
        card("NAXIS", Value::Integer(2), "number of array dimensions")?,
        card("NAXIS1", Value::Integer(naxis1 as i64), "length of dimension 1")?,
        card("NAXIS2", Value::Integer(0), "length of dimension 2")?,
        card("PCOUNT", Value::Integer(0), "number of group parameters")?,
        card("GCOUNT", Value::Integer(1), "number of groups")?,
        card("TFIELDS", Value::Integer(columns.len() as i64), "number of table fields")?,
    ];
    for column in &columns {
        cards.extend(column.cards()?);
    }
    if !declares(ext, "EXTNAME") {
        cards.push(card("EXTNAME", Value::String(ext.name.clone()), "extension name")?);
    }
    cards.extend(header_cards(ext, runtime, config)?);

    Ok(HduTemplate {
        name: ext.name.clone(),
        hdu_type: HduType::BinaryTable,
        cards,
    })
}

/// All HDU headers of the template of `def`, in file order.
pub fn build_template(
    def: &DxuDefinition,
    runtime: &RuntimeValues,
    config: &Config,
) -> Result<Vec<HduTemplate>> {
    let mut hdus = vec![primary_template(
        def.primary(),
        !def.tables().is_empty(),
        runtime,
        config,
    )?];
    for ext in def.tables() {
        hdus.push(table_template(ext, runtime, config)?);
    }
    for hdu in &hdus {
        validate_required_keywords(hdu.hdu_type, &hdu.cards)?;
    }
    Ok(hdus)
}

/// Write the template of `def` as a FITS file. Tables have no rows, so
/// the file consists of header blocks only.
pub fn write_template<W: Write>(
    def: &DxuDefinition,
    runtime: &RuntimeValues,
    config: &Config,
    out: &mut W,
) -> Result<()> {
    let hdus = build_template(def, runtime, config)?;
    let mut buf = Vec::new();
    for hdu in &hdus {
        buf.extend_from_slice(&serialize_header(&hdu.cards));
    }
    out.write_all(&buf)?;
    info!(
        name = %def.name,
        hdus = hdus.len(),
        bytes = buf.len(),
        "wrote FITS template"
    );
    Ok(())
}

fn integer(cards: &[Card], keyword: &str) -> usize {
    cards
        .iter()
        .find(|c| c.keyword_str() == keyword)
        .and_then(|c| match c.value {
            Some(Value::Integer(n)) => usize::try_from(n).ok(),
            _ => None,
        })
        .unwrap_or(0)
}

/// Read back the headers of a FITS file, skipping data units.
pub fn read_headers(data: &[u8]) -> Result<Vec<Vec<Card>>> {
    let mut headers = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let cards = parse_header_blocks(&data[offset..])?;
        offset += header_blocks_for_cards(cards.len()) * BLOCK_SIZE;

        let data_len = if integer(&cards, "NAXIS") == 0 {
            0
        } else {
            integer(&cards, "NAXIS1") * integer(&cards, "NAXIS2") + integer(&cards, "PCOUNT")
        };
        offset += padded_byte_len(data_len);
        headers.push(cards);
    }
    if offset != data.len() {
        return Err(Error::InvalidHeader(String::from("truncated data unit")));
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InternalPolicy;
    use std::path::Path;

    const DEF: &str = r#"
name: Template test
version: 1
creators: [{first-name: A, last-name: B}]
description: d
extensions:
  - name: Primary
    description: p
    header:
      - {name: ORIGIN, description: Observatory, value: ESO-PARANAL}
      - {name: PROG_ID, description: Programme, datatype: str}
      - {name: OBJECT, description: Target, datatype: str, required: false}
      - {name: SKYSUB, description: Sky flags, datatype: int16, array: true, required: false}
      - {name: PIPEVERS, description: Pipeline, datatype: str, internal: true, value: "2.1"}
  - name: QXP-Z
    description: t
    columns:
      - {name: NAME, description: Object name, ucd: meta.id, datatype: str, maxlength: 24}
      - {name: FLUX, description: Flux, ucd: phot.flux, datatype: float, arraysize: 3, unit: erg/s}
      - {name: NOBS, description: Observations, ucd: meta.number, datatype: uint32, maybenull: true}
      - {name: SECRET, description: s, ucd: meta.code, datatype: int8, internal: true}
"#;

    fn definition() -> DxuDefinition {
        DxuDefinition::from_yaml_str(DEF, Path::new(".")).unwrap()
    }

    fn keywords(hdu: &HduTemplate) -> Vec<&str> {
        hdu.cards.iter().map(Card::keyword_str).collect()
    }

    #[test]
    fn primary_header() {
        let hdus = build_template(&definition(), &RuntimeValues::new(), &Config::default()).unwrap();
        let primary = &hdus[0];
        assert_eq!(
            keywords(primary),
            ["SIMPLE", "BITPIX", "NAXIS", "EXTEND", "ORIGIN", "PROG_ID"]
        );
        assert_eq!(
            primary.value("ORIGIN"),
            Some(&Value::String(String::from("ESO-PARANAL")))
        );
        assert_eq!(primary.value("PROG_ID"), Some(&Value::Undefined));
        assert_eq!(primary.card("PROG_ID").unwrap().comment.as_deref(), Some("Programme"));
    }

    #[test]
    fn table_header() {
        let hdus = build_template(&definition(), &RuntimeValues::new(), &Config::default()).unwrap();
        let table = &hdus[1];
        assert_eq!(table.hdu_type, HduType::BinaryTable);
        // 24 + 3 * 4 + 4
        assert_eq!(table.value("NAXIS1"), Some(&Value::Integer(40)));
        assert_eq!(table.value("TFIELDS"), Some(&Value::Integer(3)));
        assert_eq!(table.value("TFORM2"), Some(&Value::String(String::from("3E"))));
        assert_eq!(table.value("TZERO3"), Some(&Value::Integer(2_147_483_648)));
        assert_eq!(table.value("TSCAL3"), Some(&Value::Integer(1)));
        assert_eq!(table.value("TNULL3"), Some(&Value::Integer(i32::MAX as i64)));
        assert_eq!(table.value("EXTNAME"), Some(&Value::String(String::from("QXP-Z"))));
        assert!(table.card("TTYPE4").is_none());
    }

    #[test]
    fn internal_policy_for_templates() {
        let config = Config {
            internal_fits: InternalPolicy::Include,
            ..Config::default()
        };
        let hdus = build_template(&definition(), &RuntimeValues::new(), &config).unwrap();
        assert_eq!(hdus[0].value("PIPEVERS"), Some(&Value::String(String::from("2.1"))));
        assert_eq!(hdus[1].value("TTYPE4"), Some(&Value::String(String::from("SECRET"))));
        assert_eq!(hdus[1].value("TZERO4"), Some(&Value::Integer(-128)));
    }

    #[test]
    fn supplied_values_fill_placeholders() {
        let mut runtime = RuntimeValues::new();
        runtime.push("PROG_ID", Value::String(String::from("0110.A-1234(A)")));
        runtime.push("SKYSUB", Value::Integer(1));
        runtime.push("SKYSUB", Value::Integer(0));
        let hdus = build_template(&definition(), &runtime, &Config::default()).unwrap();
        assert_eq!(
            hdus[0].value("PROG_ID"),
            Some(&Value::String(String::from("0110.A-1234(A)")))
        );
        assert_eq!(hdus[0].value("SKYSUB2"), Some(&Value::Integer(0)));
    }

    #[test]
    fn written_template_reads_back() {
        let def = definition();
        let mut out = Vec::new();
        write_template(&def, &RuntimeValues::new(), &Config::default(), &mut out).unwrap();
        assert_eq!(out.len() % BLOCK_SIZE, 0);

        let headers = read_headers(&out).unwrap();
        assert_eq!(headers.len(), 2);
        let expected = build_template(&def, &RuntimeValues::new(), &Config::default()).unwrap();
        for (read, built) in headers.iter().zip(&expected) {
            let read: Vec<&str> = read.iter().map(Card::keyword_str).collect();
            assert_eq!(read, keywords(built));
        }
        validate_required_keywords(HduType::BinaryTable, &headers[1]).unwrap();
    }

    #[test]
    fn truncated_file_is_rejected() {
        let mut out = Vec::new();
        write_template(&definition(), &RuntimeValues::new(), &Config::default(), &mut out).unwrap();
        assert!(read_headers(&out[..BLOCK_SIZE / 2]).is_err());
    }
}
