//! FITS header cards: building, writing, reading back, and checking the
//! mandatory keywords of generated headers.

use core::str;

use crate::block::{
    header_blocks_for_cards, BLOCK_SIZE, CARD_SIZE, HEADER_PAD_BYTE, KEYWORD_LEN,
    MAX_STRING_VALUE_LEN,
};
use crate::error::{Error, Result};
use crate::value::{format_value, parse_value, Value};

// ── Types ──

/// One 80-byte FITS keyword record.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    /// The 8-byte keyword name, ASCII, left-justified, space-padded.
    pub keyword: [u8; 8],
    /// The value, if this card has a value indicator (`= ` in bytes 8..10).
    pub value: Option<Value>,
    /// An optional comment string.
    pub comment: Option<String>,
}

impl Card {
    /// Build a valued card, checking the keyword against the FITS rules
    /// (at most 8 of `A-Z 0-9 - _`) and string values against the
    /// printable ASCII range. Comments are transliterated to ASCII.
    pub fn new(keyword: &str, value: Value, comment: Option<&str>) -> Result<Card> {
        let keyword = make_keyword(keyword)?;
        if let Value::String(s) = &value {
            if !is_card_text(s) {
                return Err(Error::InvalidHeader(format!(
                    "value {s:?} of {} is not printable ASCII",
                    String::from_utf8_lossy(&keyword).trim_end()
                )));
            }
        }
        Ok(Card {
            keyword,
            value: Some(value),
            comment: comment.filter(|c| !c.is_empty()).map(ascii_text),
        })
    }

    /// Return the keyword as a trimmed string.
    pub fn keyword_str(&self) -> &str {
        let end = self
            .keyword
            .iter()
            .rposition(|&b| b != b' ')
            .map(|i| i + 1)
            .unwrap_or(0);
        str::from_utf8(&self.keyword[..end]).unwrap_or("")
    }

    /// Returns `true` if this card is the END keyword.
    pub fn is_end(&self) -> bool {
        &self.keyword == b"END     "
    }
}

/// The kind of HDU a generated header describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HduType {
    Primary,
    BinaryTable,
}

/// Returns `true` if `name` is a legal FITS keyword.
pub fn is_valid_keyword(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= KEYWORD_LEN
        && name
            .bytes()
            .all(|b| matches!(b, b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_'))
}

/// Keywords that describe the HDU structure and are written by the
/// template builder itself.
const STRUCTURAL: [&str; 9] = [
    "SIMPLE", "BITPIX", "NAXIS", "EXTEND", "XTENSION", "PCOUNT", "GCOUNT", "TFIELDS", "END",
];

/// Structural keywords carrying a 1-based index suffix.
const INDEXED: [&str; 12] = [
    "NAXIS", "TTYPE", "TCOMM", "TFORM", "TDIM", "TZERO", "TSCAL", "TUNIT", "TUCD", "TLMIN",
    "TLMAX", "TNULL",
];

/// Returns `true` if `name` is a structural keyword a definition may not
/// declare as a header (`NAXIS`, `TFORM3`, ...).
pub fn is_reserved_keyword(name: &str) -> bool {
    STRUCTURAL.contains(&name)
        || INDEXED.iter().any(|prefix| {
            name.strip_prefix(prefix)
                .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
        })
}

/// Returns `true` if `text` only holds printable ASCII (0x20 to 0x7E), the
/// characters a header card may contain.
pub fn is_card_text(text: &str) -> bool {
    text.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Printable ASCII rendering of free text, for card comments and `TCOMMn`.
/// Common symbols are spelled out, accented Latin letters lose their
/// accent, anything else becomes `?`.
pub fn ascii_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            ' '..='~' => out.push(ch),
            '≥' => out.push_str(">="),
            '≤' => out.push_str("<="),
            '±' => out.push_str("+/-"),
            '×' => out.push('x'),
            '°' => out.push_str("deg"),
            'µ' | 'μ' => out.push('u'),
            '–' | '—' => out.push('-'),
            '‘' | '’' => out.push('\''),
            '“' | '”' => out.push('"'),
            '…' => out.push_str("..."),
            c if c.is_whitespace() => out.push(' '),
            c => out.push(unaccented(c).unwrap_or('?')),
        }
    }
    out
}

fn unaccented(c: char) -> Option<char> {
    let base = match c {
        'à'..='å' => 'a',
        'ç' => 'c',
        'è'..='ë' => 'e',
        'ì'..='ï' => 'i',
        'ñ' => 'n',
        'ò'..='ö' | 'ø' => 'o',
        'ù'..='ü' => 'u',
        'ý' | 'ÿ' => 'y',
        'À'..='Å' => 'A',
        'Ç' => 'C',
        'È'..='Ë' => 'E',
        'Ì'..='Ï' => 'I',
        'Ñ' => 'N',
        'Ò'..='Ö' | 'Ø' => 'O',
        'Ù'..='Ü' => 'U',
        'Ý' => 'Y',
        'ß' => 's',
        _ => return None,
    };
    Some(base)
}

/// Length of `text` inside a quoted card value, where `'` is doubled.
pub fn quoted_len(text: &str) -> usize {
    text.len() + text.matches('\'').count()
}

/// Cut ASCII `text` so its quoted form fits in one string value. The flag
/// tells whether anything was cut.
pub fn fit_string_value(text: &str) -> (String, bool) {
    let mut width = 0;
    let mut out = String::with_capacity(text.len().min(MAX_STRING_VALUE_LEN));
    for ch in text.chars() {
        width += if ch == '\'' { 2 } else { ch.len_utf8() };
        if width > MAX_STRING_VALUE_LEN {
            return (out, true);
        }
        out.push(ch);
    }
    (out, false)
}

fn make_keyword(name: &str) -> Result<[u8; 8]> {
    if !is_valid_keyword(name) {
        return Err(Error::InvalidHeader(format!("illegal keyword {name:?}")));
    }
    let mut k = [b' '; 8];
    k[..name.len()].copy_from_slice(name.as_bytes());
    Ok(k)
}

// ── Writing ──

/// Serialize a [`Card`] into an 80-byte FITS card image.
pub fn format_card(card: &Card) -> [u8; CARD_SIZE] {
    let mut buf = [b' '; CARD_SIZE];
    buf[..8].copy_from_slice(&card.keyword);

    if let Some(ref value) = card.value {
        buf[8] = b'=';
        buf[9] = b' ';

        let mut field = format_value(value);
        if let Some(ref comment) = card.comment {
            insert_comment(&mut field, &ascii_text(comment));
        }
        buf[10..80].copy_from_slice(&field);
    } else if let Some(ref comment) = card.comment {
        let comment = ascii_text(comment);
        let bytes = comment.as_bytes();
        let len = bytes.len().min(72);
        buf[8..8 + len].copy_from_slice(&bytes[..len]);
    }

    buf
}

/// Insert a ` / comment` string into a 70-byte value field.
///
/// Comments that do not fit are truncated; a field with no room left keeps
/// its value and drops the comment.
fn insert_comment(field: &mut [u8; 70], comment: &str) {
    let content_end = if field[0] == b'\'' {
        let mut i = 1;
        loop {
            if i >= 70 {
                break i;
            }
            if field[i] == b'\'' {
                if i + 1 < 70 && field[i + 1] == b'\'' {
                    i += 2;
                } else {
                    break i + 1;
                }
            } else {
                i += 1;
            }
        }
    } else {
        20
    };

    let sep_start = content_end + 1;
    if sep_start + 3 >= 70 {
        return;
    }

    field[sep_start] = b'/';
    field[sep_start + 1] = b' ';

    let comment_start = sep_start + 2;
    let comment_bytes = comment.as_bytes();
    let len = comment_bytes.len().min(70 - comment_start);
    field[comment_start..comment_start + len].copy_from_slice(&comment_bytes[..len]);
}

/// Create the standard FITS END card.
pub fn format_end_card() -> [u8; CARD_SIZE] {
    let mut buf = [b' '; CARD_SIZE];
    buf[..3].copy_from_slice(b"END");
    buf
}

/// Serialize header cards into complete FITS header blocks.
///
/// Appends the END card and pads the final block with blanks. The returned
/// length is always a multiple of [`BLOCK_SIZE`].
pub fn serialize_header(cards: &[Card]) -> Vec<u8> {
    let total_bytes = header_blocks_for_cards(cards.len()) * BLOCK_SIZE;
    let mut buf = vec![HEADER_PAD_BYTE; total_bytes];

    for (i, card) in cards.iter().enumerate() {
        let offset = i * CARD_SIZE;
        buf[offset..offset + CARD_SIZE].copy_from_slice(&format_card(card));
    }

    let end_offset = cards.len() * CARD_SIZE;
    buf[end_offset..end_offset + CARD_SIZE].copy_from_slice(&format_end_card());

    buf
}

// ── Parsing ──

/// Parse a single 80-byte card.
pub fn parse_card(card_bytes: &[u8; CARD_SIZE]) -> Result<Card> {
    let mut keyword = [b' '; 8];
    keyword.copy_from_slice(&card_bytes[..8]);

    if !keyword
        .iter()
        .all(|&b| matches!(b, b'A'..=b'Z' | b'0'..=b'9' | b' ' | b'-' | b'_'))
    {
        return Err(Error::InvalidHeader(format!(
            "illegal keyword bytes {:?}",
            String::from_utf8_lossy(&keyword)
        )));
    }

    if card_bytes[8] == b'=' && card_bytes[9] == b' ' {
        let (value, comment) =
            parse_value(&card_bytes[10..CARD_SIZE]).unwrap_or((Value::Undefined, None));
        return Ok(Card {
            keyword,
            value: Some(value),
            comment: comment.map(String::from),
        });
    }

    let text = str::from_utf8(&card_bytes[8..CARD_SIZE])
        .map_err(|_| Error::InvalidHeader(String::from("non-ASCII commentary text")))?
        .trim_end();
    Ok(Card {
        keyword,
        value: None,
        comment: Some(text).filter(|t| !t.is_empty()).map(String::from),
    })
}

/// Parse consecutive header blocks until the END card; the END card is
/// not included in the result.
pub fn parse_header_blocks(data: &[u8]) -> Result<Vec<Card>> {
    let mut cards = Vec::new();
    for chunk in data.chunks_exact(CARD_SIZE) {
        let card_bytes: &[u8; CARD_SIZE] = chunk
            .try_into()
            .map_err(|_| Error::InvalidHeader(String::from("short card")))?;
        let card = parse_card(card_bytes)?;
        if card.is_end() {
            return Ok(cards);
        }
        cards.push(card);
    }
    Err(Error::InvalidHeader(String::from("END card not found")))
}

// ── Validation ──

fn require_at<'a>(cards: &'a [Card], index: usize, name: &str) -> Result<&'a Card> {
    match cards.get(index) {
        Some(card) if card.keyword_str() == name => Ok(card),
        _ => Err(Error::MissingKeyword(String::from(name))),
    }
}

fn require_present(cards: &[Card], name: &str) -> Result<()> {
    if cards.iter().any(|c| c.keyword_str() == name) {
        Ok(())
    } else {
        Err(Error::MissingKeyword(String::from(name)))
    }
}

fn require_value(card: &Card, expected: &Value) -> Result<()> {
    if card.value.as_ref() == Some(expected) {
        Ok(())
    } else {
        Err(Error::InvalidHeader(format!(
            "{} must be {expected}",
            card.keyword_str()
        )))
    }
}

/// Check that the mandatory keywords are present and ordered for the
/// given HDU type.
pub fn validate_required_keywords(hdu_type: HduType, cards: &[Card]) -> Result<()> {
    match hdu_type {
        HduType::Primary => {
            require_value(require_at(cards, 0, "SIMPLE")?, &Value::Logical(true))?;
            require_at(cards, 1, "BITPIX")?;
            require_at(cards, 2, "NAXIS")?;
        }
        HduType::BinaryTable => {
            let xtension = require_at(cards, 0, "XTENSION")?;
            require_value(xtension, &Value::String(String::from("BINTABLE")))?;
            require_value(require_at(cards, 1, "BITPIX")?, &Value::Integer(8))?;
            require_value(require_at(cards, 2, "NAXIS")?, &Value::Integer(2))?;
            for name in ["NAXIS1", "NAXIS2", "PCOUNT", "GCOUNT", "TFIELDS"] {
                require_present(cards, name)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_card(s: &str) -> [u8; CARD_SIZE] {
        let mut buf = [b' '; CARD_SIZE];
        let bytes = s.as_bytes();
        let len = bytes.len().min(CARD_SIZE);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    #[test]
    fn new_rejects_illegal_keywords() {
        assert!(Card::new("TTYPE1", Value::Integer(1), None).is_ok());
        assert!(Card::new("DATE-OBS", Value::Integer(1), None).is_ok());
        assert!(Card::new("ttype1", Value::Integer(1), None).is_err());
        assert!(Card::new("TOOLONGKEY", Value::Integer(1), None).is_err());
        assert!(Card::new("", Value::Integer(1), None).is_err());
    }

    #[test]
    fn reserved_keywords() {
        assert!(is_reserved_keyword("NAXIS"));
        assert!(is_reserved_keyword("NAXIS2"));
        assert!(is_reserved_keyword("TFORM12"));
        assert!(!is_reserved_keyword("TFORMAT"));
        assert!(!is_reserved_keyword("TELESCOP"));
        assert!(!is_reserved_keyword("EXTNAME"));
    }

    #[test]
    fn new_drops_empty_comment() {
        let card = Card::new("ORIGIN", Value::String(String::from("ESO")), Some("")).unwrap();
        assert!(card.comment.is_none());
    }

    #[test]
    fn format_card_with_comment() {
        let card = Card::new(
            "TELESCOP",
            Value::String(String::from("ESO-VISTA")),
            Some("ESO telescope designation"),
        )
        .unwrap();
        let buf = format_card(&card);
        let text = str::from_utf8(&buf).unwrap();
        assert_eq!(
            text.trim_end(),
            "TELESCOP= 'ESO-VISTA' / ESO telescope designation"
        );
    }

    #[test]
    fn comments_become_ascii() {
        assert_eq!(ascii_text("Température ≥ 0"), "Temperature >= 0");
        assert_eq!(ascii_text("Décalage vers le rouge"), "Decalage vers le rouge");
        assert_eq!(ascii_text("λ in Å"), "? in A");
        let card = Card::new("TEMP", Value::Float(1.5), Some("Température ≥ 0")).unwrap();
        let buf = format_card(&card);
        assert!(buf.iter().all(|b| (0x20..=0x7E).contains(b)));
        assert!(str::from_utf8(&buf).unwrap().contains("/ Temperature >= 0"));
    }

    #[test]
    fn string_values_must_be_ascii() {
        let err = Card::new("OBJECT", Value::String(String::from("Décalage")), None);
        assert!(matches!(err, Err(Error::InvalidHeader(_))));
        assert!(Card::new("OBJECT", Value::String(String::from("NGC 253")), None).is_ok());
    }

    #[test]
    fn string_values_are_fitted_after_quoting() {
        let (cut, truncated) = fit_string_value(&"'".repeat(40));
        assert!(truncated);
        assert_eq!(cut.len(), 34);
        assert_eq!(quoted_len(&cut), MAX_STRING_VALUE_LEN);
        assert_eq!(fit_string_value("short"), (String::from("short"), false));
    }

    #[test]
    fn format_undefined_card_keeps_indicator() {
        let card = Card::new("PROG_ID", Value::Undefined, Some("run code")).unwrap();
        let buf = format_card(&card);
        assert_eq!(&buf[8..10], b"= ");
        let back = parse_card(&buf).unwrap();
        assert_eq!(back.value, Some(Value::Undefined));
        assert_eq!(back.comment.as_deref(), Some("run code"));
    }

    #[test]
    fn parse_card_end_and_commentary() {
        assert!(parse_card(&make_card("END")).unwrap().is_end());
        let c = parse_card(&make_card("COMMENT generated from a DXU")).unwrap();
        assert!(c.value.is_none());
        assert_eq!(c.comment.as_deref(), Some("generated from a DXU"));
    }

    #[test]
    fn parse_card_invalid_keyword() {
        assert!(matches!(
            parse_card(&make_card("bitpix  =                    16")),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn serialize_header_is_block_aligned() {
        let cards: Vec<Card> = (0..40)
            .map(|i| Card::new(&format!("KEY{i}"), Value::Integer(i), None).unwrap())
            .collect();
        let bytes = serialize_header(&cards);
        assert_eq!(bytes.len(), 2 * BLOCK_SIZE);
        assert_eq!(&bytes[40 * CARD_SIZE..40 * CARD_SIZE + 3], b"END");
        assert!(bytes[41 * CARD_SIZE..].iter().all(|&b| b == b' '));
    }

    #[test]
    fn serialize_then_parse() {
        let cards = vec![
            Card::new("SIMPLE", Value::Logical(true), None).unwrap(),
            Card::new("BITPIX", Value::Integer(8), None).unwrap(),
            Card::new("NAXIS", Value::Integer(0), None).unwrap(),
            Card::new("ORIGIN", Value::String(String::from("ESO-PARANAL")), Some("site"))
                .unwrap(),
        ];
        let parsed = parse_header_blocks(&serialize_header(&cards)).unwrap();
        assert_eq!(parsed, cards);
    }

    #[test]
    fn parse_header_without_end() {
        let data = vec![b' '; BLOCK_SIZE];
        assert!(parse_header_blocks(&data).is_err());
    }

    #[test]
    fn validate_primary_and_table() {
        let primary = vec![
            Card::new("SIMPLE", Value::Logical(true), None).unwrap(),
            Card::new("BITPIX", Value::Integer(8), None).unwrap(),
            Card::new("NAXIS", Value::Integer(0), None).unwrap(),
        ];
        assert!(validate_required_keywords(HduType::Primary, &primary).is_ok());
        assert!(matches!(
            validate_required_keywords(HduType::BinaryTable, &primary),
            Err(Error::MissingKeyword(k)) if k == "XTENSION"
        ));

        let mut table = vec![
            Card::new("XTENSION", Value::String(String::from("BINTABLE")), None).unwrap(),
            Card::new("BITPIX", Value::Integer(8), None).unwrap(),
            Card::new("NAXIS", Value::Integer(2), None).unwrap(),
            Card::new("NAXIS1", Value::Integer(4), None).unwrap(),
            Card::new("NAXIS2", Value::Integer(0), None).unwrap(),
            Card::new("PCOUNT", Value::Integer(0), None).unwrap(),
            Card::new("GCOUNT", Value::Integer(1), None).unwrap(),
        ];
        assert!(matches!(
            validate_required_keywords(HduType::BinaryTable, &table),
            Err(Error::MissingKeyword(k)) if k == "TFIELDS"
        ));
        table.push(Card::new("TFIELDS", Value::Integer(1), None).unwrap());
        assert!(validate_required_keywords(HduType::BinaryTable, &table).is_ok());
    }
}
