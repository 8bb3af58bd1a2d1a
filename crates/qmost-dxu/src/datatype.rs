//! DXU datatypes and their FITS binary-table representation.

use core::fmt;
use core::str::FromStr;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::value::Value;

/// The closed set of datatypes a DXU column or header may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Datatype {
    Str,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float,
    Double,
}

/// The FITS binary-table element type (the letter of `TFORMn`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCode {
    /// L -- logical, one byte.
    Logical,
    /// B -- unsigned byte.
    Byte,
    /// I -- 16-bit signed integer.
    Short,
    /// J -- 32-bit signed integer.
    Int,
    /// K -- 64-bit signed integer.
    Long,
    /// E -- 32-bit IEEE float.
    Float,
    /// D -- 64-bit IEEE float.
    Double,
    /// A -- ASCII character.
    Ascii,
}

/// How a null cell is represented for a datatype.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NullSentinel {
    /// Raw stored integer announced through `TNULLn`.
    Tnull(i64),
    /// IEEE NaN, no keyword needed.
    NaN,
    /// Empty string, no keyword needed.
    EmptyString,
    /// The datatype has no null representation.
    Undefined,
}

/// One row of the datatype mapping table.
struct Mapping {
    datatype: Datatype,
    name: &'static str,
    code: TypeCode,
    /// `TZEROn` offset for types FITS stores through a signed/unsigned shift.
    zero: Option<Value>,
    null: NullSentinel,
    /// Physical value range for integer types.
    bounds: Option<(i128, i128)>,
}

static TABLE: [Mapping; 12] = [
    Mapping {
        datatype: Datatype::Str,
        name: "str",
        code: TypeCode::Ascii,
        zero: None,
        null: NullSentinel::EmptyString,
        bounds: None,
    },
    Mapping {
        datatype: Datatype::Bool,
        name: "bool",
        code: TypeCode::Logical,
        zero: None,
        null: NullSentinel::Undefined,
        bounds: None,
    },
    Mapping {
        datatype: Datatype::Int8,
        name: "int8",
        code: TypeCode::Byte,
        zero: Some(Value::Integer(-128)),
        // physical -128, stored as raw byte 0
        null: NullSentinel::Tnull(0),
        bounds: Some((i8::MIN as i128, i8::MAX as i128)),
    },
    Mapping {
        datatype: Datatype::Int16,
        name: "int16",
        code: TypeCode::Short,
        zero: None,
        null: NullSentinel::Tnull(i16::MIN as i64),
        bounds: Some((i16::MIN as i128, i16::MAX as i128)),
    },
    Mapping {
        datatype: Datatype::Int32,
        name: "int32",
        code: TypeCode::Int,
        zero: None,
        null: NullSentinel::Tnull(i32::MIN as i64),
        bounds: Some((i32::MIN as i128, i32::MAX as i128)),
    },
    Mapping {
        datatype: Datatype::Int64,
        name: "int64",
        code: TypeCode::Long,
        zero: None,
        null: NullSentinel::Tnull(i64::MIN),
        bounds: Some((i64::MIN as i128, i64::MAX as i128)),
    },
    Mapping {
        datatype: Datatype::Uint8,
        name: "uint8",
        code: TypeCode::Byte,
        zero: None,
        null: NullSentinel::Tnull(u8::MAX as i64),
        bounds: Some((0, u8::MAX as i128)),
    },
    Mapping {
        datatype: Datatype::Uint16,
        name: "uint16",
        code: TypeCode::Short,
        zero: Some(Value::Integer(1 << 15)),
        // physical 65535, stored as 65535 - 32768
        null: NullSentinel::Tnull(i16::MAX as i64),
        bounds: Some((0, u16::MAX as i128)),
    },
    Mapping {
        datatype: Datatype::Uint32,
        name: "uint32",
        code: TypeCode::Int,
        zero: Some(Value::Integer(1 << 31)),
        null: NullSentinel::Tnull(i32::MAX as i64),
        bounds: Some((0, u32::MAX as i128)),
    },
    Mapping {
        datatype: Datatype::Uint64,
        name: "uint64",
        code: TypeCode::Long,
        zero: Some(Value::Unsigned(1 << 63)),
        null: NullSentinel::Tnull(i64::MAX),
        bounds: Some((0, u64::MAX as i128)),
    },
    Mapping {
        datatype: Datatype::Float,
        name: "float",
        code: TypeCode::Float,
        zero: None,
        null: NullSentinel::NaN,
        bounds: None,
    },
    Mapping {
        datatype: Datatype::Double,
        name: "double",
        code: TypeCode::Double,
        zero: None,
        null: NullSentinel::NaN,
        bounds: None,
    },
];

impl Datatype {
    /// All datatypes, in mapping-table order.
    pub const ALL: [Datatype; 12] = [
        Datatype::Str,
        Datatype::Bool,
        Datatype::Int8,
        Datatype::Int16,
        Datatype::Int32,
        Datatype::Int64,
        Datatype::Uint8,
        Datatype::Uint16,
        Datatype::Uint32,
        Datatype::Uint64,
        Datatype::Float,
        Datatype::Double,
    ];

    fn mapping(self) -> &'static Mapping {
        // TABLE is declared in the same order as ALL.
        &TABLE[self as usize]
    }

    /// The name used in definition files.
    pub fn name(self) -> &'static str {
        self.mapping().name
    }

    /// The FITS element type this datatype is stored as.
    pub fn type_code(self) -> TypeCode {
        self.mapping().code
    }

    /// The `TZEROn` offset, for types stored shifted into the opposite
    /// signedness.
    pub fn zero_offset(self) -> Option<Value> {
        self.mapping().zero.clone()
    }

    pub fn null_sentinel(self) -> NullSentinel {
        self.mapping().null
    }

    pub fn is_integer(self) -> bool {
        self.mapping().bounds.is_some()
    }

    pub fn is_float(self) -> bool {
        matches!(self, Datatype::Float | Datatype::Double)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Returns `true` if `value` is a literal of this datatype. Integer
    /// literals must fall inside the type's range; floats accept integers.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (Datatype::Str, Value::String(_)) => true,
            (Datatype::Bool, Value::Logical(_)) => true,
            (dt, Value::Integer(n)) if dt.is_integer() => dt.contains(*n as i128),
            (dt, Value::Unsigned(n)) if dt.is_integer() => dt.contains(*n as i128),
            (dt, v) if dt.is_float() => v.as_f64().is_some(),
            _ => false,
        }
    }

    fn contains(self, n: i128) -> bool {
        self.mapping()
            .bounds
            .is_some_and(|(lo, hi)| (lo..=hi).contains(&n))
    }

    /// The datatype a literal implies when a header declares none.
    pub fn of_literal(value: &Value) -> Option<Datatype> {
        match value {
            Value::String(_) => Some(Datatype::Str),
            Value::Logical(_) => Some(Datatype::Bool),
            Value::Integer(_) => Some(Datatype::Int64),
            Value::Unsigned(_) => Some(Datatype::Uint64),
            Value::Float(_) => Some(Datatype::Double),
            Value::Undefined => None,
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Datatype {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TABLE
            .iter()
            .find(|m| m.name == s)
            .map(|m| m.datatype)
            .ok_or_else(|| Error::definition("datatype", format!("unknown datatype {s:?}")))
    }
}

impl TypeCode {
    /// The TFORM letter.
    pub fn letter(self) -> char {
        match self {
            TypeCode::Logical => 'L',
            TypeCode::Byte => 'B',
            TypeCode::Short => 'I',
            TypeCode::Int => 'J',
            TypeCode::Long => 'K',
            TypeCode::Float => 'E',
            TypeCode::Double => 'D',
            TypeCode::Ascii => 'A',
        }
    }

    /// Bytes per element.
    pub fn byte_size(self) -> usize {
        match self {
            TypeCode::Logical | TypeCode::Byte | TypeCode::Ascii => 1,
            TypeCode::Short => 2,
            TypeCode::Int | TypeCode::Float => 4,
            TypeCode::Long | TypeCode::Double => 8,
        }
    }
}

/// A `TFORMn` value: repeat count and element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormCode {
    pub repeat: usize,
    pub code: TypeCode,
}

impl FormCode {
    /// Total bytes this column occupies per row.
    pub fn byte_width(&self) -> usize {
        self.repeat * self.code.byte_size()
    }
}

impl fmt::Display for FormCode {
    /// A repeat of one is written without a count (`J`, not `1J`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.repeat == 1 {
            write!(f, "{}", self.code.letter())
        } else {
            write!(f, "{}{}", self.repeat, self.code.letter())
        }
    }
}
