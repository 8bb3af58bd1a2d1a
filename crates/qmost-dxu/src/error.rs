use std::path::PathBuf;

/// All errors that can occur while loading, checking, mapping or rendering
/// a DXU definition.
#[derive(Debug)]
pub enum Error {
    /// The raw definition does not conform to the DXU schema.
    SchemaValidation {
        /// Location of the offending node, e.g. `/extensions/1/columns/0/ucd`.
        path: String,
        /// The constraint that was violated.
        constraint: String,
    },
    /// The definition is schema-valid but semantically inconsistent.
    Definition {
        /// Name of the header keyword or column (and attribute) at fault.
        field: String,
        reason: String,
    },
    /// Two headers or two columns of one extension share a name.
    DuplicateName {
        /// `header` or `columns`, qualified by the extension name.
        scope: String,
        name: String,
    },
    /// A rendering option has an unknown name or an unusable value.
    Config { key: String, reason: String },
    /// A schema document is not a usable JSON Schema.
    InvalidSchema(String),
    /// A FITS header card or block could not be parsed or written.
    InvalidHeader(String),
    /// A mandatory FITS keyword was not found in a header.
    MissingKeyword(String),
    /// An `!include` target could not be read.
    Include { path: PathBuf, source: std::io::Error },
    /// Malformed YAML.
    Yaml(serde_yaml::Error),
    /// An I/O error from the standard library.
    Io(std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    pub(crate) fn schema(path: impl Into<String>, constraint: impl Into<String>) -> Self {
        Error::SchemaValidation {
            path: path.into(),
            constraint: constraint.into(),
        }
    }

    pub(crate) fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Config {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn definition(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Definition {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::SchemaValidation { path, constraint } => {
                write!(f, "schema validation failed at {path}: {constraint}")
            }
            Error::Definition { field, reason } => {
                write!(f, "invalid definition of {field}: {reason}")
            }
            Error::DuplicateName { scope, name } => {
                write!(f, "duplicate name {name:?} in {scope}")
            }
            Error::Config { key, reason } => write!(f, "invalid option {key}: {reason}"),
            Error::InvalidSchema(msg) => write!(f, "invalid schema: {msg}"),
            Error::InvalidHeader(msg) => write!(f, "invalid FITS header: {msg}"),
            Error::MissingKeyword(kw) => write!(f, "missing required keyword: {kw}"),
            Error::Include { path, source } => {
                write!(f, "cannot include {}: {source}", path.display())
            }
            Error::Yaml(e) => write!(f, "YAML error: {e}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Include { source, .. } => Some(source),
            Error::Yaml(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Yaml(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_schema_validation() {
        let e = Error::schema("/extensions/0/name", "missing required property");
        assert_eq!(
            e.to_string(),
            "schema validation failed at /extensions/0/name: missing required property"
        );
    }

    #[test]
    fn display_definition() {
        let e = Error::definition("FLUX.range", "range is not allowed for bool");
        assert_eq!(
            e.to_string(),
            "invalid definition of FLUX.range: range is not allowed for bool"
        );
    }

    #[test]
    fn display_config() {
        let e = Error::config("soft_breaks", "\"maybe\" is not a boolean");
        assert_eq!(
            e.to_string(),
            "invalid option soft_breaks: \"maybe\" is not a boolean"
        );
    }

    #[test]
    fn display_duplicate_name() {
        let e = Error::DuplicateName {
            scope: String::from("columns of QXP-Z"),
            name: String::from("RA"),
        };
        assert_eq!(e.to_string(), "duplicate name \"RA\" in columns of QXP-Z");
    }

    #[test]
    fn display_missing_keyword() {
        let e = Error::MissingKeyword(String::from("TFIELDS"));
        assert_eq!(e.to_string(), "missing required keyword: TFIELDS");
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let e = Error::Io(io_err);
        assert_eq!(e.to_string(), "I/O error: file not found");
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = std::io::Error::other("oops");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
    }

    #[test]
    fn yaml_error_from_conversion() {
        let yaml_err = serde_yaml::from_str::<u32>("[1, 2").unwrap_err();
        let e: Error = yaml_err.into();
        assert!(matches!(e, Error::Yaml(_)));
        assert!(e.to_string().starts_with("YAML error: "));
    }

    #[test]
    fn std_error_source() {
        use std::error::Error as StdError;

        let e = Error::definition("X", "y");
        assert!(e.source().is_none());

        let e = Error::Include {
            path: PathBuf::from("missing.yml"),
            source: std::io::Error::other("inner"),
        };
        assert!(e.source().is_some());
    }
}
