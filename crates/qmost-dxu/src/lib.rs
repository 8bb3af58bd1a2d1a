//! Data eXchange Unit (DXU) definitions and their FITS representation.
//!
//! A DXU definition is a YAML document describing the header keywords and
//! binary-table columns of a set of FITS extensions. This crate loads such
//! definitions (resolving `!include` tags), validates them, derives the
//! FITS keyword plan of every column and header, and renders reference
//! documentation and empty FITS templates.
//!
//! ```no_run
//! use std::path::Path;
//! use qmost_dxu::{render_reference_table, Config, DxuDefinition, RuntimeValues};
//!
//! let def = DxuDefinition::from_path(Path::new("qxp.yml"))?;
//! let mut out = std::io::stdout();
//! for ext in def.tables() {
//!     render_reference_table(ext, &RuntimeValues::new(), &Config::default(), &mut out)?;
//! }
//! # Ok::<(), qmost_dxu::Error>(())
//! ```

pub mod block;
pub mod cell;
pub mod config;
pub mod datatype;
pub mod definition;
pub mod error;
pub mod header;
pub mod loader;
pub mod mapper;
pub mod render;
pub mod schema;
pub mod template;
pub mod value;

pub use config::{Config, InternalPolicy};
pub use datatype::{Datatype, FormCode};
pub use definition::{ColumnSpec, DxuDefinition, Extension, HeaderSpec};
pub use error::{Error, Result};
pub use mapper::{derive_column_form, derive_header_entries, RuntimeValues};
pub use render::{render_fits_reference, render_reference_table, render_rst};
pub use template::write_template;
