//! YAML loading with `!include` composition.
//!
//! A definition may pull any node from a separate file:
//!
//! ```yaml
//! extensions:
//!   - !include primary.yml
//!   - !include qxp-z.yml
//! ```
//!
//! Include paths are relative to the file that contains the tag, and
//! included files may include further files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_yaml::Value as YamlValue;
use tracing::debug;

use crate::error::{Error, Result};

/// Nesting limit for includes; deeper chains are reported as a cycle.
const MAX_INCLUDE_DEPTH: usize = 32;

/// Source of included files.
type Reader<'a> = &'a dyn Fn(&Path) -> io::Result<String>;

fn read_file(path: &Path) -> io::Result<String> {
    fs::read_to_string(path)
}

/// Read `path` and resolve all includes it (transitively) contains.
pub fn load_yaml(path: &Path) -> Result<YamlValue> {
    load_nested(path, &read_file, 0)
}

/// Parse YAML text whose includes resolve against `root`.
pub fn parse_yaml(text: &str, root: &Path) -> Result<YamlValue> {
    let node: YamlValue = serde_yaml::from_str(text)?;
    resolve_includes(node, root, &read_file, 0)
}

/// Parse YAML text whose includes name entries of `files`, given as
/// (name, text) pairs, instead of files on disk.
pub fn parse_embedded(text: &str, files: &[(&str, &str)]) -> Result<YamlValue> {
    let read = |path: &Path| {
        files
            .iter()
            .find(|(name, _)| Path::new(name) == path)
            .map(|(_, text)| text.to_string())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no embedded file of that name"))
    };
    let node: YamlValue = serde_yaml::from_str(text)?;
    resolve_includes(node, Path::new(""), &read, 0)
}

fn load_nested(path: &Path, read: Reader<'_>, depth: usize) -> Result<YamlValue> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(Error::Include {
            path: path.to_path_buf(),
            source: io::Error::other("include nesting too deep (cycle?)"),
        });
    }
    let text = read(path).map_err(|source| Error::Include {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), depth, "loaded YAML");
    let node: YamlValue = serde_yaml::from_str(&text)?;
    resolve_includes(node, &parent_dir(path), read, depth)
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn resolve_includes(
    node: YamlValue,
    root: &Path,
    read: Reader<'_>,
    depth: usize,
) -> Result<YamlValue> {
    match node {
        YamlValue::Tagged(tagged) if tagged.tag == "include" => {
            let target = match &tagged.value {
                YamlValue::String(s) => root.join(s),
                other => {
                    return Err(Error::schema(
                        "!include",
                        format!("include target must be a file name, got {other:?}"),
                    ))
                }
            };
            load_nested(&target, read, depth + 1)
        }
        YamlValue::Sequence(items) => items
            .into_iter()
            .map(|item| resolve_includes(item, root, read, depth))
            .collect::<Result<Vec<_>>>()
            .map(YamlValue::Sequence),
        YamlValue::Mapping(map) => {
            let mut out = serde_yaml::Mapping::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key, resolve_includes(value, root, read, depth)?);
            }
            Ok(YamlValue::Mapping(out))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn plain_yaml_is_unchanged() {
        let node = parse_yaml("a: [1, 2]\nb: x\n", Path::new(".")).unwrap();
        assert_eq!(node["a"][1], YamlValue::from(2));
        assert_eq!(node["b"], YamlValue::from("x"));
    }

    #[test]
    fn include_is_resolved_relative_to_including_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("ext")).unwrap();
        write(&dir.path().join("ext"), "cols.yml", "- name: RA\n- name: DEC\n");
        write(
            &dir.path().join("ext"),
            "table.yml",
            "name: QXP-Z\ncolumns: !include cols.yml\n",
        );
        let top = write(
            dir.path(),
            "dxu.yml",
            "extensions:\n  - !include ext/table.yml\n",
        );

        let node = load_yaml(&top).unwrap();
        let ext = &node["extensions"][0];
        assert_eq!(ext["name"], YamlValue::from("QXP-Z"));
        assert_eq!(ext["columns"][1]["name"], YamlValue::from("DEC"));
    }

    #[test]
    fn missing_include_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let top = write(dir.path(), "dxu.yml", "x: !include nowhere.yml\n");
        match load_yaml(&top) {
            Err(Error::Include { path, .. }) => assert!(path.ends_with("nowhere.yml")),
            other => panic!("expected include error, got {other:?}"),
        }
    }

    #[test]
    fn include_cycle_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.yml", "next: !include b.yml\n");
        write(dir.path(), "b.yml", "next: !include a.yml\n");
        assert!(matches!(
            load_yaml(&dir.path().join("a.yml")),
            Err(Error::Include { .. })
        ));
    }

    #[test]
    fn embedded_includes() {
        let files = [("items.yml", "- 1\n- 2\n"), ("nested.yml", "inner: !include items.yml\n")];
        let node = parse_embedded("top: !include nested.yml\n", &files).unwrap();
        assert_eq!(node["top"]["inner"][1], YamlValue::from(2));
        match parse_embedded("top: !include other.yml\n", &files) {
            Err(Error::Include { path, .. }) => assert_eq!(path, PathBuf::from("other.yml")),
            other => panic!("expected include error, got {other:?}"),
        }
    }

    #[test]
    fn other_tags_pass_through() {
        let node = parse_yaml("x: !custom 3\n", Path::new(".")).unwrap();
        assert!(matches!(node["x"], YamlValue::Tagged(_)));
    }
}
