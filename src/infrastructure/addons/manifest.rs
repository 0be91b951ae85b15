//! Addon descriptor loading - the `addon.yml` metadata entry of a package

use std::path::Path;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Deserialize;
use serde_yaml::Value;
use crate::application::errors::AddonError;
use crate::domain::entities::AddonDescriptor;
use super::archive::PackageArchive;

/// Conventional path of the metadata entry inside a package
pub const METADATA_ENTRY: &str = "addon.yml";

// Ids name on-disk data directories, so they must be a single safe path component
static ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("valid id pattern")
});

/// Metadata as written by addon authors, before validation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawDescriptor {
    name: Option<Value>,
    id: Option<Value>,
    version: Option<Value>,
    description: Option<String>,
    #[serde(alias = "main", alias = "entryPoint")]
    entry_point: Option<Value>,
    #[serde(default, alias = "loadPlugin", alias = "registerAsHostPlugin")]
    register_as_host_plugin: bool,
    library: Option<String>,
    author: Option<String>,
}

/// Parse a package's descriptor
pub fn read_descriptor(path: impl AsRef<Path>) -> Result<AddonDescriptor, AddonError> {
    let archive = PackageArchive::open(path)?;
    descriptor_from_archive(&archive)
}

/// Parse the descriptor of an already opened package
pub fn descriptor_from_archive(archive: &PackageArchive) -> Result<AddonDescriptor, AddonError> {
    let content = archive.read(METADATA_ENTRY)?.ok_or_else(|| {
        AddonError::MetadataMissing(format!(
            "{} not found in package {}",
            METADATA_ENTRY,
            archive.path().display()
        ))
    })?;
    parse_descriptor(&content).map_err(|e| match e {
        AddonError::MetadataInvalid(detail) => {
            AddonError::MetadataInvalid(format!("{} ({})", detail, archive.path().display()))
        }
        other => other,
    })
}

/// Parse and validate raw metadata
pub fn parse_descriptor(content: &[u8]) -> Result<AddonDescriptor, AddonError> {
    let raw: RawDescriptor = serde_yaml::from_slice(content)
        .map_err(|e| AddonError::MetadataInvalid(format!("failed to parse metadata: {}", e)))?;

    let descriptor = AddonDescriptor {
        name: scalar("name", raw.name)?,
        id: scalar("id", raw.id)?,
        version: scalar("version", raw.version)?,
        description: raw.description.filter(|d| !d.trim().is_empty()),
        entry_point: scalar("entry-point", raw.entry_point)?,
        register_as_host_plugin: raw.register_as_host_plugin,
        library: raw.library.filter(|l| !l.trim().is_empty()),
        author: raw.author,
    };

    if let Some(field) = descriptor.missing_field() {
        return Err(AddonError::MetadataInvalid(format!("missing required field '{}'", field)));
    }
    if !ID_PATTERN.is_match(&descriptor.id) {
        return Err(AddonError::MetadataInvalid(format!(
            "id '{}' must be a plain directory name",
            descriptor.id
        )));
    }

    Ok(descriptor)
}

/// Render a scalar field as text; `version: 1` is as valid as `version: "1"`
fn scalar(field: &str, value: Option<Value>) -> Result<String, AddonError> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(_) => Err(AddonError::MetadataInvalid(format!("field '{}' must be a plain value", field))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::addons::archive::PackageWriter;

    #[test]
    fn test_parse_full_descriptor() {
        let yaml = b"
name: Economy
id: econ
version: 1.2.0
description: Coins and shops
entry-point: economy.EconomyMain
register-as-host-plugin: true
library: libeconomy.so
";
        let descriptor = parse_descriptor(yaml).unwrap();
        assert_eq!(descriptor.name, "Economy");
        assert_eq!(descriptor.id, "econ");
        assert_eq!(descriptor.version, "1.2.0");
        assert_eq!(parse_descriptor(b"name: A\nid: a\nversion: 2\nentry-point: Main").unwrap().version, "2");
        assert_eq!(descriptor.entry_point, "economy.EconomyMain");
        assert_eq!(descriptor.description.as_deref(), Some("Coins and shops"));
        assert_eq!(descriptor.library.as_deref(), Some("libeconomy.so"));
        assert!(descriptor.register_as_host_plugin);
    }

    #[test]
    fn test_parse_json_with_legacy_keys() {
        let json = br#"{"name": "Warps", "id": "warps", "version": "0.1", "main": "WarpsMain", "loadPlugin": false}"#;
        let descriptor = parse_descriptor(json).unwrap();
        assert_eq!(descriptor.entry_point, "WarpsMain");
        assert!(!descriptor.register_as_host_plugin);
        assert_eq!(descriptor.display_description(), "Addon");

        let json = br#"{"name": "Warps", "id": "warps", "version": "0.1", "entryPoint": "WarpsMain", "registerAsHostPlugin": true}"#;
        let descriptor = parse_descriptor(json).unwrap();
        assert_eq!(descriptor.entry_point, "WarpsMain");
        assert!(descriptor.register_as_host_plugin);
    }

    #[test]
    fn test_missing_required_fields() {
        for (yaml, field) in [
            ("id: a\nversion: 1\nentry-point: Main", "name"),
            ("name: A\nversion: 1\nentry-point: Main", "id"),
            ("name: A\nid: a\nentry-point: Main", "version"),
            ("name: A\nid: a\nversion: 1", "entry-point"),
            ("name: '  '\nid: a\nversion: 1\nentry-point: Main", "name"),
        ] {
            match parse_descriptor(yaml.as_bytes()) {
                Err(AddonError::MetadataInvalid(msg)) => assert!(msg.contains(field), "{}: {}", field, msg),
                other => panic!("expected MetadataInvalid for {}, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_unparseable_and_unsafe_ids() {
        assert!(matches!(parse_descriptor(b"[not, a, mapping"), Err(AddonError::MetadataInvalid(_))));
        assert!(matches!(parse_descriptor(b"just text"), Err(AddonError::MetadataInvalid(_))));
        assert!(matches!(
            parse_descriptor(b"name: A\nid: ../escape\nversion: 1\nentry-point: Main"),
            Err(AddonError::MetadataInvalid(_))
        ));
    }

    #[test]
    fn test_read_descriptor_from_package() {
        let dir = tempfile::tempdir().unwrap();

        let good = dir.path().join("good.addon");
        PackageWriter::new()
            .add_file(METADATA_ENTRY, "name: Good\nid: good\nversion: 1\nentry-point: GoodMain")
            .write_to(&good)
            .unwrap();
        assert_eq!(read_descriptor(&good).unwrap().name, "Good");

        let empty = dir.path().join("empty.addon");
        PackageWriter::new()
            .add_file("readme.txt", "no metadata here")
            .write_to(&empty)
            .unwrap();
        assert!(matches!(read_descriptor(&empty), Err(AddonError::MetadataMissing(_))));
    }
}
