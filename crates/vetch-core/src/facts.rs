//! Fact storage and serialization.
//!
//! A fact is a serializable summary an analyzer attaches to an exported
//! object or to a whole package, keyed by `(package path, object path,
//! analyzer, kind)`. Facts flow one way: exported while analyzing a
//! package, imported by later runs on packages that depend on it. Fact
//! files carry a schema version and a content hash so a corrupted or
//! stale file fails loudly instead of silently dropping facts.

use crate::error::VetchError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Schema version of the fact file format. Bump on any change to [`Fact`]
/// or [`FactFile`] serialization.
pub const FACTS_SCHEMA_VERSION: u32 = 1;

// ============================================================================
// Fact
// ============================================================================

/// One exported fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    /// Name of the exporting analyzer; importers only see their own facts.
    pub analyzer: String,
    /// Fact kind name within the analyzer.
    pub kind: String,
    /// The kind's payload schema version; imports require an exact match.
    pub version: u32,
    /// Stable object path within the package; `None` for package facts.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub object: Option<String>,
    pub value: serde_json::Value,
}

/// The on-disk form of one package's exported facts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactFile {
    pub schema_version: u32,
    pub package: String,
    /// Hex SHA-256 over the serialized fact list.
    pub sha256: String,
    pub facts: Vec<Fact>,
}

fn content_hash(facts: &[Fact]) -> String {
    let bytes = serde_json::to_vec(facts).unwrap_or_default();
    hex::encode(Sha256::digest(&bytes))
}

impl FactFile {
    pub fn new(package: impl Into<String>, facts: Vec<Fact>) -> FactFile {
        let sha256 = content_hash(&facts);
        FactFile {
            schema_version: FACTS_SCHEMA_VERSION,
            package: package.into(),
            sha256,
            facts,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, VetchError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Decode and verify a fact file. Version mismatches and hash
    /// mismatches are fact errors, fatal for the importing run.
    pub fn decode(bytes: &[u8]) -> Result<FactFile, VetchError> {
        let file: FactFile = serde_json::from_slice(bytes)
            .map_err(|e| VetchError::Fact(format!("malformed fact file: {e}")))?;
        if file.schema_version != FACTS_SCHEMA_VERSION {
            return Err(VetchError::Fact(format!(
                "fact file for {:?} has schema version {}, want {}",
                file.package, file.schema_version, FACTS_SCHEMA_VERSION
            )));
        }
        let want = content_hash(&file.facts);
        if file.sha256 != want {
            return Err(VetchError::Fact(format!(
                "fact file for {:?} failed its content hash",
                file.package
            )));
        }
        Ok(file)
    }
}

// ============================================================================
// FactBase
// ============================================================================

/// The full fact key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FactKey {
    pub package: String,
    /// `None` for package facts.
    pub object: Option<String>,
    pub analyzer: String,
    pub kind: String,
}

/// In-memory store of imported facts, populated from the dependency
/// packages' fact files before a run. Values carry their kind's schema
/// version so importers can insist on an exact match.
#[derive(Debug, Default, Clone)]
pub struct FactBase {
    by_key: HashMap<FactKey, (u32, serde_json::Value)>,
}

impl FactBase {
    pub fn new() -> FactBase {
        FactBase::default()
    }

    /// Merge a decoded fact file.
    pub fn add_file(&mut self, file: &FactFile) {
        self.add_facts(&file.package, &file.facts);
    }

    /// Insert facts exported in-process (harness use, no file round-trip).
    pub fn add_facts(&mut self, package: &str, facts: &[Fact]) {
        for f in facts {
            self.by_key.insert(
                FactKey {
                    package: package.to_string(),
                    object: f.object.clone(),
                    analyzer: f.analyzer.clone(),
                    kind: f.kind.clone(),
                },
                (f.version, f.value.clone()),
            );
        }
    }

    /// The stored payload for `key` when its version matches.
    pub fn get(&self, key: &FactKey, version: u32) -> Option<&serde_json::Value> {
        match self.by_key.get(key) {
            Some((v, value)) if *v == version => Some(value),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fact(kind: &str, object: Option<&str>, value: serde_json::Value) -> Fact {
        Fact {
            analyzer: "printf".into(),
            kind: kind.into(),
            version: 1,
            object: object.map(String::from),
            value,
        }
    }

    #[test]
    fn round_trip_preserves_facts() {
        let file = FactFile::new(
            "example.com/dep",
            vec![
                fact("wrapper", Some("Logf"), json!({"format_arg": 0})),
                fact("summary", None, json!({"calls": 3})),
            ],
        );
        let bytes = file.encode().unwrap();
        let back = FactFile::decode(&bytes).unwrap();
        assert_eq!(back.package, "example.com/dep");
        assert_eq!(back.facts, file.facts);
    }

    #[test]
    fn corrupted_payload_fails_hash_check() {
        let file = FactFile::new("p", vec![fact("k", None, json!(1))]);
        let mut tampered = file.clone();
        tampered.facts[0].value = json!(2);
        let bytes = tampered.encode().unwrap();
        let err = FactFile::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("content hash"), "got {err}");
    }

    #[test]
    fn wrong_schema_version_rejected() {
        let mut file = FactFile::new("p", vec![]);
        file.schema_version = FACTS_SCHEMA_VERSION + 1;
        let bytes = serde_json::to_vec(&file).unwrap();
        let err = FactFile::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("schema version"), "got {err}");
    }

    #[test]
    fn factbase_keys_distinguish_object_and_package_facts() {
        let mut base = FactBase::new();
        let file = FactFile::new(
            "dep",
            vec![
                fact("wrapper", Some("Logf"), json!(true)),
                fact("wrapper", None, json!(false)),
            ],
        );
        base.add_file(&file);
        let obj_key = FactKey {
            package: "dep".into(),
            object: Some("Logf".into()),
            analyzer: "printf".into(),
            kind: "wrapper".into(),
        };
        assert_eq!(base.get(&obj_key, 1), Some(&json!(true)));
        let pkg = base.get(
            &FactKey {
                package: "dep".into(),
                object: None,
                analyzer: "printf".into(),
                kind: "wrapper".into(),
            },
            1,
        );
        assert_eq!(pkg, Some(&json!(false)));
        // A schema bump hides stale payloads.
        assert_eq!(base.get(&obj_key, 2), None);
    }
}
