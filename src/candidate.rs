//! Catalog entry model
//!
//! A [`Candidate`] is built from one key-value record of a package index
//! (a repodata-style JSON object) and converted back losslessly.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CandidateError;
use crate::version::Version;

/// One package record that specifiers are matched against
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    version: Option<String>,
    pub build: Option<String>,
    #[serde(default)]
    pub build_number: u64,
    #[serde(default)]
    pub depends: Vec<String>,
    pub license: Option<String>,
    pub md5: Option<String>,
    pub sha256: Option<String>,
    pub size: Option<u64>,
    pub subdir: Option<String>,
    pub timestamp: Option<u64>,
    pub channel: Option<String>,
    #[serde(skip)]
    parsed_version: OnceLock<Option<Version>>,
}

impl Candidate {
    /// Minimal candidate with just a name and a raw version
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
            ..Default::default()
        }
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn set_version(&mut self, version: Option<String>) {
        self.version = version;
        self.parsed_version = OnceLock::new();
    }

    /// The version parsed on first use; `None` when absent or unparsable
    pub fn parsed_version(&self) -> Option<&Version> {
        self.parsed_version
            .get_or_init(|| {
                let raw = self.version.as_deref()?;
                Version::parse(raw)
                    .inspect_err(|e| debug!("unparsable version '{}' for {}: {}", raw, self.name, e))
                    .ok()
            })
            .as_ref()
    }

    /// Build a candidate from a key-value record. `name` is required, every
    /// other key is optional and unknown keys are ignored.
    pub fn from_mapping(map: &Map<String, Value>) -> Result<Self, CandidateError> {
        let name = match map.get("name") {
            None | Some(Value::Null) => return Err(CandidateError::MissingKey("name")),
            Some(Value::String(name)) => name.clone(),
            Some(_) => return Err(invalid("name", "expected a string")),
        };

        Ok(Self {
            name,
            version: get_string(map, "version")?,
            build: get_string(map, "build")?,
            build_number: get_u64(map, "build_number")?.unwrap_or(0),
            depends: get_string_list(map, "depends")?,
            license: get_string(map, "license")?,
            md5: get_string(map, "md5")?,
            sha256: get_string(map, "sha256")?,
            size: get_u64(map, "size")?,
            subdir: get_string(map, "subdir")?,
            timestamp: get_u64(map, "timestamp")?,
            channel: get_string(map, "channel")?,
            parsed_version: OnceLock::new(),
        })
    }

    /// Inverse of [`Candidate::from_mapping`]. Every field is present; unset
    /// optional fields become `null` and `depends` defaults to `[]`.
    pub fn to_mapping(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::from(self.name.clone()));
        map.insert("version".to_string(), Value::from(self.version.clone()));
        map.insert("build".to_string(), Value::from(self.build.clone()));
        map.insert("build_number".to_string(), Value::from(self.build_number));
        map.insert("depends".to_string(), Value::from(self.depends.clone()));
        map.insert("license".to_string(), Value::from(self.license.clone()));
        map.insert("md5".to_string(), Value::from(self.md5.clone()));
        map.insert("sha256".to_string(), Value::from(self.sha256.clone()));
        map.insert("size".to_string(), Value::from(self.size));
        map.insert("subdir".to_string(), Value::from(self.subdir.clone()));
        map.insert("timestamp".to_string(), Value::from(self.timestamp));
        map.insert("channel".to_string(), Value::from(self.channel.clone()));
        map
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.version == other.version
            && self.build == other.build
            && self.build_number == other.build_number
            && self.depends == other.depends
            && self.license == other.license
            && self.md5 == other.md5
            && self.sha256 == other.sha256
            && self.size == other.size
            && self.subdir == other.subdir
            && self.timestamp == other.timestamp
            && self.channel == other.channel
    }
}

impl Eq for Candidate {}

impl TryFrom<&Map<String, Value>> for Candidate {
    type Error = CandidateError;

    fn try_from(map: &Map<String, Value>) -> Result<Self, Self::Error> {
        Candidate::from_mapping(map)
    }
}

impl TryFrom<&Value> for Candidate {
    type Error = CandidateError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        value
            .as_object()
            .ok_or(CandidateError::NotAMapping)
            .and_then(Candidate::from_mapping)
    }
}

fn invalid(key: &str, reason: &str) -> CandidateError {
    CandidateError::InvalidField {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn get_string(map: &Map<String, Value>, key: &str) -> Result<Option<String>, CandidateError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid(key, "expected a string")),
    }
}

fn get_u64(map: &Map<String, Value>, key: &str) -> Result<Option<u64>, CandidateError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| invalid(key, "expected a non-negative integer")),
    }
}

fn get_string_list(map: &Map<String, Value>, key: &str) -> Result<Vec<String>, CandidateError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid(key, "expected a list of strings"))
            })
            .collect(),
        Some(_) => Err(invalid(key, "expected a list of strings")),
    }
}
