//! Catalog loading for the `filter` command
//!
//! Accepted documents:
//! - repodata: `{"info": {"subdir": ..}, "packages": {file: record}, "packages.conda": {file: record}}`
//! - a plain JSON array of records

use std::path::Path;

use anyhow::{Context, bail};
use serde_json::Value;
use tracing::debug;

const PACKAGE_SECTIONS: [&str; 2] = ["packages", "packages.conda"];

/// Read a catalog file into a list of records
pub fn load(path: &Path) -> anyhow::Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    let document: Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse catalog {}", path.display()))?;

    let records = from_document(document)?;
    debug!("loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Flatten a parsed catalog document into records
pub fn from_document(document: Value) -> anyhow::Result<Vec<Value>> {
    match document {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => {
            let subdir = map
                .get("info")
                .and_then(|info| info.get("subdir"))
                .and_then(Value::as_str)
                .map(str::to_string);

            let mut records = Vec::new();
            for section in PACKAGE_SECTIONS {
                let Some(Value::Object(packages)) = map.remove(section) else {
                    continue;
                };
                records.extend(
                    packages
                        .into_iter()
                        .map(|(_, record)| with_subdir(record, subdir.as_deref())),
                );
            }
            Ok(records)
        }
        _ => bail!("catalog must be a JSON array or a repodata object"),
    }
}

/// Fill in the catalog-wide subdir for records that do not carry their own
fn with_subdir(mut record: Value, subdir: Option<&str>) -> Value {
    if let (Value::Object(fields), Some(subdir)) = (&mut record, subdir) {
        if matches!(fields.get("subdir"), None | Some(Value::Null)) {
            fields.insert("subdir".to_string(), Value::from(subdir));
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn repodata_sections_are_flattened() {
        let records = from_document(json!({
            "info": { "subdir": "linux-64" },
            "packages": {
                "python-3.9.1-h1.tar.bz2": { "name": "python", "version": "3.9.1" }
            },
            "packages.conda": {
                "python-3.10.0-h2.conda": { "name": "python", "version": "3.10.0", "subdir": "noarch" }
            }
        }))
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["subdir"], json!("linux-64"));
        assert_eq!(records[1]["subdir"], json!("noarch"));
    }

    #[test]
    fn arrays_are_taken_as_is() {
        let records = from_document(json!([{ "name": "zlib" }, 3])).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn scalars_are_rejected() {
        assert!(from_document(json!("catalog")).is_err());
    }
}
