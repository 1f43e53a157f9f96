//! Password-manager JSON export documents.
//!
//! Only login items (`type == 1`) are parsed into [`Record`]s. Every other item,
//! and every top-level field besides `items`, is carried through untouched so
//! the cleaned document can be imported straight back.

use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::atomic_file::write_atomic;
use crate::error::{VaultError, VaultResult};
use crate::record::{ItemKind, Record};

const ITEMS_KEY: &str = "items";

/// A loaded export document.
#[derive(Debug, Clone)]
pub struct VaultExport {
    /// The top-level object; its `items` entry is replaced on output
    document: Map<String, Value>,
    /// Login items, in document order
    pub logins: Vec<Record>,
    /// Non-login items, verbatim and in document order
    pub others: Vec<Value>,
}

impl VaultExport {
    /// Read and parse an export file.
    pub fn load(path: &Path) -> VaultResult<Self> {
        let text = fs::read_to_string(path)?;
        let export = Self::from_json(&text)?;
        info!(
            path = %path.display(),
            logins = export.logins.len(),
            other_items = export.others.len(),
            "loaded vault export"
        );
        Ok(export)
    }

    /// Parse an export document.
    ///
    /// # Arguments
    /// * `json` - The full document text
    ///
    /// # Returns
    /// The export split into login records and pass-through items. A document
    /// without an `items` array has no items.
    pub fn from_json(json: &str) -> VaultResult<Self> {
        let mut document = match serde_json::from_str::<Value>(json)? {
            Value::Object(map) => map,
            other => {
                return Err(VaultError::General(format!(
                    "export document must be a JSON object, found {}",
                    value_kind(&other)
                )))
            }
        };

        let items = match document.get_mut(ITEMS_KEY).map(Value::take) {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(VaultError::General(format!(
                    "export `items` must be an array, found {}",
                    value_kind(&other)
                )))
            }
        };

        let mut logins = Vec::new();
        let mut others = Vec::new();
        for item in items {
            if is_login_item(&item) {
                logins.push(serde_json::from_value(item)?);
            } else {
                others.push(item);
            }
        }
        debug!(logins = logins.len(), others = others.len(), "parsed export items");

        Ok(Self {
            document,
            logins,
            others,
        })
    }

    /// Render the document with `records` in place of the original logins.
    ///
    /// Login records come first, then any non-login records, then the
    /// pass-through items. All other top-level fields keep their position.
    pub fn to_json(&self, records: &[Record]) -> VaultResult<String> {
        let mut items: Vec<Value> = Vec::with_capacity(records.len() + self.others.len());
        let (logins, non_logins): (Vec<&Record>, Vec<&Record>) = records.iter().partition(|r| r.is_login());
        for record in logins.into_iter().chain(non_logins) {
            items.push(serde_json::to_value(record)?);
        }
        items.extend(self.others.iter().cloned());

        let mut document = self.document.clone();
        match document.get_mut(ITEMS_KEY) {
            Some(slot) => *slot = Value::Array(items),
            None => {
                document.insert(ITEMS_KEY.to_string(), Value::Array(items));
            }
        }

        Ok(serde_json::to_string_pretty(&Value::Object(document))?)
    }

    /// Write the cleaned document to `path`.
    pub fn save(&self, path: &Path, records: &[Record]) -> VaultResult<()> {
        let json = self.to_json(records)?;
        write_atomic(path, json.as_bytes())?;
        info!(path = %path.display(), items = records.len() + self.others.len(), "saved cleaned export");
        Ok(())
    }
}

fn is_login_item(item: &Value) -> bool {
    item.get("type")
        .and_then(Value::as_i64)
        .map(|code| ItemKind::from(code) == ItemKind::Login)
        .unwrap_or(false)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Credential, UriValue};
    use serde_json::json;

    const EXPORT: &str = r#"{
  "encrypted": false,
  "folders": [{"id": "f1", "name": "Work"}],
  "items": [
    {"id": "card", "type": 3, "name": "Visa", "card": {"number": "4111"}, "login": null},
    {
      "id": "a",
      "type": 1,
      "name": "Alpha",
      "favorite": false,
      "login": {"uris": [{"match": null, "uri": "https://a.com"}], "username": "u", "password": "p", "totp": null}
    },
    {"id": "note", "type": 2, "name": "Notes", "secureNote": {"type": 0}}
  ],
  "collections": []
}"#;

    #[test]
    fn test_from_json_splits_items() {
        let export = VaultExport::from_json(EXPORT).unwrap();
        assert_eq!(export.logins.len(), 1);
        assert_eq!(export.logins[0].id, "a");
        assert_eq!(export.logins[0].credential().username, "u");
        assert_eq!(export.others.len(), 2);
        assert_eq!(export.others[0]["id"], "card");
        assert_eq!(export.others[1]["id"], "note");
    }

    #[test]
    fn test_to_json_keeps_envelope_and_other_items() {
        let export = VaultExport::from_json(EXPORT).unwrap();
        let out = export.to_json(&export.logins).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();

        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["encrypted", "folders", "items", "collections"]);
        assert_eq!(value["folders"][0]["name"], "Work");

        let ids: Vec<&str> = value["items"].as_array().unwrap().iter().map(|i| i["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a", "card", "note"]);
        // Pass-through items are byte-for-byte the same values
        assert_eq!(
            value["items"][1],
            json!({"id": "card", "type": 3, "name": "Visa", "card": {"number": "4111"}, "login": null})
        );
        assert_eq!(value["items"][0]["login"]["uris"][0]["uri"], "https://a.com");
        assert!(out.starts_with("{\n  \"encrypted\": false"));
    }

    #[test]
    fn test_to_json_writes_new_records() {
        let export = VaultExport::from_json(EXPORT).unwrap();
        let added = Record::login(
            "csv",
            "Imported",
            Credential {
                username: "név".to_string(),
                secret: "s".to_string(),
                uris: vec![UriValue::new("https://b.com")],
                ..Credential::default()
            },
        );
        let mut records = export.logins.clone();
        records.push(added);

        let out = export.to_json(&records).unwrap();
        assert!(out.contains("\"név\""));
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["items"].as_array().unwrap().len(), 4);
        assert_eq!(value["items"][1]["id"], "csv");
    }

    #[test]
    fn test_missing_items_is_empty() {
        let export = VaultExport::from_json(r#"{"encrypted": false}"#).unwrap();
        assert!(export.logins.is_empty());
        assert!(export.others.is_empty());

        let value: Value = serde_json::from_str(&export.to_json(&[]).unwrap()).unwrap();
        assert_eq!(value, json!({"encrypted": false, "items": []}));
    }

    #[test]
    fn test_item_without_type_passes_through() {
        let export = VaultExport::from_json(r#"{"items": [{"id": "x", "name": "untyped"}]}"#).unwrap();
        assert!(export.logins.is_empty());
        assert_eq!(export.others.len(), 1);
    }

    #[test]
    fn test_invalid_documents_are_rejected() {
        assert!(matches!(VaultExport::from_json("not json"), Err(VaultError::Json(_))));
        assert!(matches!(VaultExport::from_json("[1, 2]"), Err(VaultError::General(_))));
        assert!(matches!(
            VaultExport::from_json(r#"{"items": {"id": "a"}}"#),
            Err(VaultError::General(_))
        ));
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("export.json");
        let output = dir.path().join("out").join("cleaned.json");
        fs::write(&input, EXPORT).unwrap();

        let export = VaultExport::load(&input).unwrap();
        export.save(&output, &export.logins).unwrap();

        let reloaded = VaultExport::load(&output).unwrap();
        assert_eq!(reloaded.logins, export.logins);
        assert_eq!(reloaded.others, export.others);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            VaultExport::load(&dir.path().join("missing.json")),
            Err(VaultError::Io(_))
        ));
    }
}
