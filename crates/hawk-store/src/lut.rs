// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Static shard key to remote locator and digest registry.
// Author: Lukas Bower

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::config::RemoteConfig;
use crate::error::TableError;

/// One fetchable shard.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LutEntry {
    /// Remote file id substituted into the configured url template.
    #[serde(default)]
    pub id: Option<u64>,
    /// Explicit locator, used verbatim when present.
    #[serde(default)]
    pub url: Option<String>,
    /// Expected md5 of the blob as hex.
    pub md5: String,
}

impl LutEntry {
    /// Remote locator for this entry.
    pub fn locator(&self, remote: &RemoteConfig) -> String {
        match (&self.url, self.id) {
            (Some(url), _) => url.clone(),
            (None, Some(id)) => remote
                .url_template
                .replace("{id}", &id.to_string())
                .replace("{private_link}", &remote.private_link),
            // Rejected at load time.
            (None, None) => String::new(),
        }
    }

    /// Expected digest normalized to lowercase hex.
    pub fn expected_digest(&self) -> String {
        self.md5.trim().to_ascii_lowercase()
    }
}

/// Immutable registry of every fetchable shard.
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    entries: BTreeMap<String, LutEntry>,
}

impl LookupTable {
    /// Load the table from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        let text = fs::read_to_string(path).map_err(|source| TableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Parse the table from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, TableError> {
        let entries: BTreeMap<String, LutEntry> = serde_json::from_str(text)?;
        Self::from_entries(entries)
    }

    /// Build a table from already parsed entries.
    pub fn from_entries(entries: BTreeMap<String, LutEntry>) -> Result<Self, TableError> {
        if let Some((key, _)) = entries
            .iter()
            .find(|(_, entry)| entry.url.is_none() && entry.id.is_none())
        {
            return Err(TableError::MissingLocator(key.clone()));
        }
        Ok(Self { entries })
    }

    /// Entry for `key`, if the shard is known.
    pub fn get(&self, key: &str) -> Option<&LutEntry> {
        self.entries.get(key)
    }

    /// Whether `key` names a fetchable shard.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Known shard keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of known shards.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"{
        "SBW_header": {"id": 4242, "md5": "0123456789ABCDEF0123456789abcdef"},
        "BR_AR_01": {"url": "https://mirror.example/BR_AR_01", "md5": "ffffffffffffffffffffffffffffffff"}
    }"#;

    #[test]
    fn template_locator_substitutes_id_and_link() {
        let table = LookupTable::from_json_str(TABLE).expect("table");
        let remote = RemoteConfig {
            url_template: "https://host/files/{id}?private_link={private_link}".to_string(),
            private_link: "abc".to_string(),
        };
        let entry = table.get("SBW_header").expect("header entry");
        assert_eq!(entry.locator(&remote), "https://host/files/4242?private_link=abc");
        assert_eq!(entry.expected_digest(), "0123456789abcdef0123456789abcdef");
    }

    #[test]
    fn explicit_url_is_verbatim() {
        let table = LookupTable::from_json_str(TABLE).expect("table");
        let entry = table.get("BR_AR_01").expect("entry");
        assert_eq!(
            entry.locator(&RemoteConfig::default()),
            "https://mirror.example/BR_AR_01"
        );
    }

    #[test]
    fn keys_are_sorted_and_complete() {
        let table = LookupTable::from_json_str(TABLE).expect("table");
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["BR_AR_01", "SBW_header"]);
        assert_eq!(table.len(), 2);
        assert!(!table.contains("NI_RPH_AR_01"));
    }

    #[test]
    fn entry_without_locator_is_rejected() {
        let err = LookupTable::from_json_str(r#"{"X_Y": {"md5": "00"}}"#).unwrap_err();
        assert!(matches!(err, TableError::MissingLocator(key) if key == "X_Y"));
    }
}
