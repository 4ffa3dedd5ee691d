//! `storage.cfg` parser
//!
//! Each storage backend is a stanza: an unindented `type: id` line followed by
//! indented `key value` directives.
//!
//! ```text
//! nfs: backups
//!         export /srv/backups
//!         server 10.0.0.20
//!         content backup
//!         options vers=4.2,no_root_squash
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

lazy_static! {
    static ref STANZA_HEADER: Regex = Regex::new(r"^([A-Za-z][\w-]*):\s*(\S+)\s*$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub id: String,
    pub storage_type: String,
    pub path: Option<String>,
    pub server: Option<String>,
    pub export: Option<String>,
    pub share: Option<String>,
    pub content: Vec<String>,
    pub options: Option<String>,
    pub mount_options: Option<String>,
    pub domain: Option<String>,
    pub username: Option<String>,
    pub maxfiles: Option<u32>,
    pub subdir: Option<String>,
    /// Every directive of the stanza, lower-cased key to verbatim value
    pub raw: BTreeMap<String, String>,
}

impl StorageEntry {
    fn new(storage_type: &str, id: &str) -> Self {
        Self {
            id: id.to_string(),
            storage_type: storage_type.to_ascii_lowercase(),
            path: None,
            server: None,
            export: None,
            share: None,
            content: Vec::new(),
            options: None,
            mount_options: None,
            domain: None,
            username: None,
            maxfiles: None,
            subdir: None,
            raw: BTreeMap::new(),
        }
    }

    pub fn is_type(&self, storage_type: &str) -> bool {
        self.storage_type.eq_ignore_ascii_case(storage_type)
    }

    /// Every directive of the stanza rendered as `key value`, space separated
    pub fn option_text(&self) -> String {
        self.raw
            .iter()
            .map(|(key, value)| {
                if value.is_empty() {
                    key.clone()
                } else {
                    format!("{key} {value}")
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn set(&mut self, key: &str, value: &str) {
        let text = Some(value.to_string()).filter(|v| !v.is_empty());
        match key {
            "path" => self.path = text,
            "server" => self.server = text,
            "export" => self.export = text,
            "share" => self.share = text,
            "content" => {
                self.content = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
            }
            "options" => self.options = text,
            "mountoptions" | "mount" => self.mount_options = text,
            "domain" => self.domain = text,
            "username" => self.username = text,
            "maxfiles" => self.maxfiles = value.parse().ok(),
            "subdir" => self.subdir = text,
            _ => {}
        }
        self.raw.insert(key.to_string(), value.to_string());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedStorage {
    pub entries: Vec<StorageEntry>,
}

impl ParsedStorage {
    pub fn of_type<'a>(&'a self, storage_type: &'a str) -> impl Iterator<Item = &'a StorageEntry> {
        self.entries.iter().filter(move |e| e.is_type(storage_type))
    }
}

/// Parse the text of a `storage.cfg` file
pub fn parse(content: &str) -> ParsedStorage {
    let mut parsed = ParsedStorage::default();
    let mut current: Option<StorageEntry> = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let indented = line.starts_with(char::is_whitespace);
        if !indented {
            match STANZA_HEADER.captures(trimmed) {
                Some(caps) => {
                    if let Some(entry) = current.take() {
                        parsed.entries.push(entry);
                    }
                    current = Some(StorageEntry::new(&caps[1], &caps[2]));
                }
                None => trace!(line = trimmed, "Skipping unindented non-stanza line"),
            }
            continue;
        }

        let Some(entry) = current.as_mut() else {
            trace!(line = trimmed, "Skipping directive outside a stanza");
            continue;
        };

        let mut parts = trimmed.splitn(2, char::is_whitespace);
        let key = parts.next().unwrap_or_default().to_ascii_lowercase();
        let value = parts.next().map(str::trim).unwrap_or_default();
        entry.set(&key, value);
    }

    if let Some(entry) = current {
        parsed.entries.push(entry);
    }

    parsed
}
