//! LXC container configuration parser
//!
//! The input may hold a single `/etc/pve/lxc/<id>.conf` file or several of
//! them concatenated, each introduced by one of the header lines below:
//!
//! ```text
//! # Container 101
//! [CT:101]
//! # /etc/pve/lxc/101.conf
//! # CTID: 101
//! # === 101 ===
//! ```
//!
//! Both Proxmox (`key: value`) and native LXC (`lxc.key = value`) syntax are
//! understood.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::TriState;

/// Id given to a container when the input carries no header line
pub const UNKNOWN_CONTAINER: &str = "unknown";

lazy_static! {
    static ref CONTAINER_HEADERS: Vec<Regex> = vec![
        Regex::new(r"(?i)^#\s*Container\s+(\d+)\b").unwrap(),
        Regex::new(r"(?i)^\[CT:\s*(\d+)\s*\]").unwrap(),
        Regex::new(r"(?i)^#\s*/etc/pve/lxc/(\d+)\.conf\b").unwrap(),
        Regex::new(r"(?i)^#\s*CTID:\s*(\d+)\b").unwrap(),
        Regex::new(r"^#\s*={3,}\s*(\d+)\s*={3,}").unwrap(),
    ];
    static ref SNAPSHOT_SECTION: Regex = Regex::new(r"^\[[^\]]+\]\s*$").unwrap();
    static ref MOUNT_POINT_KEY: Regex = Regex::new(r"^mp\d+$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub id: String,
    pub unprivileged: TriState,
    pub nesting: bool,
    pub mount_points: Vec<String>,
    /// Capability adjustments as `drop:<caps>` or `keep:<caps>`
    pub capabilities: Vec<String>,
    pub hostname: Option<String>,
}

impl ContainerConfig {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            unprivileged: TriState::Unspecified,
            nesting: false,
            mount_points: Vec::new(),
            capabilities: Vec::new(),
            hostname: None,
        }
    }

    /// Containers count as privileged unless `unprivileged` is affirmed
    pub fn is_privileged(&self) -> bool {
        self.unprivileged != TriState::Yes
    }

    /// Display name: `<id>` or `<id> (<hostname>)`
    pub fn label(&self) -> String {
        match &self.hostname {
            Some(hostname) => format!("{} ({})", self.id, hostname),
            None => self.id.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedContainers {
    pub containers: Vec<ContainerConfig>,
}

/// Block being accumulated for the current container
struct Block {
    config: ContainerConfig,
    recognised: bool,
    in_snapshot: bool,
}

impl Block {
    fn new(id: &str) -> Self {
        Self {
            config: ContainerConfig::new(id),
            recognised: false,
            in_snapshot: false,
        }
    }
}

fn header_id(line: &str) -> Option<&str> {
    CONTAINER_HEADERS
        .iter()
        .find_map(|re| re.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Parse one or more LXC container configurations
pub fn parse(content: &str) -> ParsedContainers {
    let mut parsed = ParsedContainers::default();
    let has_headers = content.lines().any(|l| header_id(l.trim()).is_some());

    let mut current = if has_headers {
        None
    } else {
        Some(Block::new(UNKNOWN_CONTAINER))
    };

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(id) = header_id(trimmed) {
            if let Some(block) = current.take() {
                parsed.containers.push(block.config);
            }
            current = Some(Block::new(id));
            continue;
        }

        if trimmed.starts_with('#') {
            continue;
        }

        let Some(block) = current.as_mut() else {
            continue;
        };

        if SNAPSHOT_SECTION.is_match(trimmed) {
            block.in_snapshot = true;
            continue;
        }
        if block.in_snapshot {
            continue;
        }

        if apply_directive(&mut block.config, trimmed) {
            block.recognised = true;
        } else {
            trace!(line = trimmed, "Skipping unrecognised container directive");
        }
    }

    if let Some(block) = current {
        if has_headers || block.recognised {
            parsed.containers.push(block.config);
        }
    }

    parsed
}

/// Apply one directive line; returns whether the line was understood
fn apply_directive(config: &mut ContainerConfig, line: &str) -> bool {
    if line.starts_with("lxc.") {
        return apply_lxc_directive(config, line);
    }

    let Some((key, value)) = line.split_once(':') else {
        return false;
    };
    let key = key.trim();
    let value = value.trim();

    match key {
        "unprivileged" => {
            config.unprivileged = if matches!(value, "1" | "true") {
                TriState::Yes
            } else {
                TriState::No
            };
        }
        "hostname" => config.hostname = Some(value.to_string()),
        "features" => {
            if value
                .split(',')
                .map(str::trim)
                .any(|f| f == "nesting=1" || f == "nesting=true")
            {
                config.nesting = true;
            }
        }
        key if MOUNT_POINT_KEY.is_match(key) => config.mount_points.push(value.to_string()),
        _ => {}
    }
    true
}

fn apply_lxc_directive(config: &mut ContainerConfig, line: &str) -> bool {
    let Some(split) = line.find(|c: char| c == '=' || c == ':') else {
        return false;
    };
    let key = line[..split].trim();
    let value = line[split + 1..].trim().to_string();

    match key {
        "lxc.idmap" | "lxc.id_map" => config.unprivileged = TriState::Yes,
        "lxc.mount.entry" => config.mount_points.push(value),
        "lxc.cap.drop" => config.capabilities.push(format!("drop:{value}")),
        "lxc.cap.keep" => config.capabilities.push(format!("keep:{value}")),
        _ => {}
    }
    true
}
