//! `cluster.fw` parser
//!
//! The Proxmox VE cluster firewall file is split into bracketed sections:
//!
//! ```text
//! [OPTIONS]
//! enable: 1
//! policy_in: DROP
//!
//! [IPSET management]
//! 192.168.1.0/24 # admin LAN
//!
//! [RULES]
//! IN ACCEPT -source +management -p tcp -dport 8006 # web UI
//! |IN SSH(ACCEPT) -i vmbr0
//!
//! [GROUP webservers]
//! IN ACCEPT -p tcp -dport 443
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

use super::TriState;

lazy_static! {
    static ref SECTION_HEADER: Regex =
        Regex::new(r"^\[\s*([A-Za-z_]+)(?:\s+([^\]]*?))?\s*\]").unwrap();
    static ref RULE_LINE: Regex = Regex::new(r"(?i)^(\|)?\s*(IN|OUT|GROUP)\s+(\S+)(.*)$").unwrap();
    static ref SOURCE: Regex = Regex::new(r"(?:^|\s)-source\s+(\S+)").unwrap();
    static ref DEST: Regex = Regex::new(r"(?:^|\s)-dest\s+(\S+)").unwrap();
    static ref PROTO: Regex = Regex::new(r"(?:^|\s)-p\s+(\S+)").unwrap();
    static ref DPORT: Regex = Regex::new(r"(?:^|\s)-dport\s+(\S+)").unwrap();
    static ref SPORT: Regex = Regex::new(r"(?:^|\s)-sport\s+(\S+)").unwrap();
    static ref IFACE: Regex = Regex::new(r"(?:^|\s)-i\s+(\S+)").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    In,
    Out,
    Group,
}

impl Direction {
    fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "IN" => Some(Self::In),
            "OUT" => Some(Self::Out),
            "GROUP" => Some(Self::Group),
            _ => None,
        }
    }
}

/// A single firewall rule line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRule {
    pub direction: Direction,
    /// Action or macro (`ACCEPT`, `SSH(ACCEPT)`) or, for `GROUP` rules, the group name
    pub action: String,
    pub source: Option<String>,
    pub dest: Option<String>,
    pub proto: Option<String>,
    pub dport: Option<String>,
    pub sport: Option<String>,
    pub iface: Option<String>,
    pub comment: Option<String>,
    /// `false` for rules disabled with a leading `|`
    pub enabled: bool,
    /// Security group the rule was declared in, `None` for `[RULES]`
    pub group: Option<String>,
}

/// Cluster-wide firewall configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFirewall {
    pub enabled: TriState,
    pub policy_in: Option<String>,
    pub policy_out: Option<String>,
    pub rules: Vec<FirewallRule>,
    /// IP set name to its entries, in declaration order
    pub ipsets: Vec<(String, Vec<String>)>,
    pub aliases: BTreeMap<String, String>,
    /// Every `[OPTIONS]` entry as written
    pub options: BTreeMap<String, String>,
}

impl ParsedFirewall {
    /// True when no section of the file yielded anything
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
            && self.rules.is_empty()
            && self.ipsets.is_empty()
            && self.aliases.is_empty()
    }

    pub fn enabled_rules(&self) -> impl Iterator<Item = &FirewallRule> {
        self.rules.iter().filter(|r| r.enabled)
    }

    pub fn ipset(&self, name: &str) -> Option<&[String]> {
        self.ipsets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, entries)| entries.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Section {
    None,
    Options,
    Rules,
    Ipset(usize),
    Group(String),
    Aliases,
    Unknown,
}

/// Parse the text of a `cluster.fw` file
pub fn parse(content: &str) -> ParsedFirewall {
    let mut firewall = ParsedFirewall::default();
    let mut section = Section::None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(caps) = SECTION_HEADER.captures(trimmed) {
            let name = caps.get(2).map(|m| m.as_str().trim().to_string());
            section = match caps[1].to_ascii_uppercase().as_str() {
                "OPTIONS" => Section::Options,
                "RULES" => Section::Rules,
                "ALIASES" => Section::Aliases,
                "IPSET" => {
                    firewall.ipsets.push((name.unwrap_or_default(), Vec::new()));
                    Section::Ipset(firewall.ipsets.len() - 1)
                }
                "GROUP" => Section::Group(name.unwrap_or_default()),
                _ => Section::Unknown,
            };
            continue;
        }

        match &section {
            Section::Options => parse_option(trimmed, &mut firewall),
            Section::Rules => {
                if let Some(rule) = parse_rule(trimmed, None) {
                    firewall.rules.push(rule);
                }
            }
            Section::Group(name) => {
                if let Some(rule) = parse_rule(trimmed, Some(name)) {
                    firewall.rules.push(rule);
                }
            }
            Section::Ipset(index) => {
                let entry = trimmed
                    .split(|c: char| c.is_whitespace() || c == '#')
                    .next()
                    .unwrap_or_default();
                if !entry.is_empty() {
                    firewall.ipsets[*index].1.push(entry.to_string());
                }
            }
            Section::Aliases => {
                let mut parts = trimmed.split_whitespace();
                if let (Some(name), Some(cidr)) = (parts.next(), parts.next()) {
                    firewall.aliases.insert(name.to_string(), cidr.to_string());
                }
            }
            Section::None | Section::Unknown => {
                trace!(line = trimmed, "Skipping cluster.fw line outside a known section");
            }
        }
    }

    firewall
}

fn parse_option(line: &str, firewall: &mut ParsedFirewall) {
    let (key, value) = match line.split_once(':') {
        Some((k, v)) if !k.trim().contains(char::is_whitespace) => (k.trim(), v.trim()),
        _ => match line.split_once(char::is_whitespace) {
            Some((k, v)) => (k.trim(), v.trim()),
            None => {
                trace!(line, "Skipping option without value");
                return;
            }
        },
    };

    match key.to_ascii_lowercase().as_str() {
        "enable" => firewall.enabled = TriState::from_flag(value),
        "policy_in" => firewall.policy_in = Some(value.to_ascii_uppercase()),
        "policy_out" => firewall.policy_out = Some(value.to_ascii_uppercase()),
        _ => {}
    }
    firewall.options.insert(key.to_string(), value.to_string());
}

fn parse_rule(line: &str, group: Option<&str>) -> Option<FirewallRule> {
    let caps = match RULE_LINE.captures(line) {
        Some(caps) => caps,
        None => {
            trace!(line, "Skipping line that is not a firewall rule");
            return None;
        }
    };
    let direction = Direction::from_token(&caps[2])?;
    let rest = caps.get(4).map(|m| m.as_str()).unwrap_or_default();

    let (flags, comment) = match rest.split_once('#') {
        Some((flags, comment)) => (flags, Some(comment.trim().to_string())),
        None => (rest, None),
    };
    let flag = |re: &Regex| re.captures(flags).map(|c| c[1].to_string());

    Some(FirewallRule {
        direction,
        action: caps[3].to_string(),
        source: flag(&SOURCE),
        dest: flag(&DEST),
        proto: flag(&PROTO),
        dport: flag(&DPORT),
        sport: flag(&SPORT),
        iface: flag(&IFACE),
        comment: comment.filter(|c| !c.is_empty()),
        enabled: caps.get(1).is_none(),
        group: group.map(String::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let firewall = parse("");
        assert_eq!(firewall, ParsedFirewall::default());
        assert!(firewall.is_empty());
        assert_eq!(firewall.enabled, TriState::Unspecified);
    }

    #[test]
    fn test_parse_options() {
        let firewall = parse("[OPTIONS]\nenable: 1\npolicy_in: drop\npolicy_out ACCEPT\nlog_ratelimit: enable=1,rate=1/second\n");

        assert_eq!(firewall.enabled, TriState::Yes);
        assert_eq!(firewall.policy_in.as_deref(), Some("DROP"));
        assert_eq!(firewall.policy_out.as_deref(), Some("ACCEPT"));
        assert_eq!(
            firewall.options.get("log_ratelimit").map(String::as_str),
            Some("enable=1,rate=1/second")
        );
    }

    #[test]
    fn test_disabled_firewall() {
        let firewall = parse("[options]\nenable: 0\n");
        assert_eq!(firewall.enabled, TriState::No);
        assert!(!firewall.is_empty());
    }

    #[test]
    fn test_parse_rule_flags_in_any_order() {
        let firewall = parse("[RULES]\nIN ACCEPT -dport 8006 -p tcp -source +management -i vmbr0 # web UI\n");

        let rule = &firewall.rules[0];
        assert_eq!(rule.direction, Direction::In);
        assert_eq!(rule.action, "ACCEPT");
        assert_eq!(rule.proto.as_deref(), Some("tcp"));
        assert_eq!(rule.dport.as_deref(), Some("8006"));
        assert_eq!(rule.source.as_deref(), Some("+management"));
        assert_eq!(rule.iface.as_deref(), Some("vmbr0"));
        assert_eq!(rule.comment.as_deref(), Some("web UI"));
        assert!(rule.dest.is_none());
        assert!(rule.enabled);
    }

    #[test]
    fn test_disabled_rule_and_group_reference() {
        let firewall = parse("[RULES]\n|out DROP -dest 10.0.0.0/8\nGROUP webservers\n");

        assert_eq!(firewall.rules.len(), 2);
        assert!(!firewall.rules[0].enabled);
        assert_eq!(firewall.rules[0].direction, Direction::Out);
        assert_eq!(firewall.rules[0].dest.as_deref(), Some("10.0.0.0/8"));
        assert_eq!(firewall.rules[1].direction, Direction::Group);
        assert_eq!(firewall.rules[1].action, "webservers");
        assert_eq!(firewall.enabled_rules().count(), 1);
    }

    #[test]
    fn test_parse_ipsets_and_groups() {
        let firewall = parse(
            "[IPSET management]\n192.168.1.0/24 # admin LAN\n!192.168.1.66\n\n[GROUP web]\nIN ACCEPT -p tcp -dport 443\n[ALIASES]\nnas 10.0.0.5\n",
        );

        assert_eq!(
            firewall.ipset("management"),
            Some(&["192.168.1.0/24".to_string(), "!192.168.1.66".to_string()][..])
        );
        assert_eq!(firewall.rules[0].group.as_deref(), Some("web"));
        assert_eq!(firewall.aliases.get("nas").map(String::as_str), Some("10.0.0.5"));
    }

    #[test]
    fn test_malformed_rules_are_skipped() {
        let firewall = parse("[RULES]\nACCEPT everything\nIN\nIN ACCEPT\n");
        assert_eq!(firewall.rules.len(), 1);
        assert_eq!(firewall.rules[0].action, "ACCEPT");
    }
}
