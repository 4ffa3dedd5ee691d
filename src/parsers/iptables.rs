//! Packet-filter dump parser
//!
//! Accepts either `iptables-save` output or `iptables -L -n` output. The format
//! is detected from the text itself; anything else yields no chains.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Policy marker for chains without a declared default policy
pub const NO_POLICY: &str = "-";

lazy_static! {
    static ref CHAIN_DECLARATION: Regex = Regex::new(r"^:(\S+)\s+(\S+)").unwrap();
    static ref APPEND: Regex = Regex::new(r"^-A\s+(\S+)\s*(.*)$").unwrap();
    static ref LIST_CHAIN: Regex =
        Regex::new(r"^Chain\s+(\S+)(?:\s+\(policy\s+(\w+))?").unwrap();
    static ref TARGET: Regex = Regex::new(r"(?:^|\s)-j\s+(\S+)").unwrap();
    static ref PROTOCOL: Regex = Regex::new(r"(?:^|\s)-p\s+(\S+)").unwrap();
    static ref SOURCE: Regex = Regex::new(r"(?:^|\s)-s\s+(\S+)").unwrap();
    static ref DESTINATION: Regex = Regex::new(r"(?:^|\s)-d\s+(\S+)").unwrap();
    static ref DPORT: Regex = Regex::new(r"--dport\s+(\S+)").unwrap();
    static ref SPORT: Regex = Regex::new(r"--sport\s+(\S+)").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IptablesRule {
    pub target: String,
    pub protocol: String,
    pub source: String,
    pub destination: String,
    /// Compact summary such as `dpt:22 spt:1024`
    pub options: String,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IptablesChain {
    pub name: String,
    /// Declared policy, or [`NO_POLICY`]
    pub policy: String,
    /// Table from the preceding `*table` line; `None` for list output
    pub table: Option<String>,
    pub rules: Vec<IptablesRule>,
}

impl IptablesChain {
    fn new(name: &str, policy: &str, table: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            policy: policy.to_string(),
            table: table.map(String::from),
            rules: Vec::new(),
        }
    }

    /// Whether the chain belongs to the filter table (list output has no table)
    pub fn is_filter(&self) -> bool {
        self.table.as_deref().map_or(true, |t| t == "filter")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedIptables {
    pub chains: Vec<IptablesChain>,
}

impl ParsedIptables {
    /// Filter-table chain with the given name
    pub fn filter_chain(&self, name: &str) -> Option<&IptablesChain> {
        self.chains
            .iter()
            .find(|c| c.name == name && c.is_filter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DumpFormat {
    Save,
    List,
}

fn detect_format(content: &str) -> Option<DumpFormat> {
    let lines = || content.lines().map(str::trim_start);

    if lines().any(|l| l.starts_with('*') || l.starts_with(':')) {
        Some(DumpFormat::Save)
    } else if lines().any(|l| l.starts_with("Chain ")) {
        Some(DumpFormat::List)
    } else {
        None
    }
}

/// Parse `iptables-save` or `iptables -L -n` output
pub fn parse(content: &str) -> ParsedIptables {
    match detect_format(content) {
        Some(DumpFormat::Save) => parse_save(content),
        Some(DumpFormat::List) => parse_list(content),
        None => {
            if !content.trim().is_empty() {
                trace!("Unrecognised packet-filter dump format");
            }
            ParsedIptables::default()
        }
    }
}

fn parse_save(content: &str) -> ParsedIptables {
    let mut chains: Vec<IptablesChain> = Vec::new();
    let mut table: Option<String> = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed == "COMMIT" {
            continue;
        }

        if let Some(name) = trimmed.strip_prefix('*') {
            table = Some(name.trim().to_string());
            continue;
        }

        if let Some(caps) = CHAIN_DECLARATION.captures(trimmed) {
            let chain = IptablesChain::new(&caps[1], &caps[2], table.as_deref());
            match chains
                .iter()
                .position(|c| c.name == chain.name && c.table == chain.table)
            {
                Some(index) => chains[index] = chain,
                None => chains.push(chain),
            }
            continue;
        }

        if let Some(caps) = APPEND.captures(trimmed) {
            let name = &caps[1];
            let rule = parse_rule_spec(&caps[2], trimmed);
            let index = match chains
                .iter()
                .position(|c| c.name == name && c.table == table)
            {
                Some(index) => index,
                None => {
                    chains.push(IptablesChain::new(name, NO_POLICY, table.as_deref()));
                    chains.len() - 1
                }
            };
            chains[index].rules.push(rule);
            continue;
        }

        trace!(line = trimmed, "Skipping unrecognised iptables-save line");
    }

    ParsedIptables { chains }
}

fn parse_rule_spec(spec: &str, raw: &str) -> IptablesRule {
    let capture = |re: &Regex| re.captures(spec).map(|c| c[1].to_string());

    let mut options = Vec::new();
    if let Some(dport) = capture(&DPORT) {
        options.push(format!("dpt:{dport}"));
    }
    if let Some(sport) = capture(&SPORT) {
        options.push(format!("spt:{sport}"));
    }

    IptablesRule {
        target: capture(&TARGET).unwrap_or_else(|| NO_POLICY.to_string()),
        protocol: capture(&PROTOCOL).unwrap_or_else(|| "all".to_string()),
        source: capture(&SOURCE).unwrap_or_else(|| "0.0.0.0/0".to_string()),
        destination: capture(&DESTINATION).unwrap_or_else(|| "0.0.0.0/0".to_string()),
        options: options.join(" "),
        raw: raw.to_string(),
    }
}

fn parse_list(content: &str) -> ParsedIptables {
    let mut parsed = ParsedIptables::default();
    let mut current: Option<IptablesChain> = None;
    let mut in_rows = false;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(caps) = LIST_CHAIN.captures(trimmed) {
            if let Some(chain) = current.take() {
                parsed.chains.push(chain);
            }
            let policy = caps.get(2).map_or(NO_POLICY, |m| m.as_str());
            current = Some(IptablesChain::new(&caps[1], policy, None));
            in_rows = false;
            continue;
        }

        let Some(chain) = current.as_mut() else {
            continue;
        };

        if trimmed.starts_with("target") {
            in_rows = true;
            continue;
        }
        if !in_rows {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() < 5 {
            trace!(line = trimmed, "Skipping short iptables row");
            continue;
        }
        chain.rules.push(IptablesRule {
            target: fields[0].to_string(),
            protocol: fields[1].to_string(),
            source: fields[3].to_string(),
            destination: fields[4].to_string(),
            options: fields[5..].join(" "),
            raw: trimmed.to_string(),
        });
    }

    if let Some(chain) = current {
        parsed.chains.push(chain);
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAVE_DUMP: &str = "\
# Generated by iptables-save v1.8.9
*nat
:PREROUTING ACCEPT [0:0]
:INPUT ACCEPT [0:0]
COMMIT
*filter
:INPUT DROP [0:0]
:FORWARD DROP [0:0]
:OUTPUT ACCEPT [12:3456]
-A INPUT -i lo -j ACCEPT
-A INPUT -p tcp -m tcp --dport 22 -s 192.168.1.0/24 -j ACCEPT
-A PVEFW-INPUT -j DROP
COMMIT
";

    const LIST_DUMP: &str = "\
Chain INPUT (policy ACCEPT)
target     prot opt source               destination
ACCEPT     all  --  0.0.0.0/0            0.0.0.0/0            state RELATED,ESTABLISHED
ACCEPT     tcp  --  10.0.0.0/8           0.0.0.0/0            tcp dpt:22

Chain FORWARD (policy DROP)
target     prot opt source               destination

Chain PVEFW-INPUT (1 references)
target     prot opt source               destination
DROP       all  --  0.0.0.0/0            0.0.0.0/0
";

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse(""), ParsedIptables::default());
    }

    #[test]
    fn test_unknown_format_yields_no_chains() {
        assert!(parse("this is not a firewall dump\n").chains.is_empty());
    }

    #[test]
    fn test_parse_save_format() {
        let parsed = parse(SAVE_DUMP);

        let input = parsed.filter_chain("INPUT").unwrap();
        assert_eq!(input.policy, "DROP");
        assert_eq!(input.table.as_deref(), Some("filter"));
        assert_eq!(input.rules.len(), 2);

        let ssh = &input.rules[1];
        assert_eq!(ssh.target, "ACCEPT");
        assert_eq!(ssh.protocol, "tcp");
        assert_eq!(ssh.source, "192.168.1.0/24");
        assert_eq!(ssh.destination, "0.0.0.0/0");
        assert_eq!(ssh.options, "dpt:22");

        let loopback = &input.rules[0];
        assert_eq!(loopback.protocol, "all");
        assert_eq!(loopback.options, "");
    }

    #[test]
    fn test_save_format_keeps_tables_apart() {
        let parsed = parse(SAVE_DUMP);

        let nat_input = parsed
            .chains
            .iter()
            .find(|c| c.name == "INPUT" && c.table.as_deref() == Some("nat"))
            .unwrap();
        assert_eq!(nat_input.policy, "ACCEPT");
    }

    #[test]
    fn test_append_creates_undeclared_chain() {
        let parsed = parse(SAVE_DUMP);
        let chain = parsed.filter_chain("PVEFW-INPUT").unwrap();
        assert_eq!(chain.policy, NO_POLICY);
        assert_eq!(chain.rules[0].target, "DROP");
    }

    #[test]
    fn test_parse_list_format() {
        let parsed = parse(LIST_DUMP);

        assert_eq!(parsed.chains.len(), 3);
        let input = parsed.filter_chain("INPUT").unwrap();
        assert_eq!(input.policy, "ACCEPT");
        assert_eq!(input.rules.len(), 2);
        assert_eq!(input.rules[0].options, "state RELATED,ESTABLISHED");
        assert_eq!(input.rules[1].source, "10.0.0.0/8");
        assert_eq!(input.rules[1].options, "tcp dpt:22");

        assert!(parsed.chains[1].rules.is_empty());
        assert_eq!(parsed.chains[2].policy, NO_POLICY);
        assert_eq!(parsed.chains[2].rules.len(), 1);
    }

    #[test]
    fn test_parse_is_idempotent() {
        assert_eq!(parse(SAVE_DUMP), parse(SAVE_DUMP));
        assert_eq!(parse(LIST_DUMP), parse(LIST_DUMP));
    }
}
