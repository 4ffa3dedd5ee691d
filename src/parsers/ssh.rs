//! `sshd_config` parser
//!
//! Only the global scope is audited: parsing stops at the first `Match`
//! block. For every keyword the first value obtained is used, as sshd does.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

/// Global-scope directives of an OpenSSH daemon configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSsh {
    pub permit_root_login: Option<String>,
    pub password_authentication: Option<String>,
    pub pubkey_authentication: Option<String>,
    pub port: Option<u16>,
    pub max_auth_tries: Option<u32>,
    pub permit_empty_passwords: Option<String>,
    pub x11_forwarding: Option<String>,
    pub use_pam: Option<String>,
    pub protocol: Option<String>,
    pub login_grace_time: Option<String>,

    /// Every directive encountered, key case preserved as written
    pub directives: BTreeMap<String, String>,
}

impl ParsedSsh {
    /// Look up a directive by keyword, ignoring case
    pub fn directive(&self, key: &str) -> Option<&str> {
        self.directives
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Parse the text of an `sshd_config` file
pub fn parse(content: &str) -> ParsedSsh {
    let mut ssh = ParsedSsh::default();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.splitn(2, char::is_whitespace);
        let key = match parts.next() {
            Some(k) => k,
            None => continue,
        };

        if key.eq_ignore_ascii_case("match") {
            trace!("Match block reached, ignoring the rest of sshd_config");
            break;
        }

        let value = match parts.next().map(str::trim) {
            Some(v) if !v.is_empty() => v,
            _ => {
                trace!(line = trimmed, "Skipping directive without value");
                continue;
            }
        };

        if ssh.directive(key).is_some() {
            continue;
        }
        ssh.directives.insert(key.to_string(), value.to_string());

        let value = value.to_string();
        match key.to_ascii_lowercase().as_str() {
            "permitrootlogin" => ssh.permit_root_login = Some(value),
            "passwordauthentication" => ssh.password_authentication = Some(value),
            "pubkeyauthentication" => ssh.pubkey_authentication = Some(value),
            "port" => ssh.port = value.parse().ok(),
            "maxauthtries" => ssh.max_auth_tries = value.parse().ok(),
            "permitemptypasswords" => ssh.permit_empty_passwords = Some(value),
            "x11forwarding" => ssh.x11_forwarding = Some(value),
            "usepam" => ssh.use_pam = Some(value),
            "protocol" => ssh.protocol = Some(value),
            "logingracetime" => ssh.login_grace_time = Some(value),
            _ => {}
        }
    }

    ssh
}
