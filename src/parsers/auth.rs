//! `user.cfg` parser
//!
//! Proxmox VE keeps users, groups, roles, ACLs and API tokens in a single
//! colon-delimited file, one record per line, dispatched on the first field:
//!
//! ```text
//! user:root@pam:1:0:::root@localhost:::
//! group:admins:alice@pve,bob@pve:Administrators:
//! role:Auditor:Sys.Audit,VM.Audit:
//! acl:1:/:@admins,carol@pve:Administrator:
//! token:root@pam!automation:0:1::
//! tfa:alice@pve:totp
//! ```
//!
//! `tfa` records may come before the `user` record they belong to, so users
//! are collected first and folded by id once the whole file has been read.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

use super::TriState;

/// A Proxmox VE user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PveUser {
    pub id: String,
    pub enable: TriState,
    pub expire: Option<i64>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub comment: Option<String>,
    pub keys: Option<String>,
    /// Second factor descriptor (`tfa` record type or the `keys` field)
    pub tfa: Option<String>,
}

impl PveUser {
    fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    /// Users are enabled unless explicitly disabled
    pub fn is_enabled(&self) -> bool {
        self.enable != TriState::No
    }

    pub fn has_tfa(&self) -> bool {
        self.tfa.is_some()
    }

    /// Fold a later record for the same id into this one.
    ///
    /// Present fields of `other` win; a present field is never replaced by an
    /// absent one.
    fn merge(&mut self, other: PveUser) {
        if other.enable != TriState::Unspecified {
            self.enable = other.enable;
        }
        self.expire = other.expire.or(self.expire);
        self.firstname = other.firstname.or(self.firstname.take());
        self.lastname = other.lastname.or(self.lastname.take());
        self.email = other.email.or(self.email.take());
        self.comment = other.comment.or(self.comment.take());
        self.keys = other.keys.or(self.keys.take());
        self.tfa = other.tfa.or(self.tfa.take());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PveGroup {
    pub id: String,
    pub members: Vec<String>,
    pub comment: Option<String>,
}

/// One subject/role pair of an `acl` line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PveAcl {
    pub propagate: bool,
    pub path: String,
    /// `user@realm`, `@group` or `user@realm!token`
    pub subject: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PveToken {
    pub user_id: String,
    pub token_id: String,
    pub expire: Option<i64>,
    pub privsep: TriState,
    pub comment: Option<String>,
}

impl PveToken {
    /// Full token id as used in ACL subjects (`user@realm!name`)
    pub fn full_id(&self) -> String {
        format!("{}!{}", self.user_id, self.token_id)
    }

    pub fn never_expires(&self) -> bool {
        matches!(self.expire, None | Some(0))
    }
}

/// Users, groups, roles, ACLs and tokens of a Proxmox VE cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAuth {
    pub users: Vec<PveUser>,
    pub groups: Vec<PveGroup>,
    pub acls: Vec<PveAcl>,
    pub tokens: Vec<PveToken>,
    /// Role name to its raw, comma separated privilege list
    pub roles: BTreeMap<String, String>,
}

impl ParsedAuth {
    pub fn user(&self, id: &str) -> Option<&PveUser> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Groups the user is a member of, as `@group` ACL subjects
    pub fn group_subjects_of(&self, user_id: &str) -> Vec<String> {
        self.groups
            .iter()
            .filter(|g| g.members.iter().any(|m| m == user_id))
            .map(|g| format!("@{}", g.id))
            .collect()
    }

    /// Roles granted to a user, either directly or through a group
    pub fn roles_of(&self, user_id: &str) -> Vec<&str> {
        let groups = self.group_subjects_of(user_id);
        self.acls
            .iter()
            .filter(|acl| acl.subject == user_id || groups.contains(&acl.subject))
            .map(|acl| acl.role.as_str())
            .collect()
    }
}

/// Parse the text of a `user.cfg` file
pub fn parse(content: &str) -> ParsedAuth {
    let mut auth = ParsedAuth::default();
    let mut users: Vec<PveUser> = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed.split(':').map(str::trim).collect();
        match fields[0] {
            "user" => {
                if let Some(user) = parse_user(&fields) {
                    users.push(user);
                }
            }
            "tfa" => {
                if let Some(user) = parse_tfa(&fields) {
                    users.push(user);
                }
            }
            "group" => {
                if let Some(group) = parse_group(&fields) {
                    auth.groups.push(group);
                }
            }
            "role" => {
                if let Some(id) = field(&fields, 1) {
                    let privs = field(&fields, 2).unwrap_or_default();
                    auth.roles.insert(id, privs);
                }
            }
            "acl" => auth.acls.extend(parse_acl(&fields)),
            "token" => {
                if let Some(token) = parse_token(&fields) {
                    auth.tokens.push(token);
                }
            }
            _ => trace!(line = trimmed, "Skipping unrecognised user.cfg record"),
        }
    }

    auth.users = merge_users(users);
    auth
}

fn field(fields: &[&str], index: usize) -> Option<String> {
    fields
        .get(index)
        .filter(|f| !f.is_empty())
        .map(|f| f.to_string())
}

fn parse_user(fields: &[&str]) -> Option<PveUser> {
    let id = field(fields, 1)?;
    let keys = field(fields, 8);

    Some(PveUser {
        id,
        enable: field(fields, 2)
            .map(|v| TriState::from_flag(&v))
            .unwrap_or_default(),
        expire: field(fields, 3).and_then(|v| v.parse().ok()),
        firstname: field(fields, 4),
        lastname: field(fields, 5),
        email: field(fields, 6),
        comment: field(fields, 7),
        tfa: keys.clone(),
        keys,
    })
}

fn parse_tfa(fields: &[&str]) -> Option<PveUser> {
    let id = field(fields, 1)?;
    let descriptor = field(fields, 2).unwrap_or_else(|| "enabled".to_string());

    Some(PveUser {
        tfa: Some(descriptor),
        ..PveUser::placeholder(&id)
    })
}

fn parse_group(fields: &[&str]) -> Option<PveGroup> {
    Some(PveGroup {
        id: field(fields, 1)?,
        members: split_list(fields.get(2).copied().unwrap_or_default()),
        comment: field(fields, 3),
    })
}

fn parse_acl(fields: &[&str]) -> Vec<PveAcl> {
    let (Some(path), Some(subjects), Some(roles)) =
        (field(fields, 2), field(fields, 3), field(fields, 4))
    else {
        return Vec::new();
    };
    let propagate = fields.get(1).map(|v| *v != "0").unwrap_or(true);

    let mut acls = Vec::new();
    for subject in split_list(&subjects) {
        for role in split_list(&roles) {
            acls.push(PveAcl {
                propagate,
                path: path.clone(),
                subject: subject.clone(),
                role,
            });
        }
    }
    acls
}

fn parse_token(fields: &[&str]) -> Option<PveToken> {
    let full_id = field(fields, 1)?;
    let (user_id, token_id) = full_id.split_once('!')?;

    Some(PveToken {
        user_id: user_id.to_string(),
        token_id: token_id.to_string(),
        expire: field(fields, 2).and_then(|v| v.parse().ok()),
        privsep: field(fields, 3)
            .map(|v| TriState::from_flag(&v))
            .unwrap_or_default(),
        comment: field(fields, 4),
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Fold user records sharing an id into one, keeping first-seen order
fn merge_users(records: Vec<PveUser>) -> Vec<PveUser> {
    let mut merged: Vec<PveUser> = Vec::with_capacity(records.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        match index.get(&record.id) {
            Some(&i) => merged[i].merge(record),
            None => {
                index.insert(record.id.clone(), merged.len());
                merged.push(record);
            }
        }
    }

    merged
}
