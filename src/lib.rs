//! pveaudit Library
//!
//! This crate audits the security posture of a Proxmox VE host from its
//! configuration files: it parses them into a [`parsers::ParsedConfig`],
//! evaluates a fixed catalog of security rules and scores the result into an
//! [`rules::AuditReport`] with a letter grade.
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use pveaudit::parsers::FileType;
//! use pveaudit::rules::{audit_sources, Grade};
//!
//! let mut sources = BTreeMap::new();
//! sources.insert(
//!     FileType::SshdConfig,
//!     "PermitRootLogin no\nPasswordAuthentication no\nPort 2222\n".to_string(),
//! );
//!
//! let report = audit_sources(&sources);
//! assert_eq!(report.overall_score, 100);
//! assert_eq!(report.grade, Grade::A);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod parsers;
pub mod rules;

pub use cli::exit_codes;
pub use error::PveAuditError;
