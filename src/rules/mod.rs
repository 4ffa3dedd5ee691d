//! Rules module - Security rule catalog, evaluation and scoring

pub mod catalog;
pub mod categories;
pub mod engine;
pub mod results;

pub use catalog::{catalog, SecurityRule};
pub use engine::{audit, audit_sources};
pub use results::{AuditReport, Category, CategoryScore, Finding, Grade, RuleResult, Severity};
