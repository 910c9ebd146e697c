use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

pub const OWNERSHIP_RECORD_TTL: i64 = 300;

/// The only record type this tool writes.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    #[serde(rename = "TXT")]
    TXT,
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::TXT => f.write_str("TXT"),
        }
    }
}

/// A record set as currently present in the zone.
///
/// `record_type` stays a string: zones can hold types this tool never writes (HTTPS, SVCB, ...).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExistingRecord {
    /// Fully qualified, with trailing dot.
    pub name: String,
    pub record_type: String,
    pub values: Vec<String>,
}

/// Returns `name` with exactly one trailing dot.
pub fn fqdn(name: &str) -> String {
    format!("{}.", name.trim_end_matches('.'))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    Create,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeAction::Create => f.write_str("CREATE"),
        }
    }
}

/// A record change waiting to be sent to the zone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChange {
    pub action: ChangeAction,
    pub record_name: String,
    pub record_type: RecordType,
    pub ttl: i64,
    pub value: String,
}

impl PendingChange {
    pub fn create_txt(record_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            action: ChangeAction::Create,
            record_name: record_name.into(),
            record_type: RecordType::TXT,
            ttl: OWNERSHIP_RECORD_TTL,
            value: value.into(),
        }
    }
}

/// Changes sent to the zone in one write.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Batch {
    pub changes: Vec<PendingChange>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn record_names(&self) -> Vec<String> {
        self.changes.iter().map(|change| change.record_name.clone()).collect()
    }
}

impl From<Vec<PendingChange>> for Batch {
    fn from(changes: Vec<PendingChange>) -> Self {
        Self { changes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fqdn_appends_a_single_dot() {
        assert_eq!(fqdn("foo.example.com"), "foo.example.com.");
        assert_eq!(fqdn("foo.example.com."), "foo.example.com.");
    }

    #[test]
    fn txt_change_defaults() {
        let change = PendingChange::create_txt("foo.example.com.", "\"value\"");
        assert_eq!(change.action, ChangeAction::Create);
        assert_eq!(change.record_type, RecordType::TXT);
        assert_eq!(change.ttl, 300);
        assert_eq!(change.action.to_string(), "CREATE");
        assert_eq!(change.record_type.to_string(), "TXT");
        assert_eq!(serde_json::to_value(change.record_type).unwrap(), "TXT");
    }
}
