use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::Domain;
use crate::item::ItemKey;
use crate::media::MediaType;
use crate::state::DomainState;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Time(DateTime<Utc>),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Time(v) => write!(f, "{}", v.to_rfc3339()),
            FieldValue::Text(v) => f.write_str(v),
        }
    }
}

pub type Properties = BTreeMap<String, FieldValue>;

/// Before/after value of one field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldChange {
    pub old: Option<FieldValue>,
    pub new: Option<FieldValue>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Added,
    Removed,
    Changed,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeAction::Added => "added",
            ChangeAction::Removed => "removed",
            ChangeAction::Changed => "changed",
        })
    }
}

/// One detected difference for one item in one domain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeRecord {
    pub key: ItemKey,
    pub domain: Domain,
    pub media_type: MediaType,
    pub action: ChangeAction,
    pub properties: BTreeMap<String, FieldChange>,
    /// State the base side converges to; `None` clears it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<DomainState>,
}

impl ChangeRecord {
    pub fn new(
        key: ItemKey,
        domain: Domain,
        media_type: MediaType,
        action: ChangeAction,
        target: Option<DomainState>,
    ) -> Self {
        Self {
            key,
            domain,
            media_type,
            action,
            properties: BTreeMap::new(),
            target,
        }
    }

    pub fn with_properties(mut self, properties: BTreeMap<String, FieldChange>) -> Self {
        self.properties = properties;
        self
    }

    /// New value of a field, if the record carries it
    pub fn new_value(&self, field: &str) -> Option<&FieldValue> {
        self.properties.get(field).and_then(|c| c.new.as_ref())
    }
}
