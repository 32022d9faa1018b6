use std::fmt;

use chrono::NaiveDateTime;
use ordered_float::OrderedFloat;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Record identifier in its textual form.
///
/// The reporting API is not consistent about emitting ids as strings or
/// numbers, so `5` and `"5"` normalize to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

/// 2^53: floats at or above this no longer hold every integer exactly.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

impl RecordId {
    /// Build from a JSON scalar. Only strings and numbers are valid ids.
    ///
    /// Integral floats such as `5.0` read as the integer `5`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self(s.clone())),
            Value::Number(n) => match n.as_f64() {
                Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_EXACT_INTEGER => {
                    Some(Self((f as i64).to_string()))
                }
                _ => Some(Self(n.to_string())),
            },
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Recency marker of a hypervisor, compared to pick between duplicates.
///
/// Variant order is the comparison order across kinds: a hypervisor that was
/// never seen loses to anything, and numbers sort before timestamps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum LastSeen {
    Never,
    Number(OrderedFloat<f64>),
    Timestamp(NaiveDateTime),
    Text(String),
}

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

impl LastSeen {
    /// Parse from a JSON value. Returns `None` for booleans, arrays and objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Never),
            Value::Number(n) => n.as_f64().map(|f| Self::Number(OrderedFloat(f))),
            Value::String(s) => Some(Self::parse_text(s)),
            _ => None,
        }
    }

    fn parse_text(s: &str) -> Self {
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
            return Self::Timestamp(dt.naive_utc());
        }
        for fmt in TIMESTAMP_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Self::Timestamp(dt);
            }
        }
        Self::Text(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Input entities
// ---------------------------------------------------------------------------

/// A compute host from the `hypervisor` report.
#[derive(Debug, Clone)]
pub struct Hypervisor {
    pub id: RecordId,
    /// Fully-qualified host name.
    pub hostname: String,
    /// `None` when missing, null or empty. Rejected by `reconcile`.
    pub availability_zone: Option<String>,
    pub last_seen: LastSeen,
    pub raw_fields: Map<String, Value>,
}

impl Hypervisor {
    pub fn short_name(&self) -> &str {
        short_hostname(&self.hostname)
    }
}

/// A tenant from the `project` report.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: RecordId,
    pub display_name: String,
    pub raw_fields: Map<String, Value>,
}

/// An active instance from the `instance` report.
///
/// `raw_fields` holds every field of the original record, in report order;
/// the typed fields are views onto it. The instance's own `availability_zone`
/// is a placeholder and is only carried in `raw_fields`.
#[derive(Debug, Clone)]
pub struct Instance {
    pub id: RecordId,
    /// Host name as reported, short or fully-qualified.
    pub hypervisor: Option<String>,
    pub project_id: Option<RecordId>,
    pub raw_fields: Map<String, Value>,
}

/// Leading label of a host name: everything before the first `.`.
pub fn short_hostname(hostname: &str) -> &str {
    hostname.split('.').next().unwrap_or(hostname)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

pub const AVAILABILITY_ZONE: &str = "availability_zone";
pub const PROJECT_DISPLAY_NAME: &str = "project_display_name";

/// An instance joined with its hypervisor and project.
///
/// Serializes as the flat field map.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedInstance {
    pub id: RecordId,
    pub hypervisor_id: RecordId,
    fields: Map<String, Value>,
}

impl EnrichedInstance {
    pub(crate) fn new(instance: &Instance, hypervisor: &Hypervisor, project: &Project) -> Self {
        let mut fields = instance.raw_fields.clone();
        let az = hypervisor.availability_zone.clone().unwrap_or_default();
        // Map::insert keeps the existing slot, so the column does not move.
        fields.insert(AVAILABILITY_ZONE.into(), Value::String(az));
        fields.insert(PROJECT_DISPLAY_NAME.into(), Value::String(project.display_name.clone()));
        Self {
            id: instance.id.clone(),
            hypervisor_id: hypervisor.id.clone(),
            fields,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn availability_zone(&self) -> Option<&str> {
        self.fields.get(AVAILABILITY_ZONE).and_then(Value::as_str)
    }

    pub fn project_display_name(&self) -> Option<&str> {
        self.fields.get(PROJECT_DISPLAY_NAME).and_then(Value::as_str)
    }
}

impl Serialize for EnrichedInstance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// Warnings + Summary
// ---------------------------------------------------------------------------

/// Recoverable data problems. The offending record is dropped and the run continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconWarning {
    /// Two hypervisors share a short name; `kept` is the one the index holds.
    DuplicateHypervisorShortName {
        short_name: String,
        kept: RecordId,
        dropped: RecordId,
    },
    InstanceMissingHypervisor { instance_id: RecordId },
    InstanceInvalidProject {
        instance_id: RecordId,
        project_id: Option<RecordId>,
    },
}

impl fmt::Display for ReconWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateHypervisorShortName { short_name, kept, dropped } => {
                write!(f, "duplicate short hypervisor name {short_name} (kept {kept}, dropped {dropped})")
            }
            Self::InstanceMissingHypervisor { instance_id } => {
                write!(f, "instance {instance_id} has no hypervisor; it will be ignored")
            }
            Self::InstanceInvalidProject { instance_id, project_id: Some(project_id) } => {
                write!(f, "instance {instance_id} has invalid project_id {project_id}; it will be ignored")
            }
            Self::InstanceInvalidProject { instance_id, project_id: None } => {
                write!(f, "instance {instance_id} has no project_id; it will be ignored")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub hypervisors: usize,
    pub short_names: usize,
    pub projects: usize,
    pub instances: usize,
    pub enriched: usize,
    pub skipped_no_hypervisor: usize,
    pub skipped_invalid_project: usize,
    pub duplicate_short_names: usize,
}

/// Result of a successful reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    pub summary: ReconSummary,
    pub warnings: Vec<ReconWarning>,
    pub instances: Vec<EnrichedInstance>,
}
