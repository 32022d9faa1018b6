use std::fmt;

use crate::model::RecordId;

/// Which report a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Hypervisor,
    Instance,
    Project,
}

impl ReportKind {
    /// Report name as exposed by the reporting API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hypervisor => "hypervisor",
            Self::Instance => "instance",
            Self::Project => "project",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal reconciliation failures. Any of these aborts the whole run.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// A hypervisor has no availability zone; AZ cannot be derived elsewhere.
    MissingAvailabilityZone { hypervisor_id: RecordId },
    /// An instance names a hypervisor whose short name matches nothing.
    UnresolvableHypervisor { instance_id: RecordId, hypervisor: String },
    /// A record could not be ingested (not an object, required field missing or mistyped).
    MalformedRecord {
        report: ReportKind,
        index: usize,
        field: Option<String>,
        reason: String,
    },
}

impl ReconError {
    /// Short machine-readable kind, attached to the error log events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingAvailabilityZone { .. } => "missing_availability_zone",
            Self::UnresolvableHypervisor { .. } => "unresolvable_hypervisor",
            Self::MalformedRecord { .. } => "malformed_record",
        }
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAvailabilityZone { hypervisor_id } => {
                write!(f, "no availability_zone for hypervisor {hypervisor_id}")
            }
            Self::UnresolvableHypervisor { instance_id, hypervisor } => {
                write!(
                    f,
                    "could not determine hypervisor for instance {instance_id} (hypervisor '{hypervisor}')"
                )
            }
            Self::MalformedRecord { report, index, field: Some(field), reason } => {
                write!(f, "{report} record #{index}: field '{field}' {reason}")
            }
            Self::MalformedRecord { report, index, field: None, reason } => {
                write!(f, "{report} record #{index}: {reason}")
            }
        }
    }
}

impl std::error::Error for ReconError {}
