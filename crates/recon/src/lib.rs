//! `reporting-recon` — joins hypervisor, instance and project reports.
//!
//! Pure engine crate: receives pre-fetched report records, returns enriched
//! active instances. No HTTP or file IO.

pub mod engine;
pub mod error;
pub mod index;
pub mod load;
pub mod model;

pub use engine::{reconcile, reconcile_records};
pub use error::{ReconError, ReportKind};
pub use load::{load_hypervisors, load_instances, load_projects};
pub use model::{
    short_hostname, EnrichedInstance, Hypervisor, Instance, LastSeen, Project, RecordId,
    ReconSummary, ReconWarning, Reconciliation,
};
