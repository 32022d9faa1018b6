use std::collections::HashMap;

use crate::model::{Hypervisor, Project, RecordId, ReconWarning};

/// Hypervisors keyed by short host name, one entry per name.
///
/// On collision the more recently seen hypervisor wins; on a tie the entry
/// already in the index stays.
#[derive(Debug, Default)]
pub struct ShortNameIndex<'a> {
    by_short: HashMap<&'a str, &'a Hypervisor>,
}

impl<'a> ShortNameIndex<'a> {
    /// Build the index, appending a warning for every duplicate short name.
    pub fn build(hypervisors: &'a [Hypervisor], warnings: &mut Vec<ReconWarning>) -> Self {
        let mut by_short: HashMap<&'a str, &'a Hypervisor> = HashMap::with_capacity(hypervisors.len());

        for hyp in hypervisors {
            let short = hyp.short_name();
            let Some(existing) = by_short.get(short).copied() else {
                by_short.insert(short, hyp);
                continue;
            };

            let (kept, dropped) = if hyp.last_seen > existing.last_seen {
                by_short.insert(short, hyp);
                (hyp, existing)
            } else {
                (existing, hyp)
            };

            let warning = ReconWarning::DuplicateHypervisorShortName {
                short_name: short.to_string(),
                kept: kept.id.clone(),
                dropped: dropped.id.clone(),
            };
            tracing::warn!(
                short_name = short,
                kept = %kept.id,
                dropped = %dropped.id,
                "duplicate short hypervisor name"
            );
            warnings.push(warning);
        }

        Self { by_short }
    }

    pub fn get(&self, short_name: &str) -> Option<&'a Hypervisor> {
        self.by_short.get(short_name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_short.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_short.is_empty()
    }
}

/// Projects keyed by id. A repeated id replaces the earlier project.
pub fn project_index(projects: &[Project]) -> HashMap<&RecordId, &Project> {
    projects.iter().map(|p| (&p.id, p)).collect()
}
