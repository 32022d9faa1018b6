use serde_json::Value;

use crate::error::ReconError;
use crate::index::{project_index, ShortNameIndex};
use crate::load::{load_hypervisors, load_instances, load_projects};
use crate::model::{
    short_hostname, EnrichedInstance, Hypervisor, Instance, Project, ReconSummary, ReconWarning,
    Reconciliation,
};

/// Join instances to their hypervisor (by short host name) and project.
///
/// Fails on the first hypervisor without an availability zone and on any
/// instance whose hypervisor name matches nothing. Instances with no
/// hypervisor or an unknown project are dropped with a warning.
pub fn reconcile(
    hypervisors: &[Hypervisor],
    instances: &[Instance],
    projects: &[Project],
) -> Result<Reconciliation, ReconError> {
    // AZ is taken from the hypervisor for every instance, so the whole set
    // must be valid before any instance is looked at.
    if let Some(hyp) = hypervisors.iter().find(|h| h.availability_zone.is_none()) {
        let err = ReconError::MissingAvailabilityZone { hypervisor_id: hyp.id.clone() };
        tracing::error!(kind = err.kind(), hypervisor_id = %hyp.id, "no availability_zone for hypervisor");
        return Err(err);
    }
    tracing::debug!(count = hypervisors.len(), "checked hypervisor AZ values");

    let mut warnings = Vec::new();
    let by_short = ShortNameIndex::build(hypervisors, &mut warnings);
    let duplicate_short_names = warnings.len();
    let by_project = project_index(projects);

    let mut summary = ReconSummary {
        hypervisors: hypervisors.len(),
        short_names: by_short.len(),
        projects: by_project.len(),
        instances: instances.len(),
        duplicate_short_names,
        ..ReconSummary::default()
    };

    let mut enriched = Vec::with_capacity(instances.len());
    for instance in instances {
        let Some(hostname) = instance.hypervisor.as_deref() else {
            tracing::warn!(instance_id = %instance.id, "instance has no hypervisor; it will be ignored");
            warnings.push(ReconWarning::InstanceMissingHypervisor { instance_id: instance.id.clone() });
            summary.skipped_no_hypervisor += 1;
            continue;
        };

        let Some(hyp) = by_short.get(short_hostname(hostname)) else {
            let err = ReconError::UnresolvableHypervisor {
                instance_id: instance.id.clone(),
                hypervisor: hostname.to_string(),
            };
            tracing::error!(
                kind = err.kind(),
                instance_id = %instance.id,
                hypervisor = hostname,
                "could not determine hypervisor for instance"
            );
            return Err(err);
        };

        let Some(project) = instance.project_id.as_ref().and_then(|id| by_project.get(id)) else {
            tracing::warn!(
                instance_id = %instance.id,
                project_id = ?instance.project_id.as_ref().map(|id| id.as_str()),
                "instance has invalid project_id; it will be ignored"
            );
            warnings.push(ReconWarning::InstanceInvalidProject {
                instance_id: instance.id.clone(),
                project_id: instance.project_id.clone(),
            });
            summary.skipped_invalid_project += 1;
            continue;
        };

        enriched.push(EnrichedInstance::new(instance, hyp, project));
    }
    tracing::debug!(enriched = enriched.len(), "checked instance hypervisor values");

    summary.enriched = enriched.len();
    Ok(Reconciliation { summary, warnings, instances: enriched })
}

/// Ingest the three raw reports and reconcile them.
pub fn reconcile_records(
    hypervisors: &[Value],
    instances: &[Value],
    projects: &[Value],
) -> Result<Reconciliation, ReconError> {
    let loaded = load_hypervisors(hypervisors).and_then(|hyps| {
        Ok((hyps, load_instances(instances)?, load_projects(projects)?))
    });
    let (hypervisors, instances, projects) = loaded.map_err(|err| {
        tracing::error!(kind = err.kind(), "{err}");
        err
    })?;
    reconcile(&hypervisors, &instances, &projects)
}
