//! Ingestion: loosely-typed report records into typed entities.
//!
//! Only structural problems fail here. Semantic gaps (no AZ, no hypervisor,
//! unknown project) are left for `reconcile` to judge.

use serde_json::{Map, Value};

use crate::error::{ReconError, ReportKind};
use crate::model::{Hypervisor, Instance, LastSeen, Project, RecordId};

pub fn load_hypervisors(records: &[Value]) -> Result<Vec<Hypervisor>, ReconError> {
    records
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let ctx = Ctx { report: ReportKind::Hypervisor, index };
            let obj = ctx.object(value)?;
            Ok(Hypervisor {
                id: ctx.required_id(obj, "id")?,
                hostname: ctx.required_str(obj, "hostname")?,
                availability_zone: ctx.optional_str(obj, "availability_zone")?.filter(|az| !az.is_empty()),
                last_seen: ctx.last_seen(obj),
                raw_fields: obj.clone(),
            })
        })
        .collect()
}

pub fn load_instances(records: &[Value]) -> Result<Vec<Instance>, ReconError> {
    records
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let ctx = Ctx { report: ReportKind::Instance, index };
            let obj = ctx.object(value)?;
            Ok(Instance {
                id: ctx.required_id(obj, "id")?,
                hypervisor: ctx.optional_str(obj, "hypervisor")?,
                project_id: ctx.optional_id(obj, "project_id")?,
                raw_fields: obj.clone(),
            })
        })
        .collect()
}

pub fn load_projects(records: &[Value]) -> Result<Vec<Project>, ReconError> {
    records
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let ctx = Ctx { report: ReportKind::Project, index };
            let obj = ctx.object(value)?;
            Ok(Project {
                id: ctx.required_id(obj, "id")?,
                display_name: display_name(obj),
                raw_fields: obj.clone(),
            })
        })
        .collect()
}

/// Display names are free text; a non-string value is kept as its JSON text.
fn display_name(obj: &Map<String, Value>) -> String {
    match obj.get("display_name") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Position of the record being ingested, for error messages.
struct Ctx {
    report: ReportKind,
    index: usize,
}

impl Ctx {
    fn bad(&self, field: &str, reason: &str) -> ReconError {
        ReconError::MalformedRecord {
            report: self.report,
            index: self.index,
            field: Some(field.to_string()),
            reason: reason.to_string(),
        }
    }

    fn object<'a>(&self, value: &'a Value) -> Result<&'a Map<String, Value>, ReconError> {
        value.as_object().ok_or_else(|| ReconError::MalformedRecord {
            report: self.report,
            index: self.index,
            field: None,
            reason: "is not a JSON object".into(),
        })
    }

    fn required_id(&self, obj: &Map<String, Value>, field: &str) -> Result<RecordId, ReconError> {
        self.optional_id(obj, field)?
            .ok_or_else(|| self.bad(field, "is missing"))
    }

    fn optional_id(&self, obj: &Map<String, Value>, field: &str) -> Result<Option<RecordId>, ReconError> {
        match obj.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => RecordId::from_value(v)
                .map(Some)
                .ok_or_else(|| self.bad(field, "is not a string or number")),
        }
    }

    fn required_str(&self, obj: &Map<String, Value>, field: &str) -> Result<String, ReconError> {
        self.optional_str(obj, field)?
            .ok_or_else(|| self.bad(field, "is missing"))
    }

    /// Unusable `last_seen` values rank as never seen.
    fn last_seen(&self, obj: &Map<String, Value>) -> LastSeen {
        let Some(value) = obj.get("last_seen") else {
            return LastSeen::Never;
        };
        LastSeen::from_value(value).unwrap_or_else(|| {
            tracing::debug!(report = %self.report, index = self.index, "unusable last_seen, ranking as never seen");
            LastSeen::Never
        })
    }

    fn optional_str(&self, obj: &Map<String, Value>, field: &str) -> Result<Option<String>, ReconError> {
        match obj.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.bad(field, "is not a string")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn load_hypervisor_fields() {
        let rows = vec![json!({
            "id": 1,
            "hostname": "h1.example.com",
            "availability_zone": "az1",
            "last_seen": 10,
            "vcpus": 32
        })];
        let hyps = load_hypervisors(&rows).unwrap();
        assert_eq!(hyps.len(), 1);
        assert_eq!(hyps[0].id.as_str(), "1");
        assert_eq!(hyps[0].short_name(), "h1");
        assert_eq!(hyps[0].availability_zone.as_deref(), Some("az1"));
        assert_eq!(hyps[0].raw_fields["vcpus"], json!(32));
    }

    #[test]
    fn empty_or_null_az_loads_as_none() {
        let rows = vec![
            json!({"id": 1, "hostname": "a", "availability_zone": ""}),
            json!({"id": 2, "hostname": "b", "availability_zone": null}),
            json!({"id": 3, "hostname": "c"}),
        ];
        let hyps = load_hypervisors(&rows).unwrap();
        assert!(hyps.iter().all(|h| h.availability_zone.is_none()));
        assert!(hyps.iter().all(|h| h.last_seen == LastSeen::Never));
    }

    #[test]
    fn hypervisor_without_hostname_is_malformed() {
        let rows = vec![json!({"id": 1, "availability_zone": "az1"})];
        let err = load_hypervisors(&rows).unwrap_err();
        assert_eq!(
            err,
            ReconError::MalformedRecord {
                report: ReportKind::Hypervisor,
                index: 0,
                field: Some("hostname".into()),
                reason: "is missing".into(),
            }
        );
    }

    #[test]
    fn non_object_record_is_malformed() {
        let rows = vec![json!({"id": "p1", "display_name": "A"}), json!("oops")];
        let err = load_projects(&rows).unwrap_err();
        assert!(matches!(
            err,
            ReconError::MalformedRecord { report: ReportKind::Project, index: 1, field: None, .. }
        ));
    }

    #[test]
    fn instance_optional_fields() {
        let rows = vec![json!({
            "id": "i-1",
            "hypervisor": null,
            "name": "web"
        })];
        let inst = load_instances(&rows).unwrap();
        assert!(inst[0].hypervisor.is_none());
        assert!(inst[0].project_id.is_none());
        assert_eq!(inst[0].raw_fields.len(), 3);
    }

    #[test]
    fn mistyped_id_is_malformed() {
        let rows = vec![json!({"id": {"nested": 1}, "hypervisor": "h1"})];
        let err = load_instances(&rows).unwrap_err();
        assert_eq!(err.to_string(), "instance record #0: field 'id' is not a string or number");
    }

    #[test]
    fn instance_placeholder_az_of_any_type_loads() {
        let rows = vec![
            json!({"id": 100, "hypervisor": "h1", "project_id": 5, "availability_zone": 0}),
            json!({"id": 101, "hypervisor": "h1", "project_id": 5, "availability_zone": ["nova"]}),
        ];
        let inst = load_instances(&rows).unwrap();
        assert_eq!(inst.len(), 2);
        assert_eq!(inst[0].raw_fields["availability_zone"], json!(0));
    }

    #[test]
    fn mistyped_instance_hypervisor_is_malformed() {
        let rows = vec![json!({"id": 100, "hypervisor": 7})];
        let err = load_instances(&rows).unwrap_err();
        assert_eq!(err.to_string(), "instance record #0: field 'hypervisor' is not a string");
    }

    #[test]
    fn unusable_last_seen_ranks_as_never() {
        let rows = vec![
            json!({"id": 1, "hostname": "a", "last_seen": true}),
            json!({"id": 2, "hostname": "b", "last_seen": {"at": 5}}),
        ];
        let hyps = load_hypervisors(&rows).unwrap();
        assert!(hyps.iter().all(|h| h.last_seen == LastSeen::Never));
    }

    #[test]
    fn non_string_display_name_keeps_json_text() {
        let rows = vec![json!({"id": 5, "display_name": 42}), json!({"id": 6, "display_name": true})];
        let projects = load_projects(&rows).unwrap();
        assert_eq!(projects[0].display_name, "42");
        assert_eq!(projects[1].display_name, "true");
    }

    #[test]
    fn project_null_display_name_is_empty() {
        let rows = vec![json!({"id": 5, "display_name": null})];
        let projects = load_projects(&rows).unwrap();
        assert_eq!(projects[0].display_name, "");
    }
}
