//! Report sources: anything that can hand back the records of a named report.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::FetchError;

/// Report filter parameters, sent as the query string. Sorted by name.
pub type ReportParams = BTreeMap<String, String>;

/// Something that can fetch a report by name.
pub trait ReportSource {
    fn fetch(&self, report: &str, params: &ReportParams) -> Result<Vec<Value>, FetchError>;
}

impl<S: ReportSource + ?Sized> ReportSource for &S {
    fn fetch(&self, report: &str, params: &ReportParams) -> Result<Vec<Value>, FetchError> {
        (**self).fetch(report, params)
    }
}

/// Parse `name=value` filter criteria.
pub fn parse_params<I, S>(criteria: I) -> Result<ReportParams, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut params = ReportParams::new();
    for c in criteria {
        let c = c.as_ref();
        match c.split_once('=') {
            Some((name, value)) if !name.is_empty() => {
                params.insert(name.to_string(), value.to_string());
            }
            _ => return Err(format!("invalid filter '{c}' (expected name=value)")),
        }
    }
    Ok(params)
}

/// Development cache in front of another source.
///
/// Each report is stored as raw JSON in `{dir}/{key}.json`. An existing file
/// is served without touching the inner source; nothing ever expires.
pub struct CachedSource<S> {
    inner: S,
    dir: PathBuf,
}

impl<S: ReportSource> CachedSource<S> {
    pub fn new(inner: S, dir: impl Into<PathBuf>) -> Self {
        Self { inner, dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Path of the cache file for a report and its parameters.
    pub fn cache_path(&self, report: &str, params: &ReportParams) -> PathBuf {
        self.dir.join(format!("{}.json", cache_key(report, params)))
    }
}

impl<S: ReportSource> ReportSource for CachedSource<S> {
    fn fetch(&self, report: &str, params: &ReportParams) -> Result<Vec<Value>, FetchError> {
        let path = self.cache_path(report, params);

        if path.exists() {
            tracing::debug!(report, path = %path.display(), "serving report from cache");
            let text = std::fs::read_to_string(&path)
                .map_err(|e| FetchError::Cache(format!("cannot read {}: {e}", path.display())))?;
            return serde_json::from_str(&text)
                .map_err(|e| FetchError::Cache(format!("corrupt cache file {}: {e}", path.display())));
        }

        let records = self.inner.fetch(report, params)?;

        std::fs::create_dir_all(&self.dir)
            .map_err(|e| FetchError::Cache(format!("cannot create {}: {e}", self.dir.display())))?;
        let json = serde_json::to_string(&records)
            .map_err(|e| FetchError::Cache(format!("cannot serialize {report}: {e}")))?;
        std::fs::write(&path, json)
            .map_err(|e| FetchError::Cache(format!("cannot write {}: {e}", path.display())))?;
        tracing::debug!(report, path = %path.display(), "cached report");

        Ok(records)
    }
}

/// File stem for a cached report: the name, then `-name=value` per parameter.
///
/// Each part is percent-encoded, `-` included, so distinct reports never
/// share a file.
fn cache_key(report: &str, params: &ReportParams) -> String {
    let mut key = encode_part(report);
    for (name, value) in params {
        key.push('-');
        key.push_str(&encode_part(name));
        key.push('=');
        key.push_str(&encode_part(value));
    }
    key
}

fn encode_part(s: &str) -> String {
    urlencoding::encode(s).replace('-', "%2D")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingSource {
        calls: Cell<usize>,
    }

    impl ReportSource for CountingSource {
        fn fetch(&self, report: &str, _params: &ReportParams) -> Result<Vec<Value>, FetchError> {
            self.calls.set(self.calls.get() + 1);
            Ok(vec![serde_json::json!({"report": report, "n": self.calls.get()})])
        }
    }

    struct FailingSource;

    impl ReportSource for FailingSource {
        fn fetch(&self, _report: &str, _params: &ReportParams) -> Result<Vec<Value>, FetchError> {
            Err(FetchError::Http { status: 401, message: "Unauthorized".into() })
        }
    }

    #[test]
    fn test_parse_params() {
        let params = parse_params(["active=1", "project_id=abc=def"]).unwrap();
        assert_eq!(params["active"], "1");
        assert_eq!(params["project_id"], "abc=def");
        assert!(parse_params(["novalue"]).is_err());
        assert!(parse_params(["=1"]).is_err());
    }

    #[test]
    fn test_cache_key() {
        let mut params = ReportParams::new();
        assert_eq!(cache_key("hypervisor", &params), "hypervisor");
        params.insert("active".into(), "1".into());
        params.insert("a b".into(), "x/y".into());
        assert_eq!(cache_key("instance", &params), "instance-a%20b=x%2Fy-active=1");
    }

    #[test]
    fn test_cache_keys_do_not_collide() {
        let params = |pairs: &[(&str, &str)]| -> ReportParams {
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
        };
        let keys = [
            cache_key("r", &params(&[("a b", "1")])),
            cache_key("r", &params(&[("a_b", "1")])),
            cache_key("r", &params(&[("x-y", "1")])),
            cache_key("r-x", &params(&[("y", "1")])),
            cache_key("r", &params(&[("k", "1-z=2")])),
            cache_key("r", &params(&[("k", "1"), ("z", "2")])),
        ];
        let unique: std::collections::HashSet<&String> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len(), "{keys:?}");
    }

    #[test]
    fn test_second_fetch_served_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cached = CachedSource::new(CountingSource { calls: Cell::new(0) }, dir.path().join("cache"));
        let params = parse_params(["active=1"]).unwrap();

        let first = cached.fetch("instance", &params).unwrap();
        let second = cached.fetch("instance", &params).unwrap();
        assert_eq!(first, second);
        assert_eq!(cached.inner().calls.get(), 1);
        assert!(dir.path().join("cache/instance-active=1.json").exists());

        // Different params are a different cache entry.
        cached.fetch("instance", &ReportParams::new()).unwrap();
        assert_eq!(cached.inner().calls.get(), 2);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cached = CachedSource::new(FailingSource, dir.path());
        let err = cached.fetch("project", &ReportParams::new()).unwrap_err();
        assert!(err.is_unauthorized());
        assert!(!cached.cache_path("project", &ReportParams::new()).exists());
    }

    #[test]
    fn test_corrupt_cache_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("project.json"), "{not json").unwrap();
        let cached = CachedSource::new(FailingSource, dir.path());
        let err = cached.fetch("project", &ReportParams::new()).unwrap_err();
        assert!(matches!(err, FetchError::Cache(_)));
    }
}
