//! Dataset descriptors and the references reported in lineage.

use crate::errors::DatasetError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Immutable reference to a namespaced data location.
///
/// `name` may still contain template placeholders; lineage reports it as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRef {
    /// Storage kind (e.g. `"s3"`).
    pub kind: String,
    /// Storage system or bucket grouping.
    pub namespace: String,
    /// Location pattern inside the namespace.
    pub name: String,
    /// Extra metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extras: HashMap<String, serde_json::Value>,
}

impl DatasetRef {
    /// Creates a new dataset reference.
    #[must_use]
    pub fn new(kind: impl Into<String>, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
            extras: HashMap::new(),
        }
    }

    /// Adds an extra metadata entry.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }
}

/// A dataset descriptor that can be declared as a task input or output.
pub trait Dataset {
    /// Projects the descriptor into a lineage reference.
    fn dataset_ref(&self) -> DatasetRef;
}

impl Dataset for DatasetRef {
    fn dataset_ref(&self) -> DatasetRef {
        self.clone()
    }
}

/// An object-store location described by a bucket and a key template such as
/// `curated/events/date={ds}/data.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Dataset {
    /// Bucket name.
    pub bucket: String,
    /// Key template with `{param}` placeholders.
    pub key_template: String,
}

impl S3Dataset {
    /// Creates a new S3 dataset descriptor.
    #[must_use]
    pub fn new(bucket: impl Into<String>, key_template: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key_template: key_template.into(),
        }
    }

    /// Lineage namespace: `s3://<bucket>`.
    #[must_use]
    pub fn namespace(&self) -> String {
        format!("s3://{}", self.bucket)
    }

    /// Lineage name: the unrendered key template.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.key_template
    }

    /// Names of the placeholders in the key template, in order of appearance.
    #[must_use]
    pub fn template_params(&self) -> Vec<String> {
        PLACEHOLDER
            .captures_iter(&self.key_template)
            .map(|caps| caps[1].to_string())
            .collect()
    }

    /// Substitutes every `{param}` placeholder with its value.
    pub fn render_key(&self, params: &HashMap<String, String>) -> Result<String, DatasetError> {
        if let Some(missing) = self
            .template_params()
            .into_iter()
            .find(|p| !params.contains_key(p))
        {
            return Err(DatasetError::MissingParam {
                param: missing,
                template: self.key_template.clone(),
            });
        }

        let rendered = PLACEHOLDER.replace_all(&self.key_template, |caps: &regex::Captures<'_>| {
            params.get(&caps[1]).cloned().unwrap_or_default()
        });
        Ok(rendered.into_owned())
    }

    /// Fully rendered object URI: `s3://<bucket>/<key>`.
    pub fn uri(&self, params: &HashMap<String, String>) -> Result<String, DatasetError> {
        Ok(format!("s3://{}/{}", self.bucket, self.render_key(params)?))
    }
}

impl Dataset for S3Dataset {
    fn dataset_ref(&self) -> DatasetRef {
        DatasetRef::new("s3", self.namespace(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_s3_dataset_ref_keeps_template() {
        let ds = S3Dataset::new("lake", "curated/events/date={ds}/data.jsonl");
        let r = ds.dataset_ref();

        assert_eq!(r.kind, "s3");
        assert_eq!(r.namespace, "s3://lake");
        assert_eq!(r.name, "curated/events/date={ds}/data.jsonl");
        assert!(r.extras.is_empty());
    }

    #[test]
    fn test_render_key_and_uri() {
        let ds = S3Dataset::new("lake", "raw/{source}/date={ds}/part.jsonl");
        let p = params(&[("ds", "2025-10-01"), ("source", "web")]);

        assert_eq!(ds.template_params(), vec!["source".to_string(), "ds".to_string()]);
        assert_eq!(ds.render_key(&p).unwrap(), "raw/web/date=2025-10-01/part.jsonl");
        assert_eq!(ds.uri(&p).unwrap(), "s3://lake/raw/web/date=2025-10-01/part.jsonl");
    }

    #[test]
    fn test_render_key_missing_param() {
        let ds = S3Dataset::new("lake", "raw/date={ds}/part.jsonl");
        let err = ds.render_key(&HashMap::new()).unwrap_err();

        assert_eq!(
            err,
            DatasetError::MissingParam {
                param: "ds".to_string(),
                template: "raw/date={ds}/part.jsonl".to_string(),
            }
        );
    }

    #[test]
    fn test_dataset_ref_serialization_skips_empty_extras() {
        let r = DatasetRef::new("s3", "s3://lake", "a/b");
        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("extras").is_none());

        let with_extra = r.with_extra("format", serde_json::json!("jsonl"));
        let json = serde_json::to_value(&with_extra).unwrap();
        assert_eq!(json["extras"]["format"], "jsonl");
    }
}
