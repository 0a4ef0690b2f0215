use crate::env::{
    SAGE_DC_ENV, SAGE_ENV_ENV, SAGE_GROUP_ENV, SAGE_INST_ENV, SAGE_SYSTEM_ENV,
    SAGE_TIME_FORMAT_ENV,
};
use crate::error::ConfigError;
use crate::layout;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::env::VarError;
use std::fmt;

/// Deployment attributes flattened into every encoded record.
///
/// An empty string and an unset field are the same thing: both are left out
/// of the output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentMetadata {
    /// Datacenter.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dc: String,
    /// Runtime environment.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub env: String,
    /// Project, team, business line or similar.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub group: String,
    /// Job or application name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub system: String,
    /// Instance ID, can be hostname or Kubernetes pod ID.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub inst: String,
    /// Layout for `@timestamp`: a Go reference layout or a `strftime`
    /// pattern. RFC 3339 when empty.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub time_format: String,
}

impl EnvironmentMetadata {
    /// Resolve the time format override into a `strftime` pattern.
    /// `None` when no override is set.
    pub fn time_pattern(&self) -> Result<Option<String>, ConfigError> {
        if self.time_format.is_empty() {
            return Ok(None);
        }
        layout::resolve(&self.time_format).map(Some)
    }

    /// Check that the time format override, if any, is a usable pattern.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.time_pattern().map(|_| ())
    }
}

/// Key-value lookup used to populate [`EnvironmentMetadata`].
///
/// `Ok(None)` means the variable is absent, which is never an error.
pub trait VarSource: Send + Sync {
    fn var(&self, name: &str) -> Result<Option<String>, ConfigError>;
}

/// Reads variables from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl VarSource for ProcessEnv {
    fn var(&self, name: &str) -> Result<Option<String>, ConfigError> {
        match std::env::var(name) {
            Ok(value) => Ok(Some(value)),
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(raw)) => Err(ConfigError::InvalidVar {
                name: name.to_string(),
                reason: format!("not valid unicode: {:?}", raw),
            }),
        }
    }
}

impl VarSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.get(name).cloned())
    }
}

impl VarSource for BTreeMap<String, String> {
    fn var(&self, name: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.get(name).cloned())
    }
}

/// One step of metadata construction. Steps run in order.
pub enum MetadataStep {
    /// Overlay every variable present in the source onto the current value.
    /// Absent variables leave their field untouched.
    FromVars(Box<dyn VarSource>),
    /// Replace the current value wholesale.
    Explicit(EnvironmentMetadata),
}

impl MetadataStep {
    pub fn from_env() -> Self {
        MetadataStep::FromVars(Box::new(ProcessEnv))
    }

    pub fn from_source(source: impl VarSource + 'static) -> Self {
        MetadataStep::FromVars(Box::new(source))
    }

    fn apply(&self, current: &EnvironmentMetadata) -> Result<EnvironmentMetadata, ConfigError> {
        match self {
            MetadataStep::Explicit(metadata) => Ok(metadata.clone()),
            MetadataStep::FromVars(source) => {
                let mut next = current.clone();
                let fields = [
                    (SAGE_DC_ENV, &mut next.dc),
                    (SAGE_ENV_ENV, &mut next.env),
                    (SAGE_GROUP_ENV, &mut next.group),
                    (SAGE_SYSTEM_ENV, &mut next.system),
                    (SAGE_INST_ENV, &mut next.inst),
                    (SAGE_TIME_FORMAT_ENV, &mut next.time_format),
                ];
                for (name, field) in fields {
                    if let Some(value) = source.var(name)? {
                        *field = value;
                    }
                }
                Ok(next)
            }
        }
    }
}

impl fmt::Debug for MetadataStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataStep::FromVars(_) => f.write_str("FromVars(..)"),
            MetadataStep::Explicit(metadata) => f.debug_tuple("Explicit").field(metadata).finish(),
        }
    }
}

/// Run `steps` in order starting from empty metadata.
///
/// The first failing step aborts construction; the result is validated
/// before it is returned.
pub fn build_metadata(steps: &[MetadataStep]) -> Result<EnvironmentMetadata, ConfigError> {
    let mut metadata = EnvironmentMetadata::default();
    for step in steps {
        metadata = step.apply(&metadata)?;
        tracing::debug!(step = ?step, "applied metadata step");
    }
    metadata.validate()?;
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    struct BrokenSource;

    impl VarSource for BrokenSource {
        fn var(&self, name: &str) -> Result<Option<String>, ConfigError> {
            Err(ConfigError::InvalidVar {
                name: name.to_string(),
                reason: "unreadable".to_string(),
            })
        }
    }

    #[test]
    fn no_steps_yield_empty_metadata() {
        assert_eq!(build_metadata(&[]).unwrap(), EnvironmentMetadata::default());
    }

    #[test]
    fn reads_all_six_variables() {
        let source = vars(&[
            ("SAGE_DC", "dc1"),
            ("SAGE_ENV", "prod"),
            ("SAGE_GROUP", "payments"),
            ("SAGE_SYSTEM", "billing"),
            ("SAGE_INST", "pod-7"),
            ("SAGE_TIME_FORMAT", "%Y-%m-%d"),
        ]);
        let metadata = build_metadata(&[MetadataStep::from_source(source)]).unwrap();
        assert_eq!(
            metadata,
            EnvironmentMetadata {
                dc: "dc1".into(),
                env: "prod".into(),
                group: "payments".into(),
                system: "billing".into(),
                inst: "pod-7".into(),
                time_format: "%Y-%m-%d".into(),
            }
        );
    }

    #[test]
    fn absent_variables_leave_fields_empty() {
        let metadata =
            build_metadata(&[MetadataStep::from_source(vars(&[("SAGE_ENV", "dev")]))]).unwrap();
        assert_eq!(metadata.env, "dev");
        assert!(metadata.dc.is_empty());
        assert!(metadata.inst.is_empty());
    }

    #[test]
    fn explicit_step_replaces_everything() {
        let explicit = EnvironmentMetadata {
            system: "system".into(),
            ..Default::default()
        };
        let metadata = build_metadata(&[
            MetadataStep::from_source(vars(&[("SAGE_ENV", "dev"), ("SAGE_DC", "dc1")])),
            MetadataStep::Explicit(explicit.clone()),
        ])
        .unwrap();
        assert_eq!(metadata, explicit);
    }

    #[test]
    fn vars_after_explicit_overlay_per_field() {
        let explicit = EnvironmentMetadata {
            env: "prod".into(),
            group: "test".into(),
            ..Default::default()
        };
        let metadata = build_metadata(&[
            MetadataStep::Explicit(explicit),
            MetadataStep::from_source(vars(&[("SAGE_ENV", "staging")])),
        ])
        .unwrap();
        assert_eq!(metadata.env, "staging");
        assert_eq!(metadata.group, "test");
    }

    #[test]
    fn failing_source_aborts_construction() {
        let err = build_metadata(&[
            MetadataStep::Explicit(EnvironmentMetadata::default()),
            MetadataStep::from_source(BrokenSource),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { ref name, .. } if name == "SAGE_DC"));
    }

    #[test]
    fn invalid_time_format_is_rejected() {
        let err = build_metadata(&[MetadataStep::from_source(vars(&[(
            "SAGE_TIME_FORMAT",
            "%Y-%m-%",
        )]))])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeFormat { .. }));
    }

    #[test]
    fn deserializes_partial_config() {
        let metadata: EnvironmentMetadata =
            serde_json::from_str(r#"{"env":"prod","inst":"host-1"}"#).unwrap();
        assert_eq!(metadata.env, "prod");
        assert_eq!(metadata.inst, "host-1");
        assert!(metadata.time_format.is_empty());
    }
}
