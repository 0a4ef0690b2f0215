//! Environment variable names read by [`MetadataStep::FromVars`].
//!
//! These are purely names; reading them goes through a
//! [`VarSource`] so the formatter stays decoupled from process state.
//!
//! [`MetadataStep::FromVars`]: crate::metadata::MetadataStep::FromVars
//! [`VarSource`]: crate::metadata::VarSource

/// Datacenter.
pub const SAGE_DC_ENV: &str = "SAGE_DC";

/// Runtime environment, e.g. `prod`.
pub const SAGE_ENV_ENV: &str = "SAGE_ENV";

/// Project, team, business line or similar.
pub const SAGE_GROUP_ENV: &str = "SAGE_GROUP";

/// Job or application name.
pub const SAGE_SYSTEM_ENV: &str = "SAGE_SYSTEM";

/// Instance ID, hostname or Kubernetes pod name.
pub const SAGE_INST_ENV: &str = "SAGE_INST";

/// Go reference layout or `strftime` pattern overriding the `@timestamp`
/// format.
pub const SAGE_TIME_FORMAT_ENV: &str = "SAGE_TIME_FORMAT";
