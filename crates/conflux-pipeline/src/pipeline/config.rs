//! Pipeline configuration.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Default upper bound on transform applications per pipeline.
const DEFAULT_MAX_APPLICATIONS: usize = 100_000;

/// How a pipeline reacts when two transform applications share a name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UniqueNames {
    /// Silently suffix the duplicate name.
    Allow,
    /// Suffix the duplicate name and emit a warning.
    #[default]
    Warn,
    /// Reject the application.
    Error,
}

/// Options for a [`Pipeline`](super::Pipeline).
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct PipelineOptions {
    /// Human-readable pipeline name, used in logs and graph exports.
    #[builder(default, setter(into, strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Policy for duplicate transform application names.
    #[builder(default)]
    #[serde(default)]
    pub unique_names: UniqueNames,

    /// Maximum number of transform applications the pipeline accepts.
    #[builder(default = "DEFAULT_MAX_APPLICATIONS")]
    #[serde(default = "default_max_applications")]
    pub max_applications: usize,
}

fn default_max_applications() -> usize {
    DEFAULT_MAX_APPLICATIONS
}

impl PipelineOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.max_applications == Some(0) {
            return Err("max_applications must be at least 1".into());
        }
        Ok(())
    }
}

impl PipelineOptions {
    /// Returns a builder for pipeline options.
    pub fn builder() -> PipelineOptionsBuilder {
        PipelineOptionsBuilder::default()
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            name: None,
            unique_names: UniqueNames::default(),
            max_applications: DEFAULT_MAX_APPLICATIONS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = PipelineOptions::default();
        assert_eq!(options.unique_names, UniqueNames::Warn);
        assert_eq!(options.max_applications, DEFAULT_MAX_APPLICATIONS);
        assert!(options.name.is_none());
    }

    #[test]
    fn test_options_builder() {
        let options = PipelineOptions::builder()
            .name("ingest")
            .unique_names(UniqueNames::Error)
            .build()
            .unwrap();
        assert_eq!(options.name.as_deref(), Some("ingest"));
        assert_eq!(options.unique_names, UniqueNames::Error);
        assert_eq!(options.max_applications, DEFAULT_MAX_APPLICATIONS);
    }

    #[test]
    fn test_options_validation() {
        let result = PipelineOptions::builder().max_applications(0usize).build();
        let error = crate::PipelineError::from(result.unwrap_err());
        assert!(matches!(error, crate::PipelineError::InvalidConfig(_)));
        assert!(error.to_string().contains("max_applications"));
    }

    #[test]
    fn test_unique_names_from_str() {
        assert_eq!("allow".parse::<UniqueNames>().unwrap(), UniqueNames::Allow);
        assert_eq!(UniqueNames::Error.to_string(), "error");
        assert!("loud".parse::<UniqueNames>().is_err());
    }

    #[test]
    fn test_options_deserialize_defaults() {
        let options: PipelineOptions = serde_json::from_str(r#"{"unique_names":"allow"}"#).unwrap();
        assert_eq!(options.unique_names, UniqueNames::Allow);
        assert_eq!(options.max_applications, DEFAULT_MAX_APPLICATIONS);
    }
}
