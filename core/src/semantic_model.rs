//! Semantic model references and the registry of models a user may pick.
//!
//! A reference names a YAML file on a stage, `DATABASE.SCHEMA.STAGE/file.yaml`.
//! The service expects it prefixed with `@`.

use std::fmt;

use crate::errors::{ConfigError, ConfigResult, SessionError};

/// Validated path to a semantic model file on a stage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemanticModelRef {
    path: String,
}

impl SemanticModelRef {
    /// Validates `DATABASE.SCHEMA.STAGE/file`. A leading `@` is accepted.
    pub fn parse(raw: &str) -> ConfigResult<Self> {
        let trimmed = raw.trim();
        let path = trimmed.strip_prefix('@').unwrap_or(trimmed);
        let invalid = || ConfigError::InvalidSemanticModel(raw.to_string());

        let (stage, file) = path.split_once('/').ok_or_else(invalid)?;
        let stage_parts: Vec<&str> = stage.split('.').collect();
        if stage_parts.len() != 3 || stage_parts.iter().any(|part| part.trim().is_empty()) {
            return Err(invalid());
        }
        if file.is_empty() || file.ends_with('/') {
            return Err(invalid());
        }

        Ok(Self {
            path: path.to_string(),
        })
    }

    /// `DATABASE.SCHEMA.STAGE/file`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The value sent as `semantic_model_file`
    pub fn stage_path(&self) -> String {
        format!("@{}", self.path)
    }

    /// Last path segment, used as the label in model pickers
    pub fn display_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

impl fmt::Display for SemanticModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// The models available for selection, in configuration order
#[derive(Debug, Clone)]
pub struct SemanticModelRegistry {
    models: Vec<SemanticModelRef>,
}

impl SemanticModelRegistry {
    pub fn new(models: Vec<SemanticModelRef>) -> ConfigResult<Self> {
        if models.is_empty() {
            return Err(ConfigError::NoSemanticModels);
        }
        let mut unique: Vec<SemanticModelRef> = Vec::with_capacity(models.len());
        for model in models {
            if !unique.contains(&model) {
                unique.push(model);
            }
        }
        Ok(Self { models: unique })
    }

    pub fn from_paths<S: AsRef<str>>(paths: &[S]) -> ConfigResult<Self> {
        let models = paths
            .iter()
            .map(|path| SemanticModelRef::parse(path.as_ref()))
            .collect::<ConfigResult<Vec<_>>>()?;
        Self::new(models)
    }

    pub fn models(&self) -> &[SemanticModelRef] {
        &self.models
    }

    /// The model selected when nothing else is asked for
    pub fn default_model(&self) -> &SemanticModelRef {
        &self.models[0]
    }

    /// Looks a model up by full path (with or without `@`) or by display name.
    pub fn resolve(&self, name: &str) -> Result<&SemanticModelRef, SessionError> {
        let needle = name.trim();
        let needle = needle.strip_prefix('@').unwrap_or(needle);
        self.models
            .iter()
            .find(|model| model.path() == needle)
            .or_else(|| {
                self.models
                    .iter()
                    .find(|model| model.display_name() == needle)
            })
            .ok_or_else(|| SessionError::UnknownSemanticModel(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO: &str = "CORTEX_ANALYST_DEMO.REVENUE_TIMESERIES.RAW_DATA/revenue_timeseries.yaml";

    #[test]
    fn parses_stage_paths() {
        let model = SemanticModelRef::parse(DEMO).unwrap();
        assert_eq!(model.path(), DEMO);
        assert_eq!(model.stage_path(), format!("@{}", DEMO));
        assert_eq!(model.display_name(), "revenue_timeseries.yaml");

        let prefixed = SemanticModelRef::parse(&format!("@{}", DEMO)).unwrap();
        assert_eq!(prefixed, model);
    }

    #[test]
    fn nested_file_paths_keep_last_segment_as_name() {
        let model = SemanticModelRef::parse("DB.SCH.STG/models/sales.yaml").unwrap();
        assert_eq!(model.display_name(), "sales.yaml");
    }

    #[test]
    fn rejects_malformed_paths() {
        for raw in [
            "",
            "revenue.yaml",
            "DB.SCHEMA/revenue.yaml",
            "DB..STAGE/revenue.yaml",
            "DB.SCHEMA.STAGE/",
            "DB.SCHEMA.STAGE.EXTRA/revenue.yaml",
        ] {
            assert!(
                matches!(SemanticModelRef::parse(raw), Err(ConfigError::InvalidSemanticModel(_))),
                "accepted {:?}",
                raw
            );
        }
    }

    #[test]
    fn registry_resolves_by_path_or_name() {
        let registry =
            SemanticModelRegistry::from_paths(&[DEMO, "DB.SCH.STG/sales.yaml"]).unwrap();
        assert_eq!(registry.default_model().path(), DEMO);
        assert_eq!(
            registry.resolve("sales.yaml").unwrap().path(),
            "DB.SCH.STG/sales.yaml"
        );
        assert_eq!(registry.resolve(&format!("@{}", DEMO)).unwrap().path(), DEMO);
        assert_eq!(
            registry.resolve("missing.yaml"),
            Err(SessionError::UnknownSemanticModel("missing.yaml".to_string()))
        );
    }

    #[test]
    fn registry_requires_models_and_drops_duplicates() {
        assert!(matches!(
            SemanticModelRegistry::from_paths::<&str>(&[]),
            Err(ConfigError::NoSemanticModels)
        ));
        let registry = SemanticModelRegistry::from_paths(&[DEMO, DEMO]).unwrap();
        assert_eq!(registry.models().len(), 1);
    }
}
