//! Configuration validation.

use std::collections::HashSet;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::schema::{Config, StoreBackend};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Convert the first error into a `ConfigError`, if any.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_scheduler(config, &mut result);
        Self::validate_storage(config, &mut result);
        Self::validate_store(config, &mut result);
        Self::validate_pipelines(config, &mut result);

        result
    }

    fn validate_scheduler(config: &Config, result: &mut ValidationResult) {
        let scheduler = &config.scheduler;
        if scheduler.poll_interval_secs == 0 {
            result.add_error(ValidationError::new(
                "scheduler.poll_interval_secs",
                "poll_interval_secs must be greater than 0",
            ));
        }

        if scheduler.window_secs == 0 {
            result.add_error(ValidationError::new(
                "scheduler.window_secs",
                "window_secs must be greater than 0",
            ));
        } else if scheduler.window_secs < scheduler.poll_interval_secs {
            result.add_warning(ValidationWarning::new(
                "scheduler.window_secs",
                "window is narrower than the poll interval, fire times between ticks will be missed",
            ));
        }
    }

    fn validate_storage(config: &Config, result: &mut ValidationResult) {
        if config.storage.max_concurrent_items == 0 {
            result.add_error(ValidationError::new(
                "storage.max_concurrent_items",
                "max_concurrent_items must be greater than 0",
            ));
        }

        if config.storage.region.trim().is_empty() {
            result.add_error(ValidationError::new(
                "storage.region",
                "Region cannot be empty",
            ));
        }

        if let Some(ref url) = config.storage.endpoint_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                result.add_error(ValidationError::new(
                    "storage.endpoint_url",
                    "endpoint_url must start with http:// or https://",
                ));
            }
        }
    }

    fn validate_store(config: &Config, result: &mut ValidationResult) {
        match config.store.backend {
            StoreBackend::Sqlite if config.store.path.trim().is_empty() => {
                result.add_error(ValidationError::new(
                    "store.path",
                    "SQLite store path cannot be empty",
                ));
            }
            StoreBackend::Memory => {
                result.add_warning(ValidationWarning::new(
                    "store.backend",
                    "Memory store keeps execution records only for the lifetime of the process",
                ));
            }
            _ => {}
        }
    }

    fn validate_pipelines(config: &Config, result: &mut ValidationResult) {
        if config.pipelines.is_empty() {
            result.add_warning(ValidationWarning::new(
                "pipelines",
                "No pipelines configured",
            ));
        }

        let mut seen = HashSet::new();
        for (index, pipeline) in config.pipelines.iter().enumerate() {
            let path = format!("pipelines[{}]", index);

            if pipeline.name.trim().is_empty() {
                result.add_error(ValidationError::new(
                    format!("{}.name", path),
                    "Pipeline name cannot be empty",
                ));
            } else if !seen.insert(pipeline.name.as_str()) {
                result.add_error(ValidationError::new(
                    format!("{}.name", path),
                    format!("Duplicate pipeline name '{}'", pipeline.name),
                ));
            }

            if let Err(e) = cron::Schedule::from_str(&pipeline.cron_expression()) {
                result.add_error(ValidationError::new(
                    format!("{}.schedule", path),
                    format!("Invalid cron expression '{}': {}", pipeline.schedule, e),
                ));
            }

            if pipeline.source.trim().is_empty() {
                result.add_error(ValidationError::new(
                    format!("{}.source", path),
                    "Source location cannot be empty",
                ));
            }

            if pipeline.target.trim().is_empty() {
                result.add_error(ValidationError::new(
                    format!("{}.target", path),
                    "Target location cannot be empty",
                ));
            }

            if !pipeline.source.trim().is_empty()
                && pipeline.source.trim() == pipeline.target.trim()
            {
                result.add_error(ValidationError::new(
                    format!("{}.target", path),
                    format!(
                        "Target must differ from source for a {} pipeline",
                        pipeline.operation
                    ),
                ));
            }

            if pipeline.source_keys.iter().any(|k| k.trim().is_empty()) {
                result.add_error(ValidationError::new(
                    format!("{}.source_keys", path),
                    "Source keys cannot be empty strings",
                ));
            }
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
