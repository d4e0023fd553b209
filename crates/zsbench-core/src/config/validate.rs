//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::output::OutputFormat;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.evaluation.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "evaluation.batch_size must be > 0".into(),
            ));
        }
        if !self.evaluation.prompt_template.has_placeholder() {
            return Err(ConfigError::ValidationError(format!(
                "evaluation.prompt_template must contain {{}} or {{label}}, got {:?}",
                self.evaluation.prompt_template.as_str()
            )));
        }
        if self.text_encoder.max_length == 0 {
            return Err(ConfigError::ValidationError(
                "text_encoder.max_length must be > 0".into(),
            ));
        }
        if OutputFormat::parse(&self.output.format).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "output.format must be \"json\" or \"jsonl\", got {:?}",
                self.output.format
            )));
        }
        Ok(())
    }
}
