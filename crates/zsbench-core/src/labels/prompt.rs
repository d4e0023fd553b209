//! Label-text transforms applied before labels reach the text encoder.

use serde::{Deserialize, Serialize};

/// Maps a label to the prompt string fed to the text encoder.
///
/// Only the prompt changes; results are always reported with the original label.
pub trait LabelTransform {
    fn apply(&self, label: &str) -> String;
}

impl<F> LabelTransform for F
where
    F: Fn(&str) -> String,
{
    fn apply(&self, label: &str) -> String {
        self(label)
    }
}

/// Passes labels through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl LabelTransform for Identity {
    fn apply(&self, label: &str) -> String {
        label.to_string()
    }
}

/// A prompt template such as `"a photo of a {}"`.
///
/// Both `{}` and `{label}` are substituted with the label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptTemplate(String);

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// Whether the template contains a placeholder for the label.
    pub fn has_placeholder(&self) -> bool {
        self.0.contains("{}") || self.0.contains("{label}")
    }

    /// Whether the template maps every label to itself.
    pub fn is_identity(&self) -> bool {
        self.0 == "{}" || self.0 == "{label}"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self("{}".to_string())
    }
}

impl LabelTransform for PromptTemplate {
    /// Substitutes every `{label}` and `{}` in one left-to-right pass, so
    /// braces inside the label itself are kept verbatim.
    fn apply(&self, label: &str) -> String {
        let mut out = String::with_capacity(self.0.len() + label.len());
        let mut rest = self.0.as_str();

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            match tail
                .strip_prefix("{label}")
                .or_else(|| tail.strip_prefix("{}"))
            {
                Some(after) => {
                    out.push_str(label);
                    rest = after;
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}
