//! Core enums used throughout the crate.

use serde::{Deserialize, Serialize};

/// Which input the correlation template was cut from.
///
/// The reference is the audio embedded in the video; the other source is
/// the external recording. The offset sign is derived from this tag, never
/// from comparing buffer lengths again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSource {
    /// Template taken from the video's audio.
    Reference,
    /// Template taken from the external audio.
    Other,
}

impl TemplateSource {
    /// Whether the template was cut from the reference.
    pub fn is_reference(&self) -> bool {
        matches!(self, TemplateSource::Reference)
    }
}

impl std::fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateSource::Reference => write!(f, "reference"),
            TemplateSource::Other => write!(f, "other"),
        }
    }
}

/// Tag naming the method that produced a SyncResult.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMethodTag {
    /// Valid-mode time-domain cross-correlation.
    #[default]
    CrossCorrelation,
}

impl CorrelationMethodTag {
    /// Stable identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrelationMethodTag::CrossCorrelation => "cross_correlation",
        }
    }
}

impl std::fmt::Display for CorrelationMethodTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse confidence bucket for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    /// Bucket a confidence value (> 0.7 high, > 0.4 medium, otherwise low).
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > 0.7 {
            ConfidenceLevel::High
        } else if confidence > 0.4 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceLevel::High => write!(f, "High"),
            ConfidenceLevel::Medium => write!(f, "Medium"),
            ConfidenceLevel::Low => write!(f, "Low"),
        }
    }
}

/// Output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    #[default]
    Mp4,
    Avi,
    Mov,
    Mkv,
}

impl ContainerFormat {
    /// File extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Avi => "avi",
            ContainerFormat::Mov => "mov",
            ContainerFormat::Mkv => "mkv",
        }
    }

    /// Get all available formats.
    pub fn all() -> &'static [ContainerFormat] {
        &[
            ContainerFormat::Mp4,
            ContainerFormat::Avi,
            ContainerFormat::Mov,
            ContainerFormat::Mkv,
        ]
    }

    /// Parse from an extension or name, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        Self::all().iter().copied().find(|f| f.extension() == ext)
    }
}

impl std::fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for ContainerFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| format!("unsupported output format '{}'", s))
    }
}

/// What to do when a negative offset trims more samples than the buffer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverTrimPolicy {
    /// Produce an empty buffer.
    #[default]
    Empty,
    /// Fail the operation.
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_levels_bucket() {
        assert_eq!(ConfidenceLevel::from_confidence(0.95), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_confidence(0.7), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_confidence(0.41), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_confidence(0.4), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_confidence(0.0), ConfidenceLevel::Low);
    }

    #[test]
    fn container_format_parses_extensions() {
        assert_eq!(ContainerFormat::from_extension("MKV"), Some(ContainerFormat::Mkv));
        assert_eq!(ContainerFormat::from_extension(".mov"), Some(ContainerFormat::Mov));
        assert_eq!(ContainerFormat::from_extension("webm"), None);
        assert_eq!("avi".parse::<ContainerFormat>().unwrap(), ContainerFormat::Avi);
    }

    #[test]
    fn overtrim_policy_serializes_lowercase() {
        let json = serde_json::to_string(&OverTrimPolicy::Error).unwrap();
        assert_eq!(json, "\"error\"");
    }

    #[test]
    fn method_tag_displays_identifier() {
        assert_eq!(CorrelationMethodTag::CrossCorrelation.to_string(), "cross_correlation");
    }
}
