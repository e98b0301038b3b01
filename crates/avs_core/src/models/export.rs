//! Export settings: encode profile, output resolution, and audio mix policy.

use serde::{Deserialize, Serialize};

use super::enums::ContainerFormat;

/// x264-style encoder presets, fastest first.
pub const PRESETS: &[&str] = &[
    "ultrafast",
    "superfast",
    "veryfast",
    "faster",
    "fast",
    "medium",
    "slow",
    "slower",
    "veryslow",
];

/// Error parsing a resolution string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid resolution '{0}': expected \"original\" or WIDTHxHEIGHT")]
pub struct ResolutionParseError(pub String);

/// Output frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Resolution {
    /// Keep the source frame size.
    #[default]
    Original,
    /// Scale to an explicit size.
    Scaled { width: u32, height: u32 },
}

impl Resolution {
    /// Whether the source size is kept.
    pub fn is_original(&self) -> bool {
        matches!(self, Resolution::Original)
    }

    /// The `scale=WxH` filter expression, if scaling is requested.
    pub fn scale_filter(&self) -> Option<String> {
        match self {
            Resolution::Original => None,
            Resolution::Scaled { width, height } => Some(format!("scale={}x{}", width, height)),
        }
    }
}

impl std::str::FromStr for Resolution {
    type Err = ResolutionParseError;

    /// Accepts `original`, `1280x720`, or a labelled form like `1920x1080 (1080p)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.split_whitespace().next().unwrap_or("");
        if token.eq_ignore_ascii_case("original") {
            return Ok(Resolution::Original);
        }

        let (w, h) = token
            .split_once(['x', 'X'])
            .ok_or_else(|| ResolutionParseError(s.to_string()))?;
        let width: u32 = w.parse().map_err(|_| ResolutionParseError(s.to_string()))?;
        let height: u32 = h.parse().map_err(|_| ResolutionParseError(s.to_string()))?;

        if width == 0 || height == 0 {
            return Err(ResolutionParseError(s.to_string()));
        }

        Ok(Resolution::Scaled { width, height })
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Original => write!(f, "original"),
            Resolution::Scaled { width, height } => write!(f, "{}x{}", width, height),
        }
    }
}

impl TryFrom<String> for Resolution {
    type Error = ResolutionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.to_string()
    }
}

/// Encode settings for the exported file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportProfile {
    /// Output container.
    #[serde(default)]
    pub format: ContainerFormat,

    /// Video encoder name (e.g. `libx264`).
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    /// Audio encoder name (e.g. `aac`).
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Output frame size.
    #[serde(default)]
    pub resolution: Resolution,

    /// Target video bitrate (e.g. `8M`).
    #[serde(default = "default_video_bitrate")]
    pub video_bitrate: String,

    /// Target audio bitrate (e.g. `192k`).
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Encoder speed preset.
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant rate factor, 0-51 (lower = higher quality).
    #[serde(default = "default_crf")]
    pub crf: u8,
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_video_bitrate() -> String {
    "8M".to_string()
}

fn default_audio_bitrate() -> String {
    "192k".to_string()
}

fn default_preset() -> String {
    "medium".to_string()
}

fn default_crf() -> u8 {
    23
}

impl Default for ExportProfile {
    fn default() -> Self {
        Self {
            format: ContainerFormat::default(),
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            resolution: Resolution::default(),
            video_bitrate: default_video_bitrate(),
            audio_bitrate: default_audio_bitrate(),
            preset: default_preset(),
            crf: default_crf(),
        }
    }
}

/// How the aligned audio is combined with the video's own audio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MixPolicy {
    /// Drop the original audio; keep only the aligned track.
    Replace,
    /// Sum the original audio (attenuated) with the aligned track.
    MixWithOriginal { original_gain: f64, new_gain: f64 },
}

impl MixPolicy {
    /// Mix policy with the standard gains (original 0.3, new 1.0).
    pub fn mix_default() -> Self {
        MixPolicy::MixWithOriginal {
            original_gain: 0.3,
            new_gain: 1.0,
        }
    }

    /// Whether the original audio is kept in the mix.
    pub fn is_mix(&self) -> bool {
        matches!(self, MixPolicy::MixWithOriginal { .. })
    }
}

impl Default for MixPolicy {
    fn default() -> Self {
        MixPolicy::Replace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_parses_forms() {
        assert_eq!("original".parse::<Resolution>().unwrap(), Resolution::Original);
        assert_eq!("Original".parse::<Resolution>().unwrap(), Resolution::Original);
        assert_eq!(
            "1280x720".parse::<Resolution>().unwrap(),
            Resolution::Scaled {
                width: 1280,
                height: 720
            }
        );
        assert_eq!(
            "1920x1080 (1080p)".parse::<Resolution>().unwrap(),
            Resolution::Scaled {
                width: 1920,
                height: 1080
            }
        );
    }

    #[test]
    fn resolution_rejects_malformed() {
        assert!("".parse::<Resolution>().is_err());
        assert!("720p".parse::<Resolution>().is_err());
        assert!("0x720".parse::<Resolution>().is_err());
        assert!("1280x".parse::<Resolution>().is_err());
    }

    #[test]
    fn resolution_scale_filter() {
        assert_eq!(Resolution::Original.scale_filter(), None);
        let scaled: Resolution = "854x480".parse().unwrap();
        assert_eq!(scaled.scale_filter().as_deref(), Some("scale=854x480"));
    }

    #[test]
    fn profile_defaults_match_standard_export() {
        let profile = ExportProfile::default();
        assert_eq!(profile.format, ContainerFormat::Mp4);
        assert_eq!(profile.video_codec, "libx264");
        assert_eq!(profile.audio_codec, "aac");
        assert!(profile.resolution.is_original());
        assert_eq!(profile.video_bitrate, "8M");
        assert_eq!(profile.audio_bitrate, "192k");
        assert_eq!(profile.preset, "medium");
        assert_eq!(profile.crf, 23);
    }

    #[test]
    fn profile_deserializes_partial_toml() {
        let profile: ExportProfile =
            toml::from_str("resolution = \"1280x720\"\ncrf = 18\n").unwrap();
        assert_eq!(profile.crf, 18);
        assert_eq!(profile.resolution.to_string(), "1280x720");
        assert_eq!(profile.preset, "medium");
    }

    #[test]
    fn mix_default_gains() {
        match MixPolicy::mix_default() {
            MixPolicy::MixWithOriginal {
                original_gain,
                new_gain,
            } => {
                assert_eq!(original_gain, 0.3);
                assert_eq!(new_gain, 1.0);
            }
            MixPolicy::Replace => panic!("expected mix policy"),
        }
        assert!(!MixPolicy::default().is_mix());
    }
}
