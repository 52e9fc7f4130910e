//! Output image format for extracted frames.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Image format the decoder writes each sampled frame as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    /// JPEG frames (`.jpg`)
    #[default]
    Jpg,
    /// PNG frames (`.png`)
    Png,
}

impl FrameFormat {
    pub const ALL: &'static [FrameFormat] = &[FrameFormat::Jpg, FrameFormat::Png];

    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            FrameFormat::Jpg => "jpg",
            FrameFormat::Png => "png",
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.extension()
    }
}

impl fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FrameFormat {
    type Err = FrameFormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jpg" => Ok(FrameFormat::Jpg),
            "png" => Ok(FrameFormat::Png),
            _ => Err(FrameFormatParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unsupported frame format: {0} (expected jpg or png)")]
pub struct FrameFormatParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("JPG".parse::<FrameFormat>().unwrap(), FrameFormat::Jpg);
        assert_eq!(" png ".parse::<FrameFormat>().unwrap(), FrameFormat::Png);
    }

    #[test]
    fn test_parse_rejects_other_formats() {
        let err = "gif".parse::<FrameFormat>().unwrap_err();
        assert!(err.to_string().contains("gif"));
        assert!("jpeg".parse::<FrameFormat>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&FrameFormat::Png).unwrap(), "\"png\"");
        let parsed: FrameFormat = serde_json::from_str("\"jpg\"").unwrap();
        assert_eq!(parsed, FrameFormat::Jpg);
    }

    #[test]
    fn test_default_is_jpg() {
        assert_eq!(FrameFormat::default(), FrameFormat::Jpg);
        assert_eq!(FrameFormat::default().extension(), "jpg");
    }
}
