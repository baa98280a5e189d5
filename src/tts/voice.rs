//! The fixed set of voices the synthesis service offers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a voice name is not one of [`Voice::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown voice '{0}' (expected one of: alloy, echo, fable, onyx, nova, shimmer)")]
pub struct UnknownVoice(pub String);

/// Speaker voice sent as the `voice` field of every synthesis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    #[default]
    Alloy,
    Echo,
    Fable,
    Onyx,
    Nova,
    Shimmer,
}

impl Voice {
    pub const ALL: [Voice; 6] = [
        Voice::Alloy,
        Voice::Echo,
        Voice::Fable,
        Voice::Onyx,
        Voice::Nova,
        Voice::Shimmer,
    ];

    /// Wire name of the voice.
    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Alloy => "alloy",
            Voice::Echo => "echo",
            Voice::Fable => "fable",
            Voice::Onyx => "onyx",
            Voice::Nova => "nova",
            Voice::Shimmer => "shimmer",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Voice {
    type Err = UnknownVoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Voice::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownVoice(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_alloy() {
        assert_eq!(Voice::default(), Voice::Alloy);
    }

    #[test]
    fn parses_every_wire_name() {
        for voice in Voice::ALL {
            assert_eq!(voice.as_str().parse::<Voice>(), Ok(voice));
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Shimmer".parse::<Voice>(), Ok(Voice::Shimmer));
        assert_eq!(" NOVA ".parse::<Voice>(), Ok(Voice::Nova));
    }

    #[test]
    fn rejects_unknown_name() {
        let err = "brian".parse::<Voice>().unwrap_err();
        assert_eq!(err, UnknownVoice("brian".into()));
        assert!(err.to_string().contains("alloy"));
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Voice::Fable).unwrap();
        assert_eq!(json, "\"fable\"");
        let back: Voice = serde_json::from_str("\"echo\"").unwrap();
        assert_eq!(back, Voice::Echo);
    }
}
