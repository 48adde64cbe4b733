//! Competitive formats understood by the remote service.

use std::fmt;
use std::str::FromStr;

use super::errors::ConfigError;

/// Target format used for legality checks and deck searches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Format {
    Brawl,
    #[default]
    Commander,
    Legacy,
    Modern,
    Oathbreaker,
    Pauper,
    Pioneer,
    Standard,
}

impl Format {
    pub const ALL: [Format; 8] = [
        Format::Brawl,
        Format::Commander,
        Format::Legacy,
        Format::Modern,
        Format::Oathbreaker,
        Format::Pauper,
        Format::Pioneer,
        Format::Standard,
    ];

    /// Identifier used in query strings and legality maps.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brawl => "brawl",
            Self::Commander => "commander",
            Self::Legacy => "legacy",
            Self::Modern => "modern",
            Self::Oathbreaker => "oathbreaker",
            Self::Pauper => "pauper",
            Self::Pioneer => "pioneer",
            Self::Standard => "standard",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigError::UnknownFormat(s.to_string()))
    }
}
