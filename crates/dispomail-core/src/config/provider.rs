//! Remote blocklist providers
//!
//! Maps the numeric `api_provider` setting onto a fixed set of upstream lists.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Known disposable-domain list providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// ivolo/disposable-email-domains
    Ivolo,
    /// RevertIT/disposable-email-domains (fork, updated more frequently)
    RevertIt,
}

impl Provider {
    /// All providers, in setting-id order
    pub const ALL: [Provider; 2] = [Provider::Ivolo, Provider::RevertIt];

    /// Resolve a numeric setting id (1 or 2)
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Provider::Ivolo),
            2 => Some(Provider::RevertIt),
            _ => None,
        }
    }

    /// Numeric setting id
    pub fn id(self) -> u8 {
        match self {
            Provider::Ivolo => 1,
            Provider::RevertIt => 2,
        }
    }

    /// URL of the JSON array served by this provider
    pub fn url(self) -> &'static str {
        match self {
            Provider::Ivolo => {
                "https://raw.githubusercontent.com/ivolo/disposable-email-domains/master/index.json"
            }
            Provider::RevertIt => {
                "https://raw.githubusercontent.com/RevertIT/disposable-email-domains/master/index.json"
            }
        }
    }

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            Provider::Ivolo => "Ivolo - Disposable email domains",
            Provider::RevertIt => "RevertIT - Disposable email domains (Frequent update)",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id(), self.label())
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "1" | "ivolo" => Ok(Provider::Ivolo),
            "2" | "revertit" | "revert" | "default" => Ok(Provider::RevertIt),
            other => Err(Error::config_value(
                "refresh.provider",
                format!("Unknown provider: {other}. Must be 1 (ivolo) or 2 (revertit)"),
            )),
        }
    }
}
