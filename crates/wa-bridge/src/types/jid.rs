//! Chat and user identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::BridgeError;

/// Server suffix of individual (phone number) identifiers.
pub const USER_SERVER: &str = "s.whatsapp.net";

/// Server suffix of group identifiers.
pub const GROUP_SERVER: &str = "g.us";

/// A WhatsApp identifier of the form `user[:device]@server`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Jid {
    /// Local part (phone number or group ID).
    pub user: String,
    /// Device number, when addressing a specific linked device.
    pub device: Option<u16>,
    /// Server part, e.g. `s.whatsapp.net` or `g.us`.
    pub server: String,
}

impl Jid {
    /// Create an identifier from its parts.
    pub fn new(user: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            device: None,
            server: server.into(),
        }
    }

    /// Identifier of an individual user.
    pub fn user(user: impl Into<String>) -> Self {
        Self::new(user, USER_SERVER)
    }

    /// Whether this identifies a group chat.
    pub fn is_group(&self) -> bool {
        self.server == GROUP_SERVER
    }

    /// The identifier without its device part.
    pub fn to_non_device(&self) -> Jid {
        Jid::new(self.user.clone(), self.server.clone())
    }
}

impl FromStr for Jid {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(BridgeError::InvalidJid(s.to_string()));
        }

        // Server-only identifiers (e.g. "status@broadcast" without a user) have no '@'
        let Some((local, server)) = s.split_once('@') else {
            return Ok(Jid::new("", s));
        };
        if server.is_empty() || server.contains('@') {
            return Err(BridgeError::InvalidJid(s.to_string()));
        }

        let (user, device) = match local.split_once(':') {
            Some((user, device)) => {
                let device = device
                    .parse::<u16>()
                    .map_err(|_| BridgeError::InvalidJid(s.to_string()))?;
                (user, Some(device))
            }
            None => (local, None),
        };

        Ok(Jid {
            user: user.to_string(),
            device,
            server: server.to_string(),
        })
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.user.is_empty() {
            return f.write_str(&self.server);
        }
        match self.device {
            Some(device) => write!(f, "{}:{}@{}", self.user, device, self.server),
            None => write!(f, "{}@{}", self.user, self.server),
        }
    }
}

impl Serialize for Jid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Jid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
