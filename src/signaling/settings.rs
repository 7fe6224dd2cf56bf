use std::path::PathBuf;

use crate::config::{Config, ConfigError};
use crate::signaling::room_directory::{AllowAllRooms, InMemoryRoomDirectory, RoomDirectory};
use crate::signaling::session_registry::DEFAULT_MAX_SESSIONS;

const SECTION: &str = "Signaling";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSettings {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// The `[Signaling]` section, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalingSettings {
    pub bind_addr: String,
    pub max_sessions: usize,
    /// Empty means every non-blank room id is accepted.
    pub allowed_rooms: Vec<String>,
    pub tls: Option<TlsSettings>,
}

impl Default for SignalingSettings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_owned(),
            max_sessions: DEFAULT_MAX_SESSIONS,
            allowed_rooms: Vec::new(),
            tls: None,
        }
    }
}

impl SignalingSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_addr = config
            .get_non_empty_or_default(SECTION, "bind_addr", &defaults.bind_addr)
            .to_owned();
        let max_sessions = config
            .get_parsed::<usize>(SECTION, "max_sessions")?
            .unwrap_or(defaults.max_sessions);
        if max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                section: SECTION.to_owned(),
                key: "max_sessions".to_owned(),
                value: "0".to_owned(),
            });
        }

        let tls = if config.get_bool(SECTION, "tls")?.unwrap_or(false) {
            let path = |key: &str| {
                config
                    .get_non_empty(SECTION, key)
                    .map(PathBuf::from)
                    .ok_or_else(|| ConfigError::InvalidValue {
                        section: SECTION.to_owned(),
                        key: key.to_owned(),
                        value: String::new(),
                    })
            };
            Some(TlsSettings {
                cert_path: path("cert_path")?,
                key_path: path("key_path")?,
            })
        } else {
            None
        };

        Ok(Self {
            bind_addr,
            max_sessions,
            allowed_rooms: config.get_list(SECTION, "allowed_rooms"),
            tls,
        })
    }

    pub fn room_directory(&self) -> Box<dyn RoomDirectory> {
        if self.allowed_rooms.is_empty() {
            Box::new(AllowAllRooms)
        } else {
            Box::new(self.allowed_rooms.iter().cloned().collect::<InMemoryRoomDirectory>())
        }
    }
}
