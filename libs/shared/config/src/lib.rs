use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_DEMO_PATIENT_ID: &str = "patient123";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_LIVE_CHANNEL_CAPACITY: usize = 256;

/// Which document store backs the clinic collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    Supabase,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub demo_patient_id: String,
    pub instant_confirmation: bool,
    pub seed_doctors: bool,
    pub live_channel_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            store_backend: StoreBackend::Memory,
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            demo_patient_id: DEFAULT_DEMO_PATIENT_ID.to_string(),
            instant_confirmation: false,
            seed_doctors: true,
            live_channel_capacity: DEFAULT_LIVE_CHANNEL_CAPACITY,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Missing or
    /// malformed values fall back to defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = match lookup("HOST") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("HOST '{}' is not an IP address, using {}", raw, defaults.host);
                defaults.host
            }),
            None => defaults.host,
        };

        let port = match lookup("PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("PORT '{}' is not a valid port, using {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let supabase_url = lookup("SUPABASE_URL").unwrap_or_default();
        let supabase_anon_key = lookup("SUPABASE_ANON_PUBLIC_KEY").unwrap_or_default();

        let store_backend = match lookup("STORE_BACKEND").as_deref().map(str::trim) {
            None | Some("") | Some("memory") => StoreBackend::Memory,
            Some("supabase") => StoreBackend::Supabase,
            Some(other) => {
                warn!("Unknown STORE_BACKEND '{}', using in-memory store", other);
                StoreBackend::Memory
            }
        };

        let demo_patient_id = lookup("DEMO_PATIENT_ID")
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| {
                warn!("DEMO_PATIENT_ID not set, using {}", DEFAULT_DEMO_PATIENT_ID);
                DEFAULT_DEMO_PATIENT_ID.to_string()
            });

        let live_channel_capacity = match lookup("LIVE_CHANNEL_CAPACITY") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(capacity) if capacity > 0 => capacity,
                _ => {
                    warn!("LIVE_CHANNEL_CAPACITY '{}' is invalid, using {}", raw, DEFAULT_LIVE_CHANNEL_CAPACITY);
                    DEFAULT_LIVE_CHANNEL_CAPACITY
                }
            },
            None => DEFAULT_LIVE_CHANNEL_CAPACITY,
        };

        let mut config = Self {
            host,
            port,
            store_backend,
            supabase_url,
            supabase_anon_key,
            demo_patient_id,
            instant_confirmation: parse_flag(lookup("INSTANT_CONFIRMATION"), "INSTANT_CONFIRMATION", false),
            seed_doctors: parse_flag(lookup("SEED_DOCTORS"), "SEED_DOCTORS", true),
            live_channel_capacity,
        };

        if config.store_backend == StoreBackend::Supabase && !config.is_supabase_configured() {
            warn!("STORE_BACKEND=supabase but SUPABASE_URL/SUPABASE_ANON_PUBLIC_KEY are missing, using in-memory store");
            config.store_backend = StoreBackend::Memory;
        }

        config
    }

    pub fn is_supabase_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_flag(raw: Option<String>, name: &str, default: bool) -> bool {
    match raw.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => default,
        Some(value) => match value.as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                warn!("{} '{}' is not a boolean, using {}", name, value, default);
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = config_from(&[]);

        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.demo_patient_id, "patient123");
        assert_eq!(config.bind_addr().port(), 3000);
        assert!(config.seed_doctors);
        assert!(!config.instant_confirmation);
    }

    #[test]
    fn test_supabase_backend_requires_credentials() {
        let config = config_from(&[("STORE_BACKEND", "supabase")]);
        assert_eq!(config.store_backend, StoreBackend::Memory);

        let config = config_from(&[
            ("STORE_BACKEND", "supabase"),
            ("SUPABASE_URL", "http://localhost:54321"),
            ("SUPABASE_ANON_PUBLIC_KEY", "anon"),
        ]);
        assert_eq!(config.store_backend, StoreBackend::Supabase);
    }

    #[test]
    fn test_flags_and_bad_values() {
        let config = config_from(&[
            ("INSTANT_CONFIRMATION", "yes"),
            ("SEED_DOCTORS", "off"),
            ("PORT", "not-a-port"),
            ("LIVE_CHANNEL_CAPACITY", "0"),
        ]);

        assert!(config.instant_confirmation);
        assert!(!config.seed_doctors);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.live_channel_capacity, DEFAULT_LIVE_CHANNEL_CAPACITY);
    }
}
