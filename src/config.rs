use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use tracing::warn;

use crate::game::constants::timing::{BROADCAST_RATE, SIMULATION_RATE};
use crate::game::game_loop::GameLoopConfig;
use crate::game::state::Difficulty;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_address: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Maximum number of concurrent game rooms
    pub max_rooms: usize,
    /// Prometheus endpoint port
    pub metrics_port: u16,
    /// Path to TLS certificate file (falls back to certs/)
    pub tls_cert_path: Option<String>,
    /// Path to TLS key file (falls back to certs/)
    pub tls_key_path: Option<String>,
    /// Scales predator speeds
    pub difficulty: Difficulty,
    /// Sharks and escalation on or off
    pub predators_enabled: bool,
    pub simulation_rate: u32,
    pub broadcast_rate: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 3000,
            max_rooms: 100,
            metrics_port: 9090,
            tls_cert_path: None,
            tls_key_path: None,
            difficulty: Difficulty::Medium,
            predators_enabled: true,
            simulation_rate: SIMULATION_RATE,
            broadcast_rate: BROADCAST_RATE,
        }
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Invalid values are logged and
    /// replaced by defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("BIND_ADDRESS") {
            parse_into(&mut config.bind_address, "BIND_ADDRESS", &addr);
        }

        if let Some(port) = lookup("PORT") {
            match port.trim().parse::<u16>() {
                Ok(parsed) if parsed > 0 => config.port = parsed,
                Ok(_) => warn!("PORT must be > 0, using default"),
                Err(_) => warn!("Invalid PORT '{}', using default", port),
            }
        }

        if let Some(max_rooms) = lookup("MAX_ROOMS") {
            match max_rooms.trim().parse::<usize>() {
                Ok(parsed) if parsed > 0 && parsed <= 10000 => config.max_rooms = parsed,
                Ok(_) => warn!("MAX_ROOMS must be 1-10000, using default"),
                Err(_) => warn!("Invalid MAX_ROOMS '{}', using default", max_rooms),
            }
        }

        if let Some(port) = lookup("METRICS_PORT") {
            parse_into(&mut config.metrics_port, "METRICS_PORT", &port);
        }

        if let Some(difficulty) = lookup("DIFFICULTY") {
            match Difficulty::parse(&difficulty) {
                Some(parsed) => config.difficulty = parsed,
                None => warn!("Invalid DIFFICULTY '{}', using default", difficulty),
            }
        }

        if let Some(enabled) = lookup("PREDATORS_ENABLED") {
            match parse_bool(&enabled) {
                Some(parsed) => config.predators_enabled = parsed,
                None => warn!("Invalid PREDATORS_ENABLED '{}', using default", enabled),
            }
        }

        if let Some(rate) = lookup("SIMULATION_RATE") {
            parse_into(&mut config.simulation_rate, "SIMULATION_RATE", &rate);
        }
        if let Some(rate) = lookup("BROADCAST_RATE") {
            parse_into(&mut config.broadcast_rate, "BROADCAST_RATE", &rate);
        }

        config.tls_cert_path = lookup("TLS_CERT_PATH");
        config.tls_key_path = lookup("TLS_KEY_PATH");

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.max_rooms == 0 {
            return Err(ConfigError::NoRooms);
        }
        if self.simulation_rate == 0 || self.broadcast_rate == 0 {
            return Err(ConfigError::ZeroRate);
        }
        if self.broadcast_rate > self.simulation_rate
            || self.simulation_rate % self.broadcast_rate != 0
        {
            return Err(ConfigError::IncompatibleRates {
                simulation: self.simulation_rate,
                broadcast: self.broadcast_rate,
            });
        }
        if self.tls_cert_path.is_some() != self.tls_key_path.is_some() {
            return Err(ConfigError::PartialTls);
        }
        Ok(())
    }

    /// Per-room simulation settings
    pub fn game_loop_config(&self) -> GameLoopConfig {
        GameLoopConfig {
            simulation_rate: self.simulation_rate,
            broadcast_rate: self.broadcast_rate,
            difficulty: self.difficulty,
            predators_enabled: self.predators_enabled,
            ..Default::default()
        }
    }
}

fn parse_into<T: FromStr>(slot: &mut T, key: &str, value: &str) {
    match value.trim().parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!("Invalid {} '{}', using default", key, value),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Port cannot be 0")]
    ZeroPort,
    #[error("max_rooms must be at least 1")]
    NoRooms,
    #[error("Simulation and broadcast rates must be non-zero")]
    ZeroRate,
    #[error("Broadcast rate {broadcast} must evenly divide simulation rate {simulation}")]
    IncompatibleRates { simulation: u32, broadcast: u32 },
    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    PartialTls,
}
