use std::env;
use std::path::PathBuf;

use serde::Serialize;
use tracing::warn;

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
const APPOINTMENTS_FILE: &str = "appointments.csv";

#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub bind_address: String,
    /// Give a doctor without an assigned room the room of their first successful booking.
    pub auto_assign_doctor_room: bool,
    pub seed_sample_data: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            auto_assign_doctor_room: true,
            seed_sample_data: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            data_dir: env::var("CLINIC_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    warn!("CLINIC_DATA_DIR not set, using {}", DEFAULT_DATA_DIR);
                    defaults.data_dir.clone()
                }),
            bind_address: env::var("CLINIC_BIND_ADDRESS")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_BIND_ADDRESS not set, using {}", DEFAULT_BIND_ADDRESS);
                    defaults.bind_address.clone()
                }),
            auto_assign_doctor_room: bool_from_env(
                "CLINIC_AUTO_ASSIGN_ROOM",
                defaults.auto_assign_doctor_room,
            ),
            seed_sample_data: bool_from_env(
                "CLINIC_SEED_SAMPLE_DATA",
                defaults.seed_sample_data,
            ),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - data directory or bind address is empty");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.data_dir.as_os_str().is_empty() && !self.bind_address.is_empty()
    }

    pub fn appointments_file(&self) -> PathBuf {
        self.data_dir.join(APPOINTMENTS_FILE)
    }

    pub fn directory_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }
}

fn bool_from_env(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => parse_bool(&raw).unwrap_or_else(|| {
            warn!("{} has invalid value '{}', using {}", key, raw, default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using {}", key, default);
            default
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
