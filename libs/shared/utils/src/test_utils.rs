use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use shared_config::AppConfig;

use crate::clock::FixedClock;

/// Build a minute-precision local timestamp. Panics on an impossible date,
/// which is what a fixture should do.
pub fn datetime(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .unwrap_or_else(|| panic!("invalid fixture datetime {year}-{month}-{day} {hour}:{minute}"))
}

pub fn fixed_clock(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Arc<FixedClock> {
    Arc::new(FixedClock::new(datetime(year, month, day, hour, minute)))
}

pub struct TestConfig;

impl TestConfig {
    pub fn with_data_dir(data_dir: &Path) -> AppConfig {
        AppConfig {
            data_dir: data_dir.to_path_buf(),
            bind_address: "127.0.0.1:0".to_string(),
            auto_assign_doctor_room: true,
            seed_sample_data: false,
        }
    }
}
