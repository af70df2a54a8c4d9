//! Rig configuration, loaded from an optional JSON file.
//!
//! Every field has a default matching the bench setup, so a file only needs
//! to list what differs.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Each motor uses two PWM channels.
pub const MAX_MOTORS: usize = pca9685::registers::CHANNEL_COUNT / 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    pub pca_address: u8,
    pub tof_address: u8,
    pub pwm_frequency_hz: u16,
    /// Poll budget for calibration and continuous ranging.
    pub io_timeout_ms: u32,
    /// Poll budget for a bare single-shot measurement.
    pub measure_timeout_ms: u32,
    pub timing_budget_us: u32,
    pub grid: GridConfig,
    pub motion: MotionConfig,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            pca_address: pca9685::DEFAULT_ADDRESS,
            tof_address: vl53l0x::DEFAULT_ADDRESS,
            pwm_frequency_hz: pca9685::registers::DEFAULT_FREQUENCY_HZ,
            io_timeout_ms: vl53l0x::DEFAULT_IO_TIMEOUT_MS,
            measure_timeout_ms: vl53l0x::DEFAULT_MEASURE_TIMEOUT_MS,
            timing_budget_us: 33_000,
            grid: GridConfig::default(),
            motion: MotionConfig::default(),
        }
    }
}

/// Motors laid out over the depth image, row-major.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub cols: usize,
    pub rows: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { cols: 1, rows: 1 }
    }
}

impl GridConfig {
    pub fn motors(&self) -> usize {
        self.cols * self.rows
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Actuator speed while driven.
    pub speed_mm_s: f32,
    /// Full actuator travel.
    pub travel_mm: f32,
    /// Position error tolerated before driving.
    pub dead_band_mm: f32,
    /// Control period.
    pub tick_ms: u32,
    /// Depth that maps to full extension.
    pub near_mm: f32,
    /// Depth that maps to full retraction.
    pub far_mm: f32,
    /// Side of the square sampled around each zone centre, in pixels.
    pub window_px: usize,
    /// A zone needs more valid samples than this to update its target.
    pub min_samples: usize,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            speed_mm_s: 8.0,
            travel_mm: 100.0,
            dead_band_mm: 1.5,
            tick_ms: 20,
            near_mm: 600.0,
            far_mm: 1200.0,
            window_px: 30,
            min_samples: 20,
        }
    }
}

impl MotionConfig {
    /// Distance covered in one control period.
    pub fn step_mm(&self) -> f32 {
        self.speed_mm_s * self.tick_ms as f32 / 1000.0
    }
}

impl RigConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, address) in
            [("pca_address", self.pca_address), ("tof_address", self.tof_address)]
        {
            if address > 0x7F {
                return Err(Error::InvalidConfig(format!(
                    "{name} {address:#04x} is not a 7-bit address"
                )));
            }
        }
        if self.pca_address == self.tof_address {
            return Err(Error::InvalidConfig(
                "PCA9685 and VL53L0X share an address".to_string(),
            ));
        }

        let motors = self.grid.motors();
        if motors == 0 || motors > MAX_MOTORS {
            return Err(Error::InvalidConfig(format!(
                "grid of {motors} motors, expected 1..={MAX_MOTORS}"
            )));
        }

        let motion = &self.motion;
        if motion.tick_ms == 0 {
            return Err(Error::InvalidConfig("tick_ms must be positive".into()));
        }
        if motion.near_mm >= motion.far_mm {
            return Err(Error::InvalidConfig(format!(
                "near_mm {} must be below far_mm {}",
                motion.near_mm, motion.far_mm
            )));
        }
        if motion.travel_mm <= 0.0 || motion.speed_mm_s <= 0.0 {
            return Err(Error::InvalidConfig(
                "travel_mm and speed_mm_s must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = RigConfig::from_json("{}").unwrap();
        assert_eq!(config, RigConfig::default());
        assert_eq!(config.pca_address, 0x40);
        assert_eq!(config.tof_address, 0x29);
        assert_eq!(config.motion.step_mm(), 0.16);
    }

    #[test]
    fn partial_file_overrides_only_listed_fields() {
        let config = RigConfig::from_json(
            r#"{ "pca_address": 65, "grid": { "cols": 2, "rows": 2 },
                 "motion": { "speed_mm_s": 10.0 } }"#,
        )
        .unwrap();

        assert_eq!(config.pca_address, 0x41);
        assert_eq!(config.grid.motors(), 4);
        assert_eq!(config.motion.speed_mm_s, 10.0);
        assert_eq!(config.motion.travel_mm, 100.0);
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let err = RigConfig::from_json(r#"{ "grid": { "cols": 3, "rows": 3 } }"#)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn shared_address_is_rejected() {
        let config = RigConfig { tof_address: 0x40, ..RigConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_serde_error() {
        let err = RigConfig::from_json("{ pca_address: }").unwrap_err();
        assert!(matches!(err, Error::SerdeJson(_)));
    }
}
