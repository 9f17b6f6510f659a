// Copyright (C) 2023, Alex Badics
// This file is part of isense-console
// Licensed under the MIT license. See LICENSE file in the project root for details.

//! Per-station configuration and tracking data.
//!
//! Station settings are always changed with a read-modify-write sequence: get the
//! whole [`StationConfig`] from the tracker, change one field with one of the
//! `cycle_*`/`toggle_*` methods, and send the whole record back.

use nalgebra::{Quaternion, Vector3};

/// Highest enhancement level
pub const MAX_ENHANCEMENT: u8 = 2;
/// Highest compass mode
pub const MAX_COMPASS: u8 = 2;
/// Highest sensitivity level. The lowest is 1.
pub const MAX_SENSITIVITY: u8 = 4;
/// Prediction is set in steps of this many milliseconds
pub const PREDICTION_STEP_MS: u16 = 10;
/// Highest prediction interval in milliseconds
pub const MAX_PREDICTION_MS: u16 = 50;

/// How the orientation of a station is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngleFormat {
    /// Yaw, pitch, roll in degrees
    #[default]
    Euler,
    /// Unit quaternion
    Quaternion,
}

/// Configuration of a single station, got from [`crate::Tracker::station_config`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationConfig {
    /// The station is enabled
    pub enabled: bool,
    /// Index of the InertiaCube assigned to the station, if any
    pub inertia_cube: Option<i32>,
    /// Perceptual enhancement level, 0-2
    pub enhancement: u8,
    /// Compass mode. 0 is off, 1 is partial, 2 is full.
    pub compass: u8,
    /// Sensitivity level of the enhancement filter, 1-4
    pub sensitivity: u8,
    /// Motion prediction in milliseconds, 0-50 in steps of 10
    pub prediction: u16,
    /// Format of the reported orientation
    pub angle_format: AngleFormat,
    /// Records carry a timestamp
    pub timestamped: bool,
    /// Read button and analog states
    pub get_inputs: bool,
    /// Read auxiliary inputs
    pub get_aux_inputs: bool,
}

impl StationConfig {
    /// 0 → 1 → 2 → 0
    pub fn cycle_enhancement(&mut self) {
        self.enhancement = (self.enhancement + 1) % (MAX_ENHANCEMENT + 1);
    }

    /// 0 → 1 → 2 → 0
    pub fn cycle_compass(&mut self) {
        self.compass = (self.compass + 1) % (MAX_COMPASS + 1);
    }

    /// 1 → 2 → 3 → 4 → 1. Zero is not a valid sensitivity, so it is skipped.
    pub fn cycle_sensitivity(&mut self) {
        self.sensitivity = (self.sensitivity + 1) % (MAX_SENSITIVITY + 1);
        if self.sensitivity == 0 {
            self.sensitivity = 1;
        }
    }

    /// 0 → 10 → ... → 50 → 0
    pub fn cycle_prediction(&mut self) {
        self.prediction =
            (self.prediction + PREDICTION_STEP_MS) % (MAX_PREDICTION_MS + PREDICTION_STEP_MS);
    }

    /// Turn timestamping on or off
    pub fn toggle_timestamped(&mut self) {
        self.timestamped = !self.timestamped;
    }
}

/// Capabilities of a single station
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationCapability {
    /// Tracks position
    pub position: bool,
    /// Tracks orientation
    pub orientation: bool,
    /// Number of buttons
    pub buttons: u16,
    /// Number of analog channels
    pub channels: u16,
    /// Number of auxiliary inputs
    pub aux_inputs: u16,
    /// Number of auxiliary outputs
    pub aux_outputs: u16,
    /// Has a compass
    pub compass: bool,
}

/// Hardware description of a station, got from [`crate::Tracker::station_hardware_info`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationHardwareInfo {
    /// The driver could identify the station hardware
    pub valid: bool,
    /// Station ID
    pub id: u32,
    /// Serial number of the sensor
    pub serial: u32,
    /// Firmware revision of the sensor
    pub firmware_revision: f32,
    /// Calibration date, as reported by the sensor
    pub calibration_date: String,
    /// Station capabilities
    pub capability: StationCapability,
}

/// Orientation of a station, in the format the station is configured for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Orientation {
    /// Yaw, pitch, roll in degrees
    Euler(Vector3<f32>),
    /// Orientation quaternion
    Quaternion(Quaternion<f32>),
}

impl Default for Orientation {
    fn default() -> Self {
        Orientation::Euler(Vector3::zeros())
    }
}

/// Number of buttons reported per station
pub const BUTTON_COUNT: usize = 8;
/// Number of analog channels reported per station
pub const ANALOG_COUNT: usize = 10;
/// Number of auxiliary inputs reported per station
pub const AUX_INPUT_COUNT: usize = 4;

/// One snapshot of a single station, got from [`crate::Tracker::tracking_data`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StationData {
    /// Tracking quality, 0-255
    pub tracking_status: u8,
    /// The record was updated since the last call
    pub new_data: bool,
    /// Position in meters. Only meaningful on trackers with position tracking.
    pub position: Vector3<f32>,
    /// Orientation
    pub orientation: Orientation,
    /// Timestamp in seconds
    pub timestamp: f32,
    /// Button states
    pub buttons: [bool; BUTTON_COUNT],
    /// Analog channel values
    pub analog: [i16; ANALOG_COUNT],
    /// Auxiliary input values
    pub aux_inputs: [u8; AUX_INPUT_COUNT],
}

impl StationData {
    /// Tracking quality in percent
    pub fn tracking_quality(&self) -> u8 {
        (self.tracking_status as f32 / 2.55) as u8
    }
}
