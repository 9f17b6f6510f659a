// Copyright (C) 2023, Alex Badics
// This file is part of isense-console
// Licensed under the MIT license. See LICENSE file in the project root for details.
#![warn(missing_docs)]
//! isense-console is an operator console for InterSense motion trackers.
//! It opens a tracker through the vendor driver, polls tracking data in a loop,
//! and lets the operator change station settings with single key presses.
//!
//! All the actual tracking (sensor fusion, prediction, hardware I/O) happens inside
//! the vendor driver. This crate only talks to it through the [`Tracker`] trait.
//!
//! Example usage:
//! ```ignore
//! let mut tracker = open_tracker(&OpenOptions::default()).unwrap();
//! let config = tracker.tracker_config().unwrap();
//! println!("Got tracker: {}", config.model.name());
//! loop {
//!     let frames = tracker.tracking_data().unwrap();
//!     println!("{:?}", frames[0].orientation);
//! }
//! ```

use std::path::PathBuf;

pub mod command;
pub mod console;
pub mod display;
#[cfg(feature = "isense")]
pub mod isense;
pub mod keyboard;
pub mod station;
#[cfg(test)]
mod testing;
#[cfg(feature = "isense")]
mod util;

pub use station::{
    AngleFormat, Orientation, StationCapability, StationConfig, StationData,
    StationHardwareInfo,
};

/// Maximum number of stations a single tracker unit can report
pub const MAX_STATIONS: u16 = 8;

/// Possible errors resulting from `isense-console` API calls
#[derive(Debug)]
pub enum Error {
    /// The driver library could not be loaded, or a symbol was missing from it.
    #[cfg(feature = "isense")]
    Library(libloading::Error),
    /// Terminal or other I/O error
    Io(std::io::Error),
    /// No tracker was found.
    NotFound,
    /// A driver call reported failure. The parameter is the name of the call.
    Call(&'static str),
    /// Other error, usually a parameter out of the device's range.
    Other(&'static str),
}

/// Result type used by the whole crate
pub type Result<T> = std::result::Result<T, Error>;

/// Common interface for an open tracker session.
///
/// Station numbers are 1-based, like on the device's own configuration screens.
/// The session is closed when the value is dropped.
pub trait Tracker {
    /// Device-wide descriptors
    fn tracker_config(&mut self) -> Result<TrackerConfig>;

    /// Communication link statistics, refreshed by the driver continuously
    fn comm_stats(&mut self) -> Result<CommStats>;

    /// Hardware description of the whole system
    fn hardware_info(&mut self) -> Result<HardwareInfo>;

    /// Hardware description of a single station
    fn station_hardware_info(&mut self, station: u16) -> Result<StationHardwareInfo>;

    /// Read the current configuration of a station
    fn station_config(&mut self, station: u16) -> Result<StationConfig>;

    /// Write the whole configuration record of a station back to the device.
    /// Should only be called with a record obtained from [`Tracker::station_config`]
    fn set_station_config(&mut self, station: u16, config: &StationConfig) -> Result<()>;

    /// Latest tracking data for every station, index 0 is station 1.
    /// Has to be called at a reasonable rate (at least 100Hz), even if the
    /// data is not used, as the driver's timing depends on it.
    fn tracking_data(&mut self) -> Result<Vec<StationData>>;

    /// Reset the heading (yaw) of the station to zero
    fn reset_heading(&mut self, station: u16) -> Result<()>;

    /// Send raw bytes to the auxiliary output port of a station
    fn aux_output(&mut self, station: u16, data: &[u8]) -> Result<()>;

    /// Time since the driver was initialized, in seconds
    fn time(&mut self) -> f32;

    /// Name of the backend
    fn name(&self) -> &'static str;
}

/// Product family of the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerType {
    /// Not known, or no tracker
    #[default]
    Unknown,
    /// IS-x00 and InertiaCube trackers
    PrecisionSeries,
    /// InterTrax head trackers
    InterTraxSeries,
}

impl TrackerType {
    /// Human readable name of the product family
    pub fn name(self) -> &'static str {
        match self {
            TrackerType::Unknown => "Unknown",
            TrackerType::PrecisionSeries => "IS Precision Series",
            TrackerType::InterTraxSeries => "InterTrax Series",
        }
    }
}

/// Tracker model, as reported by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum TrackerModel {
    #[default]
    Unknown,
    Is300,
    Is600,
    Is900,
    InterTrax,
    InterTrax2,
    InterTraxLs,
    InterTraxLc,
    InertiaCube2,
    InertiaCube2Pro,
    InertiaCube2BPro,
    InertiaCube3,
    Is1200,
    /// A model code this crate does not know about
    Other(u32),
}

impl TrackerModel {
    /// Human readable name of the model
    pub fn name(self) -> &'static str {
        match self {
            TrackerModel::Is300 => "IS-300 Series",
            TrackerModel::Is600 => "IS-600 Series",
            TrackerModel::Is900 => "IS-900 Series",
            TrackerModel::InterTrax => "InterTrax 30",
            TrackerModel::InterTrax2 => "InterTrax2",
            TrackerModel::InterTraxLs => "InterTraxLS",
            TrackerModel::InterTraxLc => "InterTraxLC",
            TrackerModel::InertiaCube2
            | TrackerModel::InertiaCube2Pro
            | TrackerModel::InertiaCube2BPro => "InertiaCube2",
            TrackerModel::InertiaCube3 => "InertiaCube3",
            TrackerModel::Is1200 => "IS-1200 Series",
            TrackerModel::Unknown | TrackerModel::Other(_) => "Unknown",
        }
    }

    /// Whether the model tracks position in addition to orientation
    pub fn tracks_position(self) -> bool {
        matches!(
            self,
            TrackerModel::Is600 | TrackerModel::Is900 | TrackerModel::Is1200
        )
    }

    /// Number of station slots the model has. Used for the statistics table.
    pub fn station_slots(self) -> u16 {
        match self {
            TrackerModel::Is300 | TrackerModel::Is1200 => 4,
            TrackerModel::Is600 | TrackerModel::Is900 => MAX_STATIONS,
            _ => 1,
        }
    }
}

/// Device-wide descriptors, got from [`Tracker::tracker_config`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerConfig {
    /// Product family
    pub tracker_type: TrackerType,
    /// Product model
    pub model: TrackerModel,
    /// Port the tracker is connected to
    pub port: u32,
    /// Version of the driver library
    pub library_version: f32,
    /// Firmware revision of the tracker
    pub firmware_revision: f32,
}

/// Communication link statistics, got from [`Tracker::comm_stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CommStats {
    /// Link throughput in kilobits per second
    pub kbits_per_sec: f32,
    /// Tracking records received per second
    pub records_per_sec: u32,
}

/// What the tracker system is capable of
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capability {
    /// Tracks position
    pub position: bool,
    /// Tracks orientation
    pub orientation: bool,
    /// Supports motion prediction
    pub prediction: bool,
    /// Supports the enhancement (perceptual filter) setting
    pub enhancement: bool,
    /// Has a compass
    pub compass: bool,
    /// Maximum number of stations
    pub max_stations: u16,
    /// Maximum number of buttons per station
    pub max_buttons: u16,
    /// Maximum number of analog channels per station
    pub max_channels: u16,
}

/// System hardware description, got from [`Tracker::hardware_info`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HardwareInfo {
    /// The driver could identify the hardware. If false, the other fields are meaningless.
    pub valid: bool,
    /// Model name reported by the hardware itself
    pub model_name: String,
    /// Capabilities of the system
    pub capability: Capability,
}

impl HardwareInfo {
    /// Number of selectable stations. Four if the hardware could not be identified.
    pub fn max_stations(&self) -> u16 {
        if self.valid {
            self.capability.max_stations
        } else {
            4
        }
    }
}

/// Everything known about the tracker that does not change while it is open
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerInfo {
    /// Device-wide configuration
    pub config: TrackerConfig,
    /// Hardware description
    pub hardware: HardwareInfo,
}

impl TrackerInfo {
    /// Whether position is tracked, according to the hardware (or the model, if
    /// the hardware could not be identified)
    pub fn supports_position(&self) -> bool {
        if self.hardware.valid {
            self.hardware.capability.position
        } else {
            self.config.model.tracks_position()
        }
    }

    /// Model name to show to the user
    pub fn model_name(&self) -> &str {
        if self.hardware.valid {
            &self.hardware.model_name
        } else {
            self.config.model.name()
        }
    }
}

/// Parameters of [`open_tracker`]
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// Path of the driver library. If `None`, the platform default is searched.
    pub library: Option<PathBuf>,
    /// Port to open. 0 means the first tracker found.
    pub port: u32,
    /// Let the driver print its own diagnostic messages
    pub verbose: bool,
}

/// Open the first tracker found with the available backends.
pub fn open_tracker(options: &OpenOptions) -> Result<Box<dyn Tracker>> {
    #[cfg(feature = "isense")]
    return Ok(Box::new(isense::ISense::open(options)?));
    #[cfg(not(feature = "isense"))]
    {
        let _ = options;
        Err(Error::NotFound)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "isense")]
            Error::Library(e) => write!(f, "Driver library error: {e}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::NotFound => write!(f, "Failed to detect InterSense tracking device"),
            Error::Call(call) => write!(f, "{call} failed"),
            Error::Other(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(feature = "isense")]
impl From<libloading::Error> for Error {
    fn from(e: libloading::Error) -> Self {
        Error::Library(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<&'static str> for Error {
    fn from(e: &'static str) -> Self {
        Error::Other(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_support_falls_back_to_model() {
        let mut info = TrackerInfo {
            config: TrackerConfig {
                model: TrackerModel::Is900,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(info.supports_position());
        assert_eq!(info.model_name(), "IS-900 Series");

        info.hardware = HardwareInfo {
            valid: true,
            model_name: "IS-900 SimTracker".into(),
            capability: Capability {
                position: false,
                max_stations: 2,
                ..Default::default()
            },
        };
        assert!(!info.supports_position());
        assert_eq!(info.model_name(), "IS-900 SimTracker");
    }

    #[test]
    fn max_stations_defaults_to_four() {
        let mut hardware = HardwareInfo::default();
        assert_eq!(hardware.max_stations(), 4);
        hardware.valid = true;
        hardware.capability.max_stations = 8;
        assert_eq!(hardware.max_stations(), 8);
    }

    #[test]
    fn station_slots_by_model() {
        assert_eq!(TrackerModel::Is300.station_slots(), 4);
        assert_eq!(TrackerModel::Is1200.station_slots(), 4);
        assert_eq!(TrackerModel::Is600.station_slots(), MAX_STATIONS);
        assert_eq!(TrackerModel::InertiaCube3.station_slots(), 1);
        assert_eq!(TrackerModel::Other(42).name(), "Unknown");
    }
}
