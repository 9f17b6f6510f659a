// Copyright (C) 2023, Alex Badics
// This file is part of isense-console
// Licensed under the MIT license. See LICENSE file in the project root for details.

//! InterSense tracker support through the vendor driver library. See [`ISense`]
//! It uses [`libloading`] to load `libisense` at runtime, so nothing has to be
//! linked at build time.
//!
//! The records below mirror the C structures of the driver's 4.x API. They are
//! only ever created zeroed, and filled by the driver.

use std::{ffi::c_void, ptr};

use bytemuck::Zeroable;
use libloading::Library;
use nalgebra::{Quaternion, Vector3};

use crate::{
    station::{ANALOG_COUNT, AUX_INPUT_COUNT, BUTTON_COUNT},
    util::{c_chars_to_string, load_driver_library},
    AngleFormat, Capability, CommStats, Error, HardwareInfo, OpenOptions, Orientation, Result,
    StationCapability, StationConfig, StationData, StationHardwareInfo, Tracker, TrackerConfig,
    TrackerModel, TrackerType, MAX_STATIONS,
};

type Handle = i32;
type Bool = i32;

const FALSE: Bool = 0;
const TRUE: Bool = 1;

const ANGLE_FORMAT_EULER: u32 = 1;
const ANGLE_FORMAT_QUATERNION: u32 = 2;

#[repr(C)]
#[derive(Clone, Copy, Zeroable)]
#[allow(dead_code)]
struct RawTrackerInfo {
    lib_version: f32,
    tracker_type: u32,
    tracker_model: u32,
    port: u32,
    records_per_sec: u32,
    kbits_per_sec: f32,
    sync_state: u32,
    sync_rate: f32,
    sync_phase: u32,
    interface: u32,
    ult_timeout: u32,
    ult_volume: u32,
    dw_reserved4: u32,
    firmware_rev: f32,
    f_reserved: [f32; 3],
    led_enable: Bool,
    b_reserved: [Bool; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Zeroable)]
#[allow(dead_code)]
struct RawStationInfo {
    id: u32,
    state: Bool,
    compass: Bool,
    inertia_cube: i32,
    enhancement: u32,
    sensitivity: u32,
    prediction: u32,
    angle_format: u32,
    time_stamped: Bool,
    get_inputs: Bool,
    get_encoder_data: Bool,
    compass_compensation: u8,
    imu_shock_suppression: u8,
    urm_rejection_factor: u8,
    b_reserved2: u8,
    coord_frame: u32,
    accel_sensitivity: u32,
    f_reserved: [f32; 4],
    get_ahrs_data: Bool,
    get_camera_data: Bool,
    get_aux_inputs: Bool,
    get_covariance_data: Bool,
    get_extended_data: Bool,
    b_reserved4: Bool,
}

#[repr(C)]
#[derive(Clone, Copy, Zeroable)]
#[allow(dead_code)]
struct RawStationData {
    tracking_status: u8,
    new_data: u8,
    comm_integrity: u8,
    battery_state: u8,
    euler: [f32; 3],
    quaternion: [f32; 4],
    position: [f32; 3],
    time_stamp: f32,
    still_time: f32,
    battery_level: f32,
    compass_yaw: f32,
    button_state: [Bool; BUTTON_COUNT],
    analog_data: [i16; ANALOG_COUNT],
    aux_inputs: [u8; AUX_INPUT_COUNT],
    angular_vel_body_frame: [f32; 3],
    angular_vel_nav_frame: [f32; 3],
    accel_body_frame: [f32; 3],
    accel_nav_frame: [f32; 3],
    velocity_nav_frame: [f32; 3],
    angular_vel_raw: [f32; 3],
    meas_quality: u8,
    b_reserved: [u8; 3],
    time_stamp_seconds: u32,
    time_stamp_micro_sec: u32,
    os_time_stamp_seconds: u32,
    os_time_stamp_micro_sec: u32,
    reserved: [f32; 55],
    temperature: f32,
    mag_body_frame: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Zeroable)]
#[allow(dead_code)]
struct RawTrackingData {
    station: [RawStationData; MAX_STATIONS as usize],
}

#[repr(C)]
#[derive(Clone, Copy, Zeroable)]
#[allow(dead_code)]
struct RawCapability {
    position: Bool,
    orientation: Bool,
    encoders: Bool,
    prediction: Bool,
    enhancement: Bool,
    compass: Bool,
    self_test: Bool,
    error_log: Bool,
    ult_volume: Bool,
    ult_gain: Bool,
    ult_timeout: Bool,
    photo_diode: Bool,
    max_stations: u32,
    max_imus: u32,
    max_fpses: u32,
    max_channels: u32,
    max_buttons: u32,
    meas_data: Bool,
    diag_data: Bool,
    pse_config: Bool,
    config_lock: Bool,
    ult_max_range: f32,
    f_reserved: [f32; 3],
    compass_cal: Bool,
    b_reserved: [Bool; 3],
    dw_reserved: [u32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Zeroable)]
#[allow(dead_code)]
struct RawHardwareInfo {
    valid: Bool,
    tracker_type: u32,
    tracker_model: u32,
    port: u32,
    interface: u32,
    on_host: Bool,
    aux_system: u32,
    firmware_rev: f32,
    model_name: [u8; 128],
    capability: RawCapability,
    b_reserved: [Bool; 4],
    baud_rate: u32,
    num_test_levels: u32,
    dw_reserved: [u32; 2],
    f_reserved: [f32; 4],
    c_reserved: [[u8; 128]; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Zeroable)]
#[allow(dead_code)]
struct RawStationCapability {
    position: Bool,
    orientation: Bool,
    encoders: u32,
    num_channels: u32,
    num_buttons: u32,
    aux_inputs: u32,
    aux_outputs: u32,
    compass: Bool,
    b_reserved: [Bool; 3],
    dw_reserved: [u32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Zeroable)]
#[allow(dead_code)]
struct RawStationHardwareInfo {
    valid: Bool,
    id: u32,
    desc_version: [u8; 20],
    firmware_rev: f32,
    serial_num: u32,
    cal_date: [u8; 20],
    port: u32,
    capability: RawStationCapability,
    b_reserved: [Bool; 4],
    station_type: u32,
    device_id: u32,
    dw_reserved: [u32; 2],
    f_reserved: [f32; 4],
    c_reserved: [[u8; 128]; 3],
}

type OpenTrackerFn = unsafe extern "C" fn(*mut c_void, u32, Bool, Bool) -> Handle;
type CloseTrackerFn = unsafe extern "C" fn(Handle) -> Bool;
type GetTrackerConfigFn = unsafe extern "C" fn(Handle, *mut RawTrackerInfo, Bool) -> Bool;
type GetCommInfoFn = unsafe extern "C" fn(Handle, *mut RawTrackerInfo) -> Bool;
type GetSystemHardwareInfoFn = unsafe extern "C" fn(Handle, *mut RawHardwareInfo) -> Bool;
type GetStationHardwareInfoFn =
    unsafe extern "C" fn(Handle, *mut RawStationHardwareInfo, u16) -> Bool;
type StationConfigFn = unsafe extern "C" fn(Handle, *mut RawStationInfo, u16, Bool) -> Bool;
type GetTrackingDataFn = unsafe extern "C" fn(Handle, *mut RawTrackingData) -> Bool;
type ResetHeadingFn = unsafe extern "C" fn(Handle, u16) -> Bool;
type AuxOutputFn = unsafe extern "C" fn(Handle, u16, *mut u8, u16) -> Bool;
type GetTimeFn = unsafe extern "C" fn() -> f32;

/// Entry points of the driver. The function pointers are only valid while
/// `_library` is alive, which is why they live together.
struct DriverApi {
    open_tracker: OpenTrackerFn,
    close_tracker: CloseTrackerFn,
    get_tracker_config: GetTrackerConfigFn,
    get_comm_info: GetCommInfoFn,
    get_system_hardware_info: GetSystemHardwareInfoFn,
    get_station_hardware_info: GetStationHardwareInfoFn,
    get_station_config: StationConfigFn,
    set_station_config: StationConfigFn,
    get_tracking_data: GetTrackingDataFn,
    reset_heading: ResetHeadingFn,
    aux_output: AuxOutputFn,
    get_time: GetTimeFn,
    _library: Library,
}

/// # Safety
/// `T` must be the correct function pointer type of the symbol.
unsafe fn symbol<T: Copy>(library: &Library, name: &[u8]) -> Result<T> {
    Ok(*library.get::<T>(name)?)
}

impl DriverApi {
    fn load(library: Library) -> Result<Self> {
        // Safety: the signatures match the driver's header.
        unsafe {
            let open_tracker = symbol(&library, b"ISD_OpenTracker\0")?;
            let close_tracker = symbol(&library, b"ISD_CloseTracker\0")?;
            let get_tracker_config = symbol(&library, b"ISD_GetTrackerConfig\0")?;
            let get_comm_info = symbol(&library, b"ISD_GetCommInfo\0")?;
            let get_system_hardware_info = symbol(&library, b"ISD_GetSystemHardwareInfo\0")?;
            let get_station_hardware_info = symbol(&library, b"ISD_GetStationHardwareInfo\0")?;
            let get_station_config = symbol(&library, b"ISD_GetStationConfig\0")?;
            let set_station_config = symbol(&library, b"ISD_SetStationConfig\0")?;
            let get_tracking_data = symbol(&library, b"ISD_GetTrackingData\0")?;
            let reset_heading = symbol(&library, b"ISD_ResetHeading\0")?;
            let aux_output = symbol(&library, b"ISD_AuxOutput\0")?;
            let get_time = symbol(&library, b"ISD_GetTime\0")?;
            Ok(Self {
                open_tracker,
                close_tracker,
                get_tracker_config,
                get_comm_info,
                get_system_hardware_info,
                get_station_hardware_info,
                get_station_config,
                set_station_config,
                get_tracking_data,
                reset_heading,
                aux_output,
                get_time,
                _library: library,
            })
        }
    }
}

fn check(result: Bool, call: &'static str) -> Result<()> {
    if result == FALSE {
        Err(Error::Call(call))
    } else {
        Ok(())
    }
}

fn station_index(station: u16) -> Result<usize> {
    if (1..=MAX_STATIONS).contains(&station) {
        Ok(station as usize - 1)
    } else {
        Err(Error::Other("Station number out of range"))
    }
}

/// An open session with an InterSense tracker. The tracker is closed when this is dropped.
pub struct ISense {
    api: DriverApi,
    handle: Handle,
    verbose: Bool,
    tracker_info: RawTrackerInfo,
    /// Last record read for each station. Fields not modelled by [`StationConfig`]
    /// are written back from here.
    stations: [RawStationInfo; MAX_STATIONS as usize],
    tracking_data: Box<RawTrackingData>,
}

impl ISense {
    /// Load the driver and open the tracker on the configured port
    /// (or the first tracker found, if the port is 0)
    pub fn open(options: &OpenOptions) -> Result<Self> {
        let api = DriverApi::load(load_driver_library(options.library.as_deref())?)?;
        let verbose = if options.verbose { TRUE } else { FALSE };
        // Safety: no parent window, the rest are plain values
        let handle = unsafe { (api.open_tracker)(ptr::null_mut(), options.port, FALSE, verbose) };
        if handle < 1 {
            return Err(Error::NotFound);
        }
        log::info!("Opened tracker, handle={handle}");
        Ok(Self {
            api,
            handle,
            verbose,
            tracker_info: Zeroable::zeroed(),
            stations: Zeroable::zeroed(),
            tracking_data: Box::new(Zeroable::zeroed()),
        })
    }
}

impl Tracker for ISense {
    fn tracker_config(&mut self) -> Result<TrackerConfig> {
        check(
            unsafe {
                (self.api.get_tracker_config)(self.handle, &mut self.tracker_info, self.verbose)
            },
            "ISD_GetTrackerConfig",
        )?;
        Ok(TrackerConfig {
            tracker_type: tracker_type_from_code(self.tracker_info.tracker_type),
            model: tracker_model_from_code(self.tracker_info.tracker_model),
            port: self.tracker_info.port,
            library_version: self.tracker_info.lib_version,
            firmware_revision: self.tracker_info.firmware_rev,
        })
    }

    fn comm_stats(&mut self) -> Result<CommStats> {
        check(
            unsafe { (self.api.get_comm_info)(self.handle, &mut self.tracker_info) },
            "ISD_GetCommInfo",
        )?;
        Ok(CommStats {
            kbits_per_sec: self.tracker_info.kbits_per_sec,
            records_per_sec: self.tracker_info.records_per_sec,
        })
    }

    fn hardware_info(&mut self) -> Result<HardwareInfo> {
        let mut raw: RawHardwareInfo = Zeroable::zeroed();
        check(
            unsafe { (self.api.get_system_hardware_info)(self.handle, &mut raw) },
            "ISD_GetSystemHardwareInfo",
        )?;
        let cap = &raw.capability;
        Ok(HardwareInfo {
            valid: raw.valid != FALSE,
            model_name: c_chars_to_string(&raw.model_name),
            capability: Capability {
                position: cap.position != FALSE,
                orientation: cap.orientation != FALSE,
                prediction: cap.prediction != FALSE,
                enhancement: cap.enhancement != FALSE,
                compass: cap.compass != FALSE,
                max_stations: cap.max_stations.min(MAX_STATIONS as u32) as u16,
                max_buttons: cap.max_buttons as u16,
                max_channels: cap.max_channels as u16,
            },
        })
    }

    fn station_hardware_info(&mut self, station: u16) -> Result<StationHardwareInfo> {
        station_index(station)?;
        let mut raw: RawStationHardwareInfo = Zeroable::zeroed();
        check(
            unsafe { (self.api.get_station_hardware_info)(self.handle, &mut raw, station) },
            "ISD_GetStationHardwareInfo",
        )?;
        let cap = &raw.capability;
        Ok(StationHardwareInfo {
            valid: raw.valid != FALSE,
            id: raw.id,
            serial: raw.serial_num,
            firmware_revision: raw.firmware_rev,
            calibration_date: c_chars_to_string(&raw.cal_date),
            capability: StationCapability {
                position: cap.position != FALSE,
                orientation: cap.orientation != FALSE,
                buttons: cap.num_buttons as u16,
                channels: cap.num_channels as u16,
                aux_inputs: cap.aux_inputs as u16,
                aux_outputs: cap.aux_outputs as u16,
                compass: cap.compass != FALSE,
            },
        })
    }

    fn station_config(&mut self, station: u16) -> Result<StationConfig> {
        let index = station_index(station)?;
        let mut raw: RawStationInfo = Zeroable::zeroed();
        check(
            unsafe { (self.api.get_station_config)(self.handle, &mut raw, station, self.verbose) },
            "ISD_GetStationConfig",
        )?;
        self.stations[index] = raw;
        Ok(station_config_from_raw(&raw))
    }

    fn set_station_config(&mut self, station: u16, config: &StationConfig) -> Result<()> {
        let index = station_index(station)?;
        let mut raw = self.stations[index];
        apply_station_config(&mut raw, config);
        check(
            unsafe { (self.api.set_station_config)(self.handle, &mut raw, station, self.verbose) },
            "ISD_SetStationConfig",
        )?;
        self.stations[index] = raw;
        Ok(())
    }

    fn tracking_data(&mut self) -> Result<Vec<StationData>> {
        check(
            unsafe { (self.api.get_tracking_data)(self.handle, &mut *self.tracking_data) },
            "ISD_GetTrackingData",
        )?;
        Ok(self
            .tracking_data
            .station
            .iter()
            .zip(self.stations.iter())
            .map(|(data, config)| station_data_from_raw(data, config.angle_format))
            .collect())
    }

    fn reset_heading(&mut self, station: u16) -> Result<()> {
        station_index(station)?;
        check(
            unsafe { (self.api.reset_heading)(self.handle, station) },
            "ISD_ResetHeading",
        )
    }

    fn aux_output(&mut self, station: u16, data: &[u8]) -> Result<()> {
        station_index(station)?;
        let mut buffer = data.to_vec();
        let length = u16::try_from(buffer.len()).map_err(|_| "Aux output too long")?;
        check(
            unsafe { (self.api.aux_output)(self.handle, station, buffer.as_mut_ptr(), length) },
            "ISD_AuxOutput",
        )
    }

    fn time(&mut self) -> f32 {
        unsafe { (self.api.get_time)() }
    }

    fn name(&self) -> &'static str {
        "InterSense"
    }
}

impl Drop for ISense {
    fn drop(&mut self) {
        if unsafe { (self.api.close_tracker)(self.handle) } == FALSE {
            log::warn!("ISD_CloseTracker failed");
        } else {
            log::info!("Closed tracker, handle={}", self.handle);
        }
    }
}

fn tracker_type_from_code(code: u32) -> TrackerType {
    match code {
        1 => TrackerType::PrecisionSeries,
        2 => TrackerType::InterTraxSeries,
        _ => TrackerType::Unknown,
    }
}

fn tracker_model_from_code(code: u32) -> TrackerModel {
    match code {
        0 => TrackerModel::Unknown,
        1 => TrackerModel::Is300,
        2 => TrackerModel::Is600,
        3 => TrackerModel::Is900,
        4 => TrackerModel::InterTrax,
        5 => TrackerModel::InterTrax2,
        6 => TrackerModel::InterTraxLs,
        7 => TrackerModel::InterTraxLc,
        8 => TrackerModel::InertiaCube2,
        9 => TrackerModel::InertiaCube2Pro,
        10 => TrackerModel::Is1200,
        11 => TrackerModel::InertiaCube3,
        14 => TrackerModel::InertiaCube2BPro,
        other => TrackerModel::Other(other),
    }
}

fn station_config_from_raw(raw: &RawStationInfo) -> StationConfig {
    StationConfig {
        enabled: raw.state != FALSE,
        inertia_cube: (raw.inertia_cube >= 0).then_some(raw.inertia_cube),
        enhancement: raw.enhancement as u8,
        compass: raw.compass as u8,
        sensitivity: raw.sensitivity as u8,
        prediction: raw.prediction as u16,
        angle_format: if raw.angle_format == ANGLE_FORMAT_QUATERNION {
            AngleFormat::Quaternion
        } else {
            AngleFormat::Euler
        },
        timestamped: raw.time_stamped != FALSE,
        get_inputs: raw.get_inputs != FALSE,
        get_aux_inputs: raw.get_aux_inputs != FALSE,
    }
}

fn apply_station_config(raw: &mut RawStationInfo, config: &StationConfig) {
    raw.state = config.enabled as Bool;
    raw.inertia_cube = config.inertia_cube.unwrap_or(-1);
    raw.enhancement = config.enhancement as u32;
    raw.compass = config.compass as Bool;
    raw.sensitivity = config.sensitivity as u32;
    raw.prediction = config.prediction as u32;
    raw.angle_format = match config.angle_format {
        AngleFormat::Euler => ANGLE_FORMAT_EULER,
        AngleFormat::Quaternion => ANGLE_FORMAT_QUATERNION,
    };
    raw.time_stamped = config.timestamped as Bool;
    raw.get_inputs = config.get_inputs as Bool;
    raw.get_aux_inputs = config.get_aux_inputs as Bool;
}

fn station_data_from_raw(raw: &RawStationData, angle_format: u32) -> StationData {
    let orientation = if angle_format == ANGLE_FORMAT_QUATERNION {
        let [w, i, j, k] = raw.quaternion;
        Orientation::Quaternion(Quaternion::new(w, i, j, k))
    } else {
        Orientation::Euler(Vector3::from(raw.euler))
    };
    StationData {
        tracking_status: raw.tracking_status,
        new_data: raw.new_data != 0,
        position: Vector3::from(raw.position),
        orientation,
        timestamp: raw.time_stamp,
        buttons: raw.button_state.map(|b| b != FALSE),
        analog: raw.analog_data,
        aux_inputs: raw.aux_inputs,
    }
}
