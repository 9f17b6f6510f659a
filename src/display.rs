// Copyright (C) 2023, Alex Badics
// This file is part of isense-console
// Licensed under the MIT license. See LICENSE file in the project root for details.

//! Text rendering of tracker state. Everything here is a pure function.

use std::fmt::Write;

use crate::{
    command::BINDINGS, CommStats, Orientation, Result, StationConfig, StationData,
    StationHardwareInfo, TrackerInfo,
};

fn on_off(value: bool) -> &'static str {
    if value {
        "ON"
    } else {
        "OFF"
    }
}

/// One line of telemetry for a station. Position is only shown if the tracker
/// supports it, aux inputs and buttons only if the station is configured to read them.
pub fn format_station_data(
    info: &TrackerInfo,
    comm: &CommStats,
    station: &StationConfig,
    data: &StationData,
) -> String {
    let mut line = format!("{:3.0}Kb/s {} R/s ", comm.kbits_per_sec, comm.records_per_sec);

    if info.supports_position() {
        let _ = write!(
            line,
            "[{}%] ({:6.2},{:6.2},{:6.2})m ",
            data.tracking_quality(),
            data.position.x,
            data.position.y,
            data.position.z
        );
    }

    match data.orientation {
        Orientation::Quaternion(q) => {
            let _ = write!(line, "{:5.2} {:5.2} {:5.2} {:5.2} ", q.w, q.i, q.j, q.k);
        }
        Orientation::Euler(e) => {
            let _ = write!(line, "({:7.2},{:7.2},{:7.2})deg ", e.x, e.y, e.z);
        }
    }

    let _ = write!(line, "{:7.1}s ", data.timestamp);

    if station.get_aux_inputs {
        let [a, b, c, d] = data.aux_inputs;
        let _ = write!(line, "{a} {b} {c} {d} ");
    }

    if station.get_inputs {
        // Currently available products have at most 6 buttons
        for pressed in &data.buttons[..6] {
            line.push(if *pressed { '1' } else { '0' });
        }
        let _ = write!(line, " {} {} ", data.analog[0], data.analog[1]);
    }
    line
}

/// The tracker information table.
///
/// `stations` holds the configuration read for each station slot, in order. A failed
/// read ends the table, so only the last element may be an error.
pub fn format_tracker_stats(
    info: &TrackerInfo,
    stations: &[Result<StationConfig>],
    hardware: &[Option<StationHardwareInfo>],
) -> String {
    let mut text = String::from("\n\n********** InterSense Tracker Information ***********\n\n");
    let _ = writeln!(
        text,
        "Type:     {} device on port {}",
        info.config.tracker_type.name(),
        info.config.port
    );
    let _ = writeln!(text, "Model:    {}", info.model_name());
    text.push_str("\nStation\tTime\tState\tCube  Enhancement  Sensitivity  Compass  Prediction\n");

    for (station, config) in (1..).zip(stations) {
        match config {
            Ok(config) => {
                let cube = config
                    .inertia_cube
                    .map_or_else(|| "None".to_string(), |cube| cube.to_string());
                let _ = writeln!(
                    text,
                    "{station}\t{}\t{}\t{cube}\t   {}\t\t{}\t  {}\t  {}",
                    on_off(config.timestamped),
                    on_off(config.enabled),
                    config.enhancement,
                    config.sensitivity,
                    config.compass,
                    config.prediction,
                );
            }
            Err(e) => {
                let _ = writeln!(text, "{station}\t{e}");
                break;
            }
        }
    }

    for (station, hw) in (1..).zip(hardware) {
        if let Some(hw) = hw.as_ref().filter(|hw| hw.valid) {
            let _ = writeln!(
                text,
                "Station {station}: serial {}, firmware {:.2}, calibrated {}",
                hw.serial, hw.firmware_revision, hw.calibration_date
            );
        }
    }
    text.push('\n');
    text
}

/// List of the available commands
pub fn format_help() -> String {
    let mut text = String::from("\n");
    for binding in BINDINGS {
        let _ = writeln!(text, "{} -- {}", binding.label(), binding.help);
    }
    text
}

/// Notice after the current station changed
pub fn format_station_selected(station: u16) -> String {
    format!("\n>> Current Station is set to {station} <<\n")
}
