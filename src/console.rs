// Copyright (C) 2023, Alex Badics
// This file is part of isense-console
// Licensed under the MIT license. See LICENSE file in the project root for details.

//! The operator console loop. See [`Console`]
//!
//! Every loop iteration checks for a key press without blocking, fetches the
//! tracking data of all stations, and, if the display interval elapsed, prints one
//! line of telemetry for the current station.
//!
//! Without a tracker the console still runs, it just has nothing to show.

use std::{
    io::Write,
    thread::sleep,
    time::{Duration, Instant},
};

use crate::{
    command::Command,
    display::{format_help, format_station_data, format_station_selected, format_tracker_stats},
    keyboard::KeySource,
    Result, StationConfig, StationData, StationHardwareInfo, Tracker, TrackerInfo, TrackerType,
    MAX_STATIONS,
};

/// Monotonic time source used for throttling the display
pub trait Clock {
    /// Time elapsed since an arbitrary fixed point
    fn now(&self) -> Duration;
}

/// [`Clock`] based on [`Instant`]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    /// Start counting from now
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Timing parameters of the console loop
#[derive(Debug, Clone)]
pub struct ConsoleSettings {
    /// Minimum time between two telemetry lines
    pub display_interval: Duration,
    /// Sleep between loop iterations
    pub poll_interval: Duration,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            display_interval: Duration::from_millis(10),
            poll_interval: Duration::from_millis(1),
        }
    }
}

/// What the loop should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep going
    Continue,
    /// Leave the loop
    Quit,
}

/// State of an operator session
pub struct Console<C: Clock, W: Write> {
    tracker: Option<Box<dyn Tracker>>,
    info: TrackerInfo,
    stations: Vec<StationConfig>,
    station_hardware: Vec<Option<StationHardwareInfo>>,
    current_station: u16,
    max_stations: u16,
    settings: ConsoleSettings,
    clock: C,
    last_display: Duration,
    out: W,
}

impl<C: Clock, W: Write> Console<C, W> {
    /// Read the tracker's configuration and set up the session.
    /// Station 1 will be the current station.
    pub fn start(
        mut tracker: Option<Box<dyn Tracker>>,
        settings: ConsoleSettings,
        clock: C,
        out: W,
    ) -> Self {
        let mut info = TrackerInfo::default();
        let mut stations = vec![StationConfig::default(); MAX_STATIONS as usize];
        let mut station_hardware = vec![None; MAX_STATIONS as usize];
        let mut max_stations = info.hardware.max_stations();

        if let Some(tracker) = tracker.as_deref_mut() {
            match tracker.tracker_config() {
                Ok(config) => info.config = config,
                Err(e) => log::warn!("Could not read tracker configuration: {e}"),
            }
            match tracker.hardware_info() {
                Ok(hardware) => info.hardware = hardware,
                Err(e) => log::warn!("Could not read hardware information: {e}"),
            }
            max_stations = info.hardware.max_stations().min(MAX_STATIONS);
            log::info!(
                "{} tracker: {}, {} stations, driver time {:.2}s",
                tracker.name(),
                info.model_name(),
                max_stations,
                tracker.time()
            );

            if info.config.tracker_type == TrackerType::PrecisionSeries {
                for station in 1..=max_stations {
                    let index = station as usize - 1;
                    let config = tracker.station_config(station);
                    let hardware = config
                        .and_then(|config| {
                            stations[index] = config;
                            tracker.station_hardware_info(station)
                        })
                        .map(|hardware| station_hardware[index] = Some(hardware));
                    if let Err(e) = hardware {
                        log::warn!("Reading station {station} stopped: {e}");
                        break;
                    }
                }
            }
        }

        Self {
            last_display: clock.now(),
            tracker,
            info,
            stations,
            station_hardware,
            current_station: 1,
            max_stations,
            settings,
            clock,
            out,
        }
    }

    /// The station commands apply to, 1-based
    pub fn current_station(&self) -> u16 {
        self.current_station
    }

    /// Number of selectable stations
    pub fn max_stations(&self) -> u16 {
        self.max_stations
    }

    /// Cached configuration of a station, as last read from or written to the tracker
    pub fn station(&self, station: u16) -> &StationConfig {
        &self.stations[station as usize - 1]
    }

    /// Whether a tracker is attached
    pub fn has_tracker(&self) -> bool {
        self.tracker.is_some()
    }

    /// Run the loop until the operator quits
    pub fn run(&mut self, keys: &mut dyn KeySource) -> Result<()> {
        loop {
            if let Some(key) = keys.poll_key()? {
                if self.handle_key(key)? == Flow::Quit {
                    return Ok(());
                }
            }
            self.tick()?;
            if !self.settings.poll_interval.is_zero() {
                sleep(self.settings.poll_interval);
            }
        }
    }

    /// Process a single key press
    pub fn handle_key(&mut self, key: char) -> Result<Flow> {
        let command = Command::from_key(key);
        log::debug!("Key {key:?}: {command:?}");
        self.execute(command)
    }

    /// Carry out a command
    pub fn execute(&mut self, command: Command) -> Result<Flow> {
        match command {
            Command::CycleEnhancement => self.modify_station(StationConfig::cycle_enhancement)?,
            Command::CycleCompass => self.modify_station(StationConfig::cycle_compass)?,
            Command::CycleSensitivity => self.modify_station(StationConfig::cycle_sensitivity)?,
            Command::CyclePrediction => self.modify_station(StationConfig::cycle_prediction)?,
            Command::ToggleTimestamp => self.modify_station(StationConfig::toggle_timestamped)?,
            Command::ShowStats => self.show_stats()?,
            Command::ResetHeading => {
                let station = self.current_station;
                self.device_call(|tracker| tracker.reset_heading(station))?;
            }
            Command::AuxOutput(pattern) => {
                let station = self.current_station;
                self.device_call(|tracker| tracker.aux_output(station, &pattern.bytes()))?;
            }
            Command::SelectStation(station) => self.select_station(station)?,
            Command::Quit => {
                self.emit("\n\n")?;
                return Ok(Flow::Quit);
            }
            Command::Help => self.emit(&format_help())?,
        }
        Ok(Flow::Continue)
    }

    /// One loop iteration: fetch the tracking data, and show it if it is time to.
    pub fn tick(&mut self) -> Result<()> {
        let Some(tracker) = self.tracker.as_deref_mut() else {
            return Ok(());
        };
        // Has to be called even if nothing is displayed
        let frames = match tracker.tracking_data() {
            Ok(frames) => Some(frames),
            Err(e) => {
                log::debug!("No tracking data this tick: {e}");
                None
            }
        };

        let now = self.clock.now();
        if now.saturating_sub(self.last_display) <= self.settings.display_interval {
            return Ok(());
        }
        self.last_display = now;
        let index = self.current_station as usize - 1;
        if let Some(frame) = frames.as_ref().and_then(|frames| frames.get(index)) {
            self.show_station_data(frame)?;
        }
        Ok(())
    }

    fn show_station_data(&mut self, frame: &StationData) -> Result<()> {
        let Some(tracker) = self.tracker.as_deref_mut() else {
            return Ok(());
        };
        let comm = match tracker.comm_stats() {
            Ok(comm) => comm,
            Err(e) => {
                log::debug!("Skipping display: {e}");
                return Ok(());
            }
        };
        let station = &self.stations[self.current_station as usize - 1];
        let mut line = format_station_data(&self.info, &comm, station, frame);
        line.push('\r');
        self.emit(&line)?;
        self.out.flush()?;
        Ok(())
    }

    fn show_stats(&mut self) -> Result<()> {
        let Some(tracker) = self.tracker.as_deref_mut() else {
            return self.emit("\nNo tracker\n");
        };
        match tracker.tracker_config() {
            Ok(config) => self.info.config = config,
            Err(e) => return self.emit(&format!("\n{e}\n")),
        }
        let mut stations = Vec::new();
        for station in 1..=self.info.config.model.station_slots() {
            let config = tracker.station_config(station);
            let failed = config.is_err();
            stations.push(config);
            if failed {
                break;
            }
        }
        let text = format_tracker_stats(&self.info, &stations, &self.station_hardware);
        self.emit(&text)
    }

    /// Read the current station's configuration, change it, and write it back.
    /// A failed read skips the change. A failed write drops it, the next read
    /// returns what the device really has.
    fn modify_station(&mut self, change: impl FnOnce(&mut StationConfig)) -> Result<()> {
        let station = self.current_station;
        let index = station as usize - 1;
        let Some(tracker) = self.tracker.as_deref_mut() else {
            return self.emit("\nNo tracker\n");
        };
        let outcome = tracker.station_config(station).and_then(|mut config| {
            self.stations[index] = config.clone();
            change(&mut config);
            tracker.set_station_config(station, &config)?;
            Ok(config)
        });
        match outcome {
            Ok(config) => {
                self.stations[index] = config;
                self.show_stats()
            }
            Err(e) => {
                log::warn!("Station {station} was not changed: {e}");
                self.emit(&format!("\n{e}\n"))
            }
        }
    }

    fn device_call(&mut self, call: impl FnOnce(&mut dyn Tracker) -> Result<()>) -> Result<()> {
        let Some(tracker) = self.tracker.as_deref_mut() else {
            return self.emit("\nNo tracker\n");
        };
        if let Err(e) = call(tracker) {
            log::warn!("Command failed: {e}");
            self.emit(&format!("\n{e}\n"))?;
        }
        Ok(())
    }

    fn select_station(&mut self, station: u16) -> Result<()> {
        if station == 1 || station <= self.max_stations {
            self.current_station = station;
            self.emit(&format_station_selected(station))
        } else {
            log::debug!(
                "Station {station} not selected, the tracker has {}",
                self.max_stations
            );
            Ok(())
        }
    }

    /// Terminal is in raw mode, so line feeds need an explicit carriage return
    fn emit(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.replace('\n', "\r\n").as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        command::ESC,
        testing::{FakeTracker, ManualClock, ScriptedKeys},
        TrackerModel,
    };

    fn console(tracker: &FakeTracker, clock: &ManualClock) -> Console<ManualClock, Vec<u8>> {
        Console::start(
            Some(Box::new(tracker.clone())),
            ConsoleSettings {
                poll_interval: Duration::ZERO,
                ..Default::default()
            },
            clock.clone(),
            Vec::new(),
        )
    }

    fn output(console: &mut Console<ManualClock, Vec<u8>>) -> String {
        String::from_utf8(std::mem::take(&mut console.out)).unwrap()
    }

    #[test]
    fn startup_reads_precision_series_stations() {
        let tracker = FakeTracker::new(4);
        tracker.state().stations[2].prediction = 30;
        let console = console(&tracker, &ManualClock::default());
        assert_eq!(console.max_stations(), 4);
        assert_eq!(console.current_station(), 1);
        assert_eq!(console.station(3).prediction, 30);
        assert_eq!(tracker.state().station_reads, 4);
    }

    #[test]
    fn selection_beyond_capability_is_rejected() {
        let tracker = FakeTracker::new(4);
        let mut console = console(&tracker, &ManualClock::default());
        console.handle_key('3').unwrap();
        assert_eq!(console.current_station(), 3);
        assert!(output(&mut console).contains(">> Current Station is set to 3 <<"));

        console.handle_key('5').unwrap();
        assert_eq!(console.current_station(), 3);
        assert_eq!(output(&mut console), "");
    }

    #[test]
    fn invalid_hardware_info_allows_four_stations() {
        let tracker = FakeTracker::new(8);
        tracker.state().hardware.valid = false;
        let mut console = console(&tracker, &ManualClock::default());
        assert_eq!(console.max_stations(), 4);
        console.handle_key('4').unwrap();
        console.handle_key('5').unwrap();
        assert_eq!(console.current_station(), 4);
    }

    #[test]
    fn prediction_cycles_on_the_current_station() {
        let tracker = FakeTracker::new(4);
        tracker.state().stations[1].prediction = 50;
        let mut console = console(&tracker, &ManualClock::default());
        console.handle_key('2').unwrap();
        console.handle_key('p').unwrap();
        assert_eq!(tracker.state().stations[1].prediction, 0);
        assert_eq!(console.station(2).prediction, 0);
        assert_eq!(tracker.state().stations[0].prediction, 0);
        assert!(output(&mut console).contains("InterSense Tracker Information"));
    }

    #[test]
    fn every_mutation_writes_back_the_whole_record() {
        let tracker = FakeTracker::new(1);
        let mut console = console(&tracker, &ManualClock::default());
        for key in ['e', 'c', 's', 't'] {
            console.handle_key(key).unwrap();
        }
        let state = tracker.state();
        assert_eq!(state.station_writes, 4);
        let station = &state.stations[0];
        assert_eq!(station.enhancement, 1);
        assert_eq!(station.compass, 1);
        assert_eq!(station.sensitivity, 1);
        assert!(station.timestamped);
        assert!(station.enabled);
    }

    #[test]
    fn failed_read_skips_the_write() {
        let tracker = FakeTracker::new(1);
        let mut console = console(&tracker, &ManualClock::default());
        tracker.state().fail_station_reads = true;
        console.handle_key('e').unwrap();
        assert_eq!(tracker.state().station_writes, 0);
        assert!(output(&mut console).contains("ISD_GetStationConfig failed"));
    }

    #[test]
    fn failed_write_keeps_device_state() {
        let tracker = FakeTracker::new(1);
        let mut console = console(&tracker, &ManualClock::default());
        tracker.state().fail_station_writes = true;
        console.handle_key('s').unwrap();
        assert_eq!(tracker.state().stations[0].sensitivity, 0);
        assert_eq!(console.station(1).sensitivity, 0);
        assert!(output(&mut console).contains("ISD_SetStationConfig failed"));

        tracker.state().fail_station_writes = false;
        console.handle_key('s').unwrap();
        assert_eq!(tracker.state().stations[0].sensitivity, 1);
    }

    #[test]
    fn reset_heading_and_aux_output_target_current_station() {
        let tracker = FakeTracker::new(2);
        let mut console = console(&tracker, &ManualClock::default());
        console.handle_key('2').unwrap();
        console.handle_key('r').unwrap();
        console.handle_key('A').unwrap();
        console.handle_key('a').unwrap();
        let state = tracker.state();
        assert_eq!(state.heading_resets, vec![2]);
        assert_eq!(
            state.aux_outputs,
            vec![(2, vec![255, 255, 0, 0]), (2, vec![0, 0, 0, 0])]
        );
        assert_eq!(state.station_writes, 0);
    }

    #[test]
    fn unknown_key_prints_help() {
        let tracker = FakeTracker::new(1);
        let mut console = console(&tracker, &ManualClock::default());
        assert_eq!(console.handle_key('x').unwrap(), Flow::Continue);
        let text = output(&mut console);
        assert!(text.contains("q -- quit\r\n"));
        assert!(text.contains("R -- reset heading\r\n"));
    }

    #[test]
    fn display_is_throttled_but_data_is_fetched_every_tick() {
        let tracker = FakeTracker::new(1);
        let clock = ManualClock::default();
        let mut console = console(&tracker, &clock);

        console.tick().unwrap();
        clock.advance(Duration::from_millis(10));
        console.tick().unwrap();
        assert_eq!(output(&mut console), "");

        clock.advance(Duration::from_millis(1));
        console.tick().unwrap();
        console.tick().unwrap();
        let text = output(&mut console);
        assert_eq!(text.matches("R/s").count(), 1);
        assert!(text.ends_with('\r'));
        assert_eq!(tracker.state().frame_fetches, 4);
    }

    #[test]
    fn fetch_failures_are_not_fatal() {
        let tracker = FakeTracker::new(1);
        let clock = ManualClock::default();
        let mut console = console(&tracker, &clock);
        tracker.state().fail_frames = true;
        clock.advance(Duration::from_secs(1));
        console.tick().unwrap();
        assert_eq!(output(&mut console), "");

        tracker.state().fail_frames = false;
        tracker.state().fail_comm = true;
        clock.advance(Duration::from_secs(1));
        console.tick().unwrap();
        assert_eq!(output(&mut console), "");
    }

    #[test]
    fn shows_the_selected_station() {
        let tracker = FakeTracker::new(2);
        tracker.state().frames[1].timestamp = 321.0;
        let clock = ManualClock::default();
        let mut console = console(&tracker, &clock);
        console.handle_key('2').unwrap();
        output(&mut console);
        clock.advance(Duration::from_millis(20));
        console.tick().unwrap();
        assert!(output(&mut console).contains("  321.0s"));
    }

    #[test]
    fn stats_table_rows_follow_the_model() {
        let tracker = FakeTracker::new(4);
        tracker.state().config.model = TrackerModel::Is300;
        tracker.state().hardware.model_name = "Fake IS-300".into();
        let mut console = console(&tracker, &ManualClock::default());
        console.handle_key('d').unwrap();
        let text = output(&mut console);
        assert!(text.contains("Model:    Fake IS-300\r\n"));
        assert!(text.contains("\r\n4\tOFF\tON\t"));
        assert!(!text.contains("\r\n5\t"));
    }

    #[test]
    fn without_tracker_the_console_still_runs() {
        let mut console: Console<ManualClock, Vec<u8>> = Console::start(
            None,
            ConsoleSettings::default(),
            ManualClock::default(),
            Vec::new(),
        );
        assert!(!console.has_tracker());
        assert_eq!(console.max_stations(), 4);
        console.tick().unwrap();
        console.handle_key('e').unwrap();
        console.handle_key('4').unwrap();
        assert_eq!(console.current_station(), 4);
        assert!(output(&mut console).contains("No tracker"));
    }

    #[test]
    fn run_stops_on_quit() {
        let tracker = FakeTracker::new(1);
        let mut console = console(&tracker, &ManualClock::default());
        let mut keys = ScriptedKeys::new(&['e', ESC, 'c']);
        console.run(&mut keys).unwrap();
        assert_eq!(tracker.state().stations[0].enhancement, 1);
        assert_eq!(tracker.state().stations[0].compass, 0);
        assert_eq!(tracker.state().frame_fetches, 1);
    }

    #[test]
    fn startup_stops_at_first_station_failure() {
        let tracker = FakeTracker::new(4);
        tracker.state().fail_station_reads_from = Some(2);
        let console = console(&tracker, &ManualClock::default());
        assert_eq!(tracker.state().station_reads, 2);
        assert_eq!(console.max_stations(), 4);
        assert_eq!(console.station(1), &tracker.state().stations[0]);
    }
}
