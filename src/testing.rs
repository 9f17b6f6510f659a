// Copyright (C) 2023, Alex Badics
// This file is part of isense-console
// Licensed under the MIT license. See LICENSE file in the project root for details.

//! In-memory stand-ins for the tracker, the clock and the keyboard.

use std::{
    cell::{Cell, RefCell, RefMut},
    collections::VecDeque,
    rc::Rc,
    time::Duration,
};

use crate::{
    console::Clock, keyboard::KeySource, Capability, CommStats, Error, HardwareInfo, Result,
    StationConfig, StationData, StationHardwareInfo, Tracker, TrackerConfig, TrackerModel,
    TrackerType,
};

pub struct FakeState {
    pub config: TrackerConfig,
    pub hardware: HardwareInfo,
    pub stations: Vec<StationConfig>,
    pub frames: Vec<StationData>,
    pub fail_station_reads: bool,
    pub fail_station_reads_from: Option<u16>,
    pub fail_station_writes: bool,
    pub fail_frames: bool,
    pub fail_comm: bool,
    pub station_reads: usize,
    pub station_writes: usize,
    pub frame_fetches: usize,
    pub heading_resets: Vec<u16>,
    pub aux_outputs: Vec<(u16, Vec<u8>)>,
}

/// Tracker with `stations` stations that keeps its state in memory.
/// Clones share the state, so tests can look inside after boxing one.
#[derive(Clone)]
pub struct FakeTracker {
    state: Rc<RefCell<FakeState>>,
}

impl FakeTracker {
    pub fn new(stations: u16) -> Self {
        let state = FakeState {
            config: TrackerConfig {
                tracker_type: TrackerType::PrecisionSeries,
                model: TrackerModel::Is900,
                port: 1,
                library_version: 4.2,
                firmware_revision: 1.0,
            },
            hardware: HardwareInfo {
                valid: true,
                model_name: "Fake IS-900".into(),
                capability: Capability {
                    position: true,
                    orientation: true,
                    max_stations: stations,
                    ..Default::default()
                },
            },
            stations: vec![
                StationConfig {
                    enabled: true,
                    ..Default::default()
                };
                stations as usize
            ],
            frames: vec![StationData::default(); crate::MAX_STATIONS as usize],
            fail_station_reads: false,
            fail_station_reads_from: None,
            fail_station_writes: false,
            fail_frames: false,
            fail_comm: false,
            station_reads: 0,
            station_writes: 0,
            frame_fetches: 0,
            heading_resets: Vec::new(),
            aux_outputs: Vec::new(),
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    pub fn state(&self) -> RefMut<'_, FakeState> {
        self.state.borrow_mut()
    }

    fn index(&self, station: u16) -> Result<usize> {
        let count = self.state().stations.len();
        if station == 0 || station as usize > count {
            Err(Error::Other("Station number out of range"))
        } else {
            Ok(station as usize - 1)
        }
    }
}

impl Tracker for FakeTracker {
    fn tracker_config(&mut self) -> Result<TrackerConfig> {
        Ok(self.state().config.clone())
    }

    fn comm_stats(&mut self) -> Result<CommStats> {
        if self.state().fail_comm {
            return Err(Error::Call("ISD_GetCommInfo"));
        }
        Ok(CommStats {
            kbits_per_sec: 38.4,
            records_per_sec: 180,
        })
    }

    fn hardware_info(&mut self) -> Result<HardwareInfo> {
        Ok(self.state().hardware.clone())
    }

    fn station_hardware_info(&mut self, station: u16) -> Result<StationHardwareInfo> {
        self.index(station)?;
        Ok(StationHardwareInfo {
            valid: true,
            id: station as u32,
            serial: 1000 + station as u32,
            ..Default::default()
        })
    }

    fn station_config(&mut self, station: u16) -> Result<StationConfig> {
        let mut state = self.state();
        state.station_reads += 1;
        let failing = state.fail_station_reads
            || state
                .fail_station_reads_from
                .map_or(false, |from| station >= from);
        if failing {
            return Err(Error::Call("ISD_GetStationConfig"));
        }
        drop(state);
        let index = self.index(station)?;
        Ok(self.state().stations[index].clone())
    }

    fn set_station_config(&mut self, station: u16, config: &StationConfig) -> Result<()> {
        let index = self.index(station)?;
        let mut state = self.state();
        if state.fail_station_writes {
            return Err(Error::Call("ISD_SetStationConfig"));
        }
        state.station_writes += 1;
        state.stations[index] = config.clone();
        Ok(())
    }

    fn tracking_data(&mut self) -> Result<Vec<StationData>> {
        let mut state = self.state();
        state.frame_fetches += 1;
        if state.fail_frames {
            return Err(Error::Call("ISD_GetTrackingData"));
        }
        Ok(state.frames.clone())
    }

    fn reset_heading(&mut self, station: u16) -> Result<()> {
        self.index(station)?;
        self.state().heading_resets.push(station);
        Ok(())
    }

    fn aux_output(&mut self, station: u16, data: &[u8]) -> Result<()> {
        self.index(station)?;
        self.state().aux_outputs.push((station, data.to_vec()));
        Ok(())
    }

    fn time(&mut self) -> f32 {
        0.0
    }

    fn name(&self) -> &'static str {
        "Fake"
    }
}

/// Clock that only moves when told to. Clones share the time.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Key source that returns one scripted key per poll, then nothing
pub struct ScriptedKeys {
    keys: VecDeque<char>,
}

impl ScriptedKeys {
    pub fn new(keys: &[char]) -> Self {
        Self {
            keys: keys.iter().copied().collect(),
        }
    }
}

impl KeySource for ScriptedKeys {
    fn poll_key(&mut self) -> Result<Option<char>> {
        Ok(self.keys.pop_front())
    }
}
