// Copyright (C) 2023, Alex Badics
// This file is part of isense-console
// Licensed under the MIT license. See LICENSE file in the project root for details.

//! Single key operator commands. See [`Command::from_key`]

use crate::MAX_STATIONS;

/// The escape key, as delivered by [`crate::keyboard::KeySource`]
pub const ESC: char = '\u{1b}';

/// Raw bytes sent by [`Command::AuxOutput`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxPattern {
    /// All outputs on
    AllOn,
    /// All outputs off
    AllOff,
}

impl AuxPattern {
    /// Bytes to send to the auxiliary port
    pub fn bytes(self) -> [u8; 4] {
        match self {
            AuxPattern::AllOn => [255, 255, 0, 0],
            AuxPattern::AllOff => [0, 0, 0, 0],
        }
    }
}

/// Something the operator asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Cycle the enhancement level of the current station
    CycleEnhancement,
    /// Cycle the compass mode of the current station
    CycleCompass,
    /// Cycle the sensitivity of the current station
    CycleSensitivity,
    /// Cycle the prediction interval of the current station
    CyclePrediction,
    /// Toggle timestamped records on the current station
    ToggleTimestamp,
    /// Print the tracker statistics table
    ShowStats,
    /// Reset the heading of the current station
    ResetHeading,
    /// Make the station current
    SelectStation(u16),
    /// Send a fixed pattern to the auxiliary output of the current station
    AuxOutput(AuxPattern),
    /// Leave the console
    Quit,
    /// Print the list of commands
    Help,
}

/// One row of the key table. The first key is the one shown in the help text.
pub struct Binding {
    /// Keys that trigger the command
    pub keys: &'static str,
    /// The command
    pub command: Command,
    /// Description for the help text
    pub help: &'static str,
}

macro_rules! station_binding {
    ($n:literal, $key:literal, $help:literal) => {
        Binding {
            keys: $key,
            command: Command::SelectStation($n),
            help: $help,
        }
    };
}

/// Key table, in the order it is shown in the help text
pub const BINDINGS: &[Binding] = &[
    Binding {
        keys: "q\u{1b}Q",
        command: Command::Quit,
        help: "quit",
    },
    station_binding!(1, "1", "make station 1 current"),
    station_binding!(2, "2", "make station 2 current"),
    station_binding!(3, "3", "make station 3 current"),
    station_binding!(4, "4", "make station 4 current"),
    station_binding!(5, "5", "make station 5 current"),
    station_binding!(6, "6", "make station 6 current"),
    station_binding!(7, "7", "make station 7 current"),
    station_binding!(8, "8", "make station 8 current"),
    Binding {
        keys: "Dd",
        command: Command::ShowStats,
        help: "display current settings",
    },
    Binding {
        keys: "Ee",
        command: Command::CycleEnhancement,
        help: "cycle enhancement mode",
    },
    Binding {
        keys: "Pp",
        command: Command::CyclePrediction,
        help: "cycle prediction",
    },
    Binding {
        keys: "Cc",
        command: Command::CycleCompass,
        help: "cycle compass",
    },
    Binding {
        keys: "Ss",
        command: Command::CycleSensitivity,
        help: "cycle sensitivity",
    },
    Binding {
        keys: "Tt",
        command: Command::ToggleTimestamp,
        help: "toggle time stamps",
    },
    Binding {
        keys: "Rr",
        command: Command::ResetHeading,
        help: "reset heading",
    },
    Binding {
        keys: "A",
        command: Command::AuxOutput(AuxPattern::AllOn),
        help: "turn auxiliary outputs on",
    },
    Binding {
        keys: "a",
        command: Command::AuxOutput(AuxPattern::AllOff),
        help: "turn auxiliary outputs off",
    },
];

impl Command {
    /// Look up the command bound to a key. Unbound keys ask for help.
    pub fn from_key(key: char) -> Command {
        BINDINGS
            .iter()
            .find(|binding| binding.keys.contains(key))
            .map_or(Command::Help, |binding| binding.command)
    }
}

impl Binding {
    /// Key shown in the help text
    pub fn label(&self) -> char {
        self.keys.chars().next().unwrap_or('?')
    }
}

const _: () = assert!(MAX_STATIONS == 8, "station key bindings cover 8 stations");
