// Copyright (C) 2023, Alex Badics
// This file is part of isense-console
// Licensed under the MIT license. See LICENSE file in the project root for details.

//! Non-blocking single key input. See [`TerminalKeys`]

use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal,
};

use crate::{command::ESC, Result};

/// Source of operator key presses
pub trait KeySource {
    /// Return the next key press, if there is one. Must never block.
    fn poll_key(&mut self) -> Result<Option<char>>;
}

/// Key presses from the terminal. The terminal is put into raw mode, so keys
/// arrive without waiting for Enter. Raw mode is switched off on drop.
pub struct TerminalKeys {
    _private: (),
}

impl TerminalKeys {
    /// Switch the terminal to raw mode
    pub fn new() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self { _private: () })
    }
}

impl KeySource for TerminalKeys {
    fn poll_key(&mut self) -> Result<Option<char>> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if let Some(c) = key_to_char(key) {
                    return Ok(Some(c));
                }
            }
        }
        Ok(None)
    }
}

impl Drop for TerminalKeys {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            log::warn!("Could not restore terminal mode: {e}");
        }
    }
}

fn key_to_char(key: KeyEvent) -> Option<char> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        // Raw mode swallows Ctrl-C, so treat it as a quit request
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(ESC),
        KeyCode::Char(c) => Some(c),
        KeyCode::Esc => Some(ESC),
        KeyCode::Enter => Some('\n'),
        _ => None,
    }
}
