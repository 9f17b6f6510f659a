// Copyright (C) 2023, Alex Badics
// This file is part of isense-console
// Licensed under the MIT license. See LICENSE file in the project root for details.

use std::path::{Path, PathBuf};

use libloading::Library;

use crate::{Error, Result};

#[cfg(target_os = "windows")]
const LIBRARY_NAMES: &[&str] = &["isense.dll"];
#[cfg(target_os = "macos")]
const LIBRARY_NAMES: &[&str] = &["libisense.dylib", "./libisense.dylib"];
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const LIBRARY_NAMES: &[&str] = &["libisense.so", "./libisense.so"];

fn library_candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
    match explicit {
        Some(path) => vec![path.to_path_buf()],
        None => LIBRARY_NAMES.iter().map(PathBuf::from).collect(),
    }
}

/// Load the driver library from the explicit path, or from the first of the
/// platform default names that can be loaded.
pub fn load_driver_library(explicit: Option<&Path>) -> Result<Library> {
    let mut last_error = None;
    for candidate in library_candidates(explicit) {
        // Safety: the driver library has no initialization routines with
        // requirements on the loading thread.
        match unsafe { Library::new(&candidate) } {
            Ok(library) => {
                log::info!("Loaded driver library {}", candidate.display());
                return Ok(library);
            }
            Err(e) => {
                log::debug!("Could not load {}: {}", candidate.display(), e);
                last_error = Some(e);
            }
        }
    }
    Err(last_error.map_or(Error::NotFound, Error::Library))
}

/// Convert a NUL terminated C character array into a String
pub fn c_chars_to_string(chars: &[u8]) -> String {
    String::from_utf8_lossy(&chars.iter().copied().take_while(|c| *c != 0).collect::<Vec<_>>())
        .into_owned()
}
