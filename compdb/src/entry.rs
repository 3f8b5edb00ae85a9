/*
   Copyright (C) 2026 by the vcdb developers

   This file is part of vcdb.

   vcdb is a live compilation database engine for C/C++ IDE integration.

   vcdb is free software: you can redistribute it and/or modify
   it under the terms of the GNU General Public License as published by
   the Free Software Foundation, either version 3 of the License, or
   (at your option) any later version.

   vcdb is distributed in the hope that it will be useful,
   but WITHOUT ANY WARRANTY; without even the implied warranty of
   MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
   GNU General Public License for more details.

   You should have received a copy of the GNU General Public License
   along with vcdb.  If not, see <https://www.gnu.org/licenses/>.
*/

use log::debug;

use crate::{Entry, FileConfig, HEADER_FILE_MARKER, INCLUDE_VAR};

/// Turns resolved file configurations into persistable entries, overlaying
/// per-file variables on a static snapshot of the process environment.
#[derive(Debug, Clone)]
pub struct EntryBuilder {
    environment: Vec<(String, String)>,
}

impl EntryBuilder {
    /// Snapshots the process environment once; the snapshot is shared by
    /// every entry built for the session.
    pub fn new() -> Self {
        Self {
            environment: std::env::vars().collect(),
        }
    }

    pub fn with_environment(environment: Vec<(String, String)>) -> Self {
        Self { environment }
    }

    /// Builds the database entry for `config`.
    ///
    /// Overlays are applied in a fixed sequence (include override, then the
    /// header marker) but each strictly replaces any same-named variable, so
    /// the outcome is deterministic regardless of snapshot order.
    pub fn build(&self, config: &FileConfig) -> Entry {
        let mut environment = self.environment.clone();

        if let Some(include) = &config.include_override {
            set_variable(&mut environment, INCLUDE_VAR, include);
        }

        if config.is_header {
            set_variable(&mut environment, HEADER_FILE_MARKER, "true");
        }

        Entry {
            file: config.file.clone(),
            directory: config.directory.clone(),
            command: config.command.clone(),
            environment: environment
                .into_iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect(),
        }
    }
}

impl Default for EntryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn set_variable(environment: &mut Vec<(String, String)>, name: &str, value: &str) {
    match environment.iter_mut().find(|(existing, _)| existing == name) {
        Some((_, existing)) => {
            debug!(
                "Overriding environment variable {}: '{}' -> '{}'.",
                name, existing, value
            );
            *existing = value.to_string();
        }
        None => {
            debug!("Defining environment variable {}={}.", name, value);
            environment.push((name.to_string(), value.to_string()));
        }
    }
}
