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

use std::path::PathBuf;

use thiserror::Error;

pub mod command;
pub mod controller;
pub mod entry;
pub mod events;
pub mod flags;
pub mod project;
pub mod store;

/// Environment variable marking an entry as a header file, consumed by the
/// downstream analysis engine.
pub const HEADER_FILE_MARKER: &str = "VCDB_HEADER_FILE";

/// Environment variable overridden when a file carries its own include path.
pub const INCLUDE_VAR: &str = "INCLUDE";

/// The fully resolved build configuration of a single file.
///
/// Built fresh on every resolution and never patched afterwards; a newer
/// resolution of the same file supersedes the old one wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConfig {
    pub directory: PathBuf,
    pub file: PathBuf,
    pub command: String,
    pub include_override: Option<String>,
    pub is_header: bool,
    pub header_language: Option<HeaderLanguage>,
}

/// Sub-language a header is analyzed as when it has no override of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLanguage {
    C,
    Cpp,
}

/// One record of the compilation database, keyed by `file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub file: PathBuf,
    pub directory: PathBuf,
    pub command: String,
    pub environment: Vec<String>,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported value '{value}' for property '{property}'.")]
    UnsupportedValue { property: String, value: String },

    #[error("The compilation database is already initialized.")]
    AlreadyInitialized,

    #[error("The compilation database is not initialized.")]
    NotInitialized,

    #[error("The compilation database store is disposed.")]
    Disposed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
