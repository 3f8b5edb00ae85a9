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

use std::path::Path;

use log::debug;

use crate::{
    flags::{self, LANGUAGE_PROPERTIES, LIST_PROPERTIES, TOGGLE_PROPERTIES},
    project::PropertyBag,
    Error,
};

/// The project system's default precompiled header, used when the
/// `PrecompiledHeaderFile` property is left blank.
const DEFAULT_PCH_FILE: &str = "stdafx.h";

/// Accumulates one compiler invocation in a fixed, meaningful order:
/// compiler path, list-valued flags, precompiled-header flags, toggles,
/// language flags, verbatim additional options, target file.
#[derive(Debug, Clone)]
pub struct CommandLineBuilder {
    arguments: Vec<String>,
}

impl CommandLineBuilder {
    pub fn new(compiler: impl AsRef<str>) -> Self {
        Self {
            arguments: vec![util::quote(compiler)],
        }
    }

    pub fn push_flag(&mut self, flag: impl Into<String>) {
        self.arguments.push(flag.into());
    }

    pub fn push_flags(&mut self, flags: impl IntoIterator<Item = String>) {
        self.arguments.extend(flags);
    }

    /// Appends a free-form options string exactly as the project carries it,
    /// without quoting or escaping.
    pub fn push_verbatim(&mut self, options: impl AsRef<str>) {
        let options = options.as_ref().trim();
        if !options.is_empty() {
            self.arguments.push(options.to_string());
        }
    }

    /// Appends the target file, separator-normalized and quoted.
    pub fn push_file(&mut self, file: impl AsRef<Path>) {
        let normalized = util::normalize_path(file.as_ref().to_string_lossy());
        self.arguments.push(util::quote(normalized));
    }

    pub fn build(self) -> String {
        self.arguments.join(" ")
    }
}

/// Reads a property through the host boundary, substituting the default when
/// the host version does not carry the property at all.
///
/// This recovers the missing-property failure mode only; an unsupported
/// *value* of a present property still fails in [`flags::convert`].
pub fn property_or(properties: &dyn PropertyBag, name: &str, default: &str) -> String {
    match properties.property(name) {
        Ok(value) => value,
        Err(error) => {
            debug!("Property '{}' not readable ({}), using '{}'.", name, error, default);
            default.to_string()
        }
    }
}

/// Assembles the full compiler invocation for one file.
pub fn build_command(
    properties: &dyn PropertyBag,
    compiler: &str,
    file: &Path,
    is_header: bool,
) -> Result<String, Error> {
    let mut builder = CommandLineBuilder::new(compiler);

    let mut has_forced_includes = false;
    for &property in &LIST_PROPERTIES {
        let value = property_or(properties, property, "");
        let converted = flags::convert(property, &value)?;
        if property == "ForcedIncludeFiles" {
            has_forced_includes = !converted.is_empty();
        }
        builder.push_flags(converted);
    }

    push_precompiled_header_flags(&mut builder, properties, is_header, has_forced_includes)?;

    for &property in &TOGGLE_PROPERTIES {
        let value = property_or(properties, property, "");
        builder.push_flags(flags::convert(property, &value)?);
    }

    for &property in &LANGUAGE_PROPERTIES {
        let value = property_or(properties, property, "");
        builder.push_flags(flags::convert(property, &value)?);
    }

    builder.push_verbatim(property_or(properties, "AdditionalOptions", ""));

    builder.push_file(file);

    Ok(builder.build())
}

/// Translates the precompiled-header mode into its flags.
///
/// A header compiled under PCH mode `Use` does not include the PCH header
/// itself, so unless a forced include already pulls it in, the use target is
/// force-included to keep the translation unit compilable.
fn push_precompiled_header_flags(
    builder: &mut CommandLineBuilder,
    properties: &dyn PropertyBag,
    is_header: bool,
    has_forced_includes: bool,
) -> Result<(), Error> {
    let mode = property_or(properties, "PrecompiledHeader", "");

    let pch_file = || {
        let value = property_or(properties, "PrecompiledHeaderFile", "");
        if value.is_empty() {
            DEFAULT_PCH_FILE.to_string()
        } else {
            value
        }
    };

    match mode.as_str() {
        "Use" => {
            let pch = pch_file();
            builder.push_flag(format!("/Yu{}", util::quote(&pch)));
            if is_header && !has_forced_includes {
                builder.push_flag(format!("/FI{}", util::quote(&pch)));
            }
        }
        "Create" => {
            builder.push_flag(format!("/Yc{}", util::quote(pch_file())));
        }
        "NotUsing" | "Default" | "" => {}
        other => {
            return Err(Error::UnsupportedValue {
                property: "PrecompiledHeader".to_string(),
                value: other.to_string(),
            })
        }
    }

    Ok(())
}
