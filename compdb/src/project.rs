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

use std::{
    path::{Path, PathBuf},
    thread::{self, ThreadId},
};

use log::debug;

#[cfg(test)]
use mockall::automock;

use crate::{
    command::{self, property_or},
    Error, FileConfig, HeaderLanguage,
};

/// Item type of compilable translation units.
pub const ITEM_TYPE_COMPILE: &str = "ClCompile";

/// Item type of header files.
pub const ITEM_TYPE_INCLUDE: &str = "ClInclude";

/// The standard compiler tool; anything else is a custom build step.
pub const COMPILE_TOOL: &str = "CL";

/// Project configuration types that actually run the compiler.
const BUILDABLE_CONFIGURATION_TYPES: [&str; 4] =
    ["Application", "DynamicLibrary", "StaticLibrary", "Utility"];

/// A property read can fail two distinct ways: the host version does not
/// carry the property at all, or the read itself faulted. Neither is the
/// unsupported-*value* error of the flag converters.
#[derive(Debug, thiserror::Error)]
pub enum PropertyError {
    #[error("property '{0}' is not supported by this host version")]
    Unsupported(String),

    #[error("reading property '{0}' failed: {1}")]
    Read(String, String),
}

/// Per-file, per-configuration property snapshot from the host project
/// model. Read-only; re-fetched on every resolution.
#[cfg_attr(test, automock)]
pub trait PropertyBag {
    fn property(&self, name: &str) -> Result<String, PropertyError>;
}

/// The host project model boundary.
///
/// Every accessor answers `None` when the file is not under its purview;
/// the resolver turns that into "file not analyzable", not an error.
#[cfg_attr(test, automock)]
pub trait ProjectModel {
    /// Item type of the file within its project, if it belongs to one.
    fn item_type(&self, file: &Path) -> Option<String>;

    /// Configuration type of the project owning the file.
    fn configuration_type(&self, file: &Path) -> Option<String>;

    /// Name of the tool compiling the file in the active configuration.
    fn compile_tool(&self, file: &Path) -> Option<String>;

    /// Property snapshot of the active compiler configuration for the file.
    fn active_properties(&self, file: &Path) -> Option<Box<dyn PropertyBag + Send>>;

    /// Platform executable path of the compiler for the file's active
    /// configuration, used when `ClCompilerPath` is blank.
    fn compiler_executable(&self, file: &Path) -> Option<String>;
}

/// Capability marking the single thread the host mandates for project-model
/// access. Hosts with a thread-safe model simply don't install one.
#[derive(Debug, Clone, Copy)]
pub struct ProjectThreadCheck {
    owner: ThreadId,
}

impl ProjectThreadCheck {
    /// Captures the calling thread as the owner.
    pub fn new() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    /// Fails fast in debug builds when called off the owner thread.
    pub fn assert_owner(&self) {
        debug_assert_eq!(
            self.owner,
            thread::current().id(),
            "project model accessed off its owner thread"
        );
    }
}

impl Default for ProjectThreadCheck {
    fn default() -> Self {
        Self::new()
    }
}

/// Decides whether a file is analyzable and, if so, derives its full build
/// configuration from the host project model.
pub struct FileConfigResolver<'a> {
    model: &'a dyn ProjectModel,
    thread_check: Option<&'a ProjectThreadCheck>,
}

impl<'a> FileConfigResolver<'a> {
    pub fn new(model: &'a dyn ProjectModel) -> Self {
        Self {
            model,
            thread_check: None,
        }
    }

    pub fn with_thread_check(model: &'a dyn ProjectModel, check: &'a ProjectThreadCheck) -> Self {
        Self {
            model,
            thread_check: Some(check),
        }
    }

    /// Resolves the build configuration of `file`.
    ///
    /// `Ok(None)` means the file does not belong in the database: not part
    /// of a native project, not a compilable or header item, a non-buildable
    /// project kind, or compiled by a custom build tool. Only an unsupported
    /// property value is an actual failure.
    pub fn resolve(&self, file: &Path) -> Result<Option<FileConfig>, Error> {
        if let Some(check) = self.thread_check {
            check.assert_owner();
        }

        let item_type = match self.model.item_type(file) {
            Some(item_type) => item_type,
            None => {
                debug!("Skipping {:?}: not part of any native project.", file);
                return Ok(None);
            }
        };

        let is_header = match item_type.as_str() {
            ITEM_TYPE_COMPILE => false,
            ITEM_TYPE_INCLUDE => true,
            other => {
                debug!("Skipping {:?}: item type '{}' is not analyzable.", file, other);
                return Ok(None);
            }
        };

        match self.model.configuration_type(file) {
            Some(configuration_type)
                if BUILDABLE_CONFIGURATION_TYPES.contains(&configuration_type.as_str()) => {}
            Some(other) => {
                debug!("Skipping {:?}: configuration type '{}' is not buildable.", file, other);
                return Ok(None);
            }
            None => {
                debug!("Skipping {:?}: no active configuration.", file);
                return Ok(None);
            }
        }

        match self.model.compile_tool(file) {
            Some(tool) if tool == COMPILE_TOOL => {}
            Some(tool) => {
                debug!("Skipping {:?}: compiled by custom build tool '{}'.", file, tool);
                return Ok(None);
            }
            None => {
                debug!("Skipping {:?}: no compile tool for the active configuration.", file);
                return Ok(None);
            }
        }

        let properties = match self.model.active_properties(file) {
            Some(properties) => properties,
            None => {
                debug!("Skipping {:?}: no active compiler properties.", file);
                return Ok(None);
            }
        };

        let compiler = self.resolve_compiler_path(&*properties, file);

        let command = command::build_command(&*properties, &compiler, file, is_header)?;

        let include_override = match property_or(&*properties, "IncludePath", "") {
            value if value.is_empty() => None,
            value => Some(value),
        };

        let header_language = if is_header {
            if property_or(&*properties, "CompileAs", "") == "CompileAsC" {
                Some(HeaderLanguage::C)
            } else {
                Some(HeaderLanguage::Cpp)
            }
        } else {
            None
        };

        let directory = file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Some(FileConfig {
            directory,
            file: file.to_path_buf(),
            command,
            include_override,
            is_header,
            header_language,
        }))
    }

    fn resolve_compiler_path(&self, properties: &dyn PropertyBag, file: &Path) -> String {
        let primary = property_or(properties, "ClCompilerPath", "");
        if !primary.is_empty() {
            return primary;
        }

        match self.model.compiler_executable(file) {
            Some(executable) if !executable.is_empty() => executable,
            _ => {
                debug!("No compiler path for {:?}, assuming cl.exe on PATH.", file);
                "cl.exe".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn bag(pairs: &[(&str, &str)]) -> Box<dyn PropertyBag + Send> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        struct Bag(HashMap<String, String>);
        impl PropertyBag for Bag {
            fn property(&self, name: &str) -> Result<String, PropertyError> {
                self.0
                    .get(name)
                    .cloned()
                    .ok_or_else(|| PropertyError::Unsupported(name.to_string()))
            }
        }

        Box::new(Bag(map))
    }

    fn model_for(
        item_type: &'static str,
        properties: &'static [(&'static str, &'static str)],
    ) -> MockProjectModel {
        let mut model = MockProjectModel::new();
        model.expect_item_type().returning(move |_| Some(item_type.to_string()));
        model
            .expect_configuration_type()
            .returning(|_| Some("Application".to_string()));
        model
            .expect_compile_tool()
            .returning(|_| Some(COMPILE_TOOL.to_string()));
        model
            .expect_active_properties()
            .returning(move |_| Some(bag(properties)));
        model.expect_compiler_executable().returning(|_| None);
        model
    }

    #[test]
    fn file_outside_any_project_resolves_to_none() {
        let mut model = MockProjectModel::new();
        model.expect_item_type().returning(|_| None);

        let sut = FileConfigResolver::new(&model);

        assert!(sut.resolve(Path::new("C:\\elsewhere\\a.cpp")).unwrap().is_none());
    }

    #[test]
    fn non_compilable_item_type_resolves_to_none() {
        let mut model = MockProjectModel::new();
        model.expect_item_type().returning(|_| Some("Text".to_string()));

        let sut = FileConfigResolver::new(&model);

        assert!(sut.resolve(Path::new("C:\\src\\readme.txt")).unwrap().is_none());
    }

    #[test]
    fn unbuildable_configuration_resolves_to_none() {
        let mut model = MockProjectModel::new();
        model
            .expect_item_type()
            .returning(|_| Some(ITEM_TYPE_COMPILE.to_string()));
        model
            .expect_configuration_type()
            .returning(|_| Some("Makefile".to_string()));

        let sut = FileConfigResolver::new(&model);

        assert!(sut.resolve(Path::new("C:\\src\\a.cpp")).unwrap().is_none());
    }

    #[test]
    fn custom_build_tool_resolves_to_none() {
        let mut model = MockProjectModel::new();
        model
            .expect_item_type()
            .returning(|_| Some(ITEM_TYPE_COMPILE.to_string()));
        model
            .expect_configuration_type()
            .returning(|_| Some("Application".to_string()));
        model
            .expect_compile_tool()
            .returning(|_| Some("CustomBuild".to_string()));

        let sut = FileConfigResolver::new(&model);

        assert!(sut.resolve(Path::new("C:\\src\\generated.cpp")).unwrap().is_none());
    }

    #[test]
    fn source_file_resolves_with_command() {
        let model = model_for(
            ITEM_TYPE_COMPILE,
            &[
                ("ClCompilerPath", "C:\\tools\\cl.exe"),
                ("LanguageStandard", "stdcpp17"),
            ],
        );

        let sut = FileConfigResolver::new(&model);

        let config = sut.resolve(Path::new("C:\\src\\a.cpp")).unwrap().unwrap();

        assert!(!config.is_header);
        assert_eq!(None, config.header_language);
        assert_eq!(Path::new("C:\\src\\a.cpp"), config.file.as_path());
        assert!(config.command.starts_with("\"C:\\tools\\cl.exe\""));
        assert!(config.command.contains("/std:c++17"));
    }

    #[test]
    fn header_detects_sub_language() {
        let c_model = model_for(ITEM_TYPE_INCLUDE, &[("CompileAs", "CompileAsC")]);
        let config = FileConfigResolver::new(&c_model)
            .resolve(Path::new("C:\\src\\a.h"))
            .unwrap()
            .unwrap();
        assert!(config.is_header);
        assert_eq!(Some(HeaderLanguage::C), config.header_language);

        let cpp_model = model_for(ITEM_TYPE_INCLUDE, &[]);
        let config = FileConfigResolver::new(&cpp_model)
            .resolve(Path::new("C:\\src\\b.h"))
            .unwrap()
            .unwrap();
        assert_eq!(Some(HeaderLanguage::Cpp), config.header_language);
    }

    #[test]
    fn compiler_path_falls_back_to_platform_executable() {
        let mut model = MockProjectModel::new();
        model
            .expect_item_type()
            .returning(|_| Some(ITEM_TYPE_COMPILE.to_string()));
        model
            .expect_configuration_type()
            .returning(|_| Some("Application".to_string()));
        model
            .expect_compile_tool()
            .returning(|_| Some(COMPILE_TOOL.to_string()));
        model.expect_active_properties().returning(|_| Some(bag(&[])));
        model
            .expect_compiler_executable()
            .returning(|_| Some("C:\\vs\\cl.exe".to_string()));

        let sut = FileConfigResolver::new(&model);

        let config = sut.resolve(Path::new("C:\\src\\a.cpp")).unwrap().unwrap();

        assert!(config.command.starts_with("\"C:\\vs\\cl.exe\""));
    }

    #[test]
    fn include_path_property_becomes_override() {
        let model = model_for(ITEM_TYPE_COMPILE, &[("IncludePath", "C:\\sdk\\include")]);

        let sut = FileConfigResolver::new(&model);

        let config = sut.resolve(Path::new("C:\\src\\a.cpp")).unwrap().unwrap();

        assert_eq!(Some("C:\\sdk\\include".to_string()), config.include_override);
    }

    #[test]
    fn unsupported_value_propagates() {
        let model = model_for(ITEM_TYPE_COMPILE, &[("RuntimeLibrary", "SingleThreaded")]);

        let sut = FileConfigResolver::new(&model);

        assert!(sut.resolve(Path::new("C:\\src\\a.cpp")).is_err());
    }

    #[test]
    fn resolution_on_owner_thread_passes_check() {
        let model = model_for(ITEM_TYPE_COMPILE, &[]);
        let check = ProjectThreadCheck::new();

        let sut = FileConfigResolver::with_thread_check(&model, &check);

        assert!(sut.resolve(Path::new("C:\\src\\a.cpp")).unwrap().is_some());
    }
}
