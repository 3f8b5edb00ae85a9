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

use std::collections::BTreeMap;

use lazy_static::lazy_static;

use crate::Error;

/// How one build property translates into compiler flags.
#[derive(Debug, Clone, Copy)]
pub enum FlagMapping {
    /// Multi-valued, separator-delimited; every element becomes its own flag.
    List { prefix: &'static str, quoted: bool },

    /// Closed value set; anything outside it is an unsupported-value error.
    Enum(&'static [(&'static str, &'static str)]),

    /// Emits the flag only when the value equals the trigger.
    BoolEquals {
        trigger: &'static str,
        flag: &'static str,
    },

    /// "true" and "false" each map to a flag; anything else emits nothing.
    BoolPair {
        on: &'static str,
        off: &'static str,
    },
}

/// List-valued properties, in command-line order.
pub const LIST_PROPERTIES: [&str; 4] = [
    "AdditionalIncludeDirectories",
    "PreprocessorDefinitions",
    "UndefinePreprocessorDefinitions",
    "ForcedIncludeFiles",
];

/// Boolean and enum properties, in the stable order they appear on the
/// command line.
pub const TOGGLE_PROPERTIES: [&str; 17] = [
    "ExceptionHandling",
    "RuntimeLibrary",
    "BasicRuntimeChecks",
    "EnableEnhancedInstructionSet",
    "StructMemberAlignment",
    "CallingConvention",
    "FloatingPointModel",
    "ConformanceMode",
    "RuntimeTypeInfo",
    "TreatWChar_tAsBuiltInType",
    "ForceConformanceInForLoopScope",
    "OpenMPSupport",
    "IntrinsicFunctions",
    "DisableLanguageExtensions",
    "IgnoreStandardIncludePath",
    "UseFullPaths",
    "OmitDefaultLibName",
];

/// Language and dialect properties, emitted after the toggles.
pub const LANGUAGE_PROPERTIES: [&str; 3] =
    ["LanguageStandard", "LanguageStandard_C", "CompileAs"];

const FLAG_MAPPING: [(&str, FlagMapping); 24] = [
    (
        "AdditionalIncludeDirectories",
        FlagMapping::List {
            prefix: "/I",
            quoted: true,
        },
    ),
    (
        "PreprocessorDefinitions",
        FlagMapping::List {
            prefix: "/D",
            quoted: false,
        },
    ),
    (
        "UndefinePreprocessorDefinitions",
        FlagMapping::List {
            prefix: "/U",
            quoted: false,
        },
    ),
    (
        "ForcedIncludeFiles",
        FlagMapping::List {
            prefix: "/FI",
            quoted: true,
        },
    ),
    (
        "LanguageStandard",
        FlagMapping::Enum(&[
            ("stdcpp14", "/std:c++14"),
            ("stdcpp17", "/std:c++17"),
            ("stdcpp20", "/std:c++20"),
            ("stdcpplatest", "/std:c++latest"),
        ]),
    ),
    (
        "LanguageStandard_C",
        FlagMapping::Enum(&[
            ("stdc11", "/std:c11"),
            ("stdc17", "/std:c17"),
            ("stdc23", "/std:c23"),
            ("stdclatest", "/std:clatest"),
        ]),
    ),
    (
        "ExceptionHandling",
        FlagMapping::Enum(&[
            ("Async", "/EHa"),
            ("Sync", "/EHsc"),
            ("SyncCThrow", "/EHs"),
            ("false", ""),
        ]),
    ),
    (
        "RuntimeLibrary",
        FlagMapping::Enum(&[
            ("MultiThreaded", "/MT"),
            ("MultiThreadedDebug", "/MTd"),
            ("MultiThreadedDLL", "/MD"),
            ("MultiThreadedDebugDLL", "/MDd"),
        ]),
    ),
    (
        "BasicRuntimeChecks",
        FlagMapping::Enum(&[
            ("StackFrameRuntimeCheck", "/RTCs"),
            ("UninitializedLocalUsageCheck", "/RTCu"),
            ("EnableFastChecks", "/RTC1"),
        ]),
    ),
    (
        "EnableEnhancedInstructionSet",
        FlagMapping::Enum(&[
            ("AdvancedVectorExtensions", "/arch:AVX"),
            ("AdvancedVectorExtensions2", "/arch:AVX2"),
            ("AdvancedVectorExtensions512", "/arch:AVX512"),
            ("StreamingSIMDExtensions", "/arch:SSE"),
            ("StreamingSIMDExtensions2", "/arch:SSE2"),
            ("NoExtensions", "/arch:IA32"),
            ("NotSet", ""),
        ]),
    ),
    (
        "StructMemberAlignment",
        FlagMapping::Enum(&[
            ("1Byte", "/Zp1"),
            ("2Bytes", "/Zp2"),
            ("4Bytes", "/Zp4"),
            ("8Bytes", "/Zp8"),
            ("16Bytes", "/Zp16"),
        ]),
    ),
    (
        "CallingConvention",
        FlagMapping::Enum(&[
            ("Cdecl", "/Gd"),
            ("FastCall", "/Gr"),
            ("StdCall", "/Gz"),
            ("VectorCall", "/Gv"),
        ]),
    ),
    (
        "FloatingPointModel",
        FlagMapping::Enum(&[
            ("Precise", "/fp:precise"),
            ("Strict", "/fp:strict"),
            ("Fast", "/fp:fast"),
        ]),
    ),
    (
        "CompileAs",
        FlagMapping::Enum(&[("CompileAsC", "/TC"), ("CompileAsCpp", "/TP")]),
    ),
    (
        "ConformanceMode",
        FlagMapping::BoolPair {
            on: "/permissive-",
            off: "/permissive",
        },
    ),
    (
        "RuntimeTypeInfo",
        FlagMapping::BoolPair {
            on: "/GR",
            off: "/GR-",
        },
    ),
    (
        "TreatWChar_tAsBuiltInType",
        FlagMapping::BoolPair {
            on: "/Zc:wchar_t",
            off: "/Zc:wchar_t-",
        },
    ),
    (
        "ForceConformanceInForLoopScope",
        FlagMapping::BoolPair {
            on: "/Zc:forScope",
            off: "/Zc:forScope-",
        },
    ),
    (
        "OpenMPSupport",
        FlagMapping::BoolEquals {
            trigger: "true",
            flag: "/openmp",
        },
    ),
    (
        "IntrinsicFunctions",
        FlagMapping::BoolEquals {
            trigger: "true",
            flag: "/Oi",
        },
    ),
    (
        "DisableLanguageExtensions",
        FlagMapping::BoolEquals {
            trigger: "true",
            flag: "/Za",
        },
    ),
    (
        "IgnoreStandardIncludePath",
        FlagMapping::BoolEquals {
            trigger: "true",
            flag: "/X",
        },
    ),
    (
        "UseFullPaths",
        FlagMapping::BoolEquals {
            trigger: "true",
            flag: "/FC",
        },
    ),
    (
        "OmitDefaultLibName",
        FlagMapping::BoolEquals {
            trigger: "true",
            flag: "/Zl",
        },
    ),
];

lazy_static! {
    static ref FLAG_MAPPING_MAP: BTreeMap<&'static str, FlagMapping> =
        FLAG_MAPPING.iter().copied().collect();
}

/// Converts one property value into its compiler flags.
///
/// The empty string and the `"Default"` sentinel always convert to no flags,
/// for every property kind; the host reports both for properties left at
/// their project defaults. An enum value outside the documented domain is an
/// [`Error::UnsupportedValue`], never silently dropped.
pub fn convert(property: &str, value: &str) -> Result<Vec<String>, Error> {
    if value.is_empty() || value == "Default" {
        return Ok(vec![]);
    }

    let mapping = match FLAG_MAPPING_MAP.get(property) {
        Some(mapping) => mapping,
        None => {
            return Err(Error::UnsupportedValue {
                property: property.to_string(),
                value: value.to_string(),
            })
        }
    };

    match mapping {
        FlagMapping::List { prefix, quoted } => Ok(convert_list(value, prefix, *quoted)),

        FlagMapping::Enum(domain) => match domain.iter().find(|(name, _)| *name == value) {
            Some((_, "")) => Ok(vec![]),
            Some((_, flag)) => Ok(vec![flag.to_string()]),
            None => Err(Error::UnsupportedValue {
                property: property.to_string(),
                value: value.to_string(),
            }),
        },

        FlagMapping::BoolEquals { trigger, flag } => {
            if value == *trigger {
                Ok(vec![flag.to_string()])
            } else {
                Ok(vec![])
            }
        }

        FlagMapping::BoolPair { on, off } => match value {
            "true" => Ok(vec![on.to_string()]),
            "false" => Ok(vec![off.to_string()]),
            _ => Ok(vec![]),
        },
    }
}

/// Splits a separator-delimited property value into per-element flags.
///
/// Empty elements and MSBuild `%(...)` inheritance placeholders are not
/// values the compiler ever sees, so they are skipped.
fn convert_list(value: &str, prefix: &str, quoted: bool) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|element| !element.is_empty() && !element.starts_with("%("))
        .map(|element| {
            if quoted {
                format!("{}{}", prefix, util::quote(element))
            } else {
                format!("{}{}", prefix, element)
            }
        })
        .collect()
}
