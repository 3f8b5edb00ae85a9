use std::path::MAIN_SEPARATOR;

use lazy_static::lazy_static;
use regex::Regex;

/// Wraps a path in double quotes, unless it is already a single
/// balanced-quoted string. Applying it twice yields the same result.
pub fn quote(path: impl AsRef<str>) -> String {
    lazy_static! {
        static ref QUOTED: Regex = Regex::new(r#"^"[^"]*"$"#).unwrap();
    }

    let path = path.as_ref();
    if QUOTED.is_match(path) {
        path.to_string()
    } else {
        format!("\"{}\"", path)
    }
}

/// Rewrites a path to use the platform's preferred separator, collapses
/// runs of separators and strips trailing ones.
///
/// A leading separator pair is preserved, so UNC paths survive.
pub fn normalize_path(path: impl AsRef<str>) -> String {
    let path = path.as_ref();

    let mut result = String::with_capacity(path.len());
    let mut previous_separator = false;
    for (index, character) in path.chars().enumerate() {
        if character == '/' || character == '\\' {
            if previous_separator && index != 1 {
                continue;
            }
            result.push(MAIN_SEPARATOR);
            previous_separator = true;
        } else {
            result.push(character);
            previous_separator = false;
        }
    }

    while result.len() > 1
        && result.ends_with(MAIN_SEPARATOR)
        && !result[..result.len() - 1].ends_with(':')
    {
        result.pop();
    }

    result
}

/// Compares two entry keys the way the host file system does:
/// separator-normalized and case-insensitive.
pub fn keys_equivalent(left: impl AsRef<str>, right: impl AsRef<str>) -> bool {
    normalize_path(left).to_lowercase() == normalize_path(right).to_lowercase()
}
