//! Colon-delimited prop multiplexing.
//!
//! The WAM controller API has a single string slot (`prop`) for addressing,
//! so integer identifiers are joined with `:` (`"3:7"`, `"144:60:100"`).

use std::str::FromStr;

use plugwire_core::{WireError, WireResult};

/// Join integer identifiers into a prop string.
pub fn join<T: ToString>(parts: &[T]) -> String {
    parts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(":")
}

/// Split a prop string into segments. An empty prop has no segments.
pub fn split(prop: &str) -> Vec<&str> {
    if prop.is_empty() {
        Vec::new()
    } else {
        prop.split(':').collect()
    }
}

/// Parse one segment as an integer of type `T`.
pub fn parse<T: FromStr>(verb: &str, prop: &str, segment: &str) -> WireResult<T> {
    segment
        .trim()
        .parse()
        .map_err(|_| WireError::prop(verb, prop, format!("segment {:?} is not a valid integer", segment)))
}

/// Parse a `0`/`1` flag segment.
pub fn parse_flag(verb: &str, prop: &str, segment: &str) -> WireResult<bool> {
    match segment.trim() {
        "0" | "false" => Ok(false),
        "1" | "true" => Ok(true),
        _ => Err(WireError::prop(verb, prop, format!("segment {:?} is not a flag", segment))),
    }
}
