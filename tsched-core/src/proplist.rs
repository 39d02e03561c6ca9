// Copyright 2017 Lyndon Brown
//
// This file is part of the PulseAudio Rust language binding.
//
// Licensed under the MIT license or the Apache license (version 2.0), at your option. You may not
// copy, modify, or distribute this file except in compliance with said license. You can find copies
// of these licenses either in the LICENSE-MIT and LICENSE-APACHE files, or alternatively at
// <http://opensource.org/licenses/MIT> and <http://www.apache.org/licenses/LICENSE-2.0>
// respectively.

//! A property list: string key/value metadata attached to a sink, carried through from
//! [`crate::config::SinkConfig::sink_properties`] (spec §B.3).
//!
//! Unlike PulseAudio's client-protocol proplists, these never cross a wire; this is a plain
//! in-process string map, kept here because callers of the Sink Facade expect the familiar
//! property-list shape (e.g. `"device.description"`, `"device.string"`).

use std::collections::BTreeMap;
use std::fmt;

/// A string-keyed, string-valued property list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Proplist {
    entries: BTreeMap<String, String>,
}

impl Proplist {
    /// An empty property list.
    pub fn new() -> Self {
        Proplist::default()
    }

    /// Sets a key, replacing any existing value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Looks up a key's value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Removes a key, returning its prior value if present.
    pub fn unset(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Whether the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Merges `other` into `self`; entries in `other` take priority on key collision.
    pub fn merge(&mut self, other: &Proplist) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    /// Iterates the entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for Proplist {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.entries {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}=\"{}\"", k, v)?;
            first = false;
        }
        Ok(())
    }
}

impl FromIterator<(String, String)> for Proplist {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Proplist { entries: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let mut p = Proplist::new();
        p.set("device.description", "Built-in Audio");
        assert_eq!(p.get("device.description"), Some("Built-in Audio"));
    }

    #[test]
    fn merge_prefers_other() {
        let mut base = Proplist::new();
        base.set("a", "1");
        let mut incoming = Proplist::new();
        incoming.set("a", "2");
        base.merge(&incoming);
        assert_eq!(base.get("a"), Some("2"));
    }
}
