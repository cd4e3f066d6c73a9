//! Complex characters
//!
//! A cell holds one code point. Grapheme clusters (a base character plus
//! combining marks) are interned here and the cell stores the key with
//! [`CellFlags::COMPLEX`](super::cell::CellFlags::COMPLEX) set. The table
//! belongs to a screen; it is never global.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Interned grapheme clusters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplexChars {
    strings: Vec<String>,
    #[serde(skip)]
    keys: HashMap<String, u32>,
}

impl ComplexChars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key for `s`, interning it on first use
    pub fn intern(&mut self, s: &str) -> u32 {
        if let Some(&key) = self.keys.get(s) {
            return key;
        }
        let key = self.strings.len() as u32;
        self.strings.push(s.to_string());
        self.keys.insert(s.to_string(), key);
        key
    }

    pub fn get(&self, key: u32) -> Option<&str> {
        self.strings.get(key as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Rebuild the reverse map after deserialization
    pub fn reindex(&mut self) {
        self.keys = self
            .strings
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i as u32))
            .collect();
    }
}

impl PartialEq for ComplexChars {
    fn eq(&self, other: &Self) -> bool {
        self.strings == other.strings
    }
}

impl Eq for ComplexChars {}
