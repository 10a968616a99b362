//! Computer-keyboard bindings for the piano keys.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::notes;

/// Default key → note table. Every note has exactly one key and every key
/// plays exactly one note.
///
/// - first octave on the top row starting at `e`, sharps on the digits
/// - second octave from `x`, sharps on the home row
/// - third octave on the right-hand cluster from `k`
///
/// `i`, `o`, `b`, `j` and `m` keep their first (lower) note. The notes
/// they used to double for moved to free keys: G2 to `s`, C3 to `-`,
/// C#3 to `=`, D#3 to `'` and E3 to `/`. The top C is on `]`.
pub static DEFAULT_BINDINGS: [(&str, &str); 37] = [
    ("e", "C"),
    ("4", "C#"),
    ("r", "D"),
    ("5", "D#"),
    ("t", "E"),
    ("y", "F"),
    ("7", "F#"),
    ("u", "G"),
    ("8", "G#"),
    ("i", "A"),
    ("9", "A#"),
    ("o", "B"),
    ("x", "C2"),
    ("d", "C#2"),
    ("c", "D2"),
    ("f", "D#2"),
    ("v", "E2"),
    ("b", "F2"),
    ("g", "F#2"),
    ("s", "G2"),
    ("h", "G#2"),
    ("n", "A2"),
    ("j", "A#2"),
    ("m", "B2"),
    ("-", "C3"),
    ("=", "C#3"),
    ("k", "D3"),
    ("'", "D#3"),
    ("/", "E3"),
    ("0", "F3"),
    (",", "F#3"),
    (".", "G3"),
    ("l", "G#3"),
    (";", "A3"),
    ("p", "A#3"),
    ("[", "B3"),
    ("]", "C4"),
];

/// A single key binding, as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub key: String,
    pub note: String,
}

/// Validated key → note lookup.
#[derive(Debug, Clone)]
pub struct KeyMap {
    bindings: HashMap<String, String>,
}

impl KeyMap {
    /// Build a key map, rejecting keys bound twice and unknown notes.
    pub fn from_bindings<K, N>(
        bindings: impl IntoIterator<Item = (K, N)>,
    ) -> Result<Self, ConfigError>
    where
        K: AsRef<str>,
        N: AsRef<str>,
    {
        let mut map: HashMap<String, String> = HashMap::new();
        for (key, note) in bindings {
            let key = normalize_key(key.as_ref());
            let note = note.as_ref();
            if !notes::is_note(note) {
                return Err(ConfigError::UnknownNote {
                    key,
                    note: note.to_string(),
                });
            }
            if let Some(first) = map.get(&key) {
                return Err(ConfigError::DuplicateBinding {
                    key,
                    first: first.clone(),
                    second: note.to_string(),
                });
            }
            map.insert(key, note.to_string());
        }
        Ok(KeyMap { bindings: map })
    }

    /// Build from configuration entries.
    pub fn from_config(bindings: &[KeyBinding]) -> Result<Self, ConfigError> {
        Self::from_bindings(bindings.iter().map(|b| (&b.key, &b.note)))
    }

    /// The note bound to a `KeyboardEvent.key` value, if any.
    pub fn note_for(&self, key: &str) -> Option<&str> {
        self.bindings.get(&normalize_key(key)).map(String::as_str)
    }

    /// The key that plays `note`, if one is bound.
    pub fn key_for(&self, note: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(_, n)| n.as_str() == note)
            .map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        let bindings = DEFAULT_BINDINGS
            .iter()
            .map(|&(key, note)| (key.to_string(), note.to_string()))
            .collect();
        KeyMap { bindings }
    }
}

/// Single letters match regardless of Shift / Caps Lock.
fn normalize_key(key: &str) -> String {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => c.to_ascii_lowercase().to_string(),
        _ => key.to_string(),
    }
}
