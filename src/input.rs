//! Input binding: turns pointer, touch and keyboard events into
//! press / release actions on notes.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::keymap::KeyMap;

/// A UI event. Pointer and touch events carry the `data-note` of the key
/// control they hit; keyboard events carry `KeyboardEvent.key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum InputEvent {
    KeyDown(String),
    KeyUp(String),
    PointerDown(String),
    PointerUp(String),
    PointerLeave(String),
    TouchStart(String),
    TouchEnd(String),
    TouchCancel(String),
}

impl InputEvent {
    /// Touch events suppress the browser's default scrolling.
    pub fn prevents_default(&self) -> bool {
        matches!(
            self,
            InputEvent::TouchStart(_) | InputEvent::TouchEnd(_) | InputEvent::TouchCancel(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Press(String),
    Release(String),
}

#[derive(Debug, Clone)]
pub struct Controller {
    keymap: KeyMap,
    /// Notes held down on the computer keyboard.
    held_keys: HashSet<String>,
    /// Notes held down by mouse or touch.
    held_pointers: HashSet<String>,
}

impl Controller {
    pub fn new(keymap: KeyMap) -> Self {
        Controller {
            keymap,
            held_keys: HashSet::new(),
            held_pointers: HashSet::new(),
        }
    }

    /// Translate one event. Returns `None` when the event does nothing:
    /// unbound keys, key repeat while held, or a pointer leaving a key it
    /// never pressed.
    pub fn handle(&mut self, event: &InputEvent) -> Option<Action> {
        match event {
            InputEvent::KeyDown(key) => {
                let note = self.keymap.note_for(key)?;
                if self.held_keys.contains(note) {
                    return None;
                }
                let note = note.to_string();
                self.held_keys.insert(note.clone());
                Some(Action::Press(note))
            }
            InputEvent::KeyUp(key) => {
                let note = self.keymap.note_for(key)?.to_string();
                self.held_keys.remove(&note);
                Some(Action::Release(note))
            }
            InputEvent::PointerDown(note) | InputEvent::TouchStart(note) => {
                self.held_pointers.insert(note.clone());
                Some(Action::Press(note.clone()))
            }
            InputEvent::PointerUp(note)
            | InputEvent::PointerLeave(note)
            | InputEvent::TouchEnd(note)
            | InputEvent::TouchCancel(note) => self
                .held_pointers
                .remove(note)
                .then(|| Action::Release(note.clone())),
        }
    }

    pub fn is_key_held(&self, note: &str) -> bool {
        self.held_keys.contains(note)
    }

    /// Forget every held key and pointer, e.g. when the window loses focus.
    pub fn reset(&mut self) -> Vec<Action> {
        let mut notes: Vec<String> = self
            .held_keys
            .drain()
            .chain(self.held_pointers.drain())
            .collect();
        notes.sort();
        notes.dedup();
        notes.into_iter().map(Action::Release).collect()
    }
}

impl Default for Controller {
    fn default() -> Self {
        Controller::new(KeyMap::default())
    }
}
