pub mod config;
pub mod dsp;
pub mod error;
pub mod input;
pub mod keymap;
pub mod layout;
pub mod notes;
pub mod piano;
#[cfg(feature = "web")]
pub mod web;

use crate::config::PianoConfig;
use crate::input::InputEvent;
use crate::piano::Piano;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the crate version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: frequency in Hz of a keyboard note name.
#[wasm_bindgen]
pub fn note_frequency(note: &str) -> Option<f64> {
    notes::frequency_of(note)
}

/// WASM-exposed: `display` values for content and rotate prompt at the
/// given viewport size.
#[wasm_bindgen]
pub fn orientation_layout(width: f64, height: f64) -> Result<JsValue, JsValue> {
    let layout = layout::orientation_layout(width, height);
    serde_wasm_bindgen::to_value(&layout).map_err(|e| JsValue::from_str(&format!("{e}")))
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

/// WASM-exposed piano engine for hosts that drive audio themselves
/// (e.g. from an AudioWorklet).
#[wasm_bindgen]
pub struct WasmPiano {
    inner: Piano,
}

#[wasm_bindgen]
impl WasmPiano {
    #[wasm_bindgen(constructor)]
    pub fn new(sample_rate: f64) -> WasmPiano {
        WasmPiano {
            inner: Piano::new(sample_rate),
        }
    }

    /// Build from a config object (see `PianoConfig`, camelCase fields).
    pub fn with_config(sample_rate: f64, config: JsValue) -> Result<WasmPiano, JsValue> {
        let config: PianoConfig = serde_wasm_bindgen::from_value(config).map_err(js_err)?;
        let inner = Piano::with_config(config, sample_rate).map_err(js_err)?;
        Ok(WasmPiano { inner })
    }

    pub fn select_waveform(&mut self, name: &str) -> Result<(), JsValue> {
        self.inner.select_waveform_by_name(name).map_err(js_err)
    }

    pub fn start_tone(&mut self, note: &str, frequency: f64) -> Result<(), JsValue> {
        self.inner.start_tone(note, frequency).map_err(js_err)
    }

    pub fn press_note(&mut self, note: &str) -> Result<(), JsValue> {
        self.inner.press(note).map_err(js_err)
    }

    pub fn release_note(&mut self, note: &str) -> bool {
        self.inner.stop_tone(note)
    }

    pub fn release_all(&mut self) {
        self.inner.release_all();
    }

    /// Returns true when the key started a note.
    pub fn key_down(&mut self, key: &str) -> Result<bool, JsValue> {
        let action = self
            .inner
            .handle_input(&InputEvent::KeyDown(key.to_string()))
            .map_err(js_err)?;
        Ok(action.is_some())
    }

    pub fn key_up(&mut self, key: &str) -> Result<(), JsValue> {
        self.inner
            .handle_input(&InputEvent::KeyUp(key.to_string()))
            .map(|_| ())
            .map_err(js_err)
    }

    /// Apply a UI event object, e.g. `{ type: "touchStart", value: "C" }`.
    pub fn handle_input(&mut self, event: JsValue) -> Result<(), JsValue> {
        let event: InputEvent = serde_wasm_bindgen::from_value(event).map_err(js_err)?;
        self.inner.handle_input(&event).map(|_| ()).map_err(js_err)
    }

    pub fn set_reverb(&mut self, level: f64) {
        self.inner.set_reverb(level);
    }

    pub fn set_delay(&mut self, seconds: f64) {
        self.inner.set_delay(seconds);
    }

    pub fn set_volume(&mut self, level: f64) {
        self.inner.set_volume(level);
    }

    pub fn effects(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.effects()).map_err(js_err)
    }

    /// Install a WAV impulse response for the reverb.
    pub fn load_impulse_response(&mut self, bytes: &[u8]) -> Result<(), JsValue> {
        self.inner.load_impulse_response(bytes).map_err(js_err)
    }

    /// Render the next `frames` mono samples.
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        self.inner.render_frames(frames)
    }

    /// Render into a caller-provided buffer (e.g. an AudioWorklet output).
    pub fn render_into(&mut self, out: &mut [f32]) {
        self.inner.render(out);
    }

    /// Render the next `frames` frames as 16-bit mono WAV bytes.
    pub fn render_wav(&mut self, frames: usize) -> Result<Vec<u8>, JsValue> {
        dsp::renderer::render_wav(&mut self.inner, frames).map_err(js_err)
    }

    /// Note on/off events since the last call, as an array of objects.
    pub fn drain_events(&mut self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.drain_events()).map_err(js_err)
    }

    pub fn active_notes(&self) -> Vec<String> {
        self.inner
            .active_notes()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn current_time(&self) -> f64 {
        self.inner.current_time()
    }
}
