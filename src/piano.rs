//! The piano engine.
//!
//! Holds one tone per sounding note, the effects chain and the render
//! clock. Signal flow for every frame:
//!
//! ```text
//! tones ─┬─ delay ─────────────────────┬─ master gain ─ out
//!        └─ convolver ─ reverb send ───┘
//! ```
//!
//! The delay path is also the dry path: at a delay time of zero it passes
//! the tones straight through.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::config::PianoConfig;
use crate::dsp::convolver::{self, Convolver, DEFAULT_BLOCK_SIZE};
use crate::dsp::delay::Delay;
use crate::dsp::impulse::ImpulseResponse;
use crate::dsp::mixer::{Gain, Mixer};
use crate::dsp::oscillator::Waveform;
use crate::dsp::voice::Tone;
use crate::error::PianoError;
use crate::input::{Action, Controller, InputEvent};
use crate::notes;

/// Why a tone stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StopCause {
    Released,
    AutoStop,
}

/// Changes to the set of sounding notes, for driving the keys' "active"
/// indication.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PianoEvent {
    NoteOn { note: String, frequency: f64 },
    NoteOff { note: String, cause: StopCause },
}

/// Current values of the three effect controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EffectsMix {
    pub reverb: f64,
    pub delay: f64,
    pub volume: f64,
}

#[derive(Debug)]
pub struct Piano {
    config: PianoConfig,
    sample_rate: f64,
    /// Render clock, in frames since construction.
    frame: u64,
    waveform: Waveform,
    tones: HashMap<String, Tone>,
    input: Controller,
    delay: Delay,
    convolver: Convolver,
    reverb_send: Gain,
    mixer: Mixer,
    events: Vec<PianoEvent>,
}

impl Piano {
    /// A piano with the default configuration.
    pub fn new(sample_rate: f64) -> Self {
        Self::build(PianoConfig::default(), Controller::default(), sample_rate)
    }

    pub fn with_config(config: PianoConfig, sample_rate: f64) -> Result<Self, PianoError> {
        config.validate()?;
        let controller = Controller::new(config.key_map()?);
        Ok(Self::build(config, controller, sample_rate))
    }

    fn build(config: PianoConfig, input: Controller, sample_rate: f64) -> Self {
        let mut delay = Delay::new(sample_rate, config.max_delay_time);
        delay.set_delay_time(config.delay);
        Piano {
            sample_rate,
            frame: 0,
            waveform: config.waveform,
            tones: HashMap::new(),
            input,
            delay,
            convolver: Convolver::new(DEFAULT_BLOCK_SIZE),
            reverb_send: Gain::new(config.reverb),
            mixer: Mixer::new(config.volume),
            events: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &PianoConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    /// Audio clock in seconds.
    pub fn current_time(&self) -> f64 {
        self.frame as f64 / self.sample_rate
    }

    // ── Waveform ────────────────────────────────────────────

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Applies to tones started from now on.
    pub fn select_waveform(&mut self, waveform: Waveform) {
        log::debug!("waveform -> {waveform}");
        self.waveform = waveform;
    }

    pub fn select_waveform_by_name(&mut self, name: &str) -> Result<(), PianoError> {
        match name.parse::<Waveform>() {
            Ok(waveform) => {
                self.select_waveform(waveform);
                Ok(())
            }
            Err(e) => {
                log::warn!("{e}; keeping {}", self.waveform);
                Err(e)
            }
        }
    }

    // ── Tones ───────────────────────────────────────────────

    /// Start a tone for `note` at `frequency` Hz.
    ///
    /// `note` identifies the tone for release and for the key's visual
    /// state. A note that is already sounding is restarted.
    pub fn start_tone(&mut self, note: &str, frequency: f64) -> Result<(), PianoError> {
        if !frequency.is_finite() || frequency <= 0.0 {
            log::error!("Invalid frequency: {frequency} (note '{note}')");
            return Err(PianoError::InvalidFrequency(frequency));
        }

        let tone = Tone::start(
            self.waveform,
            frequency,
            &self.config.envelope,
            self.sample_rate,
            self.frame,
            self.config.auto_stop_after,
        );
        self.tones.insert(note.to_string(), tone);
        log::debug!("note on {note} ({frequency} Hz, {})", self.waveform);
        self.events.push(PianoEvent::NoteOn {
            note: note.to_string(),
            frequency,
        });
        Ok(())
    }

    /// Start the tone for a keyboard note name.
    pub fn press(&mut self, note: &str) -> Result<(), PianoError> {
        match notes::frequency_of(note) {
            Some(frequency) => self.start_tone(note, frequency),
            None => {
                log::error!("Unknown note '{note}'");
                Err(PianoError::UnknownNote(note.to_string()))
            }
        }
    }

    /// Stop the tone for `note`. Returns false, and does nothing else, when
    /// the note is not sounding.
    pub fn stop_tone(&mut self, note: &str) -> bool {
        let Some(mut tone) = self.tones.remove(note) else {
            return false;
        };
        tone.stop();
        log::debug!("note off {note}");
        self.events.push(PianoEvent::NoteOff {
            note: note.to_string(),
            cause: StopCause::Released,
        });
        true
    }

    /// Stop every tone and flush the delay and reverb tails.
    pub fn release_all(&mut self) {
        let mut notes: Vec<String> = self.tones.keys().cloned().collect();
        notes.sort();
        for note in notes {
            self.stop_tone(&note);
        }
        self.delay.clear();
        self.convolver.clear_tail();
    }

    pub fn is_active(&self, note: &str) -> bool {
        self.tones.contains_key(note)
    }

    /// Sounding notes, sorted by name.
    pub fn active_notes(&self) -> Vec<&str> {
        let mut notes: Vec<&str> = self.tones.keys().map(String::as_str).collect();
        notes.sort_unstable();
        notes
    }

    pub fn tone(&self, note: &str) -> Option<&Tone> {
        self.tones.get(note)
    }

    // ── Input ───────────────────────────────────────────────

    /// Route a UI event through the input controller and apply the result.
    pub fn handle_input(&mut self, event: &InputEvent) -> Result<Option<Action>, PianoError> {
        let action = self.input.handle(event);
        match &action {
            Some(Action::Press(note)) => self.press(note)?,
            Some(Action::Release(note)) => {
                self.stop_tone(note);
            }
            None => {}
        }
        Ok(action)
    }

    /// Release everything held, e.g. when the page loses focus.
    pub fn reset_input(&mut self) {
        for action in self.input.reset() {
            if let Action::Release(note) = action {
                self.stop_tone(&note);
            }
        }
    }

    // ── Effects ─────────────────────────────────────────────

    pub fn effects(&self) -> EffectsMix {
        EffectsMix {
            reverb: self.reverb_send.value(),
            delay: self.delay.delay_time(),
            volume: self.mixer.master.value(),
        }
    }

    pub fn set_reverb(&mut self, level: f64) {
        if finite_or_warn("reverb", level) {
            self.reverb_send.set_value(level);
        }
    }

    /// Delay time in seconds, clamped to the configured maximum.
    pub fn set_delay(&mut self, seconds: f64) {
        if finite_or_warn("delay", seconds) {
            self.delay.set_delay_time(seconds);
        }
    }

    pub fn set_volume(&mut self, level: f64) {
        if finite_or_warn("volume", level) {
            self.mixer.master.set_value(level);
        }
    }

    // ── Impulse response ────────────────────────────────────

    /// Decode WAV bytes and install them as the reverb impulse response.
    ///
    /// On failure the error is logged and the reverb stays as it was
    /// (silent if nothing was loaded); tones are unaffected.
    pub fn load_impulse_response(&mut self, bytes: &[u8]) -> Result<(), PianoError> {
        let ir = ImpulseResponse::from_wav_bytes(bytes).inspect_err(|e| {
            log::error!("Error loading or decoding impulse response: {e}");
        })?;
        self.set_impulse_response(&ir);
        Ok(())
    }

    /// Read the impulse response from disk.
    pub fn load_impulse_response_file(&mut self, path: impl AsRef<Path>) -> Result<(), PianoError> {
        let ir = ImpulseResponse::from_wav_file(path).inspect_err(|e| {
            log::error!("Error loading or decoding impulse response: {e}");
        })?;
        self.set_impulse_response(&ir);
        Ok(())
    }

    /// Resample and normalize `ir`, then hand it to the convolver.
    pub fn set_impulse_response(&mut self, ir: &ImpulseResponse) {
        let rate = self.sample_rate.round() as u32;
        let mut response = ir.resampled(rate);
        let scale = convolver::normalization_scale(&response, self.sample_rate);
        for s in response.iter_mut() {
            *s *= scale;
        }
        log::debug!(
            "impulse response: {:.2}s, {} samples at {rate} Hz",
            ir.duration(),
            response.len()
        );
        self.convolver.set_response(&response);
    }

    pub fn has_impulse_response(&self) -> bool {
        self.convolver.has_response()
    }

    // ── Rendering ───────────────────────────────────────────

    /// Fill `out` with the next `out.len()` mono frames.
    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            let frame = self.frame;
            let dry = self
                .tones
                .values_mut()
                .map(|tone| tone.next_sample(frame))
                .sum::<f64>() as f32;

            let delayed = self.delay.process(dry);
            let reverb = self.reverb_send.apply(self.convolver.process(dry));
            *sample = self.mixer.mix(delayed, reverb);

            self.frame += 1;
            self.expire_tones();
        }
    }

    pub fn render_frames(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        self.render(&mut out);
        out
    }

    /// Auto-stop every tone whose deadline the clock has reached.
    fn expire_tones(&mut self) {
        let frame = self.frame;
        let events = &mut self.events;
        self.tones.retain(|note, tone| {
            if !tone.is_expired(frame) {
                return true;
            }
            tone.stop();
            log::debug!("note auto-stop {note}");
            events.push(PianoEvent::NoteOff {
                note: note.clone(),
                cause: StopCause::AutoStop,
            });
            false
        });
    }

    /// Take the events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<PianoEvent> {
        std::mem::take(&mut self.events)
    }
}

fn finite_or_warn(param: &str, value: f64) -> bool {
    if value.is_finite() {
        true
    } else {
        log::warn!("ignoring non-finite {param} value {value}");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::impulse::tests::wav_i16;
    use crate::error::ImpulseError;

    const SR: f64 = 44100.0;

    fn note_off(note: &str, cause: StopCause) -> PianoEvent {
        PianoEvent::NoteOff {
            note: note.to_string(),
            cause,
        }
    }

    fn peak(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0, |m, s| m.max(s.abs()))
    }

    #[test]
    fn trigger_and_release() {
        let mut piano = Piano::new(SR);
        piano.start_tone("A", 440.0).unwrap();

        let tone = piano.tone("A").expect("tone should be active");
        assert_eq!(tone.frequency(), 440.0);
        assert_eq!(tone.waveform(), Waveform::Sine);
        assert!((tone.gain_at(0.01) - 0.7).abs() < 1e-9);
        assert!((tone.gain_at(0.1) - 0.5).abs() < 1e-9);
        assert!((tone.gain_at(0.2) - 0.4).abs() < 1e-9);

        piano.render_frames(512);
        assert!(piano.stop_tone("A"));
        assert!(!piano.is_active("A"));
        assert_eq!(
            piano.drain_events(),
            vec![
                PianoEvent::NoteOn {
                    note: "A".into(),
                    frequency: 440.0
                },
                note_off("A", StopCause::Released),
            ]
        );
    }

    #[test]
    fn invalid_frequency_is_refused() {
        let mut piano = Piano::new(SR);
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 0.0, -440.0] {
            let err = piano.start_tone("A", bad).unwrap_err();
            assert!(matches!(err, PianoError::InvalidFrequency(_)));
        }
        assert!(piano.active_notes().is_empty());
        assert!(piano.drain_events().is_empty());
        assert!(peak(&piano.render_frames(1024)) == 0.0);
    }

    #[test]
    fn unknown_note_is_refused() {
        let mut piano = Piano::new(SR);
        assert!(matches!(piano.press("H#"), Err(PianoError::UnknownNote(_))));
        assert!(piano.active_notes().is_empty());
    }

    #[test]
    fn release_without_tone_is_noop() {
        let mut piano = Piano::new(SR);
        assert!(!piano.stop_tone("A"));
        piano.release_all();
        assert!(piano.drain_events().is_empty());
    }

    #[test]
    fn release_all_silences_effect_tails() {
        let mut piano = Piano::new(SR);
        piano.set_delay(0.1);
        piano.press("A").unwrap();
        piano.press("E").unwrap();
        piano.render_frames(2000);

        piano.release_all();
        assert!(piano.active_notes().is_empty());
        assert_eq!(peak(&piano.render_frames(8820)), 0.0);
    }

    #[test]
    fn huge_config_values_are_rejected() {
        let config = PianoConfig::from_json(r#"{ "autoStopAfter": 1e300 }"#);
        assert!(config.is_err());

        let config = PianoConfig {
            max_delay_time: 1e15,
            ..PianoConfig::default()
        };
        assert!(matches!(
            Piano::with_config(config, SR),
            Err(PianoError::Config(_))
        ));
    }

    #[test]
    fn auto_stop_after_one_second() {
        let mut piano = Piano::new(SR);
        piano.press("A").unwrap();
        piano.drain_events();

        piano.render_frames(44099);
        assert!(piano.is_active("A"));
        assert!(piano.drain_events().is_empty());

        piano.render_frames(1);
        assert!(!piano.is_active("A"));
        assert_eq!(piano.drain_events(), vec![note_off("A", StopCause::AutoStop)]);
    }

    #[test]
    fn auto_stop_targets_its_own_note() {
        let mut piano = Piano::new(SR);
        piano.press("A").unwrap();
        piano.render_frames(22050);
        piano.press("C").unwrap();
        piano.drain_events();

        piano.render_frames(22050);
        assert!(!piano.is_active("A"));
        assert!(piano.is_active("C"));
        assert_eq!(piano.drain_events(), vec![note_off("A", StopCause::AutoStop)]);

        piano.render_frames(22050);
        assert!(!piano.is_active("C"));
        assert_eq!(piano.drain_events(), vec![note_off("C", StopCause::AutoStop)]);
    }

    #[test]
    fn released_tone_does_not_auto_stop_later() {
        let mut piano = Piano::new(SR);
        piano.press("A").unwrap();
        piano.stop_tone("A");
        piano.drain_events();
        piano.render_frames(50000);
        assert!(piano.drain_events().is_empty());
    }

    #[test]
    fn notes_sound_together_and_release_independently() {
        let mut piano = Piano::new(SR);
        piano.press("C").unwrap();
        piano.press("E").unwrap();
        assert_eq!(piano.active_notes(), vec!["C", "E"]);

        let out = piano.render_frames(4410);
        assert!(peak(&out) > 0.1);

        piano.stop_tone("C");
        assert_eq!(piano.active_notes(), vec!["E"]);
        piano.stop_tone("E");
        assert!(piano.active_notes().is_empty());
    }

    #[test]
    fn retrigger_replaces_tone() {
        let mut piano = Piano::new(SR);
        piano.press("A").unwrap();
        piano.render_frames(1000);
        piano.press("A").unwrap();
        assert_eq!(piano.active_notes(), vec!["A"]);
        let tone = piano.tone("A").unwrap();
        assert_eq!(tone.start_frame(), 1000);
        assert_eq!(tone.stop_frame(), 1000 + 44100);
    }

    #[test]
    fn silence_when_idle() {
        let mut piano = Piano::new(SR);
        assert!(piano.render_frames(2048).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn effect_parameters_take_exact_values() {
        let mut piano = Piano::new(SR);
        assert_eq!(
            piano.effects(),
            EffectsMix {
                reverb: 0.0,
                delay: 0.0,
                volume: 0.5
            }
        );

        piano.set_reverb(0.3);
        piano.set_delay(0.25);
        piano.set_volume(0.8);
        assert_eq!(
            piano.effects(),
            EffectsMix {
                reverb: 0.3,
                delay: 0.25,
                volume: 0.8
            }
        );

        piano.set_delay(5.0);
        assert_eq!(piano.effects().delay, 1.0);

        piano.set_volume(f64::NAN);
        piano.set_reverb(f64::INFINITY);
        assert_eq!(piano.effects().volume, 0.8);
        assert_eq!(piano.effects().reverb, 0.3);
    }

    #[test]
    fn zero_volume_is_silent() {
        let mut piano = Piano::new(SR);
        piano.set_volume(0.0);
        piano.press("A").unwrap();
        assert!(piano.render_frames(4096).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn delay_time_delays_the_dry_path() {
        let mut piano = Piano::new(SR);
        piano.set_delay(0.01);
        piano.press("A").unwrap();
        let out = piano.render_frames(882);
        assert!(out[..441].iter().all(|&s| s == 0.0));
        assert!(peak(&out[441..]) > 0.0);
    }

    #[test]
    fn waveform_selection_applies_to_new_tones() {
        let mut piano = Piano::new(SR);
        piano.press("C").unwrap();
        piano.select_waveform_by_name("square").unwrap();
        piano.press("E").unwrap();
        assert_eq!(piano.tone("C").unwrap().waveform(), Waveform::Sine);
        assert_eq!(piano.tone("E").unwrap().waveform(), Waveform::Square);

        assert!(piano.select_waveform_by_name("noise").is_err());
        assert_eq!(piano.waveform(), Waveform::Square);
    }

    #[test]
    fn keyboard_input_end_to_end() {
        let mut piano = Piano::new(SR);
        let down = InputEvent::KeyDown("i".into());

        assert_eq!(
            piano.handle_input(&down).unwrap(),
            Some(Action::Press("A".into()))
        );
        assert!(piano.is_active("A"));
        assert_eq!(piano.handle_input(&down).unwrap(), None);
        assert_eq!(piano.drain_events().len(), 1);

        piano.handle_input(&InputEvent::KeyUp("i".into())).unwrap();
        assert!(!piano.is_active("A"));
    }

    #[test]
    fn pointer_input_end_to_end() {
        let mut piano = Piano::new(SR);
        piano
            .handle_input(&InputEvent::TouchStart("G2".into()))
            .unwrap();
        assert!(piano.is_active("G2"));
        piano
            .handle_input(&InputEvent::TouchEnd("G2".into()))
            .unwrap();
        assert!(!piano.is_active("G2"));

        let err = piano
            .handle_input(&InputEvent::PointerDown("nope".into()))
            .unwrap_err();
        assert!(matches!(err, PianoError::UnknownNote(_)));
    }

    #[test]
    fn reset_input_releases_held_notes() {
        let mut piano = Piano::new(SR);
        piano.handle_input(&InputEvent::KeyDown("e".into())).unwrap();
        piano
            .handle_input(&InputEvent::PointerDown("B".into()))
            .unwrap();
        piano.reset_input();
        assert!(piano.active_notes().is_empty());
    }

    #[test]
    fn bad_impulse_response_is_not_fatal() {
        let mut piano = Piano::new(SR);
        let err = piano.load_impulse_response(b"not a wav").unwrap_err();
        assert!(matches!(
            err,
            PianoError::ImpulseResponse(ImpulseError::Decode(_))
        ));
        assert!(!piano.has_impulse_response());

        piano.set_reverb(1.0);
        piano.press("A").unwrap();
        assert!(peak(&piano.render_frames(4410)) > 0.1);
    }

    #[test]
    fn missing_impulse_file_is_not_fatal() {
        let mut piano = Piano::new(SR);
        let err = piano
            .load_impulse_response_file("missing/impulse-response.wav")
            .unwrap_err();
        assert!(matches!(err, PianoError::ImpulseResponse(ImpulseError::Io(_))));
        assert!(piano.press("A").is_ok());
    }

    #[test]
    fn reverb_send_adds_to_output() {
        let mut ir = vec![0i16; 2048];
        ir[0] = 16384;
        ir[700] = -8000;
        let bytes = wav_i16(&ir, 1, 44100);

        let render = |reverb: f64| {
            let mut piano = Piano::new(SR);
            piano.load_impulse_response(&bytes).unwrap();
            assert!(piano.has_impulse_response());
            piano.set_reverb(reverb);
            piano.press("A").unwrap();
            piano.render_frames(4096)
        };

        let dry = render(0.0);
        let wet = render(1.0);
        let diff = dry
            .iter()
            .zip(&wet)
            .fold(0.0f32, |m, (a, b)| m.max((a - b).abs()));
        assert!(diff > 1e-4, "reverb send made no difference");
    }

    #[test]
    fn config_drives_engine() {
        let config = PianoConfig::from_json(
            r#"{ "autoStopAfter": 0.5, "waveform": "triangle", "volume": 0.9,
                 "keyBindings": [ { "key": "a", "note": "A" } ] }"#,
        )
        .unwrap();
        let mut piano = Piano::with_config(config, SR).unwrap();
        assert_eq!(piano.waveform(), Waveform::Triangle);
        assert_eq!(piano.effects().volume, 0.9);

        piano.handle_input(&InputEvent::KeyDown("a".into())).unwrap();
        assert!(piano.is_active("A"));
        piano.render_frames(22050);
        assert!(!piano.is_active("A"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PianoConfig {
            volume: f64::NAN,
            ..PianoConfig::default()
        };
        assert!(matches!(
            Piano::with_config(config, SR),
            Err(PianoError::Config(_))
        ));
    }

    #[test]
    fn events_serialize_for_the_ui() {
        let on = serde_json::to_value(PianoEvent::NoteOn {
            note: "A".into(),
            frequency: 440.0,
        })
        .unwrap();
        assert_eq!(on["type"], "noteOn");
        assert_eq!(on["note"], "A");

        let off = serde_json::to_value(note_off("A", StopCause::AutoStop)).unwrap();
        assert_eq!(off["type"], "noteOff");
        assert_eq!(off["cause"], "autoStop");
    }
}
