//! Tone, a single sounding note: oscillator shaped by a gain envelope.

use crate::config::EnvelopeConfig;

use super::automation::Automation;
use super::envelope;
use super::oscillator::{Oscillator, Waveform};

/// One tone generator. Started once at `start_frame`, silent once stopped
/// and never restarted.
#[derive(Debug, Clone)]
pub struct Tone {
    oscillator: Oscillator,
    gain: Automation,
    sample_rate: f64,
    start_frame: u64,
    /// Frame at which the tone is force-stopped.
    stop_frame: u64,
    stopped: bool,
}

impl Tone {
    /// Start a tone at `start_frame` on the render clock.
    ///
    /// `auto_stop_after` is in seconds; the tone stops on its own once the
    /// clock reaches that far past the start.
    pub fn start(
        waveform: Waveform,
        frequency: f64,
        shape: &EnvelopeConfig,
        sample_rate: f64,
        start_frame: u64,
        auto_stop_after: f64,
    ) -> Self {
        let start_time = start_frame as f64 / sample_rate;
        let lifetime = (auto_stop_after * sample_rate).round() as u64;
        Tone {
            oscillator: Oscillator::new(waveform, frequency, sample_rate),
            gain: envelope::scheduled(shape, start_time),
            sample_rate,
            start_frame,
            stop_frame: start_frame.saturating_add(lifetime.max(1)),
            stopped: false,
        }
    }

    pub fn frequency(&self) -> f64 {
        self.oscillator.frequency()
    }

    pub fn waveform(&self) -> Waveform {
        self.oscillator.waveform()
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    pub fn stop_frame(&self) -> u64 {
        self.stop_frame
    }

    /// Envelope gain at `time` seconds on the audio clock.
    pub fn gain_at(&self, time: f64) -> f64 {
        self.gain.value_at(time)
    }

    /// Has the auto-stop deadline passed at `frame`?
    pub fn is_expired(&self, frame: u64) -> bool {
        frame >= self.stop_frame
    }

    /// Stop immediately.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Render the sample for `frame`.
    pub fn next_sample(&mut self, frame: u64) -> f64 {
        if self.stopped || frame < self.start_frame {
            return 0.0;
        }
        if self.is_expired(frame) {
            self.stopped = true;
            return 0.0;
        }
        let time = frame as f64 / self.sample_rate;
        self.oscillator.next_sample() * self.gain.value_at(time)
    }
}
