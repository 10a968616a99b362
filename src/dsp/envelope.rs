//! Attack / decay / sustain gain envelope.
//!
//! The envelope is not a running state machine: triggering a tone writes
//! four breakpoints onto the tone's gain automation, relative to the audio
//! clock at trigger time.

use crate::config::EnvelopeConfig;

use super::automation::Automation;

/// Schedule `shape` onto `gain`, starting at `start` seconds.
///
/// silence at `start` → attack level → decay level → sustain level,
/// joined by linear ramps. The gain holds the sustain level afterwards.
pub fn schedule(shape: &EnvelopeConfig, gain: &mut Automation, start: f64) {
    gain.set_value_at_time(0.0, start)
        .linear_ramp_to_value_at_time(shape.attack_level, start + shape.attack_time)
        .linear_ramp_to_value_at_time(shape.decay_level, start + shape.decay_time)
        .linear_ramp_to_value_at_time(shape.sustain_level, start + shape.sustain_time);
}

/// A gain automation carrying `shape` from `start`.
pub fn scheduled(shape: &EnvelopeConfig, start: f64) -> Automation {
    let mut gain = Automation::new(1.0);
    schedule(shape, &mut gain, start);
    gain
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn breakpoints_hit_their_levels() {
        let gain = scheduled(&EnvelopeConfig::default(), 0.0);
        assert!(close(gain.value_at(0.0), 0.0));
        assert!(close(gain.value_at(0.01), 0.7));
        assert!(close(gain.value_at(0.1), 0.5));
        assert!(close(gain.value_at(0.2), 0.4));
        assert!(close(gain.value_at(0.9), 0.4));
    }

    #[test]
    fn relative_to_start_time() {
        let gain = scheduled(&EnvelopeConfig::default(), 3.0);
        assert!(close(gain.value_at(3.005), 0.35));
        assert!(close(gain.value_at(3.01), 0.7));
        assert!(close(gain.value_at(3.2), 0.4));
    }

    #[test]
    fn decay_is_linear() {
        let gain = scheduled(&EnvelopeConfig::default(), 0.0);
        // halfway between 10ms (0.7) and 100ms (0.5)
        assert!(close(gain.value_at(0.055), 0.6));
    }

    #[test]
    fn stays_in_range() {
        let gain = scheduled(&EnvelopeConfig::default(), 0.0);
        for i in 0..1000 {
            let v = gain.value_at(i as f64 / 1000.0);
            assert!((0.0..=0.7 + 1e-12).contains(&v), "out of range at {i}ms: {v}");
        }
    }
}
