//! Note names and their frequencies.
//!
//! The keyboard spans three octaves plus a top C. Bare names (`C`, `F#`)
//! are the middle-C octave; a trailing `2`, `3` or `4` selects the next
//! octaves up (`C2` is an octave above `C`).

/// Note name → frequency in Hz, in ascending chromatic order.
pub static NOTE_FREQUENCIES: [(&str, f64); 37] = [
    ("C", 261.63),
    ("C#", 277.18),
    ("D", 293.66),
    ("D#", 311.13),
    ("E", 329.63),
    ("F", 349.23),
    ("F#", 369.99),
    ("G", 392.00),
    ("G#", 415.30),
    ("A", 440.00),
    ("A#", 466.16),
    ("B", 493.88),
    ("C2", 523.25),
    ("C#2", 554.37),
    ("D2", 587.33),
    ("D#2", 622.25),
    ("E2", 659.25),
    ("F2", 698.46),
    ("F#2", 739.99),
    ("G2", 783.99),
    ("G#2", 830.61),
    ("A2", 880.00),
    ("A#2", 932.33),
    ("B2", 987.77),
    ("C3", 1046.50),
    ("C#3", 1108.73),
    ("D3", 1174.66),
    ("D#3", 1244.51),
    ("E3", 1318.51),
    ("F3", 1396.91),
    ("F#3", 1479.98),
    ("G3", 1567.98),
    ("G#3", 1661.22),
    ("A3", 1760.00),
    ("A#3", 1864.66),
    ("B3", 1975.53),
    ("C4", 2093.00),
];

/// Look up the frequency of a keyboard note name.
pub fn frequency_of(note: &str) -> Option<f64> {
    NOTE_FREQUENCIES
        .iter()
        .find(|(name, _)| *name == note)
        .map(|&(_, freq)| freq)
}

/// Is `note` one of the keyboard's note names?
pub fn is_note(note: &str) -> bool {
    frequency_of(note).is_some()
}

/// All note names, lowest first.
pub fn note_names() -> impl Iterator<Item = &'static str> {
    NOTE_FREQUENCIES.iter().map(|&(name, _)| name)
}

/// Parse a keyboard note name (e.g. "C", "F#2", "C4") into a MIDI note number.
///
/// Bare names sit in MIDI octave 4 (`C` = 60); each suffix step adds an octave.
pub fn note_to_midi(note: &str) -> Option<i32> {
    let bytes = note.as_bytes();
    let base_semitone = match *bytes.first()? as char {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let mut idx = 1;
    let mut semitone = base_semitone;
    if bytes.get(idx) == Some(&b'#') {
        semitone += 1;
        idx += 1;
    }

    let octave_offset = match &note[idx..] {
        "" => 0,
        suffix => {
            let n: i32 = suffix.parse().ok()?;
            if n < 2 {
                return None;
            }
            n - 1
        }
    };

    Some((4 + octave_offset + 1) * 12 + semitone)
}

/// Convert a MIDI note number to frequency using the given A4 tuning pitch.
pub fn midi_to_frequency(midi: i32, tuning_pitch: f64) -> f64 {
    tuning_pitch * (2.0_f64).powf((midi as f64 - 69.0) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_frequency_is_finite_and_positive() {
        for (name, freq) in NOTE_FREQUENCIES.iter() {
            assert!(freq.is_finite() && *freq > 0.0, "{name} -> {freq}");
        }
    }

    #[test]
    fn table_is_ascending_and_unique() {
        for pair in NOTE_FREQUENCIES.windows(2) {
            assert!(pair[0].1 < pair[1].1, "{} !< {}", pair[0].0, pair[1].0);
        }
        let mut names: Vec<_> = note_names().collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), NOTE_FREQUENCIES.len());
    }

    #[test]
    fn table_matches_equal_temperament() {
        for (i, (name, freq)) in NOTE_FREQUENCIES.iter().enumerate() {
            let midi = note_to_midi(name).expect("parse table name");
            assert_eq!(midi, 60 + i as i32, "{name}");
            let expected = midi_to_frequency(midi, 440.0);
            assert!(
                (freq - expected).abs() < 0.01,
                "{name}: table {freq}, expected {expected}"
            );
        }
    }

    #[test]
    fn lookup() {
        assert_eq!(frequency_of("A"), Some(440.0));
        assert_eq!(frequency_of("C4"), Some(2093.0));
        assert_eq!(frequency_of("H"), None);
        assert_eq!(frequency_of("c"), None);
        assert!(is_note("F#2"));
    }

    #[test]
    fn midi_parse_rejects_bad_names() {
        assert_eq!(note_to_midi(""), None);
        assert_eq!(note_to_midi("X2"), None);
        assert_eq!(note_to_midi("C1"), None);
        assert_eq!(note_to_midi("Cx"), None);
        assert_eq!(note_to_midi("A"), Some(69));
    }
}
