//! WAV renderer: bounces the piano's output to a WAV byte buffer.

use std::io::Cursor;

use crate::error::PianoError;
use crate::piano::Piano;

/// Render the next `frames` frames of `piano` as 16-bit mono PCM WAV bytes.
pub fn render_wav(piano: &mut Piano, frames: usize) -> Result<Vec<u8>, PianoError> {
    let samples = piano.render_frames(frames);
    encode_wav(&samples, piano.sample_rate().round() as u32)
}

/// Encode mono f32 samples in [-1, 1] as 16-bit PCM WAV bytes.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, PianoError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut bytes = Vec::with_capacity(44 + samples.len() * 2);
    let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).map_err(encode_err)?;
    for &s in samples {
        let pcm = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(pcm).map_err(encode_err)?;
    }
    writer.finalize().map_err(encode_err)?;
    Ok(bytes)
}

fn encode_err(e: hound::Error) -> PianoError {
    PianoError::Encode(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_header_valid() {
        let mut piano = Piano::new(44100.0);
        let wav = render_wav(&mut piano, 100).unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");

        let sr = u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]);
        assert_eq!(sr, 44100);
        let ch = u16::from_le_bytes([wav[22], wav[23]]);
        assert_eq!(ch, 1);
    }

    #[test]
    fn wav_size_correct() {
        let mut piano = Piano::new(22050.0);
        let wav = render_wav(&mut piano, 22050).unwrap();
        let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_size, 44100);
        assert_eq!(wav.len(), 44 + 44100);
    }

    #[test]
    fn played_note_is_not_silent() {
        let mut piano = Piano::new(22050.0);
        piano.press("C").unwrap();
        let wav = render_wav(&mut piano, 11025).unwrap();

        let reader = hound::WavReader::new(Cursor::new(&wav)).unwrap();
        let loudest = reader
            .into_samples::<i16>()
            .map(|s| s.unwrap().unsigned_abs())
            .max()
            .unwrap();
        assert!(loudest > 1000, "rendered WAV should contain audio, peak {loudest}");
        assert_eq!(piano.current_frame(), 11025);
    }
}
