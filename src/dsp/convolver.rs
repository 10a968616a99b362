//! Convolution reverb.
//!
//! Uniformly partitioned overlap-save convolution: the impulse response is
//! cut into `block_size` partitions whose spectra are multiplied against a
//! frequency-domain delay line of past input blocks. Output lags input by
//! one block. With no impulse response loaded the convolver outputs silence.

use std::collections::VecDeque;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Partition length in samples (one Web Audio render quantum).
pub const DEFAULT_BLOCK_SIZE: usize = 128;

const GAIN_CALIBRATION: f32 = 0.00125;
const GAIN_CALIBRATION_SAMPLE_RATE: f32 = 44100.0;
const MIN_POWER: f32 = 0.000125;

/// Scale factor that brings an impulse response to a consistent loudness.
pub fn normalization_scale(response: &[f32], sample_rate: f64) -> f32 {
    if response.is_empty() {
        return 1.0;
    }
    let energy: f32 = response.iter().map(|s| s * s).sum();
    let mut power = (energy / response.len() as f32).sqrt();
    if !power.is_finite() || power < MIN_POWER {
        power = MIN_POWER;
    }
    (1.0 / power) * GAIN_CALIBRATION * (GAIN_CALIBRATION_SAMPLE_RATE / sample_rate as f32)
}

pub struct Convolver {
    block_size: usize,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    /// Spectra of the impulse response partitions, each `2 * block_size` long.
    partitions: Vec<Vec<Complex<f32>>>,
    /// Input block spectra, newest first; one per partition.
    history: VecDeque<Vec<Complex<f32>>>,
    /// Previous block followed by the block being filled.
    input: Vec<f32>,
    output: Vec<f32>,
    pos: usize,
    spectrum: Vec<Complex<f32>>,
    accum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl std::fmt::Debug for Convolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Convolver")
            .field("block_size", &self.block_size)
            .field("partitions", &self.partitions.len())
            .finish()
    }
}

impl Convolver {
    pub fn new(block_size: usize) -> Self {
        let block_size = block_size.max(1);
        let fft_size = 2 * block_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let ifft = planner.plan_fft_inverse(fft_size);
        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());

        Convolver {
            block_size,
            fft,
            ifft,
            partitions: Vec::new(),
            history: VecDeque::new(),
            input: vec![0.0; fft_size],
            output: vec![0.0; block_size],
            pos: 0,
            spectrum: vec![Complex::default(); fft_size],
            accum: vec![Complex::default(); fft_size],
            scratch: vec![Complex::default(); scratch_len],
        }
    }

    /// Output latency in samples.
    pub fn latency(&self) -> usize {
        self.block_size
    }

    pub fn has_response(&self) -> bool {
        !self.partitions.is_empty()
    }

    /// Install an impulse response. Clears any reverb tail in flight.
    pub fn set_response(&mut self, response: &[f32]) {
        let n = self.block_size;
        let fft_size = 2 * n;
        let fft = Arc::clone(&self.fft);
        let scratch = &mut self.scratch;

        let partitions: Vec<_> = response
            .chunks(n)
            .map(|chunk| {
                let mut spectrum = vec![Complex::default(); fft_size];
                for (dst, &src) in spectrum.iter_mut().zip(chunk) {
                    dst.re = src;
                }
                fft.process_with_scratch(&mut spectrum, &mut scratch[..]);
                spectrum
            })
            .collect();
        self.partitions = partitions;

        self.history = (0..self.partitions.len())
            .map(|_| vec![Complex::default(); fft_size])
            .collect();
        self.clear_tail();
    }

    /// Drop the reverb tail in flight. The impulse response stays installed.
    pub fn clear_tail(&mut self) {
        self.input.fill(0.0);
        self.output.fill(0.0);
        self.pos = 0;
        for block in self.history.iter_mut() {
            block.fill(Complex::default());
        }
    }

    /// Push one input sample, returning one output sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        if self.partitions.is_empty() {
            return 0.0;
        }
        let out = self.output[self.pos];
        self.input[self.block_size + self.pos] = input;
        self.pos += 1;
        if self.pos == self.block_size {
            self.process_block();
            self.pos = 0;
        }
        out
    }

    fn process_block(&mut self) {
        let n = self.block_size;

        for (dst, &src) in self.spectrum.iter_mut().zip(&self.input) {
            *dst = Complex::new(src, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        // Recycle the oldest slot for the newest spectrum.
        if let Some(mut slot) = self.history.pop_back() {
            slot.copy_from_slice(&self.spectrum);
            self.history.push_front(slot);
        }

        self.accum.fill(Complex::default());
        for (x, h) in self.history.iter().zip(&self.partitions) {
            for ((acc, &xi), &hi) in self.accum.iter_mut().zip(x).zip(h) {
                *acc += xi * hi;
            }
        }
        self.ifft.process_with_scratch(&mut self.accum, &mut self.scratch);

        // Only the second half is free of circular wrap-around.
        let norm = 1.0 / (2 * n) as f32;
        for (dst, src) in self.output.iter_mut().zip(&self.accum[n..]) {
            *dst = src.re * norm;
        }

        self.input.copy_within(n.., 0);
    }
}
