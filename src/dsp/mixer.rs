//! Gain stages and the master bus.

/// A plain gain stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gain {
    value: f64,
}

impl Gain {
    pub fn new(value: f64) -> Self {
        Gain { value }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    #[inline]
    pub fn apply(&self, sample: f32) -> f32 {
        sample * self.value as f32
    }
}

/// Sums the delay and reverb returns and applies the master volume.
#[derive(Debug, Clone)]
pub struct Mixer {
    pub master: Gain,
}

impl Mixer {
    pub fn new(master_gain: f64) -> Self {
        Mixer {
            master: Gain::new(master_gain),
        }
    }

    /// Mix one frame of the two effect returns to the output sample.
    #[inline]
    pub fn mix(&self, delay_return: f32, reverb_return: f32) -> f32 {
        soft_clip(self.master.apply(delay_return + reverb_return))
    }
}

/// Soft clipper using tanh to prevent harsh digital clipping.
#[inline]
fn soft_clip(x: f32) -> f32 {
    x.tanh()
}
