//! Delay line: mono, no feedback, delay time adjustable while running.
//!
//! The delay path carries the whole dry signal to the master bus, so a
//! delay time of zero must be a clean pass-through.

#[derive(Debug, Clone)]
pub struct Delay {
    buffer: Vec<f32>,
    write_pos: usize,
    sample_rate: f64,
    max_delay_time: f64,
    delay_time: f64,
}

impl Delay {
    /// Create a delay line holding up to `max_delay_time` seconds.
    pub fn new(sample_rate: f64, max_delay_time: f64) -> Self {
        let buffer_size = ((sample_rate * max_delay_time).ceil() as usize).saturating_add(1);
        Self {
            buffer: vec![0.0; buffer_size],
            write_pos: 0,
            sample_rate,
            max_delay_time,
            delay_time: 0.0,
        }
    }

    pub fn delay_time(&self) -> f64 {
        self.delay_time
    }

    pub fn max_delay_time(&self) -> f64 {
        self.max_delay_time
    }

    /// Set the delay time in seconds, clamped to `[0, max_delay_time]`.
    pub fn set_delay_time(&mut self, seconds: f64) {
        self.delay_time = seconds.clamp(0.0, self.max_delay_time);
    }

    fn delay_samples(&self) -> usize {
        let samples = (self.delay_time * self.sample_rate).round() as usize;
        samples.min(self.buffer.len() - 1)
    }

    /// Push one input sample and return the delayed output.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let len = self.buffer.len();
        self.buffer[self.write_pos] = input;

        let read_pos = (self.write_pos + len - self.delay_samples()) % len;
        let output = self.buffer[read_pos];

        self.write_pos = (self.write_pos + 1) % len;
        output
    }

    /// Clear the delay buffer.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
