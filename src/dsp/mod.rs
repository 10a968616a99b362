//! DSP: the piano's audio graph, in pure Rust.
//!
//! The same code renders for the browser (blocks handed to Web Audio via
//! WASM) and offline (WAV export in tests and tools).

pub mod automation;
pub mod convolver;
pub mod delay;
pub mod envelope;
pub mod impulse;
pub mod mixer;
pub mod oscillator;
pub mod renderer;
pub mod voice;
