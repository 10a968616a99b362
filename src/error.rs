use std::fmt;

#[derive(Debug)]
pub enum PianoError {
    InvalidFrequency(f64),
    UnknownNote(String),
    UnknownWaveform(String),
    ImpulseResponse(ImpulseError),
    Config(ConfigError),
    Encode(String),
}

#[derive(Debug)]
pub enum ImpulseError {
    Decode(String),
    Empty,
    Io(String),
    Fetch(String),
}

#[derive(Debug)]
pub enum ConfigError {
    Json(String),
    DuplicateBinding {
        key: String,
        first: String,
        second: String,
    },
    UnknownNote {
        key: String,
        note: String,
    },
    OutOfRange {
        field: &'static str,
        value: f64,
    },
}

impl fmt::Display for PianoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PianoError::InvalidFrequency(freq) => write!(f, "Invalid frequency: {freq}"),
            PianoError::UnknownNote(note) => write!(f, "Unknown note '{note}'"),
            PianoError::UnknownWaveform(name) => write!(f, "Unknown waveform '{name}'"),
            PianoError::ImpulseResponse(e) => write!(f, "Impulse response error: {e}"),
            PianoError::Config(e) => write!(f, "Config error: {e}"),
            PianoError::Encode(msg) => write!(f, "Encode error: {msg}"),
        }
    }
}

impl std::error::Error for PianoError {}

impl fmt::Display for ImpulseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImpulseError::Decode(msg) => write!(f, "could not decode audio data: {msg}"),
            ImpulseError::Empty => write!(f, "audio data contains no samples"),
            ImpulseError::Io(msg) => write!(f, "could not read file: {msg}"),
            ImpulseError::Fetch(msg) => write!(f, "network response was not ok: {msg}"),
        }
    }
}

impl std::error::Error for ImpulseError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Json(msg) => write!(f, "invalid JSON: {msg}"),
            ConfigError::DuplicateBinding { key, first, second } => {
                write!(f, "key '{key}' bound to both '{first}' and '{second}'")
            }
            ConfigError::UnknownNote { key, note } => {
                write!(f, "key '{key}' bound to unknown note '{note}'")
            }
            ConfigError::OutOfRange { field, value } => {
                write!(f, "{field} out of range: {value}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ImpulseError> for PianoError {
    fn from(e: ImpulseError) -> Self {
        PianoError::ImpulseResponse(e)
    }
}

impl From<ConfigError> for PianoError {
    fn from(e: ConfigError) -> Self {
        PianoError::Config(e)
    }
}

impl From<hound::Error> for ImpulseError {
    fn from(e: hound::Error) -> Self {
        ImpulseError::Decode(e.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e.to_string())
    }
}
