use std::path::PathBuf;

use thiserror::Error;

use note_scale::ScaleError;

/// Startup and I/O failures.  The per-frame mapping path never errors.
#[derive(Error, Debug)]
pub enum ThereminError {
    #[error("could not read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value for {key}: {message}")]
    ConfigValue { key: &'static str, message: String },

    #[error("note scale: {0}")]
    Scale(#[from] ScaleError),

    #[error("hand tracking source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("tracking sample is not valid JSON: {0}")]
    SampleDecode(#[from] serde_json::Error),

    #[error("audio output: {0}")]
    Audio(String),

    #[error("MIDI init failed: {0}")]
    MidiInit(#[from] midir::InitError),

    #[error("no MIDI output ports found (start a synth such as `fluidsynth` or `timidity -iA`)")]
    NoMidiPort,

    #[error("could not connect to MIDI port {port}: {message}")]
    MidiConnect { port: String, message: String },

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("window: {0}")]
    Window(#[from] minifb::Error),
}
