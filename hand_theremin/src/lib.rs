//! # hand_theremin
//!
//! A hand-tracking theremin.  Each frame, one landmark of the first detected
//! hand (the index fingertip by default) is quantized by its vertical
//! position into one note of a [`note_scale::NoteScale`].  The note sounds
//! while the hand stays in view and is released when the hand leaves.
//!
//! ## Frame → Note mapping
//!
//! | Frame | Playback state | Action |
//! |---|---|---|
//! | Hand in band *i*, silent | Silent | Attack note *i* |
//! | Hand in band *i*, playing *i* | Sounding(*i*) | nothing |
//! | Hand in band *j*, playing *i* | Sounding(*i*) | Attack note *j* (legato) |
//! | No hand, playing | Sounding(*i*) | Release |
//! | No hand, silent | Silent | nothing |
//!
//! The top of the frame (`y = 0.0`) is the first note of the scale.  With the
//! default scale that is C5, descending to C4 at the bottom.
//!
//! ## Tracking inputs
//!
//! * (default) **Pointer mode**: holding the left mouse button in the
//!   window stands in for a hand pointing at the cursor.
//! * `--replay <file>`: JSON lines in the hand detector's result shape,
//!   `{"multiHandLandmarks": [[{"x":…,"y":…,"z":…}, …21 points]]}`.
//! * `leap` feature: a LeapMotion controller via LeapC.
//!
//! ## Audio outputs
//!
//! * `synth`: a sine oscillator with an ADSR envelope through `cpal`.
//! * `midi`: note on/off messages to a MIDI output port through `midir`.
//! * `null`: log only.

pub mod error;
pub mod landmark;
pub mod mapper;
pub mod synth;
pub mod voice;
pub mod overlay;
pub mod source;
pub mod config;
pub mod visualizer;
pub mod app;
