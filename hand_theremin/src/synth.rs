//! Built-in monophonic sine synthesizer.
//!
//! [`SineVoice`] is the pure DSP part (oscillator + linear ADSR) and can be
//! stepped sample by sample in tests.  [`SynthVoice`] wraps it in a cpal
//! output stream and implements [`Voice`].

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use serde::Deserialize;

use note_scale::NoteName;

use crate::error::ThereminError;
use crate::voice::Voice;

// ════════════════════════════════════════════════════════════════════════════
// Envelope
// ════════════════════════════════════════════════════════════════════════════

/// ADSR envelope.  Times in seconds, `sustain` as a 0.0–1.0 level.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Envelope {
    pub attack:  f32,
    pub decay:   f32,
    pub sustain: f32,
    pub release: f32,
}

impl Default for Envelope {
    fn default() -> Self {
        Envelope { attack: 0.1, decay: 0.2, sustain: 0.5, release: 0.5 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Stage { Idle, Attack, Decay, Sustain, Release }

// ════════════════════════════════════════════════════════════════════════════
// SineVoice — oscillator + envelope
// ════════════════════════════════════════════════════════════════════════════

/// One sine oscillator shaped by an [`Envelope`].
#[derive(Clone, Debug)]
pub struct SineVoice {
    sample_rate:  f32,
    envelope:     Envelope,
    gain:         f32,
    stage:        Stage,
    level:        f32,
    release_step: f32,
    frequency:    f32,
    phase:        f32,
}

impl SineVoice {
    pub fn new(sample_rate: u32, envelope: Envelope, gain: f32) -> Self {
        SineVoice {
            sample_rate:  sample_rate.max(1) as f32,
            envelope,
            gain:         gain.clamp(0.0, 1.0),
            stage:        Stage::Idle,
            level:        0.0,
            release_step: 0.0,
            frequency:    0.0,
            phase:        0.0,
        }
    }

    /// Start (or retrigger) a note.  The envelope restarts its attack from
    /// the current level, so a note change while sounding does not click.
    pub fn note_on(&mut self, frequency: f32) {
        self.frequency = frequency.max(0.0);
        self.stage = Stage::Attack;
    }

    /// Enter the release stage from the current level.
    pub fn note_off(&mut self) {
        if self.stage == Stage::Idle { return; }
        self.release_step = self.level / self.samples(self.envelope.release);
        self.stage = Stage::Release;
    }

    pub fn is_idle(&self) -> bool { self.stage == Stage::Idle }

    /// Current envelope level, 0.0–1.0.
    pub fn level(&self) -> f32 { self.level }

    pub fn frequency(&self) -> f32 { self.frequency }

    /// Produce the next mono sample.
    pub fn next_sample(&mut self) -> f32 {
        self.advance_envelope();
        if self.stage == Stage::Idle {
            return 0.0;
        }
        let out = (self.phase * std::f32::consts::TAU).sin() * self.level * self.gain;
        self.phase = (self.phase + self.frequency / self.sample_rate).fract();
        out
    }

    /// Fill an interleaved buffer, writing the same sample to every channel.
    pub fn fill(&mut self, data: &mut [f32], channels: usize) {
        for frame in data.chunks_mut(channels.max(1)) {
            let s = self.next_sample();
            for sample in frame.iter_mut() {
                *sample = s;
            }
        }
    }

    fn samples(&self, seconds: f32) -> f32 {
        (seconds * self.sample_rate).max(1.0)
    }

    fn advance_envelope(&mut self) {
        let sustain = self.envelope.sustain.clamp(0.0, 1.0);
        match self.stage {
            Stage::Idle => self.level = 0.0,
            Stage::Attack => {
                self.level += 1.0 / self.samples(self.envelope.attack);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = Stage::Decay;
                }
            }
            Stage::Decay => {
                self.level -= (1.0 - sustain) / self.samples(self.envelope.decay);
                if self.level <= sustain {
                    self.level = sustain;
                    self.stage = Stage::Sustain;
                }
            }
            Stage::Sustain => self.level = sustain,
            Stage::Release => {
                self.level -= self.release_step;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = Stage::Idle;
                }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SynthVoice — cpal backend
// ════════════════════════════════════════════════════════════════════════════

/// A [`SineVoice`] playing on the default (or named) audio output device.
pub struct SynthVoice {
    shared:    Arc<Mutex<SineVoice>>,
    tuning_a4: f32,
    _stream:   cpal::Stream,
}

impl SynthVoice {
    /// Open the output device and start the stream (silent until the first
    /// attack).
    pub fn open(
        device_name: Option<&str>,
        envelope:    Envelope,
        gain:        f32,
        tuning_a4:   f32,
    ) -> Result<Self, ThereminError> {
        let device = output_device(device_name)?;
        let supported = device
            .default_output_config()
            .map_err(|e| ThereminError::Audio(format!("no usable output config: {}", e)))?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            return Err(ThereminError::Audio(format!(
                "unsupported sample format {:?} (need f32)",
                supported.sample_format()
            )));
        }
        let config: cpal::StreamConfig = supported.into();
        let channels = config.channels as usize;

        log::info!(
            target: "synth",
            "opening {} at {} Hz, {} channel(s)",
            device.name().unwrap_or_else(|_| "output".to_string()),
            config.sample_rate.0,
            channels
        );

        let shared = Arc::new(Mutex::new(SineVoice::new(config.sample_rate.0, envelope, gain)));
        let callback_voice = Arc::clone(&shared);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    callback_voice.lock().fill(data, channels);
                },
                |err| log::error!(target: "synth", "audio stream error: {}", err),
                None,
            )
            .map_err(|e| ThereminError::Audio(format!("failed to build output stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| ThereminError::Audio(format!("failed to start stream: {}", e)))?;

        Ok(SynthVoice { shared, tuning_a4, _stream: stream })
    }
}

impl Voice for SynthVoice {
    fn attack(&mut self, note: &NoteName) {
        self.shared.lock().note_on(note.frequency(self.tuning_a4));
    }

    fn release(&mut self) {
        self.shared.lock().note_off();
    }
}

fn output_device(name: Option<&str>) -> Result<cpal::Device, ThereminError> {
    let host = cpal::default_host();
    match name {
        Some(wanted) => {
            let devices = host
                .output_devices()
                .map_err(|e| ThereminError::Audio(format!("failed to enumerate devices: {}", e)))?;
            for device in devices {
                if device.name().map(|n| n == wanted).unwrap_or(false) {
                    return Ok(device);
                }
            }
            Err(ThereminError::Audio(format!("output device '{}' not found", wanted)))
        }
        None => host
            .default_output_device()
            .ok_or_else(|| ThereminError::Audio("no default output device found".to_string())),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
