//! Audio collaborators: anything that accepts attack / release.
//!
//! The mapper decides *when* a note starts or stops; a [`Voice`] makes the
//! sound.  Backends: the built-in sine synth ([`crate::synth::SynthVoice`]),
//! a monophonic MIDI voice over midir, and a silent [`NullVoice`].

use std::fmt;
use std::str::FromStr;

use note_scale::NoteName;

use crate::error::ThereminError;
use crate::mapper::NoteCommand;
use crate::synth::{Envelope, SynthVoice};

// ════════════════════════════════════════════════════════════════════════════
// Voice trait
// ════════════════════════════════════════════════════════════════════════════

/// A monophonic sound source.
pub trait Voice {
    /// Start `note`; whatever was sounding stops.
    fn attack(&mut self, note: &NoteName);

    /// Stop the sounding note, if any.
    fn release(&mut self);

    fn apply(&mut self, command: &NoteCommand) {
        match command {
            NoteCommand::Attack(note) => self.attack(note),
            NoteCommand::Release      => self.release(),
        }
    }
}

/// Used when no audio is wanted (headless replays, tests).
#[derive(Debug, Default)]
pub struct NullVoice;

impl Voice for NullVoice {
    fn attack(&mut self, note: &NoteName) {
        log::debug!(target: "voice", "attack {} (null output)", note);
    }
    fn release(&mut self) {
        log::debug!(target: "voice", "release (null output)");
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Backend selection
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AudioBackend {
    #[default]
    Synth,
    Midi,
    Null,
}

impl FromStr for AudioBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "synth" | "sine" => Ok(AudioBackend::Synth),
            "midi"           => Ok(AudioBackend::Midi),
            "null" | "none"  => Ok(AudioBackend::Null),
            other => Err(format!("unknown audio backend \"{}\" (synth, midi, null)", other)),
        }
    }
}

impl fmt::Display for AudioBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AudioBackend::Synth => "synth",
            AudioBackend::Midi  => "midi",
            AudioBackend::Null  => "null",
        })
    }
}

/// Everything needed to open a voice.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSettings {
    pub backend:   AudioBackend,
    /// Synth: exact device name.  MIDI: case-insensitive port name fragment.
    pub device:    Option<String>,
    pub program:   u8,
    pub velocity:  u8,
    pub channel:   u8,
    pub tuning_a4: f32,
    pub volume:    f32,
    pub envelope:  Envelope,
}

impl Default for AudioSettings {
    fn default() -> Self {
        AudioSettings {
            backend:   AudioBackend::Synth,
            device:    None,
            program:   79, // GM Ocarina, the closest thing to a pure sine
            velocity:  100,
            channel:   0,
            tuning_a4: 440.0,
            volume:    0.3,
            envelope:  Envelope::default(),
        }
    }
}

/// Open the configured backend.
pub fn open_voice(settings: &AudioSettings) -> Result<Box<dyn Voice>, ThereminError> {
    match settings.backend {
        AudioBackend::Synth => Ok(Box::new(SynthVoice::open(
            settings.device.as_deref(),
            settings.envelope,
            settings.volume,
            settings.tuning_a4,
        )?)),
        AudioBackend::Midi => {
            let out = open_midi_output(settings.device.as_deref())?;
            Ok(Box::new(MidiVoice::new(out, settings.channel, settings.program, settings.velocity)))
        }
        AudioBackend::Null => Ok(Box::new(NullVoice)),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MidiOut — abstraction over midir (and a capture sink for tests)
// ════════════════════════════════════════════════════════════════════════════

pub trait MidiOut {
    fn program_change(&mut self, channel: u8, program: u8);
    fn note_on(&mut self,  channel: u8, note: u8, velocity: u8);
    fn note_off(&mut self, channel: u8, note: u8);
}

struct MidirOut {
    conn: midir::MidiOutputConnection,
}

impl MidirOut {
    fn send(&mut self, msg: &[u8]) {
        if let Err(e) = self.conn.send(msg) {
            log::warn!(target: "voice", "MIDI send failed: {}", e);
        }
    }
}

impl MidiOut for MidirOut {
    fn program_change(&mut self, channel: u8, program: u8) {
        self.send(&[0xC0 | (channel & 0x0F), program & 0x7F]);
    }
    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        self.send(&[0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]);
    }
    fn note_off(&mut self, channel: u8, note: u8) {
        self.send(&[0x80 | (channel & 0x0F), note & 0x7F, 0]);
    }
}

/// Open a MIDI output port.
///
/// Preference: a port whose name contains `hint`, then a recognizable
/// software synth, then the first port.
pub fn open_midi_output(hint: Option<&str>) -> Result<Box<dyn MidiOut>, ThereminError> {
    let midi_out = midir::MidiOutput::new("hand_theremin")?;

    let ports = midi_out.ports();
    if ports.is_empty() {
        return Err(ThereminError::NoMidiPort);
    }

    let names: Vec<String> = ports
        .iter()
        .map(|p| midi_out.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
        .collect();
    let port_idx = pick_port(&names, hint);
    let name = names[port_idx].clone();
    log::info!(target: "voice", "opening MIDI port: {}", name);

    match midi_out.connect(&ports[port_idx], "hand-theremin") {
        Ok(conn) => Ok(Box::new(MidirOut { conn })),
        Err(e) => Err(ThereminError::MidiConnect { port: name, message: e.to_string() }),
    }
}

const SOFTSYNTH_HINTS: [&str; 5] = ["fluid", "timidity", "microsoft", "gm", "synth"];

fn pick_port(names: &[String], hint: Option<&str>) -> usize {
    let lowered: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
    if let Some(hint) = hint.map(str::to_lowercase).filter(|h| !h.is_empty()) {
        if let Some(i) = lowered.iter().position(|n| n.contains(&hint)) {
            return i;
        }
        log::warn!(target: "voice", "no MIDI port matches \"{}\"", hint);
    }
    lowered
        .iter()
        .position(|n| SOFTSYNTH_HINTS.iter().any(|s| n.contains(s)))
        .unwrap_or(0)
}

// ════════════════════════════════════════════════════════════════════════════
// MidiVoice — monophonic note tracking on top of MidiOut
// ════════════════════════════════════════════════════════════════════════════

/// Plays one note at a time on a MIDI channel.
pub struct MidiVoice {
    out:      Box<dyn MidiOut>,
    channel:  u8,
    velocity: u8,
    sounding: Option<u8>,
}

impl MidiVoice {
    pub fn new(mut out: Box<dyn MidiOut>, channel: u8, program: u8, velocity: u8) -> Self {
        let channel = channel & 0x0F;
        out.program_change(channel, program);
        MidiVoice { out, channel, velocity: velocity.min(127), sounding: None }
    }

    pub fn sounding(&self) -> Option<u8> { self.sounding }
}

impl Voice for MidiVoice {
    fn attack(&mut self, note: &NoteName) {
        if let Some(prev) = self.sounding.take() {
            self.out.note_off(self.channel, prev);
        }
        let key = note.midi();
        self.out.note_on(self.channel, key, self.velocity);
        self.sounding = Some(key);
    }

    fn release(&mut self) {
        if let Some(prev) = self.sounding.take() {
            self.out.note_off(self.channel, prev);
        }
    }
}

impl Drop for MidiVoice {
    fn drop(&mut self) {
        self.release();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Debug, PartialEq)]
    enum Msg { Program(u8, u8), On(u8, u8, u8), Off(u8, u8) }

    #[derive(Clone, Default)]
    struct Capture(Rc<RefCell<Vec<Msg>>>);

    impl MidiOut for Capture {
        fn program_change(&mut self, ch: u8, p: u8) { self.0.borrow_mut().push(Msg::Program(ch, p)); }
        fn note_on(&mut self, ch: u8, n: u8, v: u8) { self.0.borrow_mut().push(Msg::On(ch, n, v)); }
        fn note_off(&mut self, ch: u8, n: u8)       { self.0.borrow_mut().push(Msg::Off(ch, n)); }
    }

    fn note(s: &str) -> NoteName { s.parse().unwrap() }

    #[test]
    fn opens_with_program_change() {
        let cap = Capture::default();
        let _v = MidiVoice::new(Box::new(cap.clone()), 2, 79, 100);
        assert_eq!(cap.0.borrow()[0], Msg::Program(2, 79));
    }

    #[test]
    fn attack_switches_notes_monophonically() {
        let cap = Capture::default();
        let mut v = MidiVoice::new(Box::new(cap.clone()), 0, 0, 90);
        v.attack(&note("C5"));
        v.attack(&note("C4"));
        v.release();
        v.release();
        assert_eq!(
            cap.0.borrow()[1..],
            [Msg::On(0, 72, 90), Msg::Off(0, 72), Msg::On(0, 60, 90), Msg::Off(0, 60)]
        );
        assert_eq!(v.sounding(), None);
    }

    #[test]
    fn drop_releases_sounding_note() {
        let cap = Capture::default();
        {
            let mut v = MidiVoice::new(Box::new(cap.clone()), 0, 0, 100);
            v.apply(&NoteCommand::Attack(note("A4")));
        }
        assert_eq!(cap.0.borrow().last(), Some(&Msg::Off(0, 69)));
    }

    #[test]
    fn backend_parsing() {
        assert_eq!("synth".parse(), Ok(AudioBackend::Synth));
        assert_eq!("MIDI".parse(), Ok(AudioBackend::Midi));
        assert_eq!("none".parse(), Ok(AudioBackend::Null));
        assert!("tone.js".parse::<AudioBackend>().is_err());
    }

    #[test]
    fn port_preference() {
        let names: Vec<String> = ["Midi Through", "FLUID Synth (1234)", "USB Keys"]
            .iter().map(|s| s.to_string()).collect();
        assert_eq!(pick_port(&names, None), 1);
        assert_eq!(pick_port(&names, Some("usb")), 2);
        assert_eq!(pick_port(&names, Some("nothing")), 1);
        let plain: Vec<String> = vec!["Port A".into(), "Port B".into()];
        assert_eq!(pick_port(&plain, None), 0);
    }
}
