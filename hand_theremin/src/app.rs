//! Top-level session and application loop.
//!
//! `Session` owns the mapper, the voice and the overlay state.  It consumes
//! tracking samples strictly in arrival order, one per frame, and is the
//! only place the playback state changes.

use std::sync::mpsc::{self, Receiver, TryRecvError};

use note_scale::NoteScale;

use crate::error::ThereminError;
use crate::landmark::{TrackingSample, INDEX_FINGER_TIP};
use crate::mapper::{GestureNoteMapper, NoteCommand, PlaybackState};
use crate::overlay::ScaleBands;
use crate::source::{spawn_frame_source, PointerInput, PointerSource};
use crate::visualizer::Visualizer;
use crate::voice::{open_voice, AudioSettings, Voice};

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowConfig {
    pub width:  usize,
    pub height: usize,
    pub fps:    u32,
    /// Flip the overlay horizontally.
    pub mirror: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig { width: 640, height: 480, fps: 60, mirror: true }
    }
}

/// Configuration for the full application.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub scale:      NoteScale,
    /// Landmark of the primary hand that picks the note.
    pub landmark:   usize,
    pub audio:      AudioSettings,
    pub window:     WindowConfig,
    /// Pacing for replayed recordings (0 = unpaced).
    pub replay_fps: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            scale:      NoteScale::c_major_octave(),
            landmark:   INDEX_FINGER_TIP,
            audio:      AudioSettings::default(),
            window:     WindowConfig::default(),
            replay_fps: 30,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Session
// ════════════════════════════════════════════════════════════════════════════

pub struct Session {
    mapper:      GestureNoteMapper,
    voice:       Box<dyn Voice>,
    bands:       ScaleBands,
    last_sample: TrackingSample,
    frames:      u64,
    transitions: u64,
    pub status:  String,
}

impl Session {
    pub fn new(scale: NoteScale, landmark: usize, voice: Box<dyn Voice>) -> Self {
        let bands = ScaleBands::new(&scale);
        Session {
            mapper: GestureNoteMapper::new(scale).with_landmark(landmark),
            voice,
            bands,
            last_sample: TrackingSample::empty(),
            frames:      0,
            transitions: 0,
            status:      "Ready: raise a hand to play".to_string(),
        }
    }

    /// Process one detector result.  Returns the command sent to the voice,
    /// if the playback state changed.
    pub fn handle_sample(&mut self, sample: TrackingSample) -> Option<NoteCommand> {
        self.frames += 1;
        let command = self.mapper.update(&sample);
        if let Some(cmd) = &command {
            self.voice.apply(cmd);
            self.transitions += 1;
            match cmd {
                NoteCommand::Attack(note) => {
                    log::debug!(target: "session", "frame {}: attack {}", self.frames, note);
                    self.status = format!("Playing {}", note);
                }
                NoteCommand::Release => {
                    log::debug!(target: "session", "frame {}: release", self.frames);
                    self.status = "Hand lost: note released".to_string();
                }
            }
        }
        self.bands.set_active(self.mapper.active_index());
        self.last_sample = sample;
        command
    }

    /// Per-frame animation.
    pub fn tick(&mut self) {
        self.bands.tick();
    }

    /// Release anything still sounding.
    pub fn shutdown(&mut self) -> Option<NoteCommand> {
        let command = self.mapper.reset();
        if let Some(cmd) = &command {
            self.voice.apply(cmd);
            self.transitions += 1;
        }
        self.bands.set_active(None);
        log::info!(
            target: "session",
            "session over: {} frame(s), {} note change(s)",
            self.frames,
            self.transitions
        );
        command
    }

    // ── Accessors for the render loop ─────────────────────────────────────

    pub fn playback(&self)    -> &PlaybackState  { self.mapper.state() }
    pub fn bands(&self)       -> &ScaleBands     { &self.bands }
    pub fn last_sample(&self) -> &TrackingSample { &self.last_sample }
    pub fn frames(&self)      -> u64             { self.frames }
    pub fn transitions(&self) -> u64             { self.transitions }
}

// ════════════════════════════════════════════════════════════════════════════
// Tracking input selection
// ════════════════════════════════════════════════════════════════════════════

/// Where tracking samples come from.
pub enum Tracking {
    /// Mouse in the visualizer window.
    Pointer,
    /// An already-spawned source (replay, hardware).
    Source(Receiver<TrackingSample>),
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the windowed application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the instrument with a visualizer window until it is closed.
pub fn run(cfg: AppConfig, tracking: Tracking) -> Result<(), ThereminError> {
    log::info!(target: "app", "starting hand tracking input");
    let (pointer_tx, frame_rx) = match tracking {
        Tracking::Pointer => {
            let (tx, rx) = mpsc::channel::<PointerInput>();
            let frames = spawn_frame_source(PointerSource { rx, mirror: cfg.window.mirror });
            (Some(tx), frames)
        }
        Tracking::Source(rx) => (None, rx),
    };

    log::info!(target: "app", "initialising audio ({})", cfg.audio.backend);
    let voice = open_voice(&cfg.audio)?;

    log::info!(
        target: "app",
        "tracking landmark {} across {} note(s)",
        cfg.landmark,
        cfg.scale.len()
    );
    let mut session = Session::new(cfg.scale.clone(), cfg.landmark, voice);

    log::info!(target: "app", "opening visualizer window");
    let mut vis = Visualizer::new(&cfg.window, pointer_tx)?;
    log::info!(target: "app", "running");

    let mut source_done = false;
    while vis.is_open() {
        if !vis.poll_input() { break; }

        if !source_done {
            loop {
                match frame_rx.try_recv() {
                    Ok(sample) => { session.handle_sample(sample); }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        source_done = true;
                        session.handle_sample(TrackingSample::empty());
                        session.status = "Tracking input ended".to_string();
                        break;
                    }
                }
            }
        }

        session.tick();
        vis.render(&session);
    }

    session.shutdown();
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// run_headless() — no window, one line per transition
// ════════════════════════════════════════════════════════════════════════════

/// Drain `frames` to the end, printing `attack <note>` / `release` for each
/// transition.
pub fn run_headless<W: std::io::Write>(
    cfg:    AppConfig,
    frames: Receiver<TrackingSample>,
    out:    &mut W,
) -> Result<(), ThereminError> {
    let voice = open_voice(&cfg.audio)?;
    let mut session = Session::new(cfg.scale, cfg.landmark, voice);
    let emit = |out: &mut W, cmd: &NoteCommand| match cmd {
        NoteCommand::Attack(note) => writeln!(out, "attack {}", note),
        NoteCommand::Release      => writeln!(out, "release"),
    };

    for sample in frames {
        if let Some(cmd) = session.handle_sample(sample) {
            emit(out, &cmd)?;
        }
    }
    if let Some(cmd) = session.shutdown() {
        emit(out, &cmd)?;
    }
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::Hand;
    use crate::source::ReplaySource;
    use crate::voice::AudioBackend;
    use note_scale::NoteName;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl Voice for Recorder {
        fn attack(&mut self, note: &NoteName) { self.0.borrow_mut().push(format!("attack {}", note)); }
        fn release(&mut self) { self.0.borrow_mut().push("release".to_string()); }
    }

    fn session() -> (Session, Recorder) {
        let rec = Recorder::default();
        let s = Session::new(NoteScale::default(), INDEX_FINGER_TIP, Box::new(rec.clone()));
        (s, rec)
    }

    fn at(y: f64) -> TrackingSample {
        TrackingSample::with_hand(Hand::pointing_at(0.5, y))
    }

    #[test]
    fn voice_hears_each_transition_once() {
        let (mut s, rec) = session();
        for sample in [at(0.05), at(0.06), at(0.99), at(0.99), TrackingSample::empty(), TrackingSample::empty()] {
            s.handle_sample(sample);
        }
        assert_eq!(*rec.0.borrow(), ["attack C5", "attack C4", "release"]);
        assert_eq!(s.frames(), 6);
        assert_eq!(s.transitions(), 3);
    }

    #[test]
    fn highlight_follows_playback_state() {
        let (mut s, _rec) = session();
        s.handle_sample(at(0.4));
        assert_eq!(s.bands().active(), Some(3));
        assert_eq!(s.playback().note().map(|n| n.to_string()), Some("G4".to_string()));
        s.handle_sample(TrackingSample::empty());
        assert_eq!(s.bands().active(), None);
        assert_eq!(s.playback(), &PlaybackState::Silent);
    }

    #[test]
    fn last_sample_is_kept_for_drawing() {
        let (mut s, _rec) = session();
        s.handle_sample(at(0.2));
        assert!(s.last_sample().primary_hand().is_some());
    }

    #[test]
    fn shutdown_releases_sounding_note() {
        let (mut s, rec) = session();
        s.handle_sample(at(0.5));
        assert_eq!(s.shutdown(), Some(NoteCommand::Release));
        assert_eq!(rec.0.borrow().last().map(String::as_str), Some("release"));
        assert_eq!(s.shutdown(), None);
    }

    #[test]
    fn headless_replay_prints_transitions() {
        let mut lines = Vec::new();
        for y in [0.05, 0.06, 0.99] {
            let points: Vec<String> =
                (0..9).map(|i| format!("{{\"x\":0.5,\"y\":{}}}", if i == 8 { y } else { 0.5 })).collect();
            lines.push(format!("{{\"multiHandLandmarks\":[[{}]]}}", points.join(",")));
        }
        lines.push("{\"multiHandLandmarks\":null}".to_string());
        lines.push("{}".to_string());

        let reader = Box::new(Cursor::new(lines.join("\n")));
        let frames = spawn_frame_source(ReplaySource::new(reader));
        let cfg = AppConfig {
            audio: AudioSettings { backend: AudioBackend::Null, ..AudioSettings::default() },
            ..AppConfig::default()
        };

        let mut out = Vec::new();
        run_headless(cfg, frames, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "attack C5\nattack C4\nrelease\n");
    }

    #[test]
    fn headless_shutdown_releases_when_stream_ends_mid_note() {
        let reader = Box::new(Cursor::new(
            "{\"hands\":[[{\"x\":0,\"y\":0},{\"x\":0,\"y\":0},{\"x\":0,\"y\":0},{\"x\":0,\"y\":0},{\"x\":0,\"y\":0},{\"x\":0,\"y\":0},{\"x\":0,\"y\":0},{\"x\":0,\"y\":0},{\"x\":0,\"y\":1.0}]]}\n"
                .to_string(),
        ));
        let frames = spawn_frame_source(ReplaySource::new(reader));
        let cfg = AppConfig {
            audio: AudioSettings { backend: AudioBackend::Null, ..AudioSettings::default() },
            ..AppConfig::default()
        };
        let mut out = Vec::new();
        run_headless(cfg, frames, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "attack C4\nrelease\n");
    }
}
