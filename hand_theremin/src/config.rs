use std::path::{Path, PathBuf};

use serde::Deserialize;

use note_scale::{NoteName, NoteScale, Scale};

use crate::app::{AppConfig, WindowConfig};
use crate::error::ThereminError;
use crate::landmark::LANDMARK_COUNT;
use crate::synth::Envelope;
use crate::voice::{AudioBackend, AudioSettings};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    scale: ScaleSection,
    #[serde(default)]
    tracking: TrackingSection,
    #[serde(default)]
    audio: AudioSection,
    #[serde(default)]
    window: WindowSection,
    #[serde(default)]
    replay: ReplaySection,
}

#[derive(Deserialize, Default)]
struct ScaleSection {
    notes: Option<Vec<String>>,
    root:  Option<String>,
    mode:  Option<String>,
    count: Option<usize>,
}

#[derive(Deserialize, Default)]
struct TrackingSection {
    landmark: Option<usize>,
    mirror:   Option<bool>,
}

#[derive(Deserialize, Default)]
struct AudioSection {
    backend:   Option<String>,
    device:    Option<String>,
    program:   Option<u8>,
    velocity:  Option<u8>,
    channel:   Option<u8>,
    tuning_a4: Option<f32>,
    volume:    Option<f32>,
    #[serde(default)]
    envelope:  EnvelopeSection,
}

#[derive(Deserialize, Default)]
struct EnvelopeSection {
    attack:  Option<f32>,
    decay:   Option<f32>,
    sustain: Option<f32>,
    release: Option<f32>,
}

#[derive(Deserialize, Default)]
struct WindowSection {
    width:  Option<usize>,
    height: Option<usize>,
    fps:    Option<u32>,
}

#[derive(Deserialize, Default)]
struct ReplaySection {
    fps: Option<u32>,
}

/// Layered configuration: embedded defaults, then the user file.
pub struct Config {
    file: ConfigFile,
}

impl Config {
    /// Load defaults plus either `explicit` (errors are fatal) or the user
    /// config file (errors are logged and the file ignored).
    pub fn load(explicit: Option<&Path>) -> Result<Self, ThereminError> {
        let mut config = Config::defaults()?;

        match explicit {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| {
                    ThereminError::ConfigRead { path: path.to_path_buf(), source }
                })?;
                config.merge_str(&text, path)?;
            }
            None => {
                if let Some(path) = user_config_path().filter(|p| p.exists()) {
                    match std::fs::read_to_string(&path) {
                        Ok(text) => {
                            if let Err(e) = config.merge_str(&text, &path) {
                                log::warn!(target: "config", "ignoring {}", e);
                            }
                        }
                        Err(e) => {
                            log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                        }
                    }
                }
            }
        }
        Ok(config)
    }

    /// The embedded defaults alone.
    pub fn defaults() -> Result<Self, ThereminError> {
        let file = toml::from_str(DEFAULT_CONFIG).map_err(|source| ThereminError::ConfigParse {
            path: PathBuf::from("<embedded config.toml>"),
            source,
        })?;
        Ok(Config { file })
    }

    /// Overlay a TOML document on the current values.
    pub fn merge_str(&mut self, text: &str, origin: &Path) -> Result<(), ThereminError> {
        let user: ConfigFile = toml::from_str(text).map_err(|source| ThereminError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })?;
        self.merge(user);
        Ok(())
    }

    fn merge(&mut self, user: ConfigFile) {
        let base = &mut self.file;

        // A root/mode/count override without explicit notes means "build the
        // scale from these", so drop the default note list.
        let scale_by_mode = user.scale.notes.is_none()
            && (user.scale.root.is_some() || user.scale.mode.is_some() || user.scale.count.is_some());
        if scale_by_mode {
            base.scale.notes = None;
        }
        merge(&mut base.scale.notes, user.scale.notes);
        merge(&mut base.scale.root,  user.scale.root);
        merge(&mut base.scale.mode,  user.scale.mode);
        merge(&mut base.scale.count, user.scale.count);

        merge(&mut base.tracking.landmark, user.tracking.landmark);
        merge(&mut base.tracking.mirror,   user.tracking.mirror);

        let (a, u) = (&mut base.audio, user.audio);
        merge(&mut a.backend,   u.backend);
        merge(&mut a.device,    u.device);
        merge(&mut a.program,   u.program);
        merge(&mut a.velocity,  u.velocity);
        merge(&mut a.channel,   u.channel);
        merge(&mut a.tuning_a4, u.tuning_a4);
        merge(&mut a.volume,    u.volume);
        merge(&mut a.envelope.attack,  u.envelope.attack);
        merge(&mut a.envelope.decay,   u.envelope.decay);
        merge(&mut a.envelope.sustain, u.envelope.sustain);
        merge(&mut a.envelope.release, u.envelope.release);

        merge(&mut base.window.width,  user.window.width);
        merge(&mut base.window.height, user.window.height);
        merge(&mut base.window.fps,    user.window.fps);

        merge(&mut base.replay.fps, user.replay.fps);
    }

    /// Build the note scale.  Explicit `notes` win over root/mode/count.
    pub fn scale(&self) -> Result<NoteScale, ThereminError> {
        let s = &self.file.scale;
        if let Some(notes) = s.notes.as_ref().filter(|n| !n.is_empty()) {
            return Ok(NoteScale::from_names(notes)?);
        }
        let root: NoteName = s
            .root
            .as_deref()
            .unwrap_or("C4")
            .parse()
            .map_err(|e: note_scale::NoteError| ThereminError::ConfigValue {
                key:     "scale.root",
                message: e.to_string(),
            })?;
        let mode = Scale::by_name(s.mode.as_deref().unwrap_or("major"))?;
        Ok(NoteScale::descending(root.midi(), &mode, s.count.unwrap_or(8))?)
    }

    pub fn audio(&self) -> Result<AudioSettings, ThereminError> {
        let a = &self.file.audio;
        let fallback = AudioSettings::default();

        let backend = match a.backend.as_deref() {
            Some(b) => b.parse::<AudioBackend>().map_err(|message| ThereminError::ConfigValue {
                key: "audio.backend",
                message,
            })?,
            None => fallback.backend,
        };
        let channel = a.channel.unwrap_or(fallback.channel);
        if channel > 15 {
            return Err(ThereminError::ConfigValue {
                key:     "audio.channel",
                message: format!("{} is not a MIDI channel (0–15)", channel),
            });
        }
        let env = &a.envelope;
        let default_env = fallback.envelope;

        Ok(AudioSettings {
            backend,
            device:    a.device.clone().filter(|d| !d.trim().is_empty()),
            program:   a.program.unwrap_or(fallback.program).min(127),
            velocity:  a.velocity.unwrap_or(fallback.velocity).min(127),
            channel,
            tuning_a4: a.tuning_a4.unwrap_or(fallback.tuning_a4).clamp(200.0, 600.0),
            volume:    a.volume.unwrap_or(fallback.volume).clamp(0.0, 1.0),
            envelope:  Envelope {
                attack:  env.attack.unwrap_or(default_env.attack).max(0.0),
                decay:   env.decay.unwrap_or(default_env.decay).max(0.0),
                sustain: env.sustain.unwrap_or(default_env.sustain).clamp(0.0, 1.0),
                release: env.release.unwrap_or(default_env.release).max(0.0),
            },
        })
    }

    pub fn landmark(&self) -> Result<usize, ThereminError> {
        let landmark = self.file.tracking.landmark.unwrap_or(crate::landmark::INDEX_FINGER_TIP);
        if landmark >= LANDMARK_COUNT {
            return Err(ThereminError::ConfigValue {
                key:     "tracking.landmark",
                message: format!("{} is not a hand landmark (0–{})", landmark, LANDMARK_COUNT - 1),
            });
        }
        Ok(landmark)
    }

    pub fn window(&self) -> WindowConfig {
        let w = &self.file.window;
        let fallback = WindowConfig::default();
        WindowConfig {
            width:  w.width.unwrap_or(fallback.width).clamp(160, 3840),
            height: w.height.unwrap_or(fallback.height).clamp(120, 2160),
            fps:    w.fps.unwrap_or(fallback.fps).clamp(1, 240),
            mirror: self.file.tracking.mirror.unwrap_or(fallback.mirror),
        }
    }

    pub fn replay_fps(&self) -> u32 {
        self.file.replay.fps.unwrap_or(30)
    }

    /// Everything the app needs, validated.
    pub fn app_config(&self) -> Result<AppConfig, ThereminError> {
        Ok(AppConfig {
            scale:      self.scale()?,
            landmark:   self.landmark()?,
            audio:      self.audio()?,
            window:     self.window(),
            replay_fps: self.replay_fps(),
        })
    }
}

fn merge<T>(base: &mut Option<T>, over: Option<T>) {
    if over.is_some() {
        *base = over;
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hand_theremin").join("config.toml"))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn with(text: &str) -> Config {
        let mut c = Config::defaults().unwrap();
        c.merge_str(text, Path::new("test.toml")).unwrap();
        c
    }

    #[test]
    fn embedded_defaults_parse() {
        let app = Config::defaults().unwrap().app_config().unwrap();
        assert_eq!(app.scale, NoteScale::c_major_octave());
        assert_eq!(app.landmark, 8);
        assert_eq!(app.audio, AudioSettings::default());
        assert_eq!(app.window, WindowConfig::default());
        assert_eq!(app.replay_fps, 30);
    }

    #[test]
    fn explicit_notes_override() {
        let c = with("[scale]\nnotes = [\"G4\", \"E4\", \"C4\"]\n");
        let names: Vec<String> = c.scale().unwrap().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, ["G4", "E4", "C4"]);
    }

    #[test]
    fn mode_override_builds_from_root() {
        let c = with("[scale]\nroot = \"A3\"\nmode = \"pentatonic minor\"\ncount = 6\n");
        let names: Vec<String> = c.scale().unwrap().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, ["A4", "G4", "E4", "D4", "C4", "A3"]);
    }

    #[test]
    fn bad_note_is_reported() {
        let c = with("[scale]\nnotes = [\"C5\", \"Q9\"]\n");
        assert!(matches!(c.scale(), Err(ThereminError::Scale(_))));
    }

    #[test]
    fn bad_backend_and_channel_are_rejected() {
        let c = with("[audio]\nbackend = \"webaudio\"\n");
        assert!(matches!(c.audio(), Err(ThereminError::ConfigValue { key: "audio.backend", .. })));
        let c = with("[audio]\nchannel = 16\n");
        assert!(matches!(c.audio(), Err(ThereminError::ConfigValue { key: "audio.channel", .. })));
    }

    #[test]
    fn landmark_out_of_range() {
        let c = with("[tracking]\nlandmark = 21\n");
        assert!(c.landmark().is_err());
    }

    #[test]
    fn partial_envelope_keeps_other_defaults() {
        let c = with("[audio.envelope]\nrelease = 1.5\n");
        let env = c.audio().unwrap().envelope;
        assert_eq!(env.release, 1.5);
        assert_eq!(env.attack, 0.1);
    }

    #[test]
    fn malformed_text_is_a_parse_error() {
        let mut c = Config::defaults().unwrap();
        let err = c.merge_str("[audio\nbackend=", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, ThereminError::ConfigParse { .. }));
    }

    #[test]
    fn explicit_file_is_loaded() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[audio]\nbackend = \"null\"\n[window]\nmirror = false").unwrap();
        // unknown keys are ignored; mirror lives under [tracking]
        let app = Config::load(Some(f.path())).unwrap().app_config().unwrap();
        assert_eq!(app.audio.backend, AudioBackend::Null);
        assert!(app.window.mirror);
    }

    #[test]
    fn missing_explicit_file_is_fatal() {
        let err = Config::load(Some(Path::new("/nonexistent/hand_theremin.toml"))).err().unwrap();
        assert!(matches!(err, ThereminError::ConfigRead { .. }));
    }
}
