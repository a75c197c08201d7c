//! Gesture → note state machine.
//!
//! States are `Silent` plus one `Sounding` state per scale note.  Each
//! tracking sample drives at most one transition, and a [`NoteCommand`] is
//! emitted only when the state actually changes, so a stationary finger
//! does not retrigger its note every frame.

use note_scale::{NoteName, NoteScale};

use crate::landmark::{TrackingSample, INDEX_FINGER_TIP};

/// What the instrument should do after a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NoteCommand {
    /// Start sounding this note; a previous note stops implicitly.
    Attack(NoteName),
    /// Stop the sounding note.
    Release,
}

/// The currently sounding note, if any.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Silent,
    Sounding(NoteName),
}

impl PlaybackState {
    pub fn note(&self) -> Option<&NoteName> {
        match self {
            PlaybackState::Silent         => None,
            PlaybackState::Sounding(note) => Some(note),
        }
    }
}

/// Maps one landmark's height to a note and tracks what is playing.
#[derive(Clone, Debug)]
pub struct GestureNoteMapper {
    scale:    NoteScale,
    landmark: usize,
    state:    PlaybackState,
    /// Band the tracked landmark is in while sounding.  A scale may repeat a
    /// note, so this is not derivable from `state`.
    index:    Option<usize>,
}

impl GestureNoteMapper {
    /// Track the index fingertip against `scale`.
    pub fn new(scale: NoteScale) -> Self {
        GestureNoteMapper {
            scale,
            landmark: INDEX_FINGER_TIP,
            state:    PlaybackState::Silent,
            index:    None,
        }
    }

    /// Track a different landmark of the primary hand.
    pub fn with_landmark(mut self, landmark: usize) -> Self {
        self.landmark = landmark;
        self
    }

    /// Feed one detector result.
    pub fn update(&mut self, sample: &TrackingSample) -> Option<NoteCommand> {
        self.update_y(sample.landmark_y(self.landmark))
    }

    /// Feed the tracked landmark's vertical position directly; `None` means
    /// no hand.
    pub fn update_y(&mut self, y: Option<f64>) -> Option<NoteCommand> {
        match y {
            None => self.reset(),
            Some(y) => {
                let index = self.scale.index_for(y);
                self.index = Some(index);
                let note = self.scale.map_note(y);
                if self.state.note() == Some(note) {
                    return None;
                }
                self.state = PlaybackState::Sounding(note.clone());
                Some(NoteCommand::Attack(note.clone()))
            }
        }
    }

    /// Return to `Silent`, releasing the sounding note if there is one.
    pub fn reset(&mut self) -> Option<NoteCommand> {
        self.index = None;
        match std::mem::take(&mut self.state) {
            PlaybackState::Silent      => None,
            PlaybackState::Sounding(_) => Some(NoteCommand::Release),
        }
    }

    pub fn state(&self) -> &PlaybackState { &self.state }

    /// Scale index of the sounding note, for highlighting.
    pub fn active_index(&self) -> Option<usize> {
        self.index
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
