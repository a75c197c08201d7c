//! # note_scale
//!
//! Pitch vocabulary for the hand theremin: note names, interval sets, and
//! the fixed, top-to-bottom [`NoteScale`] that turns a normalized vertical
//! position into a note.
//!
//! ## Quick start
//!
//! ```rust
//! use note_scale::{NoteScale, Scale};
//!
//! // C major octave, highest note first (index 0 = top of the frame)
//! let scale = NoteScale::descending(60, &Scale::major(), 8).unwrap();
//! assert_eq!(scale.map_note(0.05).to_string(), "C5");
//! assert_eq!(scale.map_note(0.99).to_string(), "C4");
//! assert_eq!(scale.map_note(1.0).to_string(),  "C4");
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

/// Why a note name could not be parsed or built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NoteError {
    #[error("empty note name")]
    Empty,

    #[error("invalid note letter '{0}' (expected A–G)")]
    BadLetter(char),

    #[error("invalid accidental '{0}' (expected '#' or 'b')")]
    BadAccidental(char),

    #[error("invalid octave \"{0}\"")]
    BadOctave(String),

    #[error("note {name} lies outside the MIDI range 0–127")]
    OutOfRange { name: String },
}

/// Why a [`NoteScale`] could not be built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScaleError {
    #[error("a note scale needs at least one note")]
    Empty,

    #[error("note #{position} (\"{text}\"): {source}")]
    BadNote {
        position: usize,
        text:     String,
        #[source]
        source:   NoteError,
    },

    #[error("unknown scale \"{0}\"")]
    UnknownScale(String),

    #[error("scale step {step} from root {root} exceeds MIDI note 127")]
    OutOfRange { root: u8, step: usize },
}

// ════════════════════════════════════════════════════════════════════════════
// Letter — the natural pitch classes
// ════════════════════════════════════════════════════════════════════════════

/// One of the seven natural note letters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Letter { C, D, E, F, G, A, B }

impl Letter {
    /// Semitones above C.
    pub fn semitone(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }

    fn from_char(c: char) -> Result<Self, NoteError> {
        match c.to_ascii_uppercase() {
            'C' => Ok(Letter::C),
            'D' => Ok(Letter::D),
            'E' => Ok(Letter::E),
            'F' => Ok(Letter::F),
            'G' => Ok(Letter::G),
            'A' => Ok(Letter::A),
            'B' => Ok(Letter::B),
            _   => Err(NoteError::BadLetter(c)),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// NoteName — "C5", "F#4", "Bb3"
// ════════════════════════════════════════════════════════════════════════════

/// A spelled note in scientific pitch notation (C4 = middle C = MIDI 60).
///
/// Equality is by spelling: `C#4` and `Db4` sound the same but are distinct
/// identifiers.  Use [`NoteName::midi`] to compare pitches.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NoteName {
    letter:     Letter,
    /// Positive = sharps, negative = flats.
    accidental: i8,
    octave:     i8,
}

/// Sharp spellings used by [`NoteName::from_midi`].
const SHARP_SPELLINGS: [(Letter, i8); 12] = [
    (Letter::C, 0), (Letter::C, 1), (Letter::D, 0), (Letter::D, 1),
    (Letter::E, 0), (Letter::F, 0), (Letter::F, 1), (Letter::G, 0),
    (Letter::G, 1), (Letter::A, 0), (Letter::A, 1), (Letter::B, 0),
];

impl NoteName {
    /// Build a note, rejecting anything outside MIDI 0–127.
    pub fn new(letter: Letter, accidental: i8, octave: i8) -> Result<Self, NoteError> {
        let note = NoteName { letter, accidental, octave };
        if (0..=127).contains(&note.midi_i32()) {
            Ok(note)
        } else {
            Err(NoteError::OutOfRange { name: note.to_string() })
        }
    }

    /// Spell a MIDI note number using sharps.
    pub fn from_midi(n: u8) -> Self {
        let n = n.min(127);
        let (letter, accidental) = SHARP_SPELLINGS[(n % 12) as usize];
        NoteName { letter, accidental, octave: (n / 12) as i8 - 1 }
    }

    /// MIDI note number (C4 = 60).
    pub fn midi(&self) -> u8 {
        self.midi_i32() as u8
    }

    /// Equal-tempered frequency in Hz, given the tuning of A4.
    pub fn frequency(&self, a4_hz: f32) -> f32 {
        a4_hz * 2f32.powf((self.midi_i32() - 69) as f32 / 12.0)
    }

    fn midi_i32(&self) -> i32 {
        (self.octave as i32 + 1) * 12 + self.letter.semitone() + self.accidental as i32
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter.as_char())?;
        let mark = if self.accidental > 0 { '#' } else { 'b' };
        for _ in 0..self.accidental.unsigned_abs() {
            write!(f, "{}", mark)?;
        }
        write!(f, "{}", self.octave)
    }
}

impl FromStr for NoteName {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let letter = Letter::from_char(chars.next().ok_or(NoteError::Empty)?)?;

        let rest = chars.as_str();
        let octave_at = rest
            .find(|c: char| c == '-' || c.is_ascii_digit())
            .ok_or_else(|| NoteError::BadOctave(rest.to_string()))?;
        let (marks, octave_text) = rest.split_at(octave_at);

        let mut accidental: i8 = 0;
        for c in marks.chars() {
            match c {
                '#' | '♯' => accidental += 1,
                'b' | '♭' => accidental -= 1,
                other     => return Err(NoteError::BadAccidental(other)),
            }
        }

        let octave: i8 = octave_text
            .parse()
            .map_err(|_| NoteError::BadOctave(octave_text.to_string()))?;

        NoteName::new(letter, accidental, octave)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Scale — interval sets
// ════════════════════════════════════════════════════════════════════════════

/// A pitch collection defined as semitone intervals from a root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scale {
    /// Semitone offsets from root, e.g. `[0,2,4,5,7,9,11]` for major.
    pub intervals: Vec<u8>,
    pub name: &'static str,
}

impl Scale {
    pub fn chromatic() -> Self {
        Scale { intervals: (0..12).collect(), name: "Chromatic" }
    }
    /// Major scale (Ionian): W W H W W W H
    pub fn major() -> Self {
        Scale { intervals: vec![0,2,4,5,7,9,11], name: "Major" }
    }
    /// Natural minor (Aeolian): W H W W H W W
    pub fn minor() -> Self {
        Scale { intervals: vec![0,2,3,5,7,8,10], name: "Minor" }
    }
    pub fn pentatonic_major() -> Self {
        Scale { intervals: vec![0,2,4,7,9], name: "Pentatonic Major" }
    }
    pub fn pentatonic_minor() -> Self {
        Scale { intervals: vec![0,3,5,7,10], name: "Pentatonic Minor" }
    }
    pub fn dorian() -> Self {
        Scale { intervals: vec![0,2,3,5,7,9,10], name: "Dorian" }
    }
    pub fn phrygian() -> Self {
        Scale { intervals: vec![0,1,3,5,7,8,10], name: "Phrygian" }
    }
    pub fn lydian() -> Self {
        Scale { intervals: vec![0,2,4,6,7,9,11], name: "Lydian" }
    }
    pub fn mixolydian() -> Self {
        Scale { intervals: vec![0,2,4,5,7,9,10], name: "Mixolydian" }
    }
    pub fn whole_tone() -> Self {
        Scale { intervals: vec![0,2,4,6,8,10], name: "Whole Tone" }
    }
    pub fn blues() -> Self {
        Scale { intervals: vec![0,3,5,6,7,10], name: "Blues" }
    }

    /// Look a scale up by name, ignoring case, spaces, `-` and `_`.
    ///
    /// ```rust
    /// use note_scale::Scale;
    /// assert_eq!(Scale::by_name("pentatonic-minor").unwrap(), Scale::pentatonic_minor());
    /// ```
    pub fn by_name(name: &str) -> Result<Self, ScaleError> {
        let key: String = name
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "chromatic"                    => Ok(Scale::chromatic()),
            "major" | "ionian"             => Ok(Scale::major()),
            "minor" | "aeolian"            => Ok(Scale::minor()),
            "pentatonicmajor" | "pentatonic" => Ok(Scale::pentatonic_major()),
            "pentatonicminor"              => Ok(Scale::pentatonic_minor()),
            "dorian"                       => Ok(Scale::dorian()),
            "phrygian"                     => Ok(Scale::phrygian()),
            "lydian"                       => Ok(Scale::lydian()),
            "mixolydian"                   => Ok(Scale::mixolydian()),
            "wholetone"                    => Ok(Scale::whole_tone()),
            "blues"                        => Ok(Scale::blues()),
            _ => Err(ScaleError::UnknownScale(name.to_string())),
        }
    }

    pub fn len(&self) -> usize { self.intervals.len() }
    pub fn is_empty(&self) -> bool { self.intervals.is_empty() }
}

// ════════════════════════════════════════════════════════════════════════════
// NoteScale — the fixed, top-to-bottom note ladder
// ════════════════════════════════════════════════════════════════════════════

/// The ordered notes addressable by vertical hand position.
///
/// Index 0 is the highest pitch and sits at the top of the frame; the last
/// index is the lowest pitch at the bottom.  A `NoteScale` is never empty
/// and has no mutating methods, so the order fixed at startup holds for the
/// whole session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteScale {
    notes: Vec<NoteName>,
}

impl NoteScale {
    pub fn new(notes: Vec<NoteName>) -> Result<Self, ScaleError> {
        if notes.is_empty() {
            return Err(ScaleError::Empty);
        }
        Ok(NoteScale { notes })
    }

    /// Parse a list of note names, top (highest) first.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, ScaleError> {
        let notes = names
            .iter()
            .enumerate()
            .map(|(position, text)| {
                text.as_ref().parse::<NoteName>().map_err(|source| ScaleError::BadNote {
                    position,
                    text: text.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        NoteScale::new(notes)
    }

    /// `count` scale steps upward from `root` (wrapping across octaves),
    /// stored highest first.
    pub fn descending(root: u8, scale: &Scale, count: usize) -> Result<Self, ScaleError> {
        if scale.is_empty() || count == 0 {
            return Err(ScaleError::Empty);
        }
        let n = scale.len();
        let mut notes = (0..count)
            .map(|step| {
                let midi = root as usize + (step / n) * 12 + scale.intervals[step % n] as usize;
                if midi > 127 {
                    Err(ScaleError::OutOfRange { root, step })
                } else {
                    Ok(NoteName::from_midi(midi as u8))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        notes.reverse();
        NoteScale::new(notes)
    }

    /// `C5 B4 A4 G4 F4 E4 D4 C4`.
    pub fn c_major_octave() -> Self {
        let notes = [72, 71, 69, 67, 65, 64, 62, 60]
            .into_iter()
            .map(NoteName::from_midi)
            .collect();
        NoteScale { notes }
    }

    pub fn len(&self) -> usize { self.notes.len() }

    /// Whether the scale holds no notes.  Construction rejects that, so
    /// this is false for every `NoteScale`.
    pub fn is_empty(&self) -> bool { self.notes.is_empty() }

    pub fn get(&self, index: usize) -> Option<&NoteName> { self.notes.get(index) }

    pub fn iter(&self) -> std::slice::Iter<'_, NoteName> { self.notes.iter() }

    /// Quantize a normalized vertical position (0.0 = top) to a scale index.
    ///
    /// `floor(y * N)` clamped to `[0, N-1]`, so `y == 1.0` lands on the last
    /// note.  Negative and NaN positions land on index 0.
    pub fn index_for(&self, y: f64) -> usize {
        let n = self.notes.len();
        let scaled = (y * n as f64).floor();
        if scaled.is_nan() || scaled <= 0.0 {
            0
        } else {
            (scaled as usize).min(n - 1)
        }
    }

    /// The note at normalized vertical position `y`.
    pub fn map_note(&self, y: f64) -> &NoteName {
        &self.notes[self.index_for(y)]
    }
}

impl Default for NoteScale {
    fn default() -> Self {
        NoteScale::c_major_octave()
    }
}

impl<'a> IntoIterator for &'a NoteScale {
    type Item = &'a NoteName;
    type IntoIter = std::slice::Iter<'a, NoteName>;

    fn into_iter(self) -> Self::IntoIter {
        self.notes.iter()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn note(s: &str) -> NoteName { s.parse().unwrap() }

    // ── NoteName ──────────────────────────────────────────────────────────
    #[test]
    fn parse_naturals_and_accidentals() {
        assert_eq!(note("C4").midi(), 60);
        assert_eq!(note("C5").midi(), 72);
        assert_eq!(note("F#4").midi(), 66);
        assert_eq!(note("Bb3").midi(), 58);
        assert_eq!(note("c-1").midi(), 0);
        assert_eq!(note("G9").midi(), 127);
    }

    #[test]
    fn display_round_trips_spelling() {
        for s in ["C5", "F#4", "Bb3", "Ebb2", "C-1"] {
            assert_eq!(note(s).to_string(), s);
        }
    }

    #[test]
    fn enharmonics_are_distinct_identifiers() {
        assert_ne!(note("C#4"), note("Db4"));
        assert_eq!(note("C#4").midi(), note("Db4").midi());
    }

    #[test]
    fn parse_errors() {
        assert_eq!("".parse::<NoteName>(), Err(NoteError::Empty));
        assert_eq!("H4".parse::<NoteName>(), Err(NoteError::BadLetter('H')));
        assert_eq!("Cx4".parse::<NoteName>(), Err(NoteError::BadAccidental('x')));
        assert!(matches!("C".parse::<NoteName>(), Err(NoteError::BadOctave(_))));
        assert!(matches!("G#9".parse::<NoteName>(), Err(NoteError::OutOfRange { .. })));
        assert!(matches!("Cb-1".parse::<NoteName>(), Err(NoteError::OutOfRange { .. })));
    }

    #[test]
    fn from_midi_uses_sharps() {
        assert_eq!(NoteName::from_midi(60).to_string(), "C4");
        assert_eq!(NoteName::from_midi(61).to_string(), "C#4");
        assert_eq!(NoteName::from_midi(70).to_string(), "A#4");
        assert_eq!(NoteName::from_midi(0).to_string(), "C-1");
    }

    #[test]
    fn frequency_a440() {
        assert!((note("A4").frequency(440.0) - 440.0).abs() < 1e-3);
        assert!((note("A5").frequency(440.0) - 880.0).abs() < 1e-2);
        assert!((note("C4").frequency(440.0) - 261.626).abs() < 1e-2);
    }

    // ── Scale ─────────────────────────────────────────────────────────────
    #[test]
    fn scale_lookup_by_name() {
        assert_eq!(Scale::by_name("Major").unwrap(), Scale::major());
        assert_eq!(Scale::by_name("whole_tone").unwrap(), Scale::whole_tone());
        assert!(matches!(Scale::by_name("lochrian"), Err(ScaleError::UnknownScale(_))));
    }

    // ── NoteScale construction ────────────────────────────────────────────
    #[test]
    fn default_is_c_major_octave_top_down() {
        let names: Vec<String> = NoteScale::default().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, ["C5", "B4", "A4", "G4", "F4", "E4", "D4", "C4"]);
    }

    #[test]
    fn descending_major_matches_default() {
        let s = NoteScale::descending(60, &Scale::major(), 8).unwrap();
        assert_eq!(s, NoteScale::c_major_octave());
    }

    #[test]
    fn descending_pentatonic_wraps_octave() {
        let s = NoteScale::descending(60, &Scale::pentatonic_major(), 6).unwrap();
        let names: Vec<String> = s.iter().map(|n| n.to_string()).collect();
        assert_eq!(names, ["C5", "A4", "G4", "E4", "D4", "C4"]);
    }

    #[test]
    fn descending_rejects_overflow() {
        assert!(matches!(
            NoteScale::descending(120, &Scale::major(), 8),
            Err(ScaleError::OutOfRange { .. })
        ));
    }

    #[test]
    fn from_names_reports_position() {
        let err = NoteScale::from_names(&["C5", "X4"]).unwrap_err();
        assert!(matches!(err, ScaleError::BadNote { position: 1, .. }));
        assert_eq!(NoteScale::from_names::<&str>(&[]), Err(ScaleError::Empty));
    }

    // ── Quantizer ─────────────────────────────────────────────────────────
    #[test]
    fn map_note_is_floor_of_y_times_n() {
        let s = NoteScale::default();
        for k in 0..1000 {
            let y = k as f64 / 1000.0;
            let expected = (y * 8.0).floor() as usize;
            assert_eq!(s.index_for(y), expected, "y = {}", y);
            assert_eq!(s.map_note(y), s.get(expected).unwrap());
        }
    }

    #[test]
    fn y_of_one_clamps_to_last() {
        let s = NoteScale::default();
        assert_eq!(s.index_for(1.0), 7);
        assert_eq!(s.map_note(1.0).to_string(), "C4");
        assert_eq!(s.index_for(3.5), 7);
    }

    #[test]
    fn bucket_edge_goes_to_lower_bucket() {
        let s = NoteScale::default();
        assert_eq!(s.index_for(0.125), 1);
        assert_eq!(s.map_note(0.125).to_string(), "B4");
    }

    #[test]
    fn just_below_bucket_edge_stays_in_upper_bucket() {
        let s = NoteScale::default();
        assert_eq!(s.index_for(0.12499999999), 0);
        assert_eq!(s.index_for(0.87499999999), 6);
        assert_eq!(s.map_note(0.99999999999).to_string(), "C4");
    }

    #[test]
    fn negative_and_nan_clamp_to_top() {
        let s = NoteScale::default();
        assert_eq!(s.index_for(-0.2), 0);
        assert_eq!(s.index_for(f64::NAN), 0);
    }

    #[test]
    fn single_note_scale_always_maps_to_it() {
        let s = NoteScale::from_names(&["A4"]).unwrap();
        for y in [0.0, 0.5, 0.999, 1.0] {
            assert_eq!(s.map_note(y).to_string(), "A4");
        }
    }
}
