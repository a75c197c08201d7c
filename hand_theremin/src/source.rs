//! Hand tracking sources: JSON-lines replay, pointer simulation, and
//! LeapMotion hardware.
//!
//! Every source runs on its own thread and delivers one [`TrackingSample`]
//! per frame over a `mpsc` channel.  Consumers don't need to know whether
//! samples came from a recorded detector stream, the mouse, or real
//! hardware.

use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::landmark::{Hand, TrackingSample};

// ════════════════════════════════════════════════════════════════════════════
// FrameSource trait — unified interface for replay, sim and hw
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`TrackingSample`]s over a channel.
///
/// A source returns when it runs out of frames or the receiver is dropped.
pub trait FrameSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<TrackingSample>);
}

/// Spawn a frame source on its own thread and return the receiving end.
pub fn spawn_frame_source<S: FrameSource>(source: S) -> Receiver<TrackingSample> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// ReplaySource — recorded or piped detector output
// ════════════════════════════════════════════════════════════════════════════

/// Reads one detector result per line (see [`crate::landmark`] for the
/// shape).  Blank lines and `#` comments are skipped; an undecodable line
/// becomes an empty frame so a glitch reads as "hand lost" rather than
/// stopping playback.
pub struct ReplaySource {
    reader: Box<dyn BufRead + Send>,
    /// Wall-clock pacing between frames; `None` replays as fast as possible.
    frame_interval: Option<Duration>,
}

impl ReplaySource {
    pub fn new(reader: Box<dyn BufRead + Send>) -> Self {
        ReplaySource { reader, frame_interval: None }
    }

    /// Pace frames at `fps` (0 = unpaced).
    pub fn paced(mut self, fps: u32) -> Self {
        self.frame_interval = (fps > 0).then(|| Duration::from_secs_f64(1.0 / fps as f64));
        self
    }

    /// Decode one line; `None` for lines that carry no frame.
    pub fn decode_line(line_no: usize, line: &str) -> Option<TrackingSample> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        match TrackingSample::from_json(line) {
            Ok(sample) => Some(sample),
            Err(e) => {
                log::warn!(target: "source", "line {}: {}; treating as no hand", line_no, e);
                Some(TrackingSample::empty())
            }
        }
    }
}

impl FrameSource for ReplaySource {
    fn run(self: Box<Self>, tx: Sender<TrackingSample>) {
        let ReplaySource { reader, frame_interval } = *self;
        let mut next_frame = Instant::now();
        let mut frames = 0usize;

        for (i, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(l)  => l,
                Err(e) => {
                    log::error!(target: "source", "replay read error: {}", e);
                    break;
                }
            };
            let Some(sample) = ReplaySource::decode_line(i + 1, &line) else { continue };

            if let Some(interval) = frame_interval {
                let now = Instant::now();
                if next_frame > now {
                    thread::sleep(next_frame - now);
                }
                next_frame += interval;
            }
            if tx.send(sample).is_err() { return; }
            frames += 1;
        }
        log::info!(target: "source", "replay finished after {} frame(s)", frames);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PointerSource — mouse simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw pointer event from the visualizer window, in normalized *screen*
/// coordinates (0.0–1.0, y = 0.0 at the top).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerInput {
    /// Pointer position with the "hand" button held.
    Pressed { x: f64, y: f64 },
    /// Button up or pointer outside the window: no hand.
    Released,
    Quit,
}

/// Turns [`PointerInput`] into tracking samples, one per window frame.
///
/// The synthesized hand points its index fingertip at the pointer.  With
/// `mirror` set the hand's x is flipped, so after the mirrored overlay
/// projection the drawn fingertip lands under the cursor again.
pub struct PointerSource {
    pub rx: Receiver<PointerInput>,
    pub mirror: bool,
}

impl PointerSource {
    pub fn sample_for(input: PointerInput, mirror: bool) -> TrackingSample {
        match input {
            PointerInput::Pressed { x, y } => {
                let x = if mirror { 1.0 - x } else { x };
                TrackingSample::with_hand(Hand::pointing_at(x, y))
            }
            PointerInput::Released | PointerInput::Quit => TrackingSample::empty(),
        }
    }
}

impl FrameSource for PointerSource {
    fn run(self: Box<Self>, tx: Sender<TrackingSample>) {
        for input in self.rx {
            if input == PointerInput::Quit { return; }
            if tx.send(PointerSource::sample_for(input, self.mirror)).is_err() { return; }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapSource — real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Frame source backed by a LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
///
/// Leap reports millimetres above the device.  The first hand is converted
/// to the 21-point layout: palm centre as the wrist, then four points per
/// digit (knuckle, mid-finger, last joint, tip), and normalized against a
/// fixed interaction box so that raising the hand moves toward `y = 0.0`.
#[cfg(feature = "leap")]
pub struct LeapSource;

#[cfg(feature = "leap")]
impl LeapSource {
    // Interaction box (mm)
    const X_MIN: f64 = -200.0;
    const X_SPAN: f64 = 400.0;
    const Y_MIN: f64 = 80.0;
    const Y_SPAN: f64 = 320.0;

    fn normalize(x: f32, y: f32, z: f32) -> crate::landmark::Landmark {
        let (x, y, z) = (x as f64, y as f64, z as f64);
        crate::landmark::Landmark::new(
            ((x - Self::X_MIN) / Self::X_SPAN).clamp(0.0, 1.0),
            (1.0 - (y - Self::Y_MIN) / Self::Y_SPAN).clamp(0.0, 1.0),
            z / Self::X_SPAN,
        )
    }

    fn to_hand(hand: &leaprs::Hand) -> Hand {
        let mut landmarks = Vec::with_capacity(crate::landmark::LANDMARK_COUNT);
        let palm = hand.palm().position();
        landmarks.push(Self::normalize(palm.x, palm.y, palm.z));
        for digit in hand.digits() {
            let k = digit.metacarpal().next_joint();
            let l = digit.distal().prev_joint();
            let t = digit.distal().next_joint();
            let knuckle = Self::normalize(k.x, k.y, k.z);
            let last    = Self::normalize(l.x, l.y, l.z);
            let tip     = Self::normalize(t.x, t.y, t.z);
            let mid = crate::landmark::Landmark::new(
                (knuckle.x + last.x) / 2.0,
                (knuckle.y + last.y) / 2.0,
                (knuckle.z + last.z) / 2.0,
            );
            landmarks.extend([knuckle, mid, last, tip]);
        }
        Hand::new(landmarks)
    }
}

#[cfg(feature = "leap")]
impl FrameSource for LeapSource {
    fn run(self: Box<Self>, tx: Sender<TrackingSample>) {
        use leaprs::{Connection, ConnectionConfig, Event};

        let mut connection = match Connection::create(ConnectionConfig::default()) {
            Ok(c)  => c,
            Err(e) => {
                log::error!(target: "source", "failed to create LeapC connection: {:?}", e);
                return;
            }
        };
        if let Err(e) = connection.open() {
            log::error!(target: "source", "failed to open LeapMotion device: {:?}", e);
            return;
        }

        loop {
            let msg = match connection.poll(100) {
                Ok(m)  => m,
                Err(_) => continue,
            };
            if let Event::Tracking(frame) = msg.event() {
                let sample = match frame.hands().next() {
                    Some(hand) => TrackingSample::with_hand(Self::to_hand(&hand)),
                    None       => TrackingSample::empty(),
                };
                if tx.send(sample).is_err() { return; }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::INDEX_FINGER_TIP;
    use std::io::Cursor;

    const HAND_LINE: &str =
        r#"{"multiHandLandmarks":[[{"x":0.5,"y":0.9},{"x":0.5,"y":0.8},{"x":0.5,"y":0.7},{"x":0.5,"y":0.6},{"x":0.5,"y":0.5},{"x":0.5,"y":0.5},{"x":0.5,"y":0.4},{"x":0.5,"y":0.3},{"x":0.5,"y":0.05}]]}"#;

    fn replay(text: &str) -> Vec<TrackingSample> {
        let reader = Box::new(Cursor::new(text.to_string()));
        spawn_frame_source(ReplaySource::new(reader)).iter().collect()
    }

    #[test]
    fn replay_skips_blank_and_comment_lines() {
        let text = format!("# recorded session\n\n{}\n{{}}\n", HAND_LINE);
        let frames = replay(&text);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].landmark_y(INDEX_FINGER_TIP), Some(0.05));
        assert!(frames[1].primary_hand().is_none());
    }

    #[test]
    fn replay_turns_garbage_into_empty_frames() {
        let frames = replay("not json\n{\"multiHandLandmarks\":[[\n");
        assert_eq!(frames, vec![TrackingSample::empty(), TrackingSample::empty()]);
    }

    #[test]
    fn paced_replay_takes_wall_clock_time() {
        let text = "{}\n{}\n{}\n{}\n";
        let reader = Box::new(Cursor::new(text.to_string()));
        let start = Instant::now();
        let n = spawn_frame_source(ReplaySource::new(reader).paced(100)).iter().count();
        assert_eq!(n, 4);
        // three gaps of 10 ms
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn pointer_press_places_fingertip() {
        let s = PointerSource::sample_for(PointerInput::Pressed { x: 0.2, y: 0.6 }, false);
        let tip = s.primary_hand().unwrap().landmark(INDEX_FINGER_TIP).unwrap();
        assert_eq!((tip.x, tip.y), (0.2, 0.6));
    }

    #[test]
    fn pointer_mirror_flips_x_not_y() {
        let s = PointerSource::sample_for(PointerInput::Pressed { x: 0.2, y: 0.6 }, true);
        let tip = s.primary_hand().unwrap().landmark(INDEX_FINGER_TIP).unwrap();
        assert!((tip.x - 0.8).abs() < 1e-6);
        assert_eq!(tip.y, 0.6);
    }

    #[test]
    fn pointer_source_stops_on_quit() {
        let (tx, rx) = mpsc::channel();
        let frames = spawn_frame_source(PointerSource { rx, mirror: false });
        tx.send(PointerInput::Pressed { x: 0.5, y: 0.5 }).unwrap();
        tx.send(PointerInput::Released).unwrap();
        tx.send(PointerInput::Quit).unwrap();
        tx.send(PointerInput::Released).ok();
        let got: Vec<_> = frames.iter().collect();
        assert_eq!(got.len(), 2);
        assert!(got[0].primary_hand().is_some());
        assert!(got[1].primary_hand().is_none());
    }
}
