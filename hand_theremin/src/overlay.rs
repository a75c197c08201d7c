//! Presentation state for the note-scale UI and the hand overlay.
//!
//! The screen is split into one horizontal band per scale note, top to
//! bottom in scale order.  The band of the sounding note glows; the glow
//! eases in and out over a few frames.

use note_scale::NoteScale;

use crate::landmark::Landmark;

// ════════════════════════════════════════════════════════════════════════════
// Color palette — band index → ARGB
// ════════════════════════════════════════════════════════════════════════════

/// Hue-wheel color for band `index` of `count`, so neighbouring notes are
/// easy to tell apart.
pub fn band_color(index: usize, count: usize) -> u32 {
    let hue = (index as f32 / count.max(1) as f32) * 300.0;
    hsv_to_argb(hue, 0.65, 0.55)
}

/// Convert HSV → packed ARGB (0xAARRGGBB, A=0xFF).
fn hsv_to_argb(h: f32, s: f32, v: f32) -> u32 {
    let h  = h.rem_euclid(360.0);
    let hi = (h / 60.0) as u32;
    let f  = h / 60.0 - hi as f32;
    let p  = v * (1.0 - s);
    let q  = v * (1.0 - s * f);
    let t  = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match hi {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    0xFF000000 | (to_byte(r) << 16) | (to_byte(g) << 8) | to_byte(b)
}

fn to_byte(c: f32) -> u32 {
    (c.clamp(0.0, 1.0) * 255.0) as u32
}

/// Alpha-blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
pub fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let mix = |shift: u32| {
        let ca = ((a >> shift) & 0xFF) as f32;
        let cb = ((b >> shift) & 0xFF) as f32;
        ((ca * (1.0 - t) + cb * t) as u32) << shift
    };
    0xFF000000 | mix(16) | mix(8) | mix(0)
}

// ════════════════════════════════════════════════════════════════════════════
// NoteBand / ScaleBands
// ════════════════════════════════════════════════════════════════════════════

const GLOW_RISE: f32 = 0.25;
const GLOW_FALL: f32 = 0.12;

/// One note's strip of the screen.
#[derive(Clone, Debug)]
pub struct NoteBand {
    pub label: String,
    pub color: u32,
    /// 0.0 (idle) – 1.0 (fully lit).
    pub glow:  f32,
}

/// Display state for the whole scale.
#[derive(Clone, Debug)]
pub struct ScaleBands {
    pub bands: Vec<NoteBand>,
    active:    Option<usize>,
}

impl ScaleBands {
    pub fn new(scale: &NoteScale) -> Self {
        let count = scale.len();
        let bands = scale
            .iter()
            .enumerate()
            .map(|(i, note)| NoteBand {
                label: note.to_string(),
                color: band_color(i, count),
                glow:  0.0,
            })
            .collect();
        ScaleBands { bands, active: None }
    }

    pub fn len(&self) -> usize { self.bands.len() }
    pub fn is_empty(&self) -> bool { self.bands.is_empty() }

    pub fn active(&self) -> Option<usize> { self.active }

    pub fn set_active(&mut self, index: Option<usize>) {
        self.active = index.filter(|&i| i < self.bands.len());
    }

    /// Advance glow animations by one frame.
    pub fn tick(&mut self) {
        for (i, band) in self.bands.iter_mut().enumerate() {
            if Some(i) == self.active {
                band.glow = (band.glow + GLOW_RISE).min(1.0);
            } else {
                band.glow = (band.glow - GLOW_FALL).max(0.0);
            }
        }
    }

    /// Pixel rows `[top, bottom)` of band `index` in a view `height` tall.
    pub fn band_rows(&self, index: usize, height: usize) -> (usize, usize) {
        (self.first_row(index, height), self.first_row(index + 1, height))
    }

    /// The band drawn at pixel `row`: the one the row's centre,
    /// `y = (row + 0.5) / height`, quantizes to.
    pub fn band_at_row(&self, row: usize, height: usize) -> Option<usize> {
        let n = self.bands.len();
        (row < height && n > 0).then(|| (2 * row + 1) * n / (2 * height))
    }

    /// First row whose centre lies in band `index` or below.
    fn first_row(&self, index: usize, height: usize) -> usize {
        let n = self.bands.len().max(1);
        ((2 * height * index).saturating_sub(n) + 2 * n - 1) / (2 * n)
    }

    /// Pixel row through the middle of band `index`.
    pub fn band_center(&self, index: usize, height: usize) -> usize {
        let n = self.bands.len().max(1);
        ((index as f32 + 0.5) * height as f32 / n as f32) as usize
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Landmark projection
// ════════════════════════════════════════════════════════════════════════════

/// Project a normalized landmark onto the pixel that contains it.  With
/// `mirror` the image is flipped horizontally, like looking into a mirror.
pub fn project(landmark: &Landmark, width: usize, height: usize, mirror: bool) -> (isize, isize) {
    let x = if mirror { 1.0 - landmark.x } else { landmark.x };
    let px = (x * width as f64).floor() as isize;
    let py = (landmark.y * height as f64).floor() as isize;
    (px, py)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_colors_distinct_and_opaque() {
        let colors: Vec<u32> = (0..8).map(|i| band_color(i, 8)).collect();
        for (i, c) in colors.iter().enumerate() {
            assert_eq!(c >> 24, 0xFF, "band {} should be opaque", i);
            for d in &colors[i + 1..] {
                assert_ne!(c, d);
            }
        }
    }

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend(0xFF102030, 0xFFFFFFFF, 0.0), 0xFF102030);
        assert_eq!(blend(0xFF102030, 0xFFFFFFFF, 1.0), 0xFFFFFFFF);
    }

    #[test]
    fn bands_follow_scale_order() {
        let bands = ScaleBands::new(&NoteScale::default());
        assert_eq!(bands.len(), 8);
        assert_eq!(bands.bands[0].label, "C5");
        assert_eq!(bands.bands[7].label, "C4");
    }

    #[test]
    fn glow_rises_on_active_and_fades_elsewhere() {
        let mut b = ScaleBands::new(&NoteScale::default());
        b.set_active(Some(2));
        for _ in 0..10 { b.tick(); }
        assert_eq!(b.bands[2].glow, 1.0);
        assert_eq!(b.bands[3].glow, 0.0);

        b.set_active(None);
        for _ in 0..20 { b.tick(); }
        assert_eq!(b.bands[2].glow, 0.0);
    }

    #[test]
    fn out_of_range_active_is_ignored() {
        let mut b = ScaleBands::new(&NoteScale::default());
        b.set_active(Some(99));
        assert_eq!(b.active(), None);
    }

    #[test]
    fn band_geometry_tiles_the_view() {
        let b = ScaleBands::new(&NoteScale::default());
        assert_eq!(b.band_rows(0, 480), (0, 60));
        assert_eq!(b.band_rows(7, 480), (420, 480));
        assert_eq!(b.band_center(0, 480), 30);
        assert_eq!(b.band_center(7, 480), 450);
    }

    #[test]
    fn band_rows_agree_with_band_at_row() {
        for notes in [&["C5", "B4", "A4", "G4", "F4", "E4", "D4", "C4"][..], &["E4", "D4", "C4"][..]] {
            let b = ScaleBands::new(&NoteScale::from_names(notes).unwrap());
            for height in [462, 480, 481] {
                for row in 0..height {
                    let i = b.band_at_row(row, height).unwrap();
                    let (top, bottom) = b.band_rows(i, height);
                    assert!(top <= row && row < bottom, "row {} of {} in band {}", row, height, i);
                }
                assert_eq!(b.band_at_row(height, height), None);
            }
        }
    }

    #[test]
    fn projection_mirrors_x_only() {
        let l = Landmark::new(0.25, 0.5, 0.0);
        assert_eq!(project(&l, 640, 480, false), (160, 240));
        assert_eq!(project(&l, 640, 480, true), (480, 240));
    }
}
