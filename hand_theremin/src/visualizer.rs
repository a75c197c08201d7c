//! Software-rendered visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ C5  ──────────────────────────────────────── │  ← one band per note,
//! │ B4  ──────────────────────────────────────── │    top = highest pitch
//! │(A4) ────────────  ╱|╲  hand skeleton ─────── │  ← active note in gold
//! │ G4  ──────────── ╱ | ╲ ───────────────────── │
//! │ …                                            │
//! │ status bar                                   │
//! └──────────────────────────────────────────────┘
//! ```

use std::sync::mpsc::Sender;
use std::time::Duration;

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use crate::app::{Session, WindowConfig};
use crate::error::ThereminError;
use crate::landmark::{Hand, HAND_CONNECTIONS};
use crate::overlay::{blend, project, ScaleBands};
use crate::source::PointerInput;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

const BG_COLOR:        u32   = 0xFF101018;
const GRID_COLOR:      u32   = 0xFF4A4A55;
const BONE_COLOR:      u32   = 0xFF00FF00;
const JOINT_COLOR:     u32   = 0xFFFF0000;
const ACTIVE_COLOR:    u32   = 0xFFFFD700;  // gold
const LABEL_COLOR:     u32   = 0xFFFFFFFF;
const STATUS_BG:       u32   = 0xFF0F3460;
const STATUS_H:        usize = 18;
const LABEL_X:         usize = 20;
const GRID_LEFT:       usize = 80;
const GRID_RIGHT_PAD:  usize = 20;

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:     Window,
    buf:        Vec<u32>,
    width:      usize,
    height:     usize,
    mirror:     bool,
    pointer_tx: Option<Sender<PointerInput>>,
}

impl Visualizer {
    /// Open the window.  With `pointer_tx` the mouse acts as the hand.
    pub fn new(
        cfg:        &WindowConfig,
        pointer_tx: Option<Sender<PointerInput>>,
    ) -> Result<Self, ThereminError> {
        let mut window = Window::new(
            "Hand Theremin",
            cfg.width, cfg.height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        window.limit_update_rate(Some(Duration::from_micros(1_000_000 / cfg.fps.max(1) as u64)));

        Ok(Visualizer {
            window,
            buf: vec![BG_COLOR; cfg.width * cfg.height],
            width: cfg.width,
            height: cfg.height,
            mirror: cfg.mirror,
            pointer_tx,
        })
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Poll keyboard and mouse.  Returns false on quit.
    pub fn poll_input(&mut self) -> bool {
        if !self.window.is_open() { return false; }

        if self.window.is_key_pressed(Key::Q, KeyRepeat::No)
            || self.window.is_key_pressed(Key::Escape, KeyRepeat::No)
        {
            if let Some(tx) = &self.pointer_tx {
                let _ = tx.send(PointerInput::Quit);
            }
            return false;
        }

        if let Some(tx) = &self.pointer_tx {
            let held = self.window.get_mouse_down(MouseButton::Left);
            let input = match self.window.get_mouse_pos(MouseMode::Discard) {
                Some((mx, my)) if held => PointerInput::Pressed {
                    x: pointer_fraction(mx, self.width),
                    y: pointer_fraction(my, self.height),
                },
                _ => PointerInput::Released,
            };
            let _ = tx.send(input);
        }

        true
    }

    /// Render one frame from the session's current state.
    pub fn render(&mut self, session: &Session) {
        self.buf.fill(BG_COLOR);

        let bands = session.bands();
        self.draw_bands(bands);
        self.draw_grid(bands);

        for (i, hand) in session.last_sample().hands.iter().enumerate() {
            // hands after the first are not played; draw them dimmed
            let dim = if i == 0 { 0.0 } else { 0.6 };
            self.draw_hand(hand, dim);
        }

        self.draw_labels(bands);

        // ── Status bar ────────────────────────────────────────────────────
        let bar_y = self.height.saturating_sub(STATUS_H);
        self.fill_rect(0, bar_y, self.width, STATUS_H, STATUS_BG);
        let help = if self.pointer_tx.is_some() { "hold mouse = hand   q = quit" } else { "q = quit" };
        let status = format!("{}   {}", session.status, help);
        self.draw_text(&status, 8, bar_y + 4, 2, 0xFFEEEEEE);

        if let Err(e) = self.window.update_with_buffer(&self.buf, self.width, self.height) {
            log::warn!(target: "visualizer", "frame update failed: {}", e);
        }
    }

    // ── Scale UI ──────────────────────────────────────────────────────────

    // Bands span the full window height, the same extent the hand is
    // projected onto; the status bar is drawn over the bottom band.

    fn draw_bands(&mut self, bands: &ScaleBands) {
        for (i, band) in bands.bands.iter().enumerate() {
            let (top, bottom) = bands.band_rows(i, self.height);
            let tint = blend(BG_COLOR, band.color, 0.15 + 0.45 * band.glow);
            self.fill_rect(0, top, self.width, bottom - top, tint);
        }
    }

    fn draw_grid(&mut self, bands: &ScaleBands) {
        let right = self.width.saturating_sub(GRID_RIGHT_PAD);
        for i in 1..bands.len() {
            let (top, _) = bands.band_rows(i, self.height);
            for x in GRID_LEFT..right {
                self.set_pixel(x as isize, top as isize, GRID_COLOR);
            }
        }
    }

    fn draw_labels(&mut self, bands: &ScaleBands) {
        for (i, band) in bands.bands.iter().enumerate() {
            let cy = bands.band_center(i, self.height) as isize;
            let label = band.label.clone();
            if bands.active() == Some(i) {
                let halo = blend(BG_COLOR, ACTIVE_COLOR, 0.3 + 0.2 * band.glow);
                self.fill_circle(40, cy, 20, halo);
                self.draw_text(&label, LABEL_X, (cy - 10).max(0) as usize, 4, ACTIVE_COLOR);
            } else {
                self.draw_text(&label, LABEL_X, (cy - 7).max(0) as usize, 3, LABEL_COLOR);
            }
        }
    }

    // ── Hand overlay ──────────────────────────────────────────────────────

    fn draw_hand(&mut self, hand: &Hand, dim: f32) {
        let (w, h, mirror) = (self.width, self.height, self.mirror);
        let points: Vec<(isize, isize)> =
            hand.landmarks.iter().map(|l| project(l, w, h, mirror)).collect();

        let bone = blend(BONE_COLOR, BG_COLOR, dim);
        for &(a, b) in HAND_CONNECTIONS.iter() {
            if let (Some(&pa), Some(&pb)) = (points.get(a), points.get(b)) {
                self.draw_thick_line(pa, pb, bone);
            }
        }
        let joint = blend(JOINT_COLOR, BG_COLOR, dim);
        for &(x, y) in &points {
            self.fill_circle(x, y, 3, joint);
        }
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(self.height) {
            for col in x..(x + w).min(self.width) {
                self.buf[row * self.width + col] = color;
            }
        }
    }

    fn set_pixel(&mut self, x: isize, y: isize, color: u32) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.buf[y as usize * self.width + x as usize] = color;
        }
    }

    fn fill_circle(&mut self, cx: isize, cy: isize, r: isize, color: u32) {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Bresenham line, three pixels wide.
    fn draw_thick_line(&mut self, (x0, y0): (isize, isize), (x1, y1): (isize, isize), color: u32) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        loop {
            for o in -1..=1 {
                self.set_pixel(x + o, y, color);
                self.set_pixel(x, y + o, color);
            }
            if x == x1 && y == y1 { break; }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; x += sx; }
            if e2 <= dx { err += dx; y += sy; }
        }
    }

    /// 3×5 bitmap font, each pixel drawn as a `scale`×`scale` block.
    fn draw_text(&mut self, text: &str, x: usize, y: usize, scale: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            if cx + 3 * scale > self.width { break; }
            for (row, bits) in glyph(ch).iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(cx + col * scale, y + row * scale, scale, scale, color);
                    }
                }
            }
            cx += 4 * scale;
        }
    }
}

/// Normalized position of the centre of the pixel under the pointer.
fn pointer_fraction(pixel: f32, extent: usize) -> f64 {
    (pixel.floor() as f64 + 0.5) / extent.max(1) as f64
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        // flat sign, distinct from 'B'
        'b' => [0b100, 0b100, 0b110, 0b101, 0b110],
        '#' => [0b101, 0b111, 0b101, 0b111, 0b101],
        'A' | 'a' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'B'       => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' | 'c' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'D' | 'd' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' | 'e' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'F' | 'f' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'G' | 'g' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'H' | 'h' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' | 'i' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'K' | 'k' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' | 'l' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' | 'm' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'N' | 'n' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'O' | 'o' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'P' | 'p' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'Q' | 'q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'R' | 'r' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' | 's' => [0b111, 0b100, 0b111, 0b001, 0b111],
        'T' | 't' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' | 'u' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' | 'v' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'W' | 'w' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'Y' | 'y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ' ' => [0b000; 5],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000],
    }
}
