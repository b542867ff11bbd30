use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::fmt;
use std::path::{Path, PathBuf};

/// Font files tried when no explicit font is configured
pub const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "arial.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub const DEFAULT_FONT_SIZE: f32 = 20.0;
/// Largest label size accepted from configuration
pub const MAX_FONT_SIZE: f32 = 512.0;
/// Largest pixel multiplier of the built-in font
const MAX_BUILTIN_SCALE: f32 = 64.0;

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;

/// Font used to render box labels.
///
/// Loading never fails: when no TrueType font can be read the built-in
/// 5x7 bitmap font is used instead.
#[derive(Clone)]
pub enum LabelFont {
    Truetype { font: FontArc, scale: PxScale },
    Builtin { scale: u32 },
}

impl fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelFont::Truetype { scale, .. } => {
                f.debug_struct("Truetype").field("scale", &scale.y).finish()
            }
            LabelFont::Builtin { scale } => f.debug_struct("Builtin").field("scale", scale).finish(),
        }
    }
}

impl LabelFont {
    /// Load `preferred` if given, otherwise the first readable system font,
    /// otherwise the built-in font
    pub fn load(preferred: Option<&Path>, size: f32) -> Self {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(path) = preferred {
            candidates.push(path.to_path_buf());
        }
        candidates.extend(SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from));
        Self::load_first(&candidates, size)
    }

    /// First candidate that parses as a font, or the built-in font
    pub fn load_first(candidates: &[PathBuf], size: f32) -> Self {
        for path in candidates {
            match Self::from_file(path, size) {
                Ok(font) => {
                    log::debug!("Using label font {}", path.display());
                    return font;
                }
                Err(e) => log::debug!("Font {} unavailable: {}", path.display(), e),
            }
        }
        log::debug!("No TrueType font found, using built-in bitmap font");
        Self::builtin(size)
    }

    pub fn from_file(path: &Path, size: f32) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| anyhow::anyhow!("Failed to parse font: {}", e))?;
        Ok(LabelFont::Truetype {
            font,
            scale: PxScale::from(bounded_size(size)),
        })
    }

    /// Built-in font scaled so its cap height roughly matches `size`
    pub fn builtin(size: f32) -> Self {
        let scale = (bounded_size(size) / 10.0).round().clamp(1.0, MAX_BUILTIN_SCALE) as u32;
        LabelFont::Builtin { scale }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, LabelFont::Builtin { .. })
    }

    /// Rendered (width, height) of `text` in pixels
    pub fn text_size(&self, text: &str) -> (u32, u32) {
        match self {
            LabelFont::Truetype { font, scale } => text_size(*scale, font, text),
            LabelFont::Builtin { scale } => {
                let chars = text.chars().count() as u32;
                if chars == 0 {
                    return (0, 0);
                }
                let advance = (GLYPH_WIDTH + 1).saturating_mul(*scale);
                (
                    chars.saturating_mul(advance).saturating_sub(*scale),
                    GLYPH_HEIGHT.saturating_mul(*scale),
                )
            }
        }
    }

    /// Draw `text` with its top-left corner at (x, y); pixels outside the
    /// canvas are clipped
    pub fn draw(&self, canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, text: &str) {
        match self {
            LabelFont::Truetype { font, scale } => {
                draw_text_mut(canvas, color, x, y, *scale, font, text);
            }
            LabelFont::Builtin { scale } => draw_bitmap_text(canvas, color, x, y, *scale, text),
        }
    }
}

fn draw_bitmap_text(canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, scale: u32, text: &str) {
    let (width, height) = canvas.dimensions();
    let (width, height) = (width as i64, height as i64);
    let scale = scale as i64;
    let advance = (GLYPH_WIDTH as i64 + 1) * scale;

    for (i, ch) in text.chars().enumerate() {
        let origin_x = x as i64 + i as i64 * advance;
        if origin_x >= width {
            break;
        }
        if origin_x + advance <= 0 {
            continue;
        }
        let rows = glyph(ch);

        for (row, bits) in rows.iter().enumerate() {
            let top = y as i64 + row as i64 * scale;
            let (y0, y1) = (top.max(0), (top + scale).min(height));
            if y0 >= y1 {
                continue;
            }
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                let left = origin_x + col as i64 * scale;
                let (x0, x1) = (left.max(0), (left + scale).min(width));
                for py in y0..y1 {
                    for px in x0..x1 {
                        canvas.put_pixel(px as u32, py as u32, color);
                    }
                }
            }
        }
    }
}

/// Non-finite sizes fall back to the default; the rest are kept within [1, MAX_FONT_SIZE]
fn bounded_size(size: f32) -> f32 {
    if size.is_finite() {
        size.clamp(1.0, MAX_FONT_SIZE)
    } else {
        DEFAULT_FONT_SIZE
    }
}

/// 5x7 glyph rows, most significant of the low five bits is the leftmost column
fn glyph(ch: char) -> [u8; 7] {
    match ch.to_ascii_uppercase() {
        ' ' => [0x00; 7],
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '_' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1F],
        '(' => [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
        ')' => [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '%' => [0x18, 0x19, 0x02, 0x04, 0x08, 0x13, 0x03],
        '/' => [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00],
        _ => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
    }
}
