// Configuration loading

pub mod settings;

pub use settings::{EnterDirection, Settings};

/// Framework-agnostic RGBA color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Convert from hex u32 (0xRRGGBB)
    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xFF) as f32 / 255.0;
        let g = ((hex >> 8) & 0xFF) as f32 / 255.0;
        let b = (hex & 0xFF) as f32 / 255.0;
        Self { r, g, b, a: 1.0 }
    }
}

/// Reference highlight palette. A reference's `color_index` selects an entry.
pub const REF_COLORS: [u32; 8] = [
    0x4472C4, // Blue
    0xED7D31, // Orange
    0x9B59B6, // Purple
    0x70AD47, // Green
    0x00B0F0, // Cyan
    0xFFC000, // Gold
    0xFF6B9D, // Pink
    0x00B294, // Teal
];

/// Color for a reference color index (wraps around the palette)
pub fn ref_color(index: usize) -> Color {
    Color::from_hex(REF_COLORS[index % REF_COLORS.len()])
}
