//! Deterministic letter avatars: a fixed per-letter background color with
//! the letter drawn centered in white, encoded as PNG. The same (letter,
//! size) pair always produces byte-identical output.

pub mod font;
pub mod store;

pub use store::AvatarStore;

use anyhow::Result;

/// Square avatar edge used by the HTTP surface.
pub const DEFAULT_SIZE: u32 = 200;

/// Background for letters outside a-z.
pub const FALLBACK_COLOR: [u8; 3] = [0x80, 0x80, 0x80];

const WHITE: [u8; 3] = [0xFF, 0xFF, 0xFF];

/// The original hand-picked palette, one color per letter.
const COLORS: [[u8; 3]; 26] = [
    [0xFF, 0x00, 0x00], // a red
    [0x00, 0x80, 0x00], // b green
    [0x00, 0x00, 0xFF], // c blue
    [0xFF, 0xFF, 0x00], // d yellow
    [0xFF, 0xA5, 0x00], // e orange
    [0x80, 0x00, 0x80], // f purple
    [0x00, 0x00, 0x00], // g black
    [0xA5, 0x2A, 0x2A], // h brown
    [0x00, 0xFF, 0xFF], // i cyan
    [0xFF, 0x00, 0xFF], // j magenta
    [0x40, 0xE0, 0xD0], // k turquoise
    [0xE6, 0xE6, 0xFA], // l lavender
    [0x80, 0x00, 0x00], // m maroon
    [0x80, 0x80, 0x00], // n olive
    [0x00, 0x80, 0x80], // o teal
    [0x4B, 0x00, 0x82], // p indigo
    [0xFF, 0xDA, 0xB9], // q peachpuff
    [0xF5, 0xF5, 0xDC], // r beige
    [0xFF, 0xD7, 0x00], // s gold
    [0xC0, 0xC0, 0xC0], // t silver
    [0xCD, 0x7F, 0x32], // u bronze
    [0xFF, 0x7F, 0x50], // v coral
    [0x00, 0xFF, 0x00], // w lime
    [0xAD, 0xD8, 0xE6], // x lightblue
    [0xCC, 0xCC, 0xFF], // y periwinkle
    [0xDC, 0x14, 0x3C], // z crimson
];

/// Background color for a letter, keyed on its lowercase form.
pub fn color_for(letter: char) -> [u8; 3] {
    let lower = letter.to_ascii_lowercase();
    if lower.is_ascii_lowercase() {
        COLORS[(lower as u8 - b'a') as usize]
    } else {
        FALLBACK_COLOR
    }
}

/// Render the avatar for `letter` as an RGB PNG.
///
/// The glyph height is half the canvas height (the original sets the font
/// size to height/2), reached by integer-scaling the embedded bitmap face,
/// and the glyph is centered on both axes.
pub fn generate(letter: char, width: u32, height: u32) -> Result<Vec<u8>> {
    let bg = color_for(letter);
    let mut canvas = vec![0u8; (width * height * 3) as usize];
    for px in canvas.chunks_exact_mut(3) {
        px.copy_from_slice(&bg);
    }

    let glyph = font::glyph_for(letter);
    let scale = ((height / 2) / font::GLYPH_HEIGHT).max(1);
    let glyph_w = font::GLYPH_WIDTH * scale;
    let glyph_h = font::GLYPH_HEIGHT * scale;
    let x0 = width.saturating_sub(glyph_w) / 2;
    let y0 = height.saturating_sub(glyph_h) / 2;

    for (row_idx, row) in glyph.iter().enumerate() {
        for col in 0..font::GLYPH_WIDTH {
            if row & (1 << (font::GLYPH_WIDTH - 1 - col)) == 0 {
                continue;
            }
            fill_block(
                &mut canvas,
                width,
                height,
                x0 + col * scale,
                y0 + row_idx as u32 * scale,
                scale,
            );
        }
    }

    encode_png(&canvas, width, height)
}

fn fill_block(canvas: &mut [u8], width: u32, height: u32, x: u32, y: u32, scale: u32) {
    for dy in 0..scale {
        let py = y + dy;
        if py >= height {
            break;
        }
        for dx in 0..scale {
            let px = x + dx;
            if px >= width {
                break;
            }
            let idx = ((py * width + px) * 3) as usize;
            canvas[idx..idx + 3].copy_from_slice(&WHITE);
        }
    }
}

fn encode_png(rgb: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(rgb)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> (png::OutputInfo, Vec<u8>) {
        let decoder = png::Decoder::new(std::io::Cursor::new(bytes));
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0u8; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).unwrap();
        buf.truncate(info.buffer_size());
        (info, buf)
    }

    #[test]
    fn generation_is_deterministic_for_all_letters() {
        for c in 'a'..='z' {
            let first = generate(c, DEFAULT_SIZE, DEFAULT_SIZE).unwrap();
            let second = generate(c, DEFAULT_SIZE, DEFAULT_SIZE).unwrap();
            assert_eq!(first, second, "avatar for '{c}' not byte-stable");
            assert_eq!(&first[..8], b"\x89PNG\r\n\x1a\n");
        }
    }

    #[test]
    fn background_matches_the_letter_color() {
        let (info, pixels) = decode(&generate('a', 64, 64).unwrap());
        assert_eq!((info.width, info.height), (64, 64));
        // Top-left corner is background; 'a' maps to red.
        assert_eq!(&pixels[..3], &[0xFF, 0x00, 0x00]);

        let (_, pixels) = decode(&generate('Z', 64, 64).unwrap());
        assert_eq!(&pixels[..3], &[0xDC, 0x14, 0x3C]);
    }

    #[test]
    fn case_does_not_change_the_color() {
        assert_eq!(
            generate('m', 32, 32).unwrap(),
            generate('M', 32, 32).unwrap()
        );
    }

    #[test]
    fn non_alphabetic_gets_the_fallback_background() {
        let (_, pixels) = decode(&generate('3', 64, 64).unwrap());
        assert_eq!(&pixels[..3], &FALLBACK_COLOR);
    }

    #[test]
    fn letter_is_drawn_in_white_at_the_center() {
        let (info, pixels) = decode(&generate('i', DEFAULT_SIZE, DEFAULT_SIZE).unwrap());
        // 'I' has a stroke through the vertical middle of the canvas.
        let cx = info.width / 2;
        let cy = info.height / 2;
        let idx = ((cy * info.width + cx) * 3) as usize;
        assert_eq!(&pixels[idx..idx + 3], &[0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn distinct_letters_get_distinct_colors() {
        let mut seen = std::collections::HashSet::new();
        for c in 'a'..='z' {
            assert!(seen.insert(color_for(c)), "duplicate color for '{c}'");
        }
    }
}
