use glam::Vec2;
use thiserror::Error;

/// Error returned by [`FontSystem::load_font`].
#[derive(Debug, Clone, Error)]
#[error("font load error: {0}")]
pub struct FontLoadError(pub String);

/// Opaque handle to a font loaded into a [`FontSystem`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FontId(pub(crate) usize);

/// Device-independent text-layout factory.
///
/// Fonts arrive as opaque byte buffers from the application's I/O layer and
/// survive device loss; text renderers rasterize from here onto whatever
/// device is current.
#[derive(Default)]
pub struct FontSystem {
    fonts: Vec<fontdue::Font>,
}

impl FontSystem {
    pub fn new() -> Self {
        Self { fonts: Vec::new() }
    }

    /// Parses and stores a TrueType or OpenType font.
    pub fn load_font(&mut self, bytes: &[u8]) -> Result<FontId, FontLoadError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| FontLoadError(e.to_string()))?;
        let id = FontId(self.fonts.len());
        self.fonts.push(font);
        log::debug!("loaded font {:?} ({} bytes)", id, bytes.len());
        Ok(id)
    }

    pub fn font(&self, id: FontId) -> Option<&fontdue::Font> {
        self.fonts.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Lays out `text` at `size` px and returns its extent.
    ///
    /// Unknown fonts and empty strings measure as one empty line.
    pub fn measure_text(&self, text: &str, id: FontId, size: f32, max_width: Option<f32>) -> Vec2 {
        use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};

        let empty_line = Vec2::new(0.0, size * 1.2);
        let Some(font) = self.font(id) else {
            return empty_line;
        };

        let mut layout: Layout<()> = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            max_width,
            ..LayoutSettings::default()
        });
        layout.append(&[font], &TextStyle::new(text, size, 0));

        let glyphs = layout.glyphs();
        if glyphs.is_empty() {
            return empty_line;
        }

        // Pen position after each glyph, not the bitmap edge.
        let width = glyphs
            .iter()
            .map(|g| {
                let m = font.metrics_indexed(g.key.glyph_index, size);
                (g.x - m.xmin as f32 + m.advance_width).max(0.0)
            })
            .fold(0.0f32, f32::max);
        let height = glyphs
            .iter()
            .map(|g| g.y + g.height as f32)
            .fold(size, f32::max);
        Vec2::new(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_fail_to_load() {
        let mut fonts = FontSystem::new();
        assert!(fonts.load_font(&[0u8; 16]).is_err());
        assert!(fonts.is_empty());
    }

    #[test]
    fn unknown_font_measures_as_empty_line() {
        let fonts = FontSystem::new();
        let extent = fonts.measure_text("hello", FontId(3), 10.0, None);
        assert_eq!(extent, Vec2::new(0.0, 12.0));
    }
}
