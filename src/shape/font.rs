use bevy::asset::io::Reader;
use bevy::asset::{AssetLoader, LoadContext};
use bevy::prelude::*;
use ttf_parser::{Face, GlyphId, OutlineBuilder};

use super::{Contour, GlyphSource};
use crate::error::GooeyError;

/// Raw bytes of a TrueType/OpenType font, validated at load time.
#[derive(Asset, TypePath, Debug, Clone)]
pub struct GlyphFont {
    bytes: Vec<u8>,
}

impl GlyphFont {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, GooeyError> {
        Face::parse(&bytes, 0).map_err(|e| GooeyError::FontParse(e.to_string()))?;
        Ok(Self { bytes })
    }

    pub fn glyphs(&self) -> Result<TtfGlyphs<'_>, GooeyError> {
        let face = Face::parse(&self.bytes, 0).map_err(|e| GooeyError::FontParse(e.to_string()))?;
        Ok(TtfGlyphs::new(face))
    }
}

#[derive(Default, TypePath)]
pub struct GlyphFontLoader;

impl AssetLoader for GlyphFontLoader {
    type Asset = GlyphFont;
    type Settings = ();
    type Error = GooeyError;

    async fn load(
        &self,
        reader: &mut dyn Reader,
        _settings: &(),
        _load_context: &mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        GlyphFont::from_bytes(bytes)
    }

    fn extensions(&self) -> &[&str] {
        &["ttf", "otf"]
    }
}

/// [`GlyphSource`] over a parsed font face, normalized to em units.
pub struct TtfGlyphs<'a> {
    face: Face<'a>,
    units_per_em: f32,
}

impl<'a> TtfGlyphs<'a> {
    pub fn new(face: Face<'a>) -> Self {
        let units_per_em = f32::from(face.units_per_em()).max(1.0);
        Self { face, units_per_em }
    }

    fn glyph(&self, ch: char) -> GlyphId {
        self.face.glyph_index(ch).unwrap_or(GlyphId(0))
    }
}

impl GlyphSource for TtfGlyphs<'_> {
    fn advance(&self, ch: char) -> f32 {
        self.face
            .glyph_hor_advance(self.glyph(ch))
            .map_or(0.0, |a| f32::from(a) / self.units_per_em)
    }

    fn outline(&self, ch: char, curve_segments: usize) -> Vec<Contour> {
        let mut flattener = Flattener::new(1.0 / self.units_per_em, curve_segments.max(1));
        if self.face.outline_glyph(self.glyph(ch), &mut flattener).is_none() {
            return Vec::new();
        }
        flattener.finish()
    }
}

/// Collects outline commands as polylines, sampling each curve evenly.
struct Flattener {
    scale: f32,
    segments: usize,
    contours: Vec<Contour>,
    current: Contour,
}

impl Flattener {
    fn new(scale: f32, segments: usize) -> Self {
        Self {
            scale,
            segments,
            contours: Vec::new(),
            current: Vec::new(),
        }
    }

    fn last(&self) -> Vec2 {
        self.current.last().copied().unwrap_or(Vec2::ZERO)
    }

    fn flush(&mut self) {
        if self.current.len() >= 3 {
            self.contours.push(std::mem::take(&mut self.current));
        } else {
            self.current.clear();
        }
    }

    fn finish(mut self) -> Vec<Contour> {
        self.flush();
        self.contours
    }
}

impl OutlineBuilder for Flattener {
    fn move_to(&mut self, x: f32, y: f32) {
        self.flush();
        self.current.push(Vec2::new(x, y) * self.scale);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.current.push(Vec2::new(x, y) * self.scale);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let p0 = self.last();
        let p1 = Vec2::new(x1, y1) * self.scale;
        let p2 = Vec2::new(x, y) * self.scale;
        for i in 1..=self.segments {
            let t = i as f32 / self.segments as f32;
            let u = 1.0 - t;
            self.current.push(p0 * (u * u) + p1 * (2.0 * u * t) + p2 * (t * t));
        }
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let p0 = self.last();
        let p1 = Vec2::new(x1, y1) * self.scale;
        let p2 = Vec2::new(x2, y2) * self.scale;
        let p3 = Vec2::new(x, y) * self.scale;
        for i in 1..=self.segments {
            let t = i as f32 / self.segments as f32;
            let u = 1.0 - t;
            self.current.push(
                p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t),
            );
        }
    }

    fn close(&mut self) {
        self.flush();
    }
}
