//! Text → extruded, beveled piece geometry.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{
    BEVEL_SEGMENTS, BEVEL_SIZE, BEVEL_THICKNESS, CURVE_SEGMENTS, TEXT_DEPTH, TEXT_SIZE,
};
use crate::error::GooeyError;

pub mod extrude;
pub mod font;

pub use extrude::{PieceGeometry, extrude};
pub use font::{GlyphFont, GlyphFontLoader, TtfGlyphs};

/// A closed outline, implicitly joined last-to-first.
pub type Contour = Vec<Vec2>;

/// Text measurement and outlines, in em units (y up, origin on the baseline).
pub trait GlyphSource {
    fn advance(&self, ch: char) -> f32;
    /// Curves are flattened into `curve_segments` lines each.
    fn outline(&self, ch: char, curve_segments: usize) -> Vec<Contour>;
}

/// Whether the text becomes one piece or one piece per glyph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PieceMode {
    #[default]
    Word,
    Glyphs,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeStyle {
    /// World units per em.
    pub size: f32,
    pub depth: f32,
    pub bevel_thickness: f32,
    pub bevel_size: f32,
    pub bevel_segments: usize,
    pub curve_segments: usize,
}

impl ShapeStyle {
    /// Depth and bevel grow with gooeyness.
    pub fn for_gooeyness(gooeyness: f32) -> Self {
        let k = 1.0 + gooeyness.clamp(0.0, 1.0);
        Self {
            size: TEXT_SIZE,
            depth: TEXT_DEPTH * k,
            bevel_thickness: BEVEL_THICKNESS * k,
            bevel_size: BEVEL_SIZE * k,
            bevel_segments: BEVEL_SEGMENTS,
            curve_segments: CURVE_SEGMENTS,
        }
    }
}

/// Geometry centered on its own bounds plus where that center sits in the line.
#[derive(Clone, Debug, PartialEq)]
pub struct PieceShape {
    pub label: String,
    pub geometry: PieceGeometry,
    pub offset: Vec3,
}

/// Lay `text` out left to right and extrude it. Empty or blank text yields no pieces.
pub fn build_pieces(
    glyphs: &dyn GlyphSource,
    text: &str,
    style: &ShapeStyle,
    mode: PieceMode,
) -> Result<Vec<PieceShape>, GooeyError> {
    let mut laid_out: Vec<(char, Vec<Contour>)> = Vec::new();
    let mut pen = 0.0;
    for ch in text.chars() {
        let contours: Vec<Contour> = glyphs
            .outline(ch, style.curve_segments)
            .into_iter()
            .map(|c| {
                c.into_iter()
                    .map(|p| (p + Vec2::new(pen, 0.0)) * style.size)
                    .collect()
            })
            .collect();
        laid_out.push((ch, contours));
        pen += glyphs.advance(ch);
    }

    match mode {
        PieceMode::Word => {
            let all: Vec<Contour> = laid_out.into_iter().flat_map(|(_, c)| c).collect();
            let mut geometry = extrude(&all, style)?;
            if geometry.is_empty() {
                return Ok(Vec::new());
            }
            let center = geometry.center();
            geometry.translate(-center);
            Ok(vec![PieceShape {
                label: text.to_string(),
                geometry,
                offset: Vec3::ZERO,
            }])
        }
        PieceMode::Glyphs => {
            let mut pieces = Vec::new();
            for (ch, contours) in laid_out {
                let geometry = extrude(&contours, style)?;
                if !geometry.is_empty() {
                    pieces.push(PieceShape {
                        label: ch.to_string(),
                        geometry,
                        offset: Vec3::ZERO,
                    });
                }
            }
            let (Some(min_x), Some(max_x)) = (
                pieces.iter().map(|p| p.geometry.min.x).reduce(f32::min),
                pieces.iter().map(|p| p.geometry.max.x).reduce(f32::max),
            ) else {
                return Ok(pieces);
            };
            let line_center = (min_x + max_x) * 0.5;
            for piece in &mut pieces {
                let center = piece.geometry.center();
                piece.geometry.translate(-center);
                piece.offset = Vec3::new(center.x - line_center, 0.0, 0.0);
            }
            Ok(pieces)
        }
    }
}

/// Font-free glyphs: every visible character is a hollow block, lowercase
/// shorter than uppercase.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockGlyphs;

impl BlockGlyphs {
    const ADVANCE: f32 = 0.7;
    const SPACE_ADVANCE: f32 = 0.35;
}

impl GlyphSource for BlockGlyphs {
    fn advance(&self, ch: char) -> f32 {
        if ch.is_whitespace() {
            Self::SPACE_ADVANCE
        } else {
            Self::ADVANCE
        }
    }

    fn outline(&self, ch: char, _curve_segments: usize) -> Vec<Contour> {
        if ch.is_whitespace() || ch.is_control() {
            return Vec::new();
        }
        let top = if ch.is_lowercase() { 0.52 } else { 0.72 };
        let outer = vec![
            Vec2::new(0.05, 0.0),
            Vec2::new(0.65, 0.0),
            Vec2::new(0.65, top),
            Vec2::new(0.05, top),
        ];
        let hole = vec![
            Vec2::new(0.22, 0.16),
            Vec2::new(0.22, top - 0.16),
            Vec2::new(0.48, top - 0.16),
            Vec2::new(0.48, 0.16),
        ];
        vec![outer, hole]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total_width(pieces: &[PieceShape]) -> f32 {
        pieces.iter().map(|p| p.geometry.width()).sum()
    }

    #[test]
    fn empty_and_blank_text_build_nothing() {
        let style = ShapeStyle::for_gooeyness(0.1);
        for mode in [PieceMode::Word, PieceMode::Glyphs] {
            assert!(build_pieces(&BlockGlyphs, "", &style, mode).unwrap().is_empty());
            assert!(build_pieces(&BlockGlyphs, "   ", &style, mode).unwrap().is_empty());
        }
    }

    #[test]
    fn word_mode_is_one_centered_piece() {
        let style = ShapeStyle::for_gooeyness(0.1);
        let pieces = build_pieces(&BlockGlyphs, "Gooey", &style, PieceMode::Word).unwrap();
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].label, "Gooey");
        assert!(pieces[0].geometry.center().length() < 1e-4);
        // five glyphs of 0.7em, the last one 0.65em wide, times size, plus bevel
        let expected = (4.0 * 0.7 + 0.6) * style.size + 2.0 * style.bevel_size;
        assert!((pieces[0].geometry.width() - expected).abs() < 1e-3);
    }

    #[test]
    fn glyph_mode_spaces_pieces_left_to_right_around_origin() {
        let style = ShapeStyle::for_gooeyness(0.0);
        let pieces = build_pieces(&BlockGlyphs, "a b", &style, PieceMode::Glyphs).unwrap();
        assert_eq!(pieces.len(), 2);
        assert!(pieces[0].offset.x < 0.0);
        assert!(pieces[1].offset.x > 0.0);
        assert!((pieces[0].offset.x + pieces[1].offset.x).abs() < 1e-4);
        for p in &pieces {
            assert!(p.geometry.center().length() < 1e-4);
        }
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let style = ShapeStyle::for_gooeyness(0.3);
        for mode in [PieceMode::Word, PieceMode::Glyphs] {
            let a = build_pieces(&BlockGlyphs, "Gooey", &style, mode).unwrap();
            let b = build_pieces(&BlockGlyphs, "Gooey", &style, mode).unwrap();
            assert_eq!(a.len(), b.len());
            assert_eq!(total_width(&a), total_width(&b));
            assert_eq!(a, b);
        }
    }

    #[test]
    fn gooeyness_deepens_the_extrusion() {
        let thin = ShapeStyle::for_gooeyness(0.0);
        let thick = ShapeStyle::for_gooeyness(1.0);
        let a = build_pieces(&BlockGlyphs, "G", &thin, PieceMode::Word).unwrap();
        let b = build_pieces(&BlockGlyphs, "G", &thick, PieceMode::Word).unwrap();
        assert!(b[0].geometry.size().z > a[0].geometry.size().z);
        assert!(b[0].geometry.width() > a[0].geometry.width());
    }
}
