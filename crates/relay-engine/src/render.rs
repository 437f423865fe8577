use std::io::Cursor;

use anyhow::{bail, Context, Result};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use relay_contracts::bracket::{Bracket, NodeId, Point};

use crate::BracketRenderer;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const CONNECTOR: Rgb<u8> = Rgb([60, 60, 60]);
const PLAYER: Rgb<u8> = Rgb([52, 101, 164]);
const MATCH: Rgb<u8> = Rgb([110, 110, 110]);
const CHAMPION: Rgb<u8> = Rgb([212, 160, 23]);

const MAX_CANVAS_PIXELS: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct RasterRenderer {
    pub column_width: u32,
    pub row_height: u32,
    pub margin: u32,
    pub line_width: u32,
    pub marker_size: u32,
}

impl Default for RasterRenderer {
    fn default() -> Self {
        Self {
            column_width: 160,
            row_height: 28,
            margin: 24,
            line_width: 2,
            marker_size: 8,
        }
    }
}

impl RasterRenderer {
    pub fn canvas_size(&self, bracket: &Bracket) -> (u32, u32) {
        let rows = bracket.participants().saturating_sub(1) as u32;
        let width = self
            .margin
            .saturating_mul(2)
            .saturating_add(bracket.round_count().saturating_mul(self.column_width))
            .saturating_add(1);
        let height = self
            .margin
            .saturating_mul(2)
            .saturating_add(rows.saturating_mul(self.row_height))
            .saturating_add(1);
        (width, height)
    }

    /// Layout units to pixels; layout `y` is negated, so `-y` grows downward.
    fn to_pixel(&self, bracket: &Bracket, point: Point) -> (i64, i64) {
        let row = -point.y / bracket.vertical_spacing();
        let x = f64::from(self.margin) + point.x * f64::from(self.column_width);
        let y = f64::from(self.margin) + row * f64::from(self.row_height);
        (x.round() as i64, y.round() as i64)
    }

    pub fn draw(&self, bracket: &Bracket) -> RgbImage {
        let (width, height) = self.canvas_size(bracket);
        let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);
        let half_line = i64::from(self.line_width / 2);

        for (_, _, path) in bracket.routes() {
            let [start, corner, end] = path
                .points()
                .map(|point| self.to_pixel(bracket, point));
            fill_rect(
                &mut canvas,
                (start.0.min(corner.0), start.1.saturating_sub(half_line)),
                (start.0.max(corner.0), start.1.saturating_add(half_line)),
                CONNECTOR,
            );
            fill_rect(
                &mut canvas,
                (corner.0.saturating_sub(half_line), corner.1.min(end.1)),
                (corner.0.saturating_add(half_line), corner.1.max(end.1)),
                CONNECTOR,
            );
        }

        let champion = bracket.champion();
        let half_marker = i64::from(self.marker_size / 2);
        for (node, point) in bracket.positions() {
            let (x, y) = self.to_pixel(bracket, *point);
            let color = match node {
                _ if Some(*node) == champion => CHAMPION,
                NodeId::Player { .. } => PLAYER,
                NodeId::Match { .. } => MATCH,
            };
            fill_rect(
                &mut canvas,
                (x.saturating_sub(half_marker), y.saturating_sub(half_marker)),
                (x.saturating_add(half_marker), y.saturating_add(half_marker)),
                color,
            );
        }
        canvas
    }
}

impl BracketRenderer for RasterRenderer {
    fn render(&self, bracket: &Bracket) -> Result<Vec<u8>> {
        if let Some((node, point)) = bracket
            .positions()
            .iter()
            .find(|(_, point)| !point.x.is_finite() || !point.y.is_finite())
        {
            bail!("{node} has no drawable position ({}, {})", point.x, point.y);
        }
        let (width, height) = self.canvas_size(bracket);
        if u64::from(width) * u64::from(height) > MAX_CANVAS_PIXELS {
            bail!("bracket canvas {width}x{height} is too large to render");
        }
        let canvas = self.draw(bracket);
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(canvas)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .context("failed to encode bracket PNG")?;
        Ok(bytes)
    }
}

fn fill_rect(canvas: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let max_x = i64::from(canvas.width()) - 1;
    let max_y = i64::from(canvas.height()) - 1;
    if to.0 < 0 || to.1 < 0 || from.0 > max_x || from.1 > max_y {
        return;
    }
    let x0 = from.0.clamp(0, max_x);
    let x1 = to.0.clamp(0, max_x);
    let y0 = from.1.clamp(0, max_y);
    let y1 = to.1.clamp(0, max_y);
    for y in y0..=y1 {
        for x in x0..=x1 {
            canvas.put_pixel(x as u32, y as u32, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use image::RgbImage;
    use relay_contracts::bracket::{build, build_with, LayoutOptions, Point};

    use super::{fill_rect, RasterRenderer, BACKGROUND, CHAMPION, CONNECTOR, PLAYER};
    use crate::BracketRenderer;

    #[test]
    fn canvas_fits_rounds_and_rows() -> anyhow::Result<()> {
        let renderer = RasterRenderer::default();
        assert_eq!(renderer.canvas_size(&build(4, 100.0)?), (369, 133));
        assert_eq!(renderer.canvas_size(&build(1, 100.0)?), (49, 49));
        Ok(())
    }

    #[test]
    fn draws_elbow_connectors_and_markers() -> anyhow::Result<()> {
        let renderer = RasterRenderer::default();
        let canvas = renderer.draw(&build(4, 100.0)?);

        assert_eq!(*canvas.get_pixel(0, 0), BACKGROUND);
        // leaf 0 marker, its horizontal run, and the corner above the semifinal
        assert_eq!(*canvas.get_pixel(24, 24), PLAYER);
        assert_eq!(*canvas.get_pixel(100, 24), CONNECTOR);
        assert_eq!(*canvas.get_pixel(184, 30), CONNECTOR);
        // nothing diagonal between leaf 0 and the semifinal
        assert_eq!(*canvas.get_pixel(100, 31), BACKGROUND);
        // final match
        assert_eq!(*canvas.get_pixel(344, 66), CHAMPION);
        Ok(())
    }

    #[test]
    fn render_produces_decodable_png() -> anyhow::Result<()> {
        let renderer = RasterRenderer::default();
        let bracket = build_with(5, LayoutOptions::new(100.0).with_byes())?;
        let bytes = renderer.render(&bracket)?;
        let decoded = image::load_from_memory(&bytes)?;
        assert_eq!(
            (decoded.width(), decoded.height()),
            renderer.canvas_size(&bracket)
        );
        Ok(())
    }

    #[test]
    fn far_off_canvas_rects_are_skipped() -> anyhow::Result<()> {
        let renderer = RasterRenderer::default();
        let bracket = build(4, 100.0)?;
        let (x, y) = renderer.to_pixel(&bracket, Point::new(0.0, f64::NEG_INFINITY));
        assert_eq!(y, i64::MAX);

        let mut canvas = RgbImage::from_pixel(8, 8, BACKGROUND);
        fill_rect(
            &mut canvas,
            (x.saturating_sub(4), y.saturating_sub(4)),
            (x.saturating_add(4), y.saturating_add(4)),
            CHAMPION,
        );
        fill_rect(&mut canvas, (i64::MIN, -10), (-1, -1), CHAMPION);
        assert!(canvas.pixels().all(|pixel| *pixel == BACKGROUND));

        fill_rect(&mut canvas, (-5, -5), (2, 2), CHAMPION);
        assert_eq!(*canvas.get_pixel(2, 2), CHAMPION);
        assert_eq!(*canvas.get_pixel(3, 3), BACKGROUND);
        Ok(())
    }

    #[test]
    fn oversized_canvas_is_an_error() -> anyhow::Result<()> {
        let renderer = RasterRenderer {
            column_width: u32::MAX,
            ..RasterRenderer::default()
        };
        let bracket = build(4, 100.0)?;
        assert_eq!(renderer.canvas_size(&bracket).0, u32::MAX);
        let err = renderer.render(&bracket).unwrap_err();
        assert!(err.to_string().contains("too large"));
        Ok(())
    }
}
