use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};

use crate::geometry::Color;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenPoint {
    pub x: f32,
    pub y: f32,
}

impl PenPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenOptions {
    pub color: Color,
    pub thickness: f32,
}

impl Default for PenOptions {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            thickness: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PenStroke {
    pub points: Vec<PenPoint>,
    pub finalized: bool,
}

impl PenStroke {
    fn new(start: PenPoint) -> Self {
        Self {
            points: vec![start],
            finalized: false,
        }
    }
}

/// Freehand drawing surface for a signature, rasterized to a trimmed PNG on commit.
#[derive(Debug, Clone, PartialEq)]
pub struct SignaturePad {
    width: u32,
    height: u32,
    options: PenOptions,
    strokes: Vec<PenStroke>,
}

impl SignaturePad {
    pub fn new(width: u32, height: u32, options: PenOptions) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            options,
            strokes: Vec::new(),
        }
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn height(&self) -> u32 {
        self.height
    }

    fn clamp_point(&self, point: PenPoint) -> PenPoint {
        let max_x = self.width.saturating_sub(1) as f32;
        let max_y = self.height.saturating_sub(1) as f32;
        let coordinate = |value: f32, max: f32| {
            if value.is_finite() {
                value.clamp(0.0, max)
            } else {
                0.0
            }
        };
        PenPoint::new(coordinate(point.x, max_x), coordinate(point.y, max_y))
    }

    pub fn begin_stroke(&mut self, start: PenPoint) {
        let start = self.clamp_point(start);
        if let Some(open) = self.strokes.last_mut() {
            open.finalized = true;
        }
        self.strokes.push(PenStroke::new(start));
    }

    /// Appends to the open stroke. Returns `false` when no stroke is open.
    pub fn extend_stroke(&mut self, point: PenPoint) -> bool {
        let point = self.clamp_point(point);
        match self.strokes.last_mut() {
            Some(stroke) if !stroke.finalized => {
                stroke.points.push(point);
                true
            }
            _ => false,
        }
    }

    pub fn end_stroke(&mut self) {
        if let Some(stroke) = self.strokes.last_mut() {
            stroke.finalized = true;
        }
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.iter().all(|stroke| stroke.points.is_empty())
    }

    pub fn strokes(&self) -> &[PenStroke] {
        &self.strokes
    }

    pub fn rasterize(&self) -> RgbaImage {
        let mut canvas = RgbaImage::new(self.width, self.height);
        let (r, g, b) = self.options.color.rgb();
        let ink = Rgba([r, g, b, 255]);
        let radius = (self.options.thickness / 2.0).max(0.5);

        for stroke in &self.strokes {
            let Some(first) = stroke.points.first() else {
                continue;
            };
            stamp_disc(&mut canvas, *first, radius, ink);
            for segment in stroke.points.windows(2) {
                stamp_segment(&mut canvas, segment[0], segment[1], radius, ink);
            }
        }
        canvas
    }

    /// PNG of the drawn ink cropped to its bounding box, or `None` when nothing was drawn.
    pub fn to_trimmed_png(&self) -> Result<Option<Vec<u8>>, image::ImageError> {
        if self.is_empty() {
            return Ok(None);
        }
        let canvas = self.rasterize();
        let Some((x, y, width, height)) = ink_bounds(&canvas) else {
            return Ok(None);
        };
        let trimmed = image::imageops::crop_imm(&canvas, x, y, width, height).to_image();
        encode_png(trimmed).map(Some)
    }
}

fn stamp_segment(canvas: &mut RgbaImage, from: PenPoint, to: PenPoint, radius: f32, ink: Rgba<u8>) {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let length = (dx * dx + dy * dy).sqrt();
    let steps = (length / 0.5).ceil().max(1.0) as u32;
    for step in 1..=steps {
        let t = step as f32 / steps as f32;
        stamp_disc(
            canvas,
            PenPoint::new(from.x + dx * t, from.y + dy * t),
            radius,
            ink,
        );
    }
}

fn stamp_disc(canvas: &mut RgbaImage, center: PenPoint, radius: f32, ink: Rgba<u8>) {
    let (width, height) = canvas.dimensions();
    let min_x = (center.x - radius).floor().max(0.0) as u32;
    let min_y = (center.y - radius).floor().max(0.0) as u32;
    let max_x = ((center.x + radius).ceil().max(0.0) as u32).min(width.saturating_sub(1));
    let max_y = ((center.y + radius).ceil().max(0.0) as u32).min(height.saturating_sub(1));
    let radius_sq = radius * radius;

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let px = x as f32 + 0.5 - center.x;
            let py = y as f32 + 0.5 - center.y;
            if px * px + py * py <= radius_sq {
                canvas.put_pixel(x, y, ink);
            }
        }
    }
}

fn ink_bounds(canvas: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in canvas.enumerate_pixels() {
        if pixel[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((min_x, min_y, max_x, max_y)) => {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            }
        });
    }
    bounds.map(|(min_x, min_y, max_x, max_y)| (min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

fn encode_png(image: RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}
