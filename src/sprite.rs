//! Pixel masks for collision footprints
//!
//! A `SpriteMask` is a row-major boolean grid describing which pixels of a
//! sprite are solid. Masks can be built procedurally (solid rectangle,
//! filled ellipse) or loaded from a PNG's alpha channel. Overlap between two
//! masks is tested at a relative integer offset, so collision is pixel-exact
//! rather than bounding-box.

use std::path::Path;

use anyhow::{Context, Result};

/// Alpha values above this count as solid when loading from an image
const ALPHA_THRESHOLD: u8 = 127;

/// Row-major boolean pixel grid
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteMask {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
}

impl SpriteMask {
    /// Build a mask from a per-pixel predicate
    pub fn from_fn(width: u32, height: u32, mut solid: impl FnMut(u32, u32) -> bool) -> Self {
        let mut pixels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(solid(x, y));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Fully solid rectangle
    pub fn solid(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![true; (width * height) as usize],
        }
    }

    /// Filled ellipse inscribed in the given rectangle
    pub fn ellipse(width: u32, height: u32) -> Self {
        let rx = width as f32 / 2.0;
        let ry = height as f32 / 2.0;
        Self::from_fn(width, height, |x, y| {
            let dx = (x as f32 + 0.5 - rx) / rx;
            let dy = (y as f32 + 0.5 - ry) / ry;
            dx * dx + dy * dy <= 1.0
        })
    }

    /// Load a mask from a PNG's alpha channel
    pub fn from_alpha_image(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path)
            .with_context(|| format!("Failed to open sprite image {}", path.display()))?
            .to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self::from_fn(width, height, |x, y| {
            img.get_pixel(x, y).0[3] > ALPHA_THRESHOLD
        }))
    }

    /// Mirror the mask top-to-bottom (for the upper obstacle sprite)
    pub fn flip_vertical(&self) -> Self {
        Self::from_fn(self.width, self.height, |x, y| {
            self.get(x, self.height - 1 - y)
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Solid test; out-of-range coordinates are empty
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.pixels[(y * self.width + x) as usize]
    }

    /// Count of solid pixels
    pub fn solid_count(&self) -> usize {
        self.pixels.iter().filter(|p| **p).count()
    }

    /// True if any pixel is solid in both masks, with `other` placed at
    /// `offset` relative to this mask's top-left corner.
    pub fn overlap(&self, other: &SpriteMask, offset: (i32, i32)) -> bool {
        let (dx, dy) = offset;

        let x0 = dx.max(0);
        let y0 = dy.max(0);
        let x1 = (dx + other.width as i32).min(self.width as i32);
        let y1 = (dy + other.height as i32).min(self.height as i32);

        for y in y0..y1 {
            for x in x0..x1 {
                if self.get(x as u32, y as u32) && other.get((x - dx) as u32, (y - dy) as u32) {
                    return true;
                }
            }
        }
        false
    }
}

/// The three masks a session collides with
#[derive(Debug, Clone)]
pub struct SpriteSet {
    pub flier: SpriteMask,
    pub obstacle_upper: SpriteMask,
    pub obstacle_lower: SpriteMask,
}

impl SpriteSet {
    /// Procedural defaults: elliptical flier, rectangular obstacle sprites
    pub fn procedural(config: &crate::config::SpriteConfig) -> Self {
        let lower = SpriteMask::solid(config.obstacle_width, config.obstacle_height);
        Self {
            flier: SpriteMask::ellipse(config.flier_width, config.flier_height),
            obstacle_upper: lower.flip_vertical(),
            obstacle_lower: lower,
        }
    }

    /// Load all three masks from PNG alpha channels; the upper obstacle
    /// sprite is the lower one flipped, as in the source art.
    pub fn from_images(flier: impl AsRef<Path>, obstacle: impl AsRef<Path>) -> Result<Self> {
        let flier = SpriteMask::from_alpha_image(flier)?;
        let lower = SpriteMask::from_alpha_image(obstacle)?;
        Ok(Self {
            flier,
            obstacle_upper: lower.flip_vertical(),
            obstacle_lower: lower,
        })
    }
}
