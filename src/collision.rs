//! Pixel-exact flier/obstacle collision test

use crate::flier::Flier;
use crate::sprite::SpriteSet;
use crate::track::Obstacle;

/// True if the flier's mask overlaps either of the obstacle's sprite masks.
///
/// Offsets are the obstacle sprites' positions relative to the flier sprite's
/// top-left corner, rounded to whole pixels.
pub fn collides(flier: &Flier, obstacle: &Obstacle, sprites: &SpriteSet, gap_size: f32) -> bool {
    let dx = (obstacle.x - flier.x).round() as i32;
    let flier_y = flier.y.round() as i32;

    let top_edge = obstacle.top_edge(sprites.obstacle_upper.height()).round() as i32;
    let bottom_edge = obstacle.bottom_edge(gap_size).round() as i32;

    let upper_offset = (dx, top_edge - flier_y);
    let lower_offset = (dx, bottom_edge - flier_y);

    sprites.flier.overlap(&sprites.obstacle_upper, upper_offset)
        || sprites.flier.overlap(&sprites.obstacle_lower, lower_offset)
}
