//! Tile placement and composition into the canvas.

mod compositor;
mod placement;

pub use compositor::compose;
pub use placement::{tile_placement, Crop, Placement};
