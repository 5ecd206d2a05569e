pub mod consts;
pub mod error;
pub mod sample;
pub mod tile;
pub mod metadata;
pub mod grid;
pub mod io;
pub mod filters;
pub mod align;
pub mod flatfield;
pub mod canvas;
pub mod compose;
pub mod pipeline;
