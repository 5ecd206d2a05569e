//! Output volume planning and storage.

mod plan;
mod storage;

pub use plan::{plan_canvas, CanvasPlan, CanvasShape};
pub use storage::{Canvas, MemoryStrategy};
