pub mod export;
pub mod ome_tiff;
pub mod raw;
pub mod tile_source;

pub use export::{export_volume, ExportFormat, VolumeExporter, VolumeMetadata};
pub use ome_tiff::OmeTiffExporter;
pub use raw::RawExporter;
pub use tile_source::{load_tile, DiskTileSource, MemoryTileSource, TileSource};
