//! Acquisition metadata that travels with a tile folder: the on-disk layout,
//! the stage/optics parameters and the illumination modes that were selected.

pub mod acquisition;
pub mod layout;
pub mod modes;

pub use acquisition::{AcquisitionParameters, Objective, Optics};
pub use layout::AcquisitionLayout;
pub use modes::{read_selected_modes, IlluminationMode};
