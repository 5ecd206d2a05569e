use std::fs::File;
use std::marker::PhantomData;
use std::path::Path;

use memmap2::MmapMut;
use ndarray::{ArrayView2, ArrayView5};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::consts::LOW_MEMORY_THRESHOLD_BYTES;
use crate::error::{Result, StitchError};
use crate::sample::Sample;

use super::plan::{CanvasPlan, CanvasShape};

/// Where the canvas samples live while tiles are composited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryStrategy {
    /// Memory-map when the plan's estimate exceeds the low-memory threshold.
    #[default]
    Auto,
    /// Always a heap buffer.
    InMemory,
    /// Always a memory-mapped temporary file.
    MemoryMapped,
}

impl std::fmt::Display for MemoryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "Auto"),
            Self::InMemory => write!(f, "In Memory"),
            Self::MemoryMapped => write!(f, "Memory Mapped"),
        }
    }
}

impl MemoryStrategy {
    pub fn use_memory_map(&self, plan: &CanvasPlan) -> bool {
        match self {
            Self::Auto => plan.memory_estimate_bytes > LOW_MEMORY_THRESHOLD_BYTES,
            Self::InMemory => false,
            Self::MemoryMapped => true,
        }
    }
}

#[derive(Debug)]
enum Storage<T> {
    Heap(Vec<T>),
    // The file is anonymous (already unlinked) and goes away with the map.
    Mapped {
        map: MmapMut,
        _file: File,
        _marker: PhantomData<T>,
    },
}

/// Zero-initialised `(1, c, z, y, x)` volume, stored plane after plane.
#[derive(Debug)]
pub struct Canvas<T: Sample> {
    shape: CanvasShape,
    storage: Storage<T>,
}

impl<T: Sample> Canvas<T> {
    /// Allocate per `strategy`; memory-mapped files are created in `spill_dir`
    /// (the system temp directory when `None`).
    pub fn allocate(
        plan: &CanvasPlan,
        strategy: MemoryStrategy,
        spill_dir: Option<&Path>,
    ) -> Result<Self> {
        if plan.sample_type != T::TYPE {
            return Err(StitchError::InvalidGeometry(format!(
                "canvas planned for {} samples, allocated as {}",
                plan.sample_type,
                T::TYPE
            )));
        }
        if strategy.use_memory_map(plan) {
            info!(
                bytes = plan.full_size_bytes(),
                "Backing canvas with a memory-mapped file"
            );
            Self::memory_mapped(plan.shape, spill_dir)
        } else {
            Ok(Self::in_memory(plan.shape))
        }
    }

    pub fn in_memory(shape: CanvasShape) -> Self {
        Self {
            shape,
            storage: Storage::Heap(vec![T::zero(); shape.len()]),
        }
    }

    pub fn memory_mapped(shape: CanvasShape, spill_dir: Option<&Path>) -> Result<Self> {
        let bytes = shape
            .len()
            .checked_mul(std::mem::size_of::<T>())
            .ok_or_else(|| StitchError::InvalidGeometry(format!("canvas {shape} overflows")))?;
        if bytes == 0 {
            return Ok(Self::in_memory(shape));
        }

        let file = match spill_dir {
            Some(dir) => tempfile::tempfile_in(dir)?,
            None => tempfile::tempfile()?,
        };
        file.set_len(bytes as u64)?;
        // SAFETY: the file is anonymous to this process and only reachable
        // through this mapping.
        let map = unsafe { MmapMut::map_mut(&file)? };

        Ok(Self {
            shape,
            storage: Storage::Mapped {
                map,
                _file: file,
                _marker: PhantomData,
            },
        })
    }

    pub fn shape(&self) -> CanvasShape {
        self.shape
    }

    pub fn is_memory_mapped(&self) -> bool {
        matches!(self.storage, Storage::Mapped { .. })
    }

    pub fn as_slice(&self) -> &[T] {
        match &self.storage {
            Storage::Heap(data) => data,
            Storage::Mapped { map, .. } => bytemuck::cast_slice(&map[..]),
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match &mut self.storage {
            Storage::Heap(data) => data,
            Storage::Mapped { map, .. } => bytemuck::cast_slice_mut(&mut map[..]),
        }
    }

    /// Samples of one `(channel, z)` plane, row-major.
    pub fn plane_slice(&self, channel: usize, z: usize) -> &[T] {
        let plane = self.shape.plane_len();
        let start = (channel * self.shape.z + z) * plane;
        &self.as_slice()[start..start + plane]
    }

    pub fn plane(&self, channel: usize, z: usize) -> Result<ArrayView2<'_, T>> {
        Ok(ArrayView2::from_shape(
            (self.shape.height, self.shape.width),
            self.plane_slice(channel, z),
        )?)
    }

    pub fn view(&self) -> Result<ArrayView5<'_, T>> {
        Ok(ArrayView5::from_shape(self.shape.tczyx(), self.as_slice())?)
    }
}
