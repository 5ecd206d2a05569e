use std::io::{Seek, Write};

use byteorder::{ByteOrder, LittleEndian};
use bytemuck::Pod;
use image::{ColorType, DynamicImage};
use ndarray::{Array2, ShapeError};
use num_traits::{AsPrimitive, Bounded, Zero};
use serde::{Deserialize, Serialize};
use tiff::encoder::{colortype, TiffEncoder, TiffKind};
use tiff::tags::Tag;
use tiff::TiffResult;

/// Pixel sample type of a tile set, detected from the first tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleType {
    U8,
    U16,
}

impl SampleType {
    /// Map a decoded image's colour type to the sample type it is stitched as.
    pub fn from_color(color: ColorType) -> Option<Self> {
        match color {
            ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8 => Some(Self::U8),
            ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 => {
                Some(Self::U16)
            }
            _ => None,
        }
    }

    pub fn byte_size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::U8 => "uint8",
            Self::U16 => "uint16",
        }
    }
}

impl std::fmt::Display for SampleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An unsigned integer sample that tiles and the canvas are stored as.
pub trait Sample:
    Pod + Bounded + Zero + AsPrimitive<f32> + PartialEq + std::fmt::Debug + Send + Sync
{
    const TYPE: SampleType;

    /// Decode the first plane of an image as single-channel samples.
    fn from_image(image: DynamicImage) -> Result<Array2<Self>, ShapeError>;

    /// Clip to the sample range and truncate toward zero.
    fn from_f32_clipped(value: f32) -> Self;

    /// Write samples in little-endian byte order.
    fn write_le<W: Write>(data: &[Self], writer: &mut W) -> std::io::Result<()>;

    /// Append one grayscale page to a TIFF stream.
    fn write_tiff_page<W: Write + Seek, K: TiffKind>(
        encoder: &mut TiffEncoder<W, K>,
        width: u32,
        height: u32,
        data: &[Self],
        description: Option<&str>,
    ) -> TiffResult<()>;
}

macro_rules! impl_sample {
    ($ty:ty, $kind:expr, $to_luma:ident, $tiff_color:ty, $write_le:ident) => {
        impl Sample for $ty {
            const TYPE: SampleType = $kind;

            fn from_image(image: DynamicImage) -> Result<Array2<Self>, ShapeError> {
                let gray = image.$to_luma();
                let (w, h) = gray.dimensions();
                Array2::from_shape_vec((h as usize, w as usize), gray.into_raw())
            }

            fn from_f32_clipped(value: f32) -> Self {
                value.clamp(<$ty>::MIN as f32, <$ty>::MAX as f32) as $ty
            }

            fn write_le<W: Write>(data: &[Self], writer: &mut W) -> std::io::Result<()> {
                $write_le(data, writer)
            }

            fn write_tiff_page<W: Write + Seek, K: TiffKind>(
                encoder: &mut TiffEncoder<W, K>,
                width: u32,
                height: u32,
                data: &[Self],
                description: Option<&str>,
            ) -> TiffResult<()> {
                let mut image = encoder.new_image::<$tiff_color>(width, height)?;
                if let Some(text) = description {
                    image.encoder().write_tag(Tag::ImageDescription, text)?;
                }
                image.write_data(data)
            }
        }
    };
}

fn write_u8_le<W: Write>(data: &[u8], writer: &mut W) -> std::io::Result<()> {
    writer.write_all(data)
}

fn write_u16_le<W: Write>(data: &[u16], writer: &mut W) -> std::io::Result<()> {
    let mut buf = vec![0u8; data.len() * 2];
    LittleEndian::write_u16_into(data, &mut buf);
    writer.write_all(&buf)
}

impl_sample!(u8, SampleType::U8, to_luma8, colortype::Gray8, write_u8_le);
impl_sample!(u16, SampleType::U16, to_luma16, colortype::Gray16, write_u16_le);
