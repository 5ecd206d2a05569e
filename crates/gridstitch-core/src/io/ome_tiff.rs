use std::io::{Seek, Write};
use std::path::Path;

use tiff::encoder::{TiffEncoder, TiffKind};
use tracing::info;

use crate::canvas::Canvas;
use crate::consts::CLASSIC_TIFF_LIMIT_BYTES;
use crate::error::{Result, StitchError};
use crate::sample::Sample;

use super::export::{write_atomically, VolumeExporter, VolumeMetadata};

/// Writes pages in TCZYX order (z fastest) with OME-XML in the first page's
/// `ImageDescription`. Volumes past the classic TIFF limit are written as
/// BigTIFF.
#[derive(Clone, Copy, Debug, Default)]
pub struct OmeTiffExporter;

impl VolumeExporter for OmeTiffExporter {
    fn export<T: Sample>(
        &self,
        canvas: &Canvas<T>,
        metadata: &VolumeMetadata,
        path: &Path,
    ) -> Result<()> {
        let shape = canvas.shape();
        let to_u32 = |v: usize| {
            u32::try_from(v).map_err(|_| {
                StitchError::export(path, format!("dimension {v} exceeds TIFF limits"))
            })
        };
        let (width, height) = (to_u32(shape.width)?, to_u32(shape.height)?);
        let description = ome_xml(canvas, metadata);

        let bytes = (shape.len() * std::mem::size_of::<T>()) as u64;

        write_atomically(path, |writer| {
            let written = if bytes > CLASSIC_TIFF_LIMIT_BYTES {
                TiffEncoder::new_big(&mut *writer)
                    .and_then(|mut enc| write_pages(&mut enc, canvas, width, height, &description))
            } else {
                TiffEncoder::new(&mut *writer)
                    .and_then(|mut enc| write_pages(&mut enc, canvas, width, height, &description))
            };
            written.map_err(|e| StitchError::export(path, e))
        })?;

        info!(path = %path.display(), pages = shape.plane_count(), "Wrote OME-TIFF");
        Ok(())
    }
}

fn write_pages<T: Sample, W: Write + Seek, K: TiffKind>(
    encoder: &mut TiffEncoder<W, K>,
    canvas: &Canvas<T>,
    width: u32,
    height: u32,
    description: &str,
) -> tiff::TiffResult<()> {
    let shape = canvas.shape();
    for channel in 0..shape.channels {
        for z in 0..shape.z {
            let first = channel == 0 && z == 0;
            T::write_tiff_page(
                encoder,
                width,
                height,
                canvas.plane_slice(channel, z),
                first.then_some(description),
            )?;
        }
    }
    Ok(())
}

/// Minimal OME-XML for a single TCZYX image.
pub fn ome_xml<T: Sample>(canvas: &Canvas<T>, metadata: &VolumeMetadata) -> String {
    let shape = canvas.shape();
    let mut physical = String::new();
    if let Some(xy) = metadata.physical_size_xy_um {
        physical.push_str(&format!(
            " PhysicalSizeX=\"{xy}\" PhysicalSizeXUnit=\"µm\" PhysicalSizeY=\"{xy}\" PhysicalSizeYUnit=\"µm\""
        ));
    }
    if let Some(z) = metadata.physical_size_z_um {
        physical.push_str(&format!(" PhysicalSizeZ=\"{z}\" PhysicalSizeZUnit=\"µm\""));
    }

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(
        "<OME xmlns=\"http://www.openmicroscopy.org/Schemas/OME/2016-06\" \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
         xsi:schemaLocation=\"http://www.openmicroscopy.org/Schemas/OME/2016-06 \
         http://www.openmicroscopy.org/Schemas/OME/2016-06/ome.xsd\">",
    );
    xml.push_str(&format!(
        "<Image ID=\"Image:0\" Name=\"{}\">",
        escape_attr(&metadata.name)
    ));
    xml.push_str(&format!(
        "<Pixels ID=\"Pixels:0\" DimensionOrder=\"XYZCT\" Type=\"{}\" \
         SizeX=\"{}\" SizeY=\"{}\" SizeZ=\"{}\" SizeC=\"{}\" SizeT=\"1\"{}>",
        T::TYPE.name(),
        shape.width,
        shape.height,
        shape.z,
        shape.channels,
        physical
    ));
    for (index, name) in metadata.channel_names.iter().enumerate() {
        xml.push_str(&format!(
            "<Channel ID=\"Channel:0:{index}\" Name=\"{}\" SamplesPerPixel=\"1\"/>",
            escape_attr(name)
        ));
    }
    xml.push_str(&format!(
        "<TiffData IFD=\"0\" PlaneCount=\"{}\"/>",
        shape.plane_count()
    ));
    xml.push_str("</Pixels></Image></OME>");
    xml
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
