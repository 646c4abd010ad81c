//! Native multi-band GeoTIFF reading/writing
//!
//! Uses the `tiff` crate. Each band is stored as one TIFF directory; the
//! band label travels in the ImageDescription tag (the `descriptions`
//! rasterio exposes), georeferencing in the ModelPixelScale/ModelTiepoint
//! tags. Data is written as 32-bit float.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, MultibandRaster, Raster};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

// GeoTIFF / GDAL private tags
const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;

/// Read a multi-band GeoTIFF file.
///
/// Band order and descriptions are restored; the geotransform is taken
/// from the first directory.
pub fn read_geotiff<P: AsRef<Path>>(path: P) -> Result<MultibandRaster<f64>> {
    let file = BufReader::new(File::open(path.as_ref())?);
    decode(file)
}

/// Read a multi-band GeoTIFF from an in-memory buffer.
///
/// Same as [`read_geotiff`] but for bytes fetched from a remote service.
pub fn read_geotiff_from_buffer(data: &[u8]) -> Result<MultibandRaster<f64>> {
    decode(Cursor::new(data))
}

fn decode<R>(reader: R) -> Result<MultibandRaster<f64>>
where
    R: std::io::Read + std::io::Seek,
{
    let mut decoder =
        Decoder::new(reader).map_err(|e| Error::Tiff(format!("decode error: {}", e)))?;

    let mut stack: Option<MultibandRaster<f64>> = None;
    let mut index = 0usize;

    loop {
        let (width, height) = decoder
            .dimensions()
            .map_err(|e| Error::Tiff(format!("cannot read dimensions: {}", e)))?;
        let rows = height as usize;
        let cols = width as usize;

        let data = read_page_f64(&mut decoder)?;
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let label = decoder
            .get_tag_ascii_string(Tag::ImageDescription)
            .ok()
            .map(|s| s.trim_end_matches('\0').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("band_{}", index + 1));

        let mut band = Raster::from_vec(data, rows, cols)?;
        if let Ok(transform) = read_geotransform(&mut decoder) {
            band.set_transform(transform);
        }
        band.set_nodata(Some(f64::NAN));

        match stack.as_mut() {
            None => stack = Some(MultibandRaster::from_band(band, label)),
            Some(s) => s.push_band(band, label)?,
        }

        if !decoder.more_images() {
            break;
        }
        decoder
            .next_image()
            .map_err(|e| Error::Tiff(format!("cannot advance directory: {}", e)))?;
        index += 1;
    }

    stack.ok_or(Error::EmptyInput("GeoTIFF contains no directories"))
}

fn read_page_f64<R>(decoder: &mut Decoder<R>) -> Result<Vec<f64>>
where
    R: std::io::Read + std::io::Seek,
{
    let result = decoder
        .read_image()
        .map_err(|e| Error::Tiff(format!("cannot read image data: {}", e)))?;

    let data: Vec<f64> = match result {
        DecodingResult::F32(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::F64(buf) => buf,
        DecodingResult::U8(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::U16(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::U32(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::I8(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::I16(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::I32(buf) => buf.iter().map(|&v| v as f64).collect(),
        _ => {
            return Err(Error::UnsupportedDataType(
                "unsupported TIFF pixel format".to_string(),
            ))
        }
    };
    Ok(data)
}

/// Attempt to read a GeoTransform from ModelPixelScale + ModelTiepoint
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform> {
    // `Tag::from_u16_exhaustive` resolves these tag numbers to the named
    // variants, so lookups must use them rather than `Tag::Unknown`.
    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|_| Error::Tiff("no pixel scale tag".into()))?;

    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|_| Error::Tiff("no tiepoint tag".into()))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z]; scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        return Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }

    Err(Error::Tiff("cannot determine geotransform".into()))
}

/// Write a multi-band GeoTIFF file, one directory per band.
///
/// Band descriptions and georeferencing are preserved; values are stored
/// as 32-bit float with NaN as no-data.
pub fn write_geotiff<P: AsRef<Path>>(stack: &MultibandRaster<f64>, path: P) -> Result<()> {
    let file = BufWriter::new(File::create(path.as_ref())?);
    encode(stack, file)
}

/// Write a multi-band GeoTIFF to an in-memory buffer
pub fn write_geotiff_to_buffer(stack: &MultibandRaster<f64>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode(stack, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode<W>(stack: &MultibandRaster<f64>, writer: W) -> Result<()>
where
    W: std::io::Write + std::io::Seek,
{
    if stack.band_count() == 0 {
        return Err(Error::EmptyInput("cannot write a stack with no bands"));
    }

    let mut encoder =
        TiffEncoder::new(writer).map_err(|e| Error::Tiff(format!("encoder error: {}", e)))?;

    let (rows, cols) = stack.shape();
    let gt = stack.transform();

    for (label, band) in stack.iter() {
        let data: Vec<f32> = band.iter().map(|&v| v as f32).collect();

        let mut image = encoder
            .new_image::<Gray32Float>(cols as u32, rows as u32)
            .map_err(|e| Error::Tiff(format!("cannot create directory: {}", e)))?;

        image
            .encoder()
            .write_tag(Tag::ImageDescription, label)
            .map_err(|e| Error::Tiff(format!("cannot write description: {}", e)))?;

        let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
        image
            .encoder()
            .write_tag(Tag::Unknown(TAG_MODEL_PIXEL_SCALE), &scale[..])
            .map_err(|e| Error::Tiff(format!("cannot write scale tag: {}", e)))?;

        let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
        image
            .encoder()
            .write_tag(Tag::Unknown(TAG_MODEL_TIEPOINT), &tiepoint[..])
            .map_err(|e| Error::Tiff(format!("cannot write tiepoint tag: {}", e)))?;

        // Minimal GeoKey directory: GTModelTypeGeoKey=2 (Geographic),
        // GTRasterTypeGeoKey=1 (RasterPixelIsArea).
        let geokeys: [u16; 12] = [
            1, 1, 0, 2, //
            1024, 0, 1, 2, //
            1025, 0, 1, 1, //
        ];
        image
            .encoder()
            .write_tag(Tag::Unknown(TAG_GEO_KEY_DIRECTORY), &geokeys[..])
            .map_err(|e| Error::Tiff(format!("cannot write geokey tag: {}", e)))?;

        image
            .encoder()
            .write_tag(Tag::Unknown(TAG_GDAL_NODATA), "nan")
            .map_err(|e| Error::Tiff(format!("cannot write nodata tag: {}", e)))?;

        image
            .write_data(&data)
            .map_err(|e| Error::Tiff(format!("cannot write image data: {}", e)))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Raster;

    fn sample_stack() -> MultibandRaster<f64> {
        let mut first = Raster::from_vec(vec![1.0, 2.0, 3.0, f64::NAN], 2, 2).unwrap();
        first.set_transform(GeoTransform::new(33.0, 1.0, 0.05, -0.05));
        first.set_nodata(Some(f64::NAN));

        let mut stack = MultibandRaster::from_band(first, "rain_2000_1");
        stack
            .push_band(
                Raster::from_vec(vec![5.0, 6.0, 7.0, 8.0], 2, 2).unwrap(),
                "rain_2000_2",
            )
            .unwrap();
        stack
    }

    #[test]
    fn test_roundtrip_preserves_bands_and_labels() {
        let stack = sample_stack();
        let buf = write_geotiff_to_buffer(&stack).unwrap();
        let back = read_geotiff_from_buffer(&buf).unwrap();

        assert_eq!(back.band_count(), 2);
        assert_eq!(back.shape(), (2, 2));
        assert_eq!(back.label(0), Some("rain_2000_1"));
        assert_eq!(back.label(1), Some("rain_2000_2"));
        assert_eq!(back.band(1).unwrap()[(1, 1)], 8.0);
        assert!(back.band(0).unwrap()[(1, 1)].is_nan());
    }

    #[test]
    fn test_roundtrip_preserves_transform() {
        let stack = sample_stack();
        let buf = write_geotiff_to_buffer(&stack).unwrap();
        let back = read_geotiff_from_buffer(&buf).unwrap();

        let gt = back.transform();
        assert!((gt.origin_x - 33.0).abs() < 1e-9);
        assert!((gt.origin_y - 1.0).abs() < 1e-9);
        assert!((gt.pixel_width - 0.05).abs() < 1e-9);
        assert!((gt.pixel_height + 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_file_roundtrip() {
        let stack = sample_stack();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.tif");

        write_geotiff(&stack, &path).unwrap();
        let back = read_geotiff(&path).unwrap();
        assert_eq!(back.labels(), stack.labels());
    }
}
