//! In-place downscaling of stored images.

use std::io::{BufWriter, Write};
use std::path::Path;

use image::{ImageFormat, ImageReader, imageops::FilterType};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageProcessingError {
    #[error("failed to open stored image: {0}")]
    Open(#[source] std::io::Error),
    #[error("failed to decode image")]
    Decode(#[source] image::ImageError),
    #[error("no encoder available for {0:?}")]
    UnsupportedFormat(ImageFormat),
    #[error("failed to encode resized image")]
    Encode(#[source] image::ImageError),
    #[error("failed to replace stored image: {0}")]
    Write(#[source] std::io::Error),
}

/// What happened to a stored file after processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeOutcome {
    /// The image was already narrow enough and was left as is.
    Unchanged { width: u32, height: u32 },
    /// The file was overwritten with a narrower rendition.
    Resized {
        from: (u32, u32),
        to: (u32, u32),
    },
}

/// Caps the pixel width of stored images, preserving aspect ratio.
#[derive(Debug, Clone, Copy)]
pub struct ImageProcessor {
    max_width: u32,
}

impl ImageProcessor {
    pub fn new(max_width: u32) -> Self {
        Self { max_width }
    }

    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    /// Decode the file at `path` and, if wider than the limit, replace it
    /// with a Lanczos3-resampled copy in the same format.
    ///
    /// The copy is encoded into a sibling temporary file and renamed over the
    /// original only once fully written; on any error the original is intact.
    ///
    /// Blocking: call from a blocking-capable thread.
    pub fn constrain_width(&self, path: &Path) -> Result<ResizeOutcome, ImageProcessingError> {
        let reader = ImageReader::open(path)
            .map_err(ImageProcessingError::Open)?
            .with_guessed_format()
            .map_err(ImageProcessingError::Open)?;
        let format = reader.format();
        let img = reader.decode().map_err(ImageProcessingError::Decode)?;

        let (width, height) = (img.width(), img.height());
        if width <= self.max_width {
            return Ok(ResizeOutcome::Unchanged { width, height });
        }

        let target_format = format
            .or_else(|| ImageFormat::from_path(path).ok())
            .unwrap_or(ImageFormat::Png);
        if !target_format.writing_enabled() {
            return Err(ImageProcessingError::UnsupportedFormat(target_format));
        }

        // A height bound of u32::MAX lets the width drive the scale factor.
        let resized = img.resize(self.max_width, u32::MAX, FilterType::Lanczos3);

        let encodable = match target_format {
            // JPEG cannot carry an alpha channel.
            ImageFormat::Jpeg if resized.color().has_alpha() => {
                image::DynamicImage::ImageRgb8(resized.to_rgb8())
            }
            _ => resized,
        };
        replace_with_encoded(path, &encodable, target_format)?;

        Ok(ResizeOutcome::Resized {
            from: (width, height),
            to: (encodable.width(), encodable.height()),
        })
    }
}

fn replace_with_encoded(
    path: &Path,
    img: &image::DynamicImage,
    format: ImageFormat,
) -> Result<(), ImageProcessingError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut staged = NamedTempFile::new_in(dir).map_err(ImageProcessingError::Write)?;

    {
        let mut writer = BufWriter::new(staged.as_file_mut());
        img.write_to(&mut writer, format)
            .map_err(ImageProcessingError::Encode)?;
        writer.flush().map_err(ImageProcessingError::Write)?;
    }

    staged
        .persist(path)
        .map_err(|err| ImageProcessingError::Write(err.error))?;
    Ok(())
}

/// A black DXT1 DDS texture: decodable, but `image` has no DDS encoder.
#[cfg(test)]
pub(crate) fn dxt1_dds(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(128);
    bytes.extend_from_slice(b"DDS ");
    let header: [u32; 31] = {
        let mut h = [0u32; 31];
        h[0] = 124; // header size
        h[1] = 0x1007; // caps | height | width | pixel format
        h[2] = height;
        h[3] = width;
        h[4] = (width / 4) * (height / 4) * 8; // linear size
        h[18] = 32; // pixel format size
        h[19] = 0x4; // fourcc present
        h[20] = u32::from_le_bytes(*b"DXT1");
        h[26] = 0x1000; // texture
        h
    };
    for word in header {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    bytes.resize(128 + ((width / 4) * (height / 4) * 8) as usize, 0);
    bytes
}
