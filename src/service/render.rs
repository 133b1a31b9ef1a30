//! QR symbol encoding and PNG output.

use super::query::QrOptions;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{imageops, DynamicImage, ImageBuffer, ImageFormat, Luma};
use qrcode::types::QrError;
use qrcode::{QrCode, Version};
use std::io::Cursor;
use thiserror::Error;

/// Largest edge of a rendered image, in pixels.
pub const MAX_IMAGE_SIDE: u32 = 4096;

/// Failure while producing the image.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The payload does not fit the requested symbol.
    #[error("Unable to encode data ({0})")]
    Encode(QrError),

    /// Symbol, border and box size together exceed [`MAX_IMAGE_SIDE`].
    #[error("image would be {side}px wide, limit is {limit}px", limit = MAX_IMAGE_SIDE)]
    TooLarge {
        /// Requested edge length in pixels.
        side: u64,
    },

    /// PNG encoding failed.
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    /// The blocking render task did not complete.
    #[error("render task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Encodes `options.data` and returns the PNG bytes.
///
/// # Errors
///
/// [`RenderError::Encode`] when the data does not fit even the largest
/// symbol, [`RenderError::TooLarge`] when the image edge would exceed
/// [`MAX_IMAGE_SIDE`], [`RenderError::Image`] if PNG encoding fails.
///
/// # Example
///
/// ```rust
/// use qrgate::{render_png, QrOptions};
///
/// let png = render_png(&QrOptions::new("https://example.com")).unwrap();
/// assert_eq!(&png[..4], b"\x89PNG");
/// ```
pub fn render_png(options: &QrOptions) -> Result<Vec<u8>, RenderError> {
    let code = encode(options).map_err(RenderError::Encode)?;

    let modules = code.width() as u64 + 2 * u64::from(options.border);
    let side = modules * u64::from(options.box_size);
    if side > u64::from(MAX_IMAGE_SIDE) {
        return Err(RenderError::TooLarge { side });
    }

    let symbol = code
        .render::<Luma<u8>>()
        .quiet_zone(false)
        .module_dimensions(options.box_size, options.box_size)
        .build();

    let margin = options.border * options.box_size;
    let mut canvas = ImageBuffer::from_pixel(
        symbol.width() + 2 * margin,
        symbol.height() + 2 * margin,
        Luma([255u8]),
    );
    imageops::overlay(&mut canvas, &symbol, i64::from(margin), i64::from(margin));

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(canvas).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

/// Encodes at the requested version, growing to the smallest version that
/// fits when the data is too long for it.
fn encode(options: &QrOptions) -> Result<QrCode, QrError> {
    let data = options.data.as_bytes();
    let ec = options.error_correction;
    match options.version {
        Some(version) => match QrCode::with_version(data, Version::Normal(version), ec) {
            Err(QrError::DataTooLong) => QrCode::with_error_correction_level(data, ec),
            result => result,
        },
        None => QrCode::with_error_correction_level(data, ec),
    }
}

/// Runs [`render_png`] on the blocking thread pool.
///
/// # Errors
///
/// Same as [`render_png`], plus [`RenderError::Join`] if the task panicked.
pub async fn render_png_blocking(options: QrOptions) -> Result<Vec<u8>, RenderError> {
    tokio::task::spawn_blocking(move || render_png(&options)).await?
}

/// Wraps PNG bytes in a `data:` URL.
pub fn data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrcode::EcLevel;

    fn decode(png: &[u8]) -> image::GrayImage {
        image::load_from_memory_with_format(png, ImageFormat::Png)
            .unwrap()
            .to_luma8()
    }

    #[test]
    fn test_png_signature() {
        let png = render_png(&QrOptions::new("hello")).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_dimensions() {
        let mut options = QrOptions::new("hello");
        options.version = Some(1);
        options.error_correction = EcLevel::L;
        options.box_size = 2;
        options.border = 3;

        // version 1 is 21 modules wide
        let image = decode(&render_png(&options).unwrap());
        assert_eq!(image.width(), (21 + 2 * 3) * 2);
        assert_eq!(image.height(), image.width());
    }

    #[test]
    fn test_border_is_white_and_symbol_starts_dark() {
        let mut options = QrOptions::new("hello");
        options.box_size = 1;
        options.border = 4;

        let image = decode(&render_png(&options).unwrap());
        assert_eq!(image.get_pixel(0, 0), &Luma([255]));
        assert_eq!(image.get_pixel(3, 3), &Luma([255]));
        // top-left finder pattern corner
        assert_eq!(image.get_pixel(4, 4), &Luma([0]));
    }

    #[test]
    fn test_zero_border() {
        let mut options = QrOptions::new("hello");
        options.version = Some(1);
        options.box_size = 1;
        options.border = 0;

        let image = decode(&render_png(&options).unwrap());
        assert_eq!(image.width(), 21);
        assert_eq!(image.get_pixel(0, 0), &Luma([0]));
    }

    #[test]
    fn test_version_grows_to_fit() {
        let mut options = QrOptions::new("x".repeat(200));
        options.version = Some(1);

        let code = encode(&options).unwrap();
        assert!(matches!(code.version(), Version::Normal(v) if v > 1));

        options.box_size = 1;
        options.border = 0;
        let image = decode(&render_png(&options).unwrap());
        assert!(image.width() > 21);
    }

    #[test]
    fn test_requested_version_is_kept_when_data_fits() {
        let mut options = QrOptions::new("hi");
        options.version = Some(5);

        let code = encode(&options).unwrap();
        assert_eq!(code.version(), Version::Normal(5));
    }

    #[test]
    fn test_data_too_long() {
        let mut options = QrOptions::new("x".repeat(3_000));
        options.error_correction = EcLevel::L;

        let err = render_png(&options).unwrap_err();
        assert!(matches!(err, RenderError::Encode(QrError::DataTooLong)));
        assert!(err.to_string().starts_with("Unable to encode data ("));
    }

    #[test]
    fn test_image_side_is_capped() {
        let mut options = QrOptions::new("hello");
        options.version = Some(40);
        options.box_size = 50;
        options.border = 100;

        // (177 + 2 * 100) * 50
        let err = render_png(&options).unwrap_err();
        assert!(matches!(err, RenderError::TooLarge { side: 18_850 }));

        // (177 + 2 * 4) * 22 = 4070 fits
        options.box_size = 22;
        options.border = 4;
        let image = decode(&render_png(&options).unwrap());
        assert_eq!(image.width(), 4070);
    }

    #[test]
    fn test_data_url() {
        assert_eq!(data_url(b"abc"), "data:image/png;base64,YWJj");
    }

    #[tokio::test]
    async fn test_blocking_render() {
        let png = render_png_blocking(QrOptions::new("async")).await.unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }
}
