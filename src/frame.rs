//! Captured frame type handed from the render loop to the encoder thread

use image::RgbaImage;

use crate::errors::RecordError;

/// Bytes per pixel of the only accepted pixel layout (8-bit RGBA)
pub const BYTES_PER_PIXEL: usize = 4;

/// An immutable RGBA8 pixel buffer.
///
/// Rows are tightly packed, top row first. The frame is moved into the
/// encoder queue on submit and dropped once encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap raw RGBA bytes, checking that the length matches the dimensions
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RecordError> {
        if width == 0 || height == 0 {
            return Err(RecordError::Encoder(format!(
                "Invalid frame dimensions {}x{}",
                width, height
            )));
        }

        let expected = expected_len(width, height);
        if data.len() != expected {
            return Err(RecordError::Encoder(format!(
                "Invalid frame size: expected {} bytes, got {}",
                expected,
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A frame filled with one color
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, RecordError> {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(expected_len(width, height))
            .collect();
        Self::new(width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw RGBA bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl TryFrom<Frame> for RgbaImage {
    type Error = RecordError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        let (width, height) = frame.dimensions();
        RgbaImage::from_raw(width, height, frame.data).ok_or_else(|| {
            RecordError::Encoder(format!(
                "Frame buffer does not fit a {}x{} image",
                width, height
            ))
        })
    }
}

impl TryFrom<RgbaImage> for Frame {
    type Error = RecordError;

    fn try_from(image: RgbaImage) -> Result<Self, Self::Error> {
        let (width, height) = image.dimensions();
        Frame::new(width, height, image.into_raw())
    }
}

fn expected_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * BYTES_PER_PIXEL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_validation() {
        assert!(Frame::new(4, 2, vec![0u8; 32]).is_ok());

        let err = Frame::new(4, 2, vec![0u8; 24]).unwrap_err();
        assert!(matches!(err, RecordError::Encoder(_)));
        assert!(err.to_string().contains("expected 32 bytes, got 24"));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(Frame::new(0, 10, vec![]).is_err());
        assert!(Frame::new(10, 0, vec![]).is_err());
    }

    #[test]
    fn test_solid_frame_pixels() {
        let frame = Frame::solid(3, 2, [10, 20, 30, 255]).unwrap();
        assert_eq!(frame.data().len(), 3 * 2 * 4);
        assert!(frame.data().chunks(4).all(|px| px == [10, 20, 30, 255]));
    }

    #[test]
    fn test_image_conversion() {
        let mut image = RgbaImage::new(2, 2);
        image.put_pixel(1, 1, image::Rgba([1, 2, 3, 4]));

        let frame = Frame::try_from(image.clone()).unwrap();
        assert_eq!(frame.dimensions(), (2, 2));
        assert_eq!(&frame.data()[12..16], &[1, 2, 3, 4]);
        assert_eq!(RgbaImage::try_from(frame).unwrap(), image);
    }

    #[test]
    fn test_non_square_frame_keeps_layout() {
        let frame = Frame::solid(6, 2, [9, 8, 7, 6]).unwrap();
        let image = RgbaImage::try_from(frame).unwrap();
        assert_eq!(image.dimensions(), (6, 2));
        assert_eq!(image.get_pixel(5, 1), &image::Rgba([9, 8, 7, 6]));
    }
}
