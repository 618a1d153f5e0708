//! H.264 encoder wrapper using openh264

use openh264::encoder::{Encoder, FrameType};
use openh264::formats::YUVBuffer;

use crate::errors::RecordError;
use crate::frame::{Frame, BYTES_PER_PIXEL};

/// H.264 encoder bound to fixed frame dimensions
pub struct H264Encoder {
    encoder: Encoder,
    width: u32,
    height: u32,
    frame_count: u64,
    last_frame_was_keyframe: bool,
}

impl H264Encoder {
    /// Create a new H.264 encoder for frames of the given size
    ///
    /// openh264 infers dimensions from the YUV source at encode time, so the
    /// size is enforced here instead.
    pub fn new(width: u32, height: u32) -> Result<Self, RecordError> {
        Self::check_dimensions(width, height)?;

        let encoder = Encoder::new()
            .map_err(|e| RecordError::Encoder(format!("Failed to create encoder: {}", e)))?;

        Ok(Self {
            encoder,
            width,
            height,
            frame_count: 0,
            last_frame_was_keyframe: false,
        })
    }

    /// Check that a frame size can be encoded.
    ///
    /// Both dimensions must be non-zero and even for 4:2:0 chroma subsampling.
    pub fn check_dimensions(width: u32, height: u32) -> Result<(), RecordError> {
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(RecordError::Encoder(format!(
                "H.264 requires non-zero even dimensions, got {}x{}",
                width, height
            )));
        }
        Ok(())
    }

    /// Encode an RGBA frame, returning Annex B NAL units
    pub fn encode_frame(&mut self, frame: &Frame) -> Result<EncodedFrame, RecordError> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(RecordError::Encoder(format!(
                "Frame dimensions {}x{} don't match encoder {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }
        self.encode_rgba(frame.data())
    }

    /// Encode raw RGBA bytes
    pub fn encode_rgba(&mut self, rgba_data: &[u8]) -> Result<EncodedFrame, RecordError> {
        let expected_size = self.width as usize * self.height as usize * BYTES_PER_PIXEL;
        if rgba_data.len() != expected_size {
            return Err(RecordError::Encoder(format!(
                "Invalid frame size: expected {} bytes, got {}",
                expected_size,
                rgba_data.len()
            )));
        }

        let yuv = rgba_to_yuv420(rgba_data, self.width, self.height);
        self.encode_yuv(yuv)
    }

    fn encode_yuv(&mut self, yuv_data: Vec<u8>) -> Result<EncodedFrame, RecordError> {
        let yuv_buffer = YUVBuffer::from_vec(yuv_data, self.width as usize, self.height as usize);

        let bitstream = self
            .encoder
            .encode(&yuv_buffer)
            .map_err(|e| RecordError::Encoder(format!("Encoding failed: {}", e)))?;

        self.frame_count += 1;

        let is_keyframe = matches!(bitstream.frame_type(), FrameType::IDR | FrameType::I);
        self.last_frame_was_keyframe = is_keyframe;

        Ok(EncodedFrame {
            data: bitstream.to_vec(),
            is_keyframe,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get the number of frames encoded
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Check if the last encoded frame was a keyframe (IDR)
    pub fn last_was_keyframe(&self) -> bool {
        self.last_frame_was_keyframe
    }
}

/// Result of encoding a single frame
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// Encoded H.264 data in Annex B format (with start codes)
    pub data: Vec<u8>,
    /// Whether this frame is a keyframe (IDR/I frame)
    pub is_keyframe: bool,
}

/// Convert packed RGBA8 to planar YUV420 (BT.601, alpha ignored)
fn rgba_to_yuv420(rgba: &[u8], width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;

    let y_size = w * h;
    let uv_size = (w / 2) * (h / 2);
    let mut yuv = vec![0u8; y_size + uv_size * 2];

    let (y_plane, uv_planes) = yuv.split_at_mut(y_size);
    let (u_plane, v_plane) = uv_planes.split_at_mut(uv_size);

    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) * BYTES_PER_PIXEL;
            let r = rgba[idx] as i32;
            let g = rgba[idx + 1] as i32;
            let b = rgba[idx + 2] as i32;

            let y_val = ((66 * r + 129 * g + 25 * b + 128) >> 8) + 16;
            y_plane[y * w + x] = y_val.clamp(0, 255) as u8;

            // top-left pixel of each 2x2 block
            if y % 2 == 0 && x % 2 == 0 {
                let uv_idx = (y / 2) * (w / 2) + (x / 2);
                let u_val = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
                let v_val = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;
                u_plane[uv_idx] = u_val.clamp(0, 255) as u8;
                v_plane[uv_idx] = v_val.clamp(0, 255) as u8;
            }
        }
    }

    yuv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_to_yuv420_size() {
        let width = 640u32;
        let height = 480u32;
        let rgba = vec![128u8; (width * height * 4) as usize];

        let yuv = rgba_to_yuv420(&rgba, width, height);

        assert_eq!(yuv.len(), (width * height * 3 / 2) as usize);
    }

    #[test]
    fn test_rgba_to_yuv420_ignores_alpha() {
        let opaque = vec![200, 100, 50, 255].repeat(4);
        let clear = vec![200, 100, 50, 0].repeat(4);
        assert_eq!(rgba_to_yuv420(&opaque, 2, 2), rgba_to_yuv420(&clear, 2, 2));
    }

    #[test]
    fn test_odd_dimensions_rejected() {
        assert!(matches!(
            H264Encoder::new(641, 480),
            Err(RecordError::Encoder(_))
        ));
        assert!(H264Encoder::new(640, 0).is_err());
    }

    #[test]
    fn test_check_dimensions() {
        assert!(H264Encoder::check_dimensions(640, 480).is_ok());
        assert!(H264Encoder::check_dimensions(2, 2).is_ok());
        for (w, h) in [(0, 480), (640, 0), (641, 480), (640, 481)] {
            assert!(
                matches!(H264Encoder::check_dimensions(w, h), Err(RecordError::Encoder(_))),
                "{}x{} should be rejected",
                w,
                h
            );
        }
    }

    #[test]
    fn test_encode_frame() {
        let mut encoder = H264Encoder::new(640, 480).expect("Encoder creation failed");
        let frame = Frame::solid(640, 480, [128, 128, 128, 255]).unwrap();

        let encoded = encoder.encode_frame(&frame).expect("Encoding should succeed");
        assert!(!encoded.data.is_empty(), "Encoded data should not be empty");
        assert!(
            encoded.data.starts_with(&[0x00, 0x00, 0x00, 0x01])
                || encoded.data.starts_with(&[0x00, 0x00, 0x01]),
            "Should start with Annex B start code"
        );
        assert!(encoded.is_keyframe, "First frame should be a keyframe");
        assert_eq!(encoder.frame_count(), 1);
    }

    #[test]
    fn test_mismatched_frame_rejected() {
        let mut encoder = H264Encoder::new(320, 240).unwrap();
        let frame = Frame::solid(160, 120, [0, 0, 0, 255]).unwrap();

        let err = encoder.encode_frame(&frame).unwrap_err();
        assert!(err.to_string().contains("don't match encoder 320x240"));
        assert_eq!(encoder.frame_count(), 0);
    }
}
