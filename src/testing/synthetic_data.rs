//! Synthetic frames standing in for captured AR surfaces

use crate::errors::RecordError;
use crate::frame::Frame;

/// Edge length of frames produced by [`tagged_frame`]
pub const TAGGED_FRAME_SIZE: u32 = 4;

/// Create a synthetic RGBA frame with a gradient that shifts every frame
///
/// The moving pattern keeps the encoder producing real P-frames.
///
/// # Panics
///
/// Panics if `width` or `height` is zero. Use [`try_synthetic_frame`] for
/// sizes that come from user input.
pub fn synthetic_frame(frame_number: u64, width: u32, height: u32) -> Frame {
    try_synthetic_frame(frame_number, width, height)
        .unwrap_or_else(|e| panic!("synthetic frame: {}", e))
}

/// Fallible variant of [`synthetic_frame`]
pub fn try_synthetic_frame(
    frame_number: u64,
    width: u32,
    height: u32,
) -> Result<Frame, RecordError> {
    let mut data = vec![0u8; (width * height * 4) as usize];

    let base = (frame_number % 256) as u8;
    for y in 0..height {
        for x in 0..width {
            let idx = ((y * width + x) * 4) as usize;
            data[idx] = base.wrapping_add((x % 256) as u8);
            data[idx + 1] = base.wrapping_add((y % 256) as u8);
            data[idx + 2] = base.wrapping_add(((x + y) % 256) as u8);
            data[idx + 3] = 255;
        }
    }

    Frame::new(width, height, data)
}

/// A tiny frame carrying `tag` in its first four bytes, for ordering checks
pub fn tagged_frame(tag: u32) -> Frame {
    let mut data = vec![0u8; (TAGGED_FRAME_SIZE * TAGGED_FRAME_SIZE * 4) as usize];
    data[..4].copy_from_slice(&tag.to_le_bytes());
    Frame::new(TAGGED_FRAME_SIZE, TAGGED_FRAME_SIZE, data)
        .unwrap_or_else(|e| panic!("tagged frame: {}", e))
}

/// Read back the tag written by [`tagged_frame`]
pub fn frame_tag(frame: &Frame) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&frame.data()[..4]);
    u32::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_frame_changes_per_frame() {
        let a = synthetic_frame(0, 8, 8);
        let b = synthetic_frame(1, 8, 8);
        assert_eq!(a.dimensions(), (8, 8));
        assert_ne!(a.data(), b.data());
        assert!(a.data().chunks(4).all(|px| px[3] == 255));
    }

    #[test]
    fn test_try_synthetic_frame_rejects_zero_size() {
        assert!(matches!(
            try_synthetic_frame(0, 0, 480),
            Err(RecordError::Encoder(_))
        ));
        assert!(try_synthetic_frame(0, 640, 0).is_err());
        assert_eq!(try_synthetic_frame(3, 6, 4).unwrap(), synthetic_frame(3, 6, 4));
    }

    #[test]
    fn test_tag_round_trip() {
        assert_eq!(frame_tag(&tagged_frame(0xDEAD_BEEF)), 0xDEAD_BEEF);
    }
}
