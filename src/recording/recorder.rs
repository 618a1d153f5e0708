//! MP4 sink combining the H.264 encoder and the muxide muxer

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use muxide::api::{Metadata, Muxer, MuxerBuilder, VideoCodec};

use super::encoder::H264Encoder;
use super::sink::VideoSink;
use super::stats::SinkSummary;
use crate::config::RecorderConfig;
use crate::errors::RecordError;
use crate::frame::Frame;

/// Container settings taken from [`RecorderConfig`]
#[derive(Debug, Clone)]
pub struct Mp4Settings {
    pub fps: f64,
    pub fast_start: bool,
    pub title: Option<String>,
}

impl From<&RecorderConfig> for Mp4Settings {
    fn from(config: &RecorderConfig) -> Self {
        Self {
            fps: config.fps,
            fast_start: config.fast_start,
            title: config.title.clone(),
        }
    }
}

enum Output {
    /// File is open; encoder and muxer wait for the first frame's dimensions
    Pending(BufWriter<File>),
    Muxing {
        encoder: H264Encoder,
        muxer: Muxer<BufWriter<File>>,
    },
    Finalized,
}

/// Writes frames as H.264 into an MP4 file.
///
/// The file is created up front so path problems surface when recording
/// starts. The encoder is sized from the first frame; later frames must
/// match it.
pub struct Mp4Recorder {
    output: Output,
    settings: Mp4Settings,
    output_path: PathBuf,
    frame_count: u64,
}

impl Mp4Recorder {
    /// Create the output file, and any missing parent directories
    pub fn create<P: AsRef<Path>>(
        output_path: P,
        settings: Mp4Settings,
    ) -> Result<Self, RecordError> {
        let output_path = output_path.as_ref().to_path_buf();

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                RecordError::Io(format!("Failed to create output directory {:?}: {}", parent, e))
            })?;
        }

        let file = File::create(&output_path).map_err(|e| {
            RecordError::Io(format!("Failed to create output file {:?}: {}", output_path, e))
        })?;

        log::debug!("Opened recording output {:?}", output_path);

        Ok(Self {
            output: Output::Pending(BufWriter::new(file)),
            settings,
            output_path,
            frame_count: 0,
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn start_muxing(&mut self, width: u32, height: u32) -> Result<(), RecordError> {
        // Built before the writer is moved so a bad size leaves the file pending.
        let encoder = H264Encoder::new(width, height)?;

        let writer = match std::mem::replace(&mut self.output, Output::Finalized) {
            Output::Pending(writer) => writer,
            other => {
                self.output = other;
                return Ok(());
            }
        };

        let mut metadata = Metadata::new().with_current_time();
        if let Some(ref title) = self.settings.title {
            metadata = metadata.with_title(title);
        }

        // On failure the writer is dropped with the builder, closing the file.
        let muxer = MuxerBuilder::new(writer)
            .video(VideoCodec::H264, width, height, self.settings.fps)
            .with_fast_start(self.settings.fast_start)
            .with_metadata(metadata)
            .build()
            .map_err(|e| RecordError::Io(format!("Failed to create muxer: {}", e)))?;

        log::debug!("Muxer ready for {}x{} @ {} fps", width, height, self.settings.fps);
        self.output = Output::Muxing { encoder, muxer };
        Ok(())
    }
}

impl VideoSink for Mp4Recorder {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), RecordError> {
        if matches!(self.output, Output::Pending(_)) {
            self.start_muxing(frame.width(), frame.height())?;
        }

        let (encoder, muxer) = match &mut self.output {
            Output::Muxing { encoder, muxer } => (encoder, muxer),
            Output::Pending(_) | Output::Finalized => {
                return Err(RecordError::Protocol(
                    "Frame written after the recording was finalized".into(),
                ))
            }
        };

        let encoded = encoder.encode_frame(frame)?;
        if encoded.data.is_empty() {
            return Err(RecordError::Encoder("Encoder produced no data for frame".into()));
        }

        let pts = self.frame_count as f64 / self.settings.fps;
        muxer
            .write_video(pts, &encoded.data, encoded.is_keyframe)
            .map_err(|e| RecordError::Io(format!("Failed to write frame: {}", e)))?;

        self.frame_count += 1;
        Ok(())
    }

    fn finalize(&mut self) -> Result<Option<SinkSummary>, RecordError> {
        match std::mem::replace(&mut self.output, Output::Finalized) {
            Output::Finalized => Ok(None),
            Output::Pending(mut writer) => {
                // No frames arrived: leave an empty file behind.
                writer
                    .flush()
                    .map_err(|e| RecordError::Io(format!("Failed to flush output: {}", e)))?;
                Ok(Some(SinkSummary::default()))
            }
            Output::Muxing { muxer, .. } => {
                let stats = muxer
                    .finish_with_stats()
                    .map_err(|e| RecordError::Io(format!("Failed to finalize recording: {}", e)))?;
                Ok(Some(SinkSummary {
                    frames_written: stats.video_frames,
                    bytes_written: stats.bytes_written,
                    duration_secs: stats.duration_secs,
                }))
            }
        }
    }

    fn is_finalized(&self) -> bool {
        matches!(self.output, Output::Finalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::synthetic_frame;

    fn settings() -> Mp4Settings {
        Mp4Settings::from(&RecorderConfig::default())
    }

    #[test]
    fn test_create_makes_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("a").join("b").join("out.mp4");

        let recorder = Mp4Recorder::create(&output, settings()).expect("create");
        assert!(output.exists());
        assert_eq!(recorder.output_path(), output.as_path());
    }

    #[test]
    fn test_record_frames() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("frames.mp4");
        let mut recorder = Mp4Recorder::create(&output, settings()).unwrap();

        for i in 0..25 {
            recorder
                .write_frame(&synthetic_frame(i, 320, 240))
                .expect("Frame write should succeed");
        }

        let summary = recorder.finalize().unwrap().expect("first finalize");
        assert_eq!(summary.frames_written, 25);
        assert!(summary.bytes_written > 0);
        assert!(summary.duration_secs > 0.0);
        assert!(std::fs::metadata(&output).unwrap().len() > 0);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Mp4Recorder::create(dir.path().join("twice.mp4"), settings()).unwrap();
        recorder.write_frame(&synthetic_frame(0, 160, 120)).unwrap();

        assert!(recorder.finalize().unwrap().is_some());
        assert!(recorder.is_finalized());
        assert_eq!(recorder.finalize().unwrap(), None);
    }

    #[test]
    fn test_write_after_finalize_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Mp4Recorder::create(dir.path().join("late.mp4"), settings()).unwrap();
        recorder.finalize().unwrap();

        let err = recorder.write_frame(&synthetic_frame(0, 160, 120)).unwrap_err();
        assert!(matches!(err, RecordError::Protocol(_)));
    }

    #[test]
    fn test_mismatched_frame_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Mp4Recorder::create(dir.path().join("mixed.mp4"), settings()).unwrap();

        recorder.write_frame(&synthetic_frame(0, 320, 240)).unwrap();
        let err = recorder.write_frame(&synthetic_frame(1, 160, 120)).unwrap_err();
        assert!(matches!(err, RecordError::Encoder(_)));
        recorder.write_frame(&synthetic_frame(2, 320, 240)).unwrap();

        assert_eq!(recorder.finalize().unwrap().unwrap().frames_written, 2);
    }

    #[test]
    fn test_odd_first_frame_keeps_file_pending() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = Mp4Recorder::create(dir.path().join("odd.mp4"), settings()).unwrap();

        let odd = Frame::solid(15, 15, [0, 0, 0, 255]).unwrap();
        assert!(matches!(recorder.write_frame(&odd), Err(RecordError::Encoder(_))));
        recorder.write_frame(&synthetic_frame(0, 160, 120)).unwrap();

        assert_eq!(recorder.frame_count(), 1);
    }
}
