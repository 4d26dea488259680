//! Frame sources.
//!
//! A source is a single forward cursor over timestamped frames. It can be
//! positioned once with [`FrameSource::seek_ms`] and is then read
//! sequentially; `None` from [`FrameSource::read`] means end of stream.

use std::path::{Path, PathBuf};

use image::RgbImage;

/// Sequential, seekable frame cursor.
pub trait FrameSource {
    /// Position the cursor at the first frame at or after `ms`.
    fn seek_ms(&mut self, ms: f64);

    /// Read the next frame; `None` at end of stream or on a read failure.
    fn read(&mut self) -> Option<RgbImage>;

    /// Timestamp (ms) of the most recently read frame.
    fn position_ms(&self) -> f64;
}

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn check_frame_rate(fps: f64) -> std::io::Result<()> {
    if fps.is_finite() && fps > 0.0 {
        Ok(())
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("frame rate must be finite and > 0, got {}", fps),
        ))
    }
}

/// Directory of still frames named so that lexical order is time order
/// (e.g. `frame_000123.png`), played back at a fixed frame rate.
#[derive(Debug, Clone)]
pub struct ImageSequenceSource {
    frames: Vec<PathBuf>,
    fps: f64,
    next: usize,
    last_ms: f64,
}

impl ImageSequenceSource {
    /// Index the frame files of `dir`.
    pub fn open(dir: &Path, fps: f64) -> std::io::Result<Self> {
        check_frame_rate(fps)?;
        let mut frames = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && is_frame_file(&path) {
                frames.push(path);
            }
        }
        frames.sort();
        tracing::info!("{} frames indexed in {}", frames.len(), dir.display());
        Self::from_paths(frames, fps)
    }

    /// Use an explicit, already ordered list of frame files.
    pub fn from_paths(frames: Vec<PathBuf>, fps: f64) -> std::io::Result<Self> {
        check_frame_rate(fps)?;
        Ok(Self {
            frames,
            fps,
            next: 0,
            last_ms: 0.0,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_ms(&self, index: usize) -> f64 {
        index as f64 * 1000.0 / self.fps
    }
}

impl FrameSource for ImageSequenceSource {
    fn seek_ms(&mut self, ms: f64) {
        let index = (ms.max(0.0) * self.fps / 1000.0 - 1e-9).ceil().max(0.0) as usize;
        self.next = index.min(self.frames.len());
    }

    fn read(&mut self) -> Option<RgbImage> {
        let path = self.frames.get(self.next)?;
        match image::open(path) {
            Ok(img) => {
                self.last_ms = self.frame_ms(self.next);
                self.next += 1;
                Some(img.to_rgb8())
            }
            Err(e) => {
                tracing::warn!("failed to decode {}: {}; ending stream", path.display(), e);
                self.next = self.frames.len();
                None
            }
        }
    }

    fn position_ms(&self) -> f64 {
        self.last_ms
    }
}

/// In-memory frames with explicit timestamps.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    frames: Vec<(f64, RgbImage)>,
    next: usize,
    last_ms: f64,
}

impl MemorySource {
    pub fn new(frames: Vec<(f64, RgbImage)>) -> Self {
        Self {
            frames,
            next: 0,
            last_ms: 0.0,
        }
    }
}

impl FrameSource for MemorySource {
    fn seek_ms(&mut self, ms: f64) {
        self.next = self
            .frames
            .iter()
            .position(|(t, _)| *t >= ms)
            .unwrap_or(self.frames.len());
    }

    fn read(&mut self) -> Option<RgbImage> {
        let (t, frame) = self.frames.get(self.next)?;
        self.last_ms = *t;
        self.next += 1;
        Some(frame.clone())
    }

    fn position_ms(&self) -> f64 {
        self.last_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::temp_dir;

    #[test]
    fn memory_source_reads_in_order_and_seeks() {
        let frames = (0..5)
            .map(|i| (i as f64 * 100.0, RgbImage::new(2, 2)))
            .collect();
        let mut src = MemorySource::new(frames);
        src.seek_ms(150.0);
        assert!(src.read().is_some());
        assert_eq!(src.position_ms(), 200.0);
        assert!(src.read().is_some());
        assert!(src.read().is_some());
        assert!(src.read().is_none());
    }

    #[test]
    fn image_sequence_uses_frame_rate_for_timestamps() {
        let dir = temp_dir("sequence");
        std::fs::create_dir_all(&dir).expect("mkdir");
        for i in 0..4 {
            RgbImage::new(4, 3)
                .save(dir.join(format!("frame_{:03}.png", i)))
                .expect("save frame");
        }
        std::fs::write(dir.join("notes.txt"), "not a frame").expect("write");

        let mut src = ImageSequenceSource::open(&dir, 20.0).expect("open");
        assert_eq!(src.len(), 4);
        src.seek_ms(100.0);
        let frame = src.read().expect("frame 2");
        assert_eq!(frame.dimensions(), (4, 3));
        assert_eq!(src.position_ms(), 100.0);
        assert!(src.read().is_some());
        assert_eq!(src.position_ms(), 150.0);
        assert!(src.read().is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unreadable_frame_ends_the_stream() {
        let dir = temp_dir("corrupt");
        std::fs::create_dir_all(&dir).expect("mkdir");
        std::fs::write(dir.join("frame_000.png"), b"garbage").expect("write");
        let mut src = ImageSequenceSource::open(&dir, 30.0).expect("open");
        assert!(src.read().is_none());
        assert!(src.read().is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn invalid_frame_rate_is_rejected() {
        let dir = std::env::temp_dir();
        assert!(ImageSequenceSource::open(&dir, 0.0).is_err());
        for fps in [0.0, -30.0, f64::NAN, f64::INFINITY] {
            let err = ImageSequenceSource::from_paths(vec![dir.join("frame_000.png")], fps)
                .expect_err("bad frame rate");
            assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
        }
        assert!(ImageSequenceSource::from_paths(Vec::new(), 30.0).is_ok());
    }
}
