//! Camera abstraction and the directory-replay frame source

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::capture::frame::Frame;

/// A source of live frames.
///
/// `Ok(None)` signals a clean end of stream; `Err` is a read failure.
/// Both stop the capture session.
pub trait Camera {
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Image file extensions accepted as frames
const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Replays image files from a directory in sorted order.
///
/// This is the integration seam for a real camera: any device wrapper that
/// yields RGBA frames can stand in behind the [`Camera`] trait, and this
/// source makes the pipeline drivable from recorded footage.
pub struct ImageSequenceCamera {
    paths: Vec<PathBuf>,
    index: usize,
}

impl ImageSequenceCamera {
    /// Scan a directory for frame images
    pub fn new(dir: &Path) -> Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read frame directory {:?}", dir))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        info!("Found {} frame images in {:?}", paths.len(), dir);

        Ok(Self { paths, index: 0 })
    }

    /// Number of frames remaining in the sequence
    pub fn remaining(&self) -> usize {
        self.paths.len().saturating_sub(self.index)
    }
}

impl Camera for ImageSequenceCamera {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.paths.get(self.index) else {
            return Ok(None);
        };
        self.index += 1;

        debug!("Loading frame {:?}", path);
        let img = image::open(path)
            .with_context(|| format!("Failed to load frame image {:?}", path))?
            .to_rgba8();
        let (width, height) = img.dimensions();

        Ok(Some(Frame::new(img.into_raw(), width, height)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn test_empty_directory_ends_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = ImageSequenceCamera::new(dir.path()).unwrap();

        assert_eq!(camera.remaining(), 0);
        assert!(camera.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_frames_replayed_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();

        // Write two distinguishable 2x2 frames out of name order
        let mut second = RgbaImage::new(2, 2);
        second.put_pixel(0, 0, image::Rgba([200, 0, 0, 255]));
        second.save(dir.path().join("frame_02.png")).unwrap();

        let mut first = RgbaImage::new(2, 2);
        first.put_pixel(0, 0, image::Rgba([100, 0, 0, 255]));
        first.save(dir.path().join("frame_01.png")).unwrap();

        let mut camera = ImageSequenceCamera::new(dir.path()).unwrap();
        assert_eq!(camera.remaining(), 2);

        let frame = camera.next_frame().unwrap().unwrap();
        assert_eq!(frame.data[0], 100);

        let frame = camera.next_frame().unwrap().unwrap();
        assert_eq!(frame.data[0], 200);

        assert!(camera.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_non_image_files_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let camera = ImageSequenceCamera::new(dir.path()).unwrap();
        assert_eq!(camera.remaining(), 0);
    }
}
