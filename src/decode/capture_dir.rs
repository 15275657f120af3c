use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};

use super::{Frame, FrameError, FrameSource};

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Frame source that watches a directory for image files, yielding each file
/// once in name order. Stands in for a live camera: a capture process drops
/// frames into the directory and the scan loop picks them up on its ticks.
pub struct CaptureDirSource {
    dir: PathBuf,
    seen: HashSet<PathBuf>,
}

impl CaptureDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seen: HashSet::new(),
        }
    }

    fn unseen_frames(&mut self) -> Result<Vec<PathBuf>, FrameError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|err| {
            // A vanished directory means the capture device side is gone.
            FrameError::Unavailable(anyhow!(
                "capture directory {} unreadable: {err}",
                self.dir.display()
            ))
        })?;

        let mut current = HashSet::new();
        for entry in entries {
            let entry = entry.map_err(|err| FrameError::Transient(err.into()))?;
            let path = entry.path();
            if has_frame_extension(&path) {
                current.insert(path);
            }
        }

        // Files the capture side rotated away no longer need tracking,
        // keeping `seen` bounded for long sessions.
        self.seen.retain(|path| current.contains(path));

        let mut paths: Vec<PathBuf> = current
            .into_iter()
            .filter(|path| !self.seen.contains(path))
            .collect();
        paths.sort();
        Ok(paths)
    }

    pub fn tracked_files(&self) -> usize {
        self.seen.len()
    }
}

fn has_frame_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for CaptureDirSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        let candidates = self.unseen_frames()?;
        let Some(path) = candidates.into_iter().next() else {
            return Ok(None);
        };

        self.seen.insert(path.clone());

        let luma = image::open(&path)
            .with_context(|| format!("failed to load frame {}", path.display()))
            .map_err(FrameError::Transient)?
            .to_luma8();

        Ok(Some(Frame {
            width: luma.width(),
            height: luma.height(),
            pixels: luma.into_raw(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma};
    use uuid::Uuid;

    use super::*;

    fn temp_capture_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rollcall-frames-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create capture dir");
        dir
    }

    fn write_frame(dir: &Path, name: &str, width: u32, height: u32) {
        let img = GrayImage::from_pixel(width, height, Luma([128u8]));
        img.save(dir.join(name)).expect("save frame");
    }

    #[test]
    fn yields_each_frame_once_in_name_order() {
        let dir = temp_capture_dir();
        write_frame(&dir, "frame-002.png", 4, 4);
        write_frame(&dir, "frame-001.png", 8, 6);

        let mut source = CaptureDirSource::new(&dir);

        let first = source.next_frame().expect("read first").expect("frame present");
        assert_eq!((first.width, first.height), (8, 6));

        let second = source.next_frame().expect("read second").expect("frame present");
        assert_eq!((second.width, second.height), (4, 4));

        assert!(source.next_frame().expect("read third").is_none());
    }

    #[test]
    fn rotated_away_files_are_dropped_from_tracking() {
        let dir = temp_capture_dir();
        write_frame(&dir, "frame-001.png", 4, 4);

        let mut source = CaptureDirSource::new(&dir);
        source.next_frame().expect("read frame").expect("frame present");
        assert_eq!(source.tracked_files(), 1);

        std::fs::remove_file(dir.join("frame-001.png")).expect("rotate frame away");
        assert!(source.next_frame().expect("read after rotation").is_none());
        assert_eq!(source.tracked_files(), 0);
    }

    #[test]
    fn ignores_non_image_files() {
        let dir = temp_capture_dir();
        std::fs::write(dir.join("notes.txt"), b"not a frame").expect("write txt");

        let mut source = CaptureDirSource::new(&dir);
        assert!(source.next_frame().expect("read").is_none());
    }

    #[test]
    fn missing_directory_is_unavailable() {
        let dir = std::env::temp_dir().join(format!("rollcall-gone-{}", Uuid::new_v4()));
        let mut source = CaptureDirSource::new(&dir);

        match source.next_frame() {
            Err(FrameError::Unavailable(_)) => {}
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[test]
    fn unreadable_image_is_transient() {
        let dir = temp_capture_dir();
        std::fs::write(dir.join("broken.png"), b"not actually a png").expect("write bad png");

        let mut source = CaptureDirSource::new(&dir);
        match source.next_frame() {
            Err(FrameError::Transient(_)) => {}
            other => panic!("expected Transient, got {other:?}"),
        }
    }
}
