use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    foundation::error::{BirdviewError, BirdviewResult},
    source::{FrameSource, SourceFrame, SourceInfo, SourceKind},
};

/// Extensions (lower-case, without the dot) accepted as still images.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Regular files in `dir` with an accepted image extension, sorted by path.
///
/// The extension match is case-insensitive. Sub-directories are not descended into.
pub fn list_image_files(dir: &Path) -> BirdviewResult<Vec<PathBuf>> {
    scan_image_files(dir).map(|scan| scan.files)
}

#[derive(Debug, Default)]
pub(crate) struct ImageScan {
    pub(crate) files: Vec<PathBuf>,
    /// One message per entry `read_dir` failed to yield.
    pub(crate) unreadable: Vec<String>,
}

pub(crate) fn scan_image_files(dir: &Path) -> BirdviewResult<ImageScan> {
    let rd = std::fs::read_dir(dir)
        .with_context(|| format!("read image directory '{}'", dir.display()))
        .map_err(|e| BirdviewError::frame_source(format!("{e:#}")))?;
    Ok(collect_image_entries(rd))
}

pub(crate) fn collect_image_entries(
    entries: impl IntoIterator<Item = std::io::Result<std::fs::DirEntry>>,
) -> ImageScan {
    let mut scan = ImageScan::default();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                scan.unreadable.push(e.to_string());
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            scan.files.push(path);
        }
    }
    scan.files.sort();
    scan
}

/// Still images from one directory, decoded lazily in path order.
#[derive(Debug)]
pub struct ImageDirectorySource {
    info: SourceInfo,
    files: std::vec::IntoIter<PathBuf>,
}

impl ImageDirectorySource {
    /// Enumerate `dir`; finding no image files is an error.
    pub fn open(dir: &Path, fps: f64) -> BirdviewResult<Self> {
        let ImageScan { files, unreadable } = scan_image_files(dir)?;
        if files.is_empty() {
            return Err(BirdviewError::frame_source(format!(
                "no valid image files found in directory: {}",
                dir.display()
            )));
        }
        Ok(Self {
            info: SourceInfo {
                kind: SourceKind::ImageSequence,
                description: dir.display().to_string(),
                nominal_fps: Some(fps),
                total_frames: Some(files.len() as u64),
                native_size: None,
                unreadable_entries: unreadable,
            },
            files: files.into_iter(),
        })
    }

    /// Paths not yet pulled, in order.
    pub fn remaining(&self) -> &[PathBuf] {
        self.files.as_slice()
    }
}

impl FrameSource for ImageDirectorySource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn next_frame(&mut self) -> Option<BirdviewResult<SourceFrame>> {
        let path = self.files.next()?;
        let label = path.display().to_string();
        Some(
            image::open(&path)
                .map(|img| SourceFrame {
                    frame: img.to_rgb8(),
                    label: label.clone(),
                })
                .map_err(|e| BirdviewError::decode(format!("failed to read image {label}: {e}"))),
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/directory.rs"]
mod tests;
