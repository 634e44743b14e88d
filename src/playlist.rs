// SPDX-License-Identifier: MPL-2.0

use std::path::{Path, PathBuf};

use gifpaper_config::SamplingMethod;
use rand::seq::SliceRandom;
use walkdir::WalkDir;

use crate::error::Error;

/// Circular list of the animations in a slideshow directory.
#[derive(Debug)]
pub struct Playlist {
    dir: PathBuf,
    entries: Vec<PathBuf>,
    cursor: usize,
}

impl Playlist {
    /// Collect the regular files directly inside `dir`.
    ///
    /// # Errors
    ///
    /// Fails if `dir` is not a directory or contains no regular files.
    pub fn from_dir(dir: &Path, sampling: SamplingMethod) -> Result<Self, Error> {
        if !dir.is_dir() {
            return Err(Error::NotADirectory(dir.to_path_buf()));
        }

        let mut entries: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_file())
            .map(walkdir::DirEntry::into_path)
            .collect();

        if entries.is_empty() {
            return Err(Error::EmptyDirectory(dir.to_path_buf()));
        }

        match sampling {
            SamplingMethod::Alphanumeric => {
                entries.sort_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()));
            }
            SamplingMethod::Random => entries.shuffle(&mut rand::rng()),
        }

        tracing::debug!(dir = %dir.display(), entries = entries.len(), ?sampling, "slideshow playlist");

        Ok(Self {
            dir: dir.to_path_buf(),
            entries,
            cursor: 0,
        })
    }

    /// The entry to open next; the cursor then moves past it, wrapping around.
    pub fn next_path(&mut self) -> &Path {
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.entries.len();
        &self.entries[index]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// A single entry links to itself, so there is nothing to rotate through.
    #[must_use]
    pub fn is_single(&self) -> bool {
        self.entries.len() == 1
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[cfg(test)]
    #[must_use]
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }
}
