//! Frame discovery.
//!
//! The generator writes `Image0.bmp`, `Image1.bmp`, … into its frame
//! directory. [`FrameSequence::discover`] counts the files that match the
//! pattern and then rebuilds the ordered list by formatting each index
//! into a file name. Directory listing order is never trusted, and a
//! lexicographic sort would put `Image10` before `Image2`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::ReelError;

/// File name pattern `<prefix><index>.<extension>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePattern {
    /// Text before the index, e.g. `Image`.
    pub prefix: String,
    /// Extension without the dot, e.g. `bmp`.
    pub extension: String,
}

impl Default for FramePattern {
    fn default() -> Self {
        Self {
            prefix: "Image".to_string(),
            extension: "bmp".to_string(),
        }
    }
}

impl FramePattern {
    /// Create a pattern from a prefix and an extension.
    pub fn new<P: Into<String>, E: Into<String>>(prefix: P, extension: E) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    /// File name for `index`.
    pub fn file_name(&self, index: usize) -> String {
        format!("{}{index}.{}", self.prefix, self.extension)
    }

    /// Parse the index out of a file name, if it matches the pattern.
    ///
    /// The extension is compared case-insensitively; the index must be
    /// plain ASCII digits.
    pub fn index_of(&self, file_name: &str) -> Option<usize> {
        let rest = file_name.strip_prefix(&self.prefix)?;
        let (digits, extension) = rest.rsplit_once('.')?;
        if !extension.eq_ignore_ascii_case(&self.extension) {
            return None;
        }
        if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

/// Ordered frame paths for indices `0..len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSequence {
    directory: PathBuf,
    paths: Vec<PathBuf>,
}

impl FrameSequence {
    /// Discover the frames in `directory`.
    ///
    /// # Errors
    ///
    /// - [`ReelError::EmptyInput`] if the directory does not exist or holds
    ///   no file matching `pattern`.
    /// - [`ReelError::MissingFrame`] if an index below the match count has
    ///   no file, i.e. the sequence has a hole.
    /// - [`ReelError::Io`] if the directory cannot be listed.
    pub fn discover(directory: &Path, pattern: &FramePattern) -> Result<Self, ReelError> {
        if !directory.is_dir() {
            return Err(ReelError::EmptyInput {
                directory: directory.to_path_buf(),
                reason: "directory does not exist".to_string(),
            });
        }

        let mut count = 0_usize;
        for entry in fs::read_dir(directory)? {
            let entry = entry?;
            let name = entry.file_name();
            let matches = name
                .to_str()
                .and_then(|name| pattern.index_of(name))
                .is_some();
            if matches && entry.file_type()?.is_file() {
                count += 1;
            }
        }

        if count == 0 {
            return Err(ReelError::EmptyInput {
                directory: directory.to_path_buf(),
                reason: format!("no files named {}<N>.{}", pattern.prefix, pattern.extension),
            });
        }

        let mut paths = Vec::with_capacity(count);
        for index in 0..count {
            let path = directory.join(pattern.file_name(index));
            if !path.is_file() {
                return Err(ReelError::MissingFrame { index, path });
            }
            paths.push(path);
        }

        log::debug!("Discovered {count} frame(s) in {}", directory.display());

        Ok(Self {
            directory: directory.to_path_buf(),
            paths,
        })
    }

    /// Directory the frames live in.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Frame paths in index order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Always `false`; discovery never yields an empty sequence.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
