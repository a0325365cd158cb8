//! Storage root: where overflow files live and how much room is left there.

use std::io;
use std::path::{Path, PathBuf};

/// Directory backing a document's overflow files.
pub trait StorageRoot: Send + Sync {
    /// Directory overflow files are created in.
    fn location(&self) -> &Path;

    /// Free bytes on the volume holding [`location`](Self::location).
    fn free_space(&self) -> io::Result<u64>;
}

/// A directory on a real volume.
#[derive(Clone, Debug)]
pub struct VolumeRoot {
    path: PathBuf,
}

impl VolumeRoot {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The system temporary directory.
    pub fn temp() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl StorageRoot for VolumeRoot {
    fn location(&self) -> &Path {
        &self.path
    }

    fn free_space(&self) -> io::Result<u64> {
        fs2::available_space(&self.path)
    }
}
