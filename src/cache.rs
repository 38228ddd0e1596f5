use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_CACHE_PATH: &str = "~/.awssaml_cache.cfg";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No cached assertion at {}", .0.display())]
    NotFound(PathBuf),
    #[error("Cache I/O error at {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Expands a leading `~/` to the current user's home directory.
/// Any other path is returned untouched.
pub fn resolve_cache_path(raw: &Path) -> PathBuf {
    raw.to_str()
        .and_then(|path| path.strip_prefix("~/"))
        .zip(home::home_dir())
        .map_or_else(|| raw.to_path_buf(), |(rest, home_dir)| home_dir.join(rest))
}

/// Keeps the raw encoded assertion on disk between invocations.
/// The file holds exactly the encoded text, nothing else.
pub struct CacheManager {
    cache_path: PathBuf,
}

impl CacheManager {
    pub fn new(raw_path: &Path) -> Self {
        CacheManager {
            cache_path: resolve_cache_path(raw_path),
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Returns the cached content as is. Validity is the caller's concern.
    pub fn read(&self) -> Result<String, Error> {
        debug!("Reading cached assertion from {}", self.cache_path.display());
        fs::read_to_string(&self.cache_path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => Error::NotFound(self.cache_path.clone()),
            _ => Error::Io {
                path: self.cache_path.clone(),
                source,
            },
        })
    }

    /// Overwrites the cache with owner-only permissions. Not atomic.
    pub fn write(&self, assertion: &str) -> Result<(), Error> {
        debug!("Caching assertion at {}", self.cache_path.display());
        let io_err = |source| Error::Io {
            path: self.cache_path.clone(),
            source,
        };

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.cache_path).map_err(io_err)?;
        file.write_all(assertion.as_bytes()).map_err(io_err)?;

        // mode() only applies on creation, tighten files left by older runs
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.cache_path, fs::Permissions::from_mode(0o600))
                .map_err(io_err)?;
        }
        Ok(())
    }
}
