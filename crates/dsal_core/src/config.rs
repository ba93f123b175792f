//! Store configuration.

use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default upper bound on the bytes moved by one backend call (1 MiB).
pub const DEFAULT_MAX_IO_SIZE: usize = 1024 * 1024;

/// Default block size of the bundled backends.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Kind of bundled backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// [`dsal_storage::InMemoryBackend`].
    Memory,
    /// [`dsal_storage::FileBackend`].
    File,
}

impl BackendKind {
    /// Returns the configuration name of this kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            other => Err(CoreError::invalid_argument(format!(
                "unknown backend {other:?}"
            ))),
        }
    }
}

/// Backend selection and its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// Ephemeral in-memory objects.
    Memory {
        /// Block size in bytes.
        block_size: usize,
    },
    /// One file per block under `root`.
    File {
        /// Root directory of the backend.
        root: PathBuf,
        /// Block size in bytes.
        block_size: usize,
    },
}

impl BackendConfig {
    /// Returns the kind of backend.
    #[must_use]
    pub const fn kind(&self) -> BackendKind {
        match self {
            Self::Memory { .. } => BackendKind::Memory,
            Self::File { .. } => BackendKind::File,
        }
    }

    /// Returns the configured block size.
    #[must_use]
    pub const fn block_size(&self) -> usize {
        match self {
            Self::Memory { block_size } | Self::File { block_size, .. } => *block_size,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::Memory {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

/// Configuration for opening a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Backend to open.
    pub backend: BackendConfig,

    /// Upper bound on the bytes moved by one backend call.
    ///
    /// Bounds the zero-fill chunks of a shrink and the staging buffer of an
    /// unaligned write.
    pub max_io_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            max_io_size: DEFAULT_MAX_IO_SIZE,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an in-memory backend with the given block size.
    #[must_use]
    pub fn memory(mut self, block_size: usize) -> Self {
        self.backend = BackendConfig::Memory { block_size };
        self
    }

    /// Uses a file backend rooted at `root`.
    #[must_use]
    pub fn file(mut self, root: impl Into<PathBuf>, block_size: usize) -> Self {
        self.backend = BackendConfig::File {
            root: root.into(),
            block_size,
        };
        self
    }

    /// Sets the maximum bytes per backend call.
    #[must_use]
    pub const fn max_io_size(mut self, size: usize) -> Self {
        self.max_io_size = size;
        self
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] for a zero block size or a zero
    /// maximum I/O size.
    pub fn validate(&self) -> CoreResult<()> {
        if self.backend.block_size() == 0 {
            return Err(CoreError::invalid_argument("block size must be positive"));
        }
        if self.max_io_size == 0 {
            return Err(CoreError::invalid_argument("max I/O size must be positive"));
        }
        Ok(())
    }
}
