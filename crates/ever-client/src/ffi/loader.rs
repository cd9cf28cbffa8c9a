//! Engine library loading
//!
//! Locates the ton_client shared library using platform naming conventions
//! and a list of search directories, then opens it with `libloading`.

use libloading::Library;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default engine library name, without platform prefix or extension
pub const ENGINE_LIBRARY: &str = "ton_client";

/// Environment variable naming an extra directory to search first
pub const LIBRARY_DIR_ENV: &str = "EVER_CLIENT_LIB_DIR";

/// Library loading errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Library not found: {0}")]
    LibraryNotFound(String),

    #[error("Symbol '{symbol}' not found in library '{library}'")]
    SymbolNotFound { library: String, symbol: String },

    #[error("Failed to load library: {0}")]
    LoadFailed(String),
}

/// Resolves and opens the engine library
///
/// # Safety
///
/// Opening a library runs its initialization code in this process. Only point
/// the loader at engine builds you trust.
#[derive(Debug, Clone)]
pub struct LibraryLoader {
    search_paths: Vec<PathBuf>,
}

impl LibraryLoader {
    /// Create a loader with default search paths
    pub fn new() -> Self {
        Self {
            search_paths: Self::default_search_paths(),
        }
    }

    /// Search order: `$EVER_CLIENT_LIB_DIR`, the working directory, then the
    /// platform's standard library directories.
    fn default_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(dir) = std::env::var_os(LIBRARY_DIR_ENV) {
            paths.push(PathBuf::from(dir));
        }

        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }

        #[cfg(target_os = "linux")]
        {
            paths.push(PathBuf::from("/usr/lib"));
            paths.push(PathBuf::from("/usr/local/lib"));
            paths.push(PathBuf::from("/lib"));

            if cfg!(target_pointer_width = "64") {
                paths.push(PathBuf::from("/usr/lib64"));
                paths.push(PathBuf::from("/lib64"));
            }
        }

        #[cfg(target_os = "macos")]
        {
            paths.push(PathBuf::from("/usr/lib"));
            paths.push(PathBuf::from("/usr/local/lib"));
            paths.push(PathBuf::from("/opt/homebrew/lib"));
        }

        #[cfg(target_os = "windows")]
        {
            if let Ok(system_root) = std::env::var("SystemRoot") {
                paths.push(PathBuf::from(format!("{}\\System32", system_root)));
            }
        }

        paths
    }

    /// Candidate file names for a library name on this platform
    fn file_names(name: &str) -> Vec<String> {
        let extensions: &[&str] = if cfg!(target_os = "windows") {
            &["dll"]
        } else if cfg!(target_os = "macos") {
            &["dylib", "so"]
        } else {
            &["so"]
        };

        let prefixes: &[&str] = if cfg!(target_os = "windows") {
            &["", "lib"]
        } else {
            &["lib", ""]
        };

        prefixes
            .iter()
            .flat_map(|prefix| {
                extensions
                    .iter()
                    .map(move |ext| format!("{}{}.{}", prefix, name, ext))
            })
            .collect()
    }

    /// Resolve a library name or path to an existing file
    pub fn resolve_library_path(&self, name: &str) -> Option<PathBuf> {
        let path = Path::new(name);
        if path.is_absolute() {
            return path.exists().then(|| path.to_path_buf());
        }

        let file_names = Self::file_names(name);
        self.search_paths.iter().find_map(|dir| {
            file_names
                .iter()
                .map(|file| dir.join(file))
                .find(|candidate| candidate.exists())
        })
    }

    /// Open a library by short name (`ton_client`) or absolute path
    pub fn open(&self, name: &str) -> Result<Library, LoadError> {
        let path = self
            .resolve_library_path(name)
            .ok_or_else(|| LoadError::LibraryNotFound(name.to_string()))?;

        tracing::debug!(path = %path.display(), "loading engine library");

        unsafe { Library::new(&path) }.map_err(|e| LoadError::LoadFailed(e.to_string()))
    }

    /// Add a custom search path (searched before all others)
    pub fn add_search_path(&mut self, path: PathBuf) {
        self.search_paths.insert(0, path);
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }
}

impl Default for LibraryLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_search_paths_include_cwd() {
        let loader = LibraryLoader::new();

        if let Ok(cwd) = std::env::current_dir() {
            assert!(loader.search_paths().contains(&cwd));
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_linux_file_names() {
        assert_eq!(
            LibraryLoader::file_names("ton_client"),
            vec!["libton_client.so".to_string(), "ton_client.so".to_string()]
        );
    }

    #[test]
    fn test_library_not_found() {
        let loader = LibraryLoader::new();
        let result = loader.open("nonexistent_engine_xyz");
        assert!(matches!(result, Err(LoadError::LibraryNotFound(_))));
    }

    #[test]
    fn test_missing_absolute_path_not_resolved() {
        let loader = LibraryLoader::new();
        assert!(loader
            .resolve_library_path("/definitely/not/here/libton_client.so")
            .is_none());
    }

    #[test]
    fn test_add_custom_search_path() {
        let mut loader = LibraryLoader::new();
        let custom_path = PathBuf::from("/custom/path");
        loader.add_search_path(custom_path.clone());

        assert_eq!(loader.search_paths()[0], custom_path);
    }
}
