use std::path::{Path, PathBuf};

use crate::error::FetchError;

use super::SourceLocation;

/// Blocking source text retrieval. Runs on a loader thread.
pub trait SourceFetcher: Send + Sync + 'static {
    fn fetch(&self, location: &SourceLocation) -> Result<String, FetchError>;
}

impl<F> SourceFetcher for F
where
    F: Fn(&SourceLocation) -> Result<String, FetchError> + Send + Sync + 'static,
{
    fn fetch(&self, location: &SourceLocation) -> Result<String, FetchError> {
        self(location)
    }
}

/// Reads UTF-8 files from disk.
///
/// Relative locations resolve against `root` when one is set, otherwise
/// against the process working directory. A leading `file://` is stripped.
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    root: Option<PathBuf>,
}

impl FileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Filesystem path a location maps to.
    pub fn resolve(&self, location: &SourceLocation) -> PathBuf {
        let raw = location.as_str().trim();
        let raw = raw.strip_prefix("file://").unwrap_or(raw);
        let path = Path::new(raw);

        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl SourceFetcher for FileFetcher {
    fn fetch(&self, location: &SourceLocation) -> Result<String, FetchError> {
        if location.is_empty() {
            return Err(FetchError::EmptyLocation);
        }

        let path = self.resolve(location);
        std::fs::read_to_string(&path).map_err(|source| FetchError::Io {
            location: location.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("quadshade-fetch-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn resolve_strips_file_scheme_and_joins_root() {
        let f = FileFetcher::with_root("/srv/shaders");
        assert_eq!(
            f.resolve(&"file://quad.vert.wgsl".into()),
            PathBuf::from("/srv/shaders/quad.vert.wgsl")
        );
        assert_eq!(f.resolve(&"/abs/x.wgsl".into()), PathBuf::from("/abs/x.wgsl"));
    }

    #[test]
    fn reads_existing_file() {
        let dir = scratch_dir("read");
        std::fs::write(dir.join("a.wgsl"), "// hello").unwrap();

        let f = FileFetcher::with_root(&dir);
        assert_eq!(f.fetch(&"a.wgsl".into()).unwrap(), "// hello");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = scratch_dir("missing");
        let err = FileFetcher::with_root(&dir).fetch(&"nope.wgsl".into()).unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }), "{err}");
    }

    #[test]
    fn empty_location_is_rejected() {
        let err = FileFetcher::new().fetch(&"  ".into()).unwrap_err();
        assert!(matches!(err, FetchError::EmptyLocation));
    }
}
