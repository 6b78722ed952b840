//! Modification-time polling for hot reload.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use quadshade_engine::gl::StageKind;

struct Watched {
    stage: StageKind,
    path: PathBuf,
    modified: Option<SystemTime>,
}

/// Reports stages whose file changed since the previous check.
pub struct SourceWatcher {
    files: Vec<Watched>,
    interval: Duration,
    last_check: Instant,
}

impl SourceWatcher {
    pub fn new(vertex: &Path, fragment: &Path, interval: Duration) -> Self {
        let watched = |stage, path: &Path| Watched {
            stage,
            path: path.to_path_buf(),
            modified: modified(path),
        };
        Self {
            files: vec![
                watched(StageKind::Vertex, vertex),
                watched(StageKind::Fragment, fragment),
            ],
            interval,
            last_check: Instant::now(),
        }
    }

    /// Stages whose file changed. Checks at most once per interval.
    pub fn changed(&mut self) -> Vec<(StageKind, PathBuf)> {
        if self.last_check.elapsed() < self.interval {
            return Vec::new();
        }
        self.last_check = Instant::now();

        let mut out = Vec::new();
        for file in &mut self.files {
            let now = modified(&file.path);
            // A vanished file is not a change; the next write will be.
            if now.is_some() && now != file.modified {
                file.modified = now;
                log::info!("{} changed: {}", file.stage, file.path.display());
                out.push((file.stage, file.path.clone()));
            }
        }
        out
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_only_rewritten_files() {
        let dir = std::env::temp_dir().join(format!("quadshade-watch-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let vs = dir.join("a.vert.wgsl");
        let fs = dir.join("a.frag.wgsl");
        std::fs::write(&vs, "v1").unwrap();
        std::fs::write(&fs, "f1").unwrap();

        let mut w = SourceWatcher::new(&vs, &fs, Duration::ZERO);
        assert!(w.changed().is_empty());

        // Force a distinct timestamp regardless of filesystem granularity.
        let later = SystemTime::now() + Duration::from_secs(5);
        let file = std::fs::File::options().write(true).open(&fs).unwrap();
        file.set_modified(later).unwrap();

        let changed = w.changed();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].0, StageKind::Fragment);
        assert!(w.changed().is_empty());
    }
}
