use std::sync::Arc;
use std::thread;

use crate::error::FetchError;

use super::{LoadReply, SourceFetcher, SourceLoader};

/// Runs every fetch on its own short-lived worker thread.
///
/// Superseded loads are not interrupted; their completions are discarded by
/// the pipeline's generation check.
pub struct ThreadedLoader<F> {
    fetcher: Arc<F>,
}

impl<F: SourceFetcher> ThreadedLoader<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }
}

impl<F: SourceFetcher> SourceLoader for ThreadedLoader<F> {
    fn load(&mut self, reply: LoadReply) {
        let fetcher = Arc::clone(&self.fetcher);
        let name = format!("quadshade-load-{}", reply.request().stage);
        let fallback = reply.duplicate();

        let spawned = thread::Builder::new().name(name).spawn(move || {
            let result = fetcher.fetch(&reply.request().location);
            reply.deliver(result);
        });

        // A failed spawn drops the closure together with the original reply.
        if let Err(e) = spawned {
            let location = fallback.request().location.clone();
            log::error!("failed to spawn loader thread for `{location}`: {e}");
            fallback.deliver(Err(FetchError::Aborted {
                location,
                reason: e.to_string(),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::gl::StageKind;
    use crate::loader::{LoadRequest, SourceLocation};

    #[test]
    fn completes_on_worker_thread() {
        let (tx, rx) = mpsc::channel();
        let mut loader =
            ThreadedLoader::new(|loc: &SourceLocation| -> Result<String, FetchError> {
                Ok(format!("src of {loc}"))
            });

        loader.load(LoadReply::new(
            LoadRequest {
                stage: StageKind::Fragment,
                generation: 7,
                location: "a.wgsl".into(),
            },
            tx,
        ));

        let done = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(done.stage, StageKind::Fragment);
        assert_eq!(done.generation, 7);
        assert_eq!(done.result.unwrap(), "src of a.wgsl");
    }
}
