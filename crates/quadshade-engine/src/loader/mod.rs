//! Asynchronous shader source loading.
//!
//! The pipeline issues one [`LoadRequest`] per location change and hands the
//! loader a [`LoadReply`]. The loader may complete it from any thread; the
//! completion is queued on a channel and applied by the pipeline on its own
//! thread during `poll`. Requests are tagged with a per-stage generation so
//! that superseded loads can be recognized and dropped.

mod fetch;
mod manual;
mod threaded;

use std::fmt;
use std::sync::mpsc::Sender;

pub use fetch::{FileFetcher, SourceFetcher};
pub use manual::ManualLoader;
pub use threaded::ThreadedLoader;

use crate::error::FetchError;
use crate::gl::StageKind;

/// Where a stage's source text lives (file path or `file://` URI).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct SourceLocation(String);

impl SourceLocation {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceLocation {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SourceLocation {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&std::path::Path> for SourceLocation {
    fn from(p: &std::path::Path) -> Self {
        Self(p.to_string_lossy().into_owned())
    }
}

/// One load to perform.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub stage: StageKind,
    pub generation: u64,
    pub location: SourceLocation,
}

/// Outcome of a [`LoadRequest`], as queued for the pipeline.
#[derive(Debug)]
pub struct LoadCompletion {
    pub stage: StageKind,
    pub generation: u64,
    pub location: SourceLocation,
    pub result: Result<String, FetchError>,
}

/// One-shot completion handle for a [`LoadRequest`].
///
/// Delivering consumes the reply, so a request completes at most once.
#[derive(Debug)]
pub struct LoadReply {
    request: LoadRequest,
    tx: Sender<LoadCompletion>,
}

impl LoadReply {
    pub(crate) fn new(request: LoadRequest, tx: Sender<LoadCompletion>) -> Self {
        Self { request, tx }
    }

    /// Second handle to the same request. Only for delivering a failure when the
    /// original could not be handed to a worker.
    pub(crate) fn duplicate(&self) -> Self {
        Self {
            request: self.request.clone(),
            tx: self.tx.clone(),
        }
    }

    pub fn request(&self) -> &LoadRequest {
        &self.request
    }

    /// Queues the result for the pipeline. A dropped pipeline is not an error.
    pub fn deliver(self, result: Result<String, FetchError>) {
        let LoadRequest {
            stage,
            generation,
            location,
        } = self.request;

        if self
            .tx
            .send(LoadCompletion {
                stage,
                generation,
                location,
                result,
            })
            .is_err()
        {
            log::debug!("{stage} load #{generation} finished after the pipeline was dropped");
        }
    }
}

/// Strategy that turns requests into completions.
pub trait SourceLoader {
    /// Starts a load. Must not block on the fetch itself.
    fn load(&mut self, reply: LoadReply);
}

impl<L: SourceLoader + ?Sized> SourceLoader for Box<L> {
    fn load(&mut self, reply: LoadReply) {
        (**self).load(reply)
    }
}
