use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::FetchError;
use crate::gl::StageKind;

use super::{LoadReply, LoadRequest, SourceLoader};

/// Loader whose requests are completed by hand, in any order.
///
/// Clones share one queue, so a caller can keep a handle after giving the
/// loader to a pipeline. Nothing completes until `complete`/`fail` is called.
#[derive(Clone, Default)]
pub struct ManualLoader {
    queue: Rc<RefCell<VecDeque<LoadReply>>>,
}

impl ManualLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests not yet completed, oldest first.
    pub fn pending(&self) -> Vec<LoadRequest> {
        self.queue.borrow().iter().map(|r| r.request().clone()).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Completes the oldest pending request for `stage` with `text`.
    /// Returns `false` if there was none.
    pub fn complete(&self, stage: StageKind, text: impl Into<String>) -> bool {
        self.resolve(|r| r.stage == stage, Ok(text.into()))
    }

    /// Completes the pending request for `stage` tagged `generation`.
    pub fn complete_generation(
        &self,
        stage: StageKind,
        generation: u64,
        text: impl Into<String>,
    ) -> bool {
        self.resolve(
            |r| r.stage == stage && r.generation == generation,
            Ok(text.into()),
        )
    }

    /// Completes the oldest pending request of either stage.
    pub fn complete_next(&self, text: impl Into<String>) -> bool {
        self.resolve(|_| true, Ok(text.into()))
    }

    /// Fails the oldest pending request for `stage`.
    pub fn fail(&self, stage: StageKind, error: FetchError) -> bool {
        self.resolve(|r| r.stage == stage, Err(error))
    }

    fn resolve(
        &self,
        matches: impl Fn(&LoadRequest) -> bool,
        result: Result<String, FetchError>,
    ) -> bool {
        let reply = {
            let mut queue = self.queue.borrow_mut();
            let Some(pos) = queue.iter().position(|r| matches(r.request())) else {
                return false;
            };
            queue.remove(pos)
        };

        match reply {
            Some(reply) => {
                reply.deliver(result);
                true
            }
            None => false,
        }
    }
}

impl SourceLoader for ManualLoader {
    fn load(&mut self, reply: LoadReply) {
        self.queue.borrow_mut().push_back(reply);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::loader::LoadCompletion;

    fn request(loader: &mut ManualLoader, tx: &mpsc::Sender<LoadCompletion>, stage: StageKind, generation: u64) {
        let request = LoadRequest {
            stage,
            generation,
            location: format!("{stage}-{generation}").into(),
        };
        loader.load(LoadReply::new(request, tx.clone()));
    }

    #[test]
    fn completes_in_caller_chosen_order() {
        let (tx, rx) = mpsc::channel();
        let mut loader = ManualLoader::new();
        request(&mut loader, &tx, StageKind::Vertex, 1);
        request(&mut loader, &tx, StageKind::Fragment, 1);
        request(&mut loader, &tx, StageKind::Vertex, 2);

        assert!(loader.complete_generation(StageKind::Vertex, 2, "v2"));
        assert!(loader.fail(StageKind::Fragment, FetchError::EmptyLocation));
        assert!(loader.complete_next("v1"));
        assert!(!loader.complete_next("nothing left"));

        let got: Vec<_> = rx.try_iter().map(|c| (c.stage, c.generation, c.result.is_ok())).collect();
        assert_eq!(
            got,
            vec![
                (StageKind::Vertex, 2, true),
                (StageKind::Fragment, 1, false),
                (StageKind::Vertex, 1, true),
            ]
        );
    }

    #[test]
    fn clones_share_the_queue() {
        let (tx, _rx) = mpsc::channel();
        let handle = ManualLoader::new();
        let mut owned = handle.clone();
        request(&mut owned, &tx, StageKind::Fragment, 7);

        assert_eq!(handle.pending_count(), 1);
        assert_eq!(handle.pending()[0].generation, 7);
    }
}
