use flodepth_service::client::{CompletionRequest, VisionClient};
use flodepth_service::model::ModelError;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

pub const CLEAN_CONTENT: &str = r#"{"depth_cm_estimate":13,"depth_range":"10–15","passability":"pass","justification":"Water near wheel-stop top; stripes slightly faded."}"#;

/// Replays canned replies in call order; anything past the end fails.
/// `None` is an empty-content reply.
pub struct FakeVision {
    replies: RefCell<VecDeque<Result<Option<String>, String>>>,
    pub models_called: RefCell<Vec<String>>,
    pub message_counts: RefCell<Vec<usize>>,
}

impl FakeVision {
    pub fn new(replies: Vec<Result<Option<&str>, &str>>) -> Self {
        let replies = replies
            .into_iter()
            .map(|r| r.map(|c| c.map(str::to_string)).map_err(str::to_string))
            .collect();
        Self {
            replies: RefCell::new(replies),
            models_called: RefCell::new(Vec::new()),
            message_counts: RefCell::new(Vec::new()),
        }
    }

    pub fn always_failing() -> Self {
        Self::new(Vec::new())
    }
}

impl VisionClient for FakeVision {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<Option<String>, ModelError> {
        self.models_called.borrow_mut().push(request.model.to_string());
        self.message_counts.borrow_mut().push(request.messages.len());
        match self.replies.borrow_mut().pop_front() {
            Some(Ok(content)) => Ok(content),
            Some(Err(msg)) => Err(ModelError::Status { status: 503, body: msg }),
            None => Err(ModelError::Transport("connection refused".to_string())),
        }
    }
}

pub fn touch(dir: &Path, names: &[&str]) {
    for name in names {
        fs::write(dir.join(name), format!("image bytes for {}", name)).expect("write image");
    }
}
