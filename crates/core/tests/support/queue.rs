//! Task queue mock that records enqueued expression ids

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use slotwise_core::TaskQueue;
use slotwise_domain::{ExpressionId, Result as DomainResult};

#[derive(Default, Clone)]
pub struct RecordingQueue {
    enqueued: Arc<Mutex<Vec<ExpressionId>>>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueued(&self) -> Vec<ExpressionId> {
        self.enqueued.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskQueue for RecordingQueue {
    async fn enqueue(&self, expression_id: ExpressionId) -> DomainResult<()> {
        self.enqueued.lock().unwrap().push(expression_id);
        Ok(())
    }
}
