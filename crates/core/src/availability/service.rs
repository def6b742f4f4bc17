//! Availability service - load, compile, persist

use std::sync::Arc;

use slotwise_domain::{AvailabilityExpression, ExpressionId, Result};
use tracing::{info, instrument, warn};

use super::compiler::AvailabilityCompiler;
use crate::ports::{PersistenceStore, TaskQueue};

/// Drives expression edits and recompilation against the injected store
pub struct AvailabilityService {
    store: Arc<dyn PersistenceStore>,
    queue: Arc<dyn TaskQueue>,
    compiler: AvailabilityCompiler,
}

impl AvailabilityService {
    pub fn new(
        store: Arc<dyn PersistenceStore>,
        queue: Arc<dyn TaskQueue>,
        compiler: AvailabilityCompiler,
    ) -> Self {
        Self { store, queue, compiler }
    }

    pub fn compiler(&self) -> &AvailabilityCompiler {
        &self.compiler
    }

    /// Save an edited expression as `Editing` and schedule its recompilation.
    #[instrument(skip(self, expression), fields(expression_id = expression.id))]
    pub async fn update_expression(&self, mut expression: AvailabilityExpression) -> Result<()> {
        expression.mark_edited();
        self.store.save_expression(&expression).await?;
        self.queue.enqueue(expression.id).await
    }

    /// Recompile one expression and replace its timeslots.
    ///
    /// On failure nothing is written and the expression stays `Editing`.
    /// Returns the number of timeslots stored.
    #[instrument(skip(self))]
    pub async fn recompile(&self, expression_id: ExpressionId) -> Result<usize> {
        let mut expression = self.store.load_expression(expression_id).await?;

        let slots = match self.compiler.compile(&expression) {
            Ok(slots) => slots,
            Err(err) => {
                warn!(error = %err, kind = err.kind(), "Availability compilation failed");
                return Err(err);
            }
        };

        self.store.replace_timeslots(expression_id, &slots).await?;
        expression.mark_published();
        self.store.save_expression(&expression).await?;

        info!(slots = slots.len(), "Availability expression published");
        Ok(slots.len())
    }

    /// Return an expression to `Editing` and withdraw its timeslots.
    #[instrument(skip(self))]
    pub async fn unpublish_expression(&self, expression_id: ExpressionId) -> Result<()> {
        let mut expression = self.store.load_expression(expression_id).await?;
        self.store.replace_timeslots(expression_id, &[]).await?;
        expression.mark_edited();
        self.store.save_expression(&expression).await
    }
}
