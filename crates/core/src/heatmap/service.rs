//! Heatmap service - load availability, aggregate per cell

use std::sync::Arc;

use slotwise_domain::{HeatmapRequest, HeatmapTimeslot, Result};
use tracing::{debug, instrument};

use super::aggregator::TimeslotAggregator;
use crate::ports::PersistenceStore;
use crate::zone::parse_time_zone;

/// Builds month heatmaps from stored timeslots
pub struct HeatmapService {
    store: Arc<dyn PersistenceStore>,
    aggregator: TimeslotAggregator,
}

impl HeatmapService {
    pub fn new(store: Arc<dyn PersistenceStore>, aggregator: TimeslotAggregator) -> Self {
        Self { store, aggregator }
    }

    /// Cells of the requested month with the hosts available in each.
    #[instrument(skip(self, request), fields(year = request.year, month = request.month, hosts = request.host_ids.len()))]
    pub async fn month_heatmap(&self, request: &HeatmapRequest) -> Result<Vec<HeatmapTimeslot>> {
        let time_zone = parse_time_zone(&request.time_zone)?;
        let mut cells = self.aggregator.month_cells(
            request.year,
            request.month,
            request.minutes_of_timeslot,
            time_zone,
        )?;

        let (Some(first), Some(last)) = (cells.first(), cells.last()) else {
            return Ok(cells);
        };
        let (start, end) = (first.datetime_of_start, last.datetime_of_end());

        let slots = self
            .store
            .load_host_availability(&request.host_ids, request.venue_id, start, end)
            .await?;
        debug!(slots = slots.len(), cells = cells.len(), "Aggregating heatmap");

        self.aggregator.fill(request.kind, &mut cells, &slots)?;
        Ok(cells)
    }
}
