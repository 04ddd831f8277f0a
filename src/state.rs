use std::sync::Arc;

use crate::charts::{compute, ChartSet};
use crate::data::filter::{init_selection, Selection};
use crate::data::model::{Dataset, GroupOption};

// ---------------------------------------------------------------------------
// Dashboard session state
// ---------------------------------------------------------------------------

/// Proof that an update was requested; only the newest one may commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTicket {
    generation: u64,
    selection: Selection,
}

impl UpdateTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }
}

/// Everything a presentation layer needs between selection changes,
/// independent of rendering.
pub struct DashboardState {
    /// Loaded once, read-only for the session.
    dataset: Arc<Dataset>,

    /// Currently selected groups.
    selection: Selection,

    /// The eight charts for `selection`.
    charts: ChartSet,

    /// Number of the most recently issued update.
    generation: u64,
}

impl DashboardState {
    /// Start a session with every group selected and charts computed.
    pub fn new(dataset: Arc<Dataset>) -> Self {
        let selection = init_selection(&dataset);
        let charts = compute(&dataset, &selection);
        DashboardState {
            dataset,
            selection,
            charts,
            generation: 0,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn charts(&self) -> &ChartSet {
        &self.charts
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Options for the group checklist.
    pub fn group_options(&self) -> Vec<GroupOption> {
        self.dataset.group_options()
    }

    /// Issue a new update; any older ticket becomes stale.
    pub fn begin_update(&mut self, selection: Selection) -> UpdateTicket {
        self.generation += 1;
        UpdateTicket {
            generation: self.generation,
            selection,
        }
    }

    /// Swap in charts computed for `ticket`. Returns `false` (and keeps the
    /// current charts) when a newer update has been issued since.
    pub fn commit(&mut self, ticket: UpdateTicket, charts: ChartSet) -> bool {
        if ticket.generation != self.generation {
            log::debug!(
                "discarding stale update {} (latest is {})",
                ticket.generation,
                self.generation
            );
            return false;
        }
        self.selection = ticket.selection;
        self.charts = charts;
        true
    }

    /// Replace the selection and recompute all charts synchronously.
    pub fn set_selection(&mut self, selection: Selection) {
        let ticket = self.begin_update(selection);
        let charts = compute(&self.dataset, ticket.selection());
        self.commit(ticket, charts);
    }

    /// Toggle a single group in the selection.
    pub fn toggle_group(&mut self, group: &str) {
        let mut selection = self.selection.clone();
        if !selection.remove(group) {
            selection.insert(group.to_string());
        }
        self.set_selection(selection);
    }

    /// Select every group.
    pub fn select_all(&mut self) {
        self.set_selection(init_selection(&self.dataset));
    }

    /// Deselect every group.
    pub fn select_none(&mut self) {
        self.set_selection(Selection::new());
    }
}
