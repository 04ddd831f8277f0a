use std::collections::BTreeSet;

use super::model::{Dataset, Record};

// ---------------------------------------------------------------------------
// Selection: which group labels are currently chosen
// ---------------------------------------------------------------------------

/// Set of selected group labels. Labels absent from the dataset are allowed
/// and simply match nothing.
pub type Selection = BTreeSet<String>;

/// Initialise a [`Selection`] with every group selected (the dashboard default).
pub fn init_selection(dataset: &Dataset) -> Selection {
    dataset.groups().clone()
}

/// Return the records whose group is selected, in dataset order.
///
/// An empty selection selects nothing.
pub fn filter_records<'a>(dataset: &'a Dataset, selection: &Selection) -> Vec<&'a Record> {
    if selection.is_empty() {
        return Vec::new();
    }
    dataset
        .records()
        .iter()
        .filter(|rec| selection.contains(&rec.group))
        .collect()
}
