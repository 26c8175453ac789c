use crate::models::{FilterCriterion, StudentEntry};
use crate::store::RosterStore;

/// Compute the visible subset of the roster for `criterion`.
///
/// Single linear scan; the result keeps store order and pairs each entry
/// with its index into the store, so edits made through the view address
/// the full roster rather than the filtered slice.
pub fn apply(store: &RosterStore, criterion: FilterCriterion) -> Vec<(usize, &StudentEntry)> {
    store
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, entry)| matches(entry, criterion))
        .collect()
}

fn matches(entry: &StudentEntry, criterion: FilterCriterion) -> bool {
    match criterion {
        FilterCriterion::ByPeriod(period) | FilterCriterion::All(period) => entry.period == period,
        FilterCriterion::ByStatus(status) => entry.status == status,
    }
}
