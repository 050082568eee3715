//! Pure vote tallying.

use std::collections::{BTreeMap, HashMap};

use super::models::Choice;

/// Count ballots per choice.
///
/// Makes no assumption about which choices appear: absent choices simply
/// have no entry, and choice keys need not be contiguous.
pub fn tally(votes: &BTreeMap<String, Choice>) -> HashMap<Choice, usize> {
    let mut counts: HashMap<Choice, usize> = HashMap::new();
    for choice in votes.values() {
        *counts.entry(choice.clone()).or_insert(0) += 1;
    }
    counts
}

/// Ballots cast for one specific choice.
pub fn count_for(votes: &BTreeMap<String, Choice>, choice: &Choice) -> usize {
    votes.values().filter(|ballot| *ballot == choice).count()
}
