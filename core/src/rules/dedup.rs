// codcall/src/rules/dedup.rs

use std::collections::HashSet;
use std::hash::Hash;

/// `candidates \ existing`.
pub fn filter_new<T>(candidates: &HashSet<T>, existing: &HashSet<T>) -> HashSet<T>
where
  T: Eq + Hash + Clone,
{
  candidates.difference(existing).cloned().collect()
}

/// Like [`filter_new`] but keeps the upstream order of `candidates` and drops
/// repeats inside the batch itself.
pub fn filter_new_ordered<T, I>(candidates: I, existing: &HashSet<T>) -> Vec<T>
where
  T: Eq + Hash + Clone,
  I: IntoIterator<Item = T>,
{
  let mut seen = HashSet::new();
  candidates
    .into_iter()
    .filter(|id| !existing.contains(id) && seen.insert(id.clone()))
    .collect()
}
