//! Cross-class maxima filtering outside single-object mode.

use super::merge::merge_maxima;
use super::params::HypothesisMergePolicy;
use crate::types::VotingMaximum;
use std::collections::BTreeMap;

/// Proximity filter over the full maxima list.
///
/// For each maximum not yet consumed, all unconsumed maxima within its
/// class-adaptive search radius are grouped with it — but only those whose
/// own radius is smaller or equal, so a small-radius class can be subsumed by
/// a larger one and not vice versa. Only the highest-weight member of each
/// group survives.
///
/// With `merge` set, same-class members of a group are merged first so
/// duplicate detections combine their evidence instead of eliminating each
/// other.
pub(crate) fn filter_maxima(
    maxima: &[VotingMaximum],
    merge: bool,
    merge_policy: HypothesisMergePolicy,
    search_dist: impl Fn(u32) -> f32,
) -> Vec<VotingMaximum> {
    let mut consumed = vec![false; maxima.len()];
    let mut filtered: Vec<VotingMaximum> = Vec::new();

    for i in 0..maxima.len() {
        if consumed[i] {
            continue;
        }

        let reference_dist = search_dist(maxima[i].class_id);
        let mut group: Vec<VotingMaximum> = Vec::new();

        for j in (i + 1)..maxima.len() {
            if consumed[j] {
                continue;
            }
            let dist = (maxima[j].position - maxima[i].position).norm();
            let other_dist = search_dist(maxima[j].class_id);
            if dist < reference_dist && other_dist <= reference_dist {
                group.push(maxima[j].clone());
                consumed[j] = true;
            }
        }

        if group.is_empty() {
            filtered.push(maxima[i].clone());
            continue;
        }
        group.push(maxima[i].clone());

        if merge {
            let mut by_class: BTreeMap<u32, Vec<VotingMaximum>> = BTreeMap::new();
            for m in group.drain(..) {
                by_class.entry(m.class_id).or_default().push(m);
            }
            for (_, same_class) in by_class {
                group.push(merge_maxima(&same_class, merge_policy));
            }
        }

        let winner = group
            .into_iter()
            .max_by(|a, b| a.weight.partial_cmp(&b.weight).unwrap_or(std::cmp::Ordering::Equal));
        if let Some(winner) = winner {
            filtered.push(winner);
        }
    }

    filtered
}
