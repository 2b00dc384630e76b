use log::debug;

use crate::config::*;
use crate::geometry::distance;

/// Position of a candidate in the caller's candidate list.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub(crate) struct CandidateIdx(pub(crate) usize);

pub(crate) fn check_candidates(candidates: &[Candidate]) -> Result<(), VotingErrors> {
    if candidates.is_empty() {
        return Err(VotingErrors::InvalidInput(
            "the candidate list is empty".to_string(),
        ));
    }
    Ok(())
}

/// The candidates ordered by increasing distance to the voter.
///
/// The sort is stable: candidates at the same distance keep their input order.
/// Callers must have rejected an empty candidate list.
pub(crate) fn rank_indices(x: f64, y: f64, candidates: &[Candidate]) -> Vec<(CandidateIdx, f64)> {
    let mut ranked: Vec<(CandidateIdx, f64)> = candidates
        .iter()
        .enumerate()
        .map(|(idx, c)| (CandidateIdx(idx), distance(x, y, c.x, c.y)))
        .collect();
    ranked.sort_by(|(_, d1), (_, d2)| d1.total_cmp(d2));
    ranked
}

/// Ranks all the candidates by distance to the voter at `(x, y)`.
pub fn rank(x: f64, y: f64, candidates: &[Candidate]) -> Result<Vec<RankedCandidate>, VotingErrors> {
    check_candidates(candidates)?;
    let ranked = rank_indices(x, y, candidates);
    debug!("rank: ({}, {}) -> {:?}", x, y, ranked);
    Ok(ranked
        .into_iter()
        .map(|(cidx, dist)| RankedCandidate {
            id: candidates[cidx.0].id.clone(),
            dist,
        })
        .collect())
}
