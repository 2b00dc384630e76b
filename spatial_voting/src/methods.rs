use log::debug;

use crate::config::*;
use crate::geometry::weight;
use crate::pairwise::smith_set_indices;
use crate::ranking::{check_candidates, rank_indices, CandidateIdx};

// **** Index-level ballots, shared with the population tally ****

pub(crate) fn plurality_idx(ranking: &[(CandidateIdx, f64)]) -> CandidateIdx {
    ranking[0].0
}

/// The approved candidates and their weight, in ranking order.
///
/// A candidate is approved when strictly closer than the threshold. When no
/// candidate qualifies, the closest candidate gets the full weight.
pub(crate) fn approval_idx(
    ranking: &[(CandidateIdx, f64)],
    approval_threshold: f64,
) -> Vec<(CandidateIdx, f64)> {
    if ranking.len() == 1 {
        return vec![(ranking[0].0, 1.0)];
    }
    let approved: Vec<(CandidateIdx, f64)> = ranking
        .iter()
        .filter(|(_, dist)| *dist < approval_threshold)
        .map(|(cidx, dist)| (*cidx, weight(*dist, approval_threshold)))
        .collect();
    if approved.is_empty() {
        debug!(
            "approval_idx: nobody within {}, falling back to {:?}",
            approval_threshold, ranking[0].0
        );
        return vec![(plurality_idx(ranking), 1.0)];
    }
    approved
}

/// Candidate at position `i` gets `n - 1 - i` points.
pub(crate) fn borda_idx(ranking: &[(CandidateIdx, f64)]) -> Vec<(CandidateIdx, u64)> {
    let n = ranking.len() as u64;
    ranking
        .iter()
        .enumerate()
        .map(|(pos, (cidx, _))| (*cidx, n - 1 - pos as u64))
        .collect()
}

/// Approval restricted to the candidates of the voter's Smith set.
pub(crate) fn smith_approval_idx(
    ranking: &[(CandidateIdx, f64)],
    approval_threshold: f64,
) -> Vec<(CandidateIdx, f64)> {
    let smith = smith_set_indices(ranking);
    let restricted: Vec<(CandidateIdx, f64)> = ranking
        .iter()
        .filter(|(cidx, _)| smith.contains(cidx))
        .cloned()
        .collect();
    approval_idx(&restricted, approval_threshold)
}

// **** Public single-voter contract ****

fn to_id(candidates: &[Candidate], cidx: CandidateIdx) -> String {
    candidates[cidx.0].id.clone()
}

/// The closest candidate to the voter.
pub fn plurality(x: f64, y: f64, candidates: &[Candidate]) -> Result<String, VotingErrors> {
    check_candidates(candidates)?;
    if candidates.len() == 1 {
        return Ok(candidates[0].id.clone());
    }
    let ranking = rank_indices(x, y, candidates);
    Ok(to_id(candidates, plurality_idx(&ranking)))
}

/// The approved candidates, weighted by the falloff of their distance.
pub fn approval(
    x: f64,
    y: f64,
    candidates: &[Candidate],
    params: &VotingParams,
) -> Result<Vec<(String, f64)>, VotingErrors> {
    check_candidates(candidates)?;
    if candidates.len() == 1 {
        return Ok(vec![(candidates[0].id.clone(), 1.0)]);
    }
    let ranking = rank_indices(x, y, candidates);
    Ok(approval_idx(&ranking, params.approval_threshold)
        .into_iter()
        .map(|(cidx, w)| (to_id(candidates, cidx), w))
        .collect())
}

/// The full ranking with the Borda points of each position.
pub fn borda(x: f64, y: f64, candidates: &[Candidate]) -> Result<Vec<(String, u64)>, VotingErrors> {
    check_candidates(candidates)?;
    if candidates.len() == 1 {
        return Ok(vec![(candidates[0].id.clone(), 0)]);
    }
    let ranking = rank_indices(x, y, candidates);
    Ok(borda_idx(&ranking)
        .into_iter()
        .map(|(cidx, points)| (to_id(candidates, cidx), points))
        .collect())
}

/// The full ranking, used as a ranked ballot by the runoff.
pub fn irv(x: f64, y: f64, candidates: &[Candidate]) -> Result<Vec<String>, VotingErrors> {
    check_candidates(candidates)?;
    if candidates.len() == 1 {
        return Ok(vec![candidates[0].id.clone()]);
    }
    Ok(rank_indices(x, y, candidates)
        .into_iter()
        .map(|(cidx, _)| to_id(candidates, cidx))
        .collect())
}

/// Approval over the voter's Smith set.
pub fn smith_approval(
    x: f64,
    y: f64,
    candidates: &[Candidate],
    params: &VotingParams,
) -> Result<Vec<(String, f64)>, VotingErrors> {
    check_candidates(candidates)?;
    if candidates.len() == 1 {
        return Ok(vec![(candidates[0].id.clone(), 1.0)]);
    }
    let ranking = rank_indices(x, y, candidates);
    Ok(smith_approval_idx(&ranking, params.approval_threshold)
        .into_iter()
        .map(|(cidx, w)| (to_id(candidates, cidx), w))
        .collect())
}

/// Casts the ballot of the voter at `(x, y)` under the given method.
pub fn cast_ballot(
    method: VotingMethod,
    x: f64,
    y: f64,
    candidates: &[Candidate],
    params: &VotingParams,
) -> Result<Ballot, VotingErrors> {
    match method {
        VotingMethod::Plurality => plurality(x, y, candidates).map(Ballot::Single),
        VotingMethod::Approval => approval(x, y, candidates, params).map(Ballot::Approval),
        VotingMethod::Borda => borda(x, y, candidates).map(Ballot::Points),
        VotingMethod::Irv => irv(x, y, candidates).map(Ballot::Ranking),
        VotingMethod::SmithApproval => {
            smith_approval(x, y, candidates, params).map(Ballot::Approval)
        }
    }
}
