use log::debug;

use std::collections::{HashMap, HashSet};

use crate::config::*;
use crate::ranking::{check_candidates, rank_indices, CandidateIdx};

// For each candidate, the candidates it beats head-to-head.
type DefeatsMap = HashMap<CandidateIdx, HashSet<CandidateIdx>>;

/// Decomposes a ranking into all its `(closer, farther)` pairs.
fn defeats_from_ranking(ranking: &[(CandidateIdx, f64)]) -> DefeatsMap {
    let mut defeats: DefeatsMap = ranking
        .iter()
        .map(|(cidx, _)| (*cidx, HashSet::new()))
        .collect();
    for (pos, (closer, _)) in ranking.iter().enumerate() {
        for (farther, _) in ranking[pos + 1..].iter() {
            if let Some(e) = defeats.get_mut(closer) {
                e.insert(*farther);
            }
        }
    }
    defeats
}

fn beats(defeats: &DefeatsMap, a: CandidateIdx, b: CandidateIdx) -> bool {
    defeats.get(&a).map(|s| s.contains(&b)).unwrap_or(false)
}

/// Iteratively removes every candidate that is beaten by another remaining
/// candidate without beating it back, until a full pass removes nothing.
fn smith_set_from_defeats(candidates: &[CandidateIdx], defeats: &DefeatsMap) -> Vec<CandidateIdx> {
    let mut smith: Vec<CandidateIdx> = candidates.to_vec();
    loop {
        let dominated: HashSet<CandidateIdx> = smith
            .iter()
            .filter(|&&c| {
                smith
                    .iter()
                    .any(|&o| o != c && beats(defeats, o, c) && !beats(defeats, c, o))
            })
            .cloned()
            .collect();
        if dominated.is_empty() {
            return smith;
        }
        debug!("smith_set_from_defeats: removing {:?}", dominated);
        smith.retain(|c| !dominated.contains(c));
    }
}

/// The Smith set of a single voter's ranking, in input order.
pub(crate) fn smith_set_indices(ranking: &[(CandidateIdx, f64)]) -> Vec<CandidateIdx> {
    let defeats = defeats_from_ranking(ranking);
    let mut all: Vec<CandidateIdx> = ranking.iter().map(|(cidx, _)| *cidx).collect();
    all.sort();
    smith_set_from_defeats(&all, &defeats)
}

/// All the head-to-head defeats induced by the voter at `(x, y)`, as
/// `(closer, farther)` pairs.
pub fn pairwise_defeats(
    x: f64,
    y: f64,
    candidates: &[Candidate],
) -> Result<Vec<(String, String)>, VotingErrors> {
    check_candidates(candidates)?;
    let ranking = rank_indices(x, y, candidates);
    let mut res: Vec<(String, String)> = Vec::new();
    for (pos, (closer, _)) in ranking.iter().enumerate() {
        for (farther, _) in ranking[pos + 1..].iter() {
            res.push((
                candidates[closer.0].id.clone(),
                candidates[farther.0].id.clone(),
            ));
        }
    }
    Ok(res)
}

/// The Smith set for the voter at `(x, y)`, in input order. Never empty.
pub fn smith_set(x: f64, y: f64, candidates: &[Candidate]) -> Result<Vec<String>, VotingErrors> {
    check_candidates(candidates)?;
    if candidates.len() == 1 {
        return Ok(vec![candidates[0].id.clone()]);
    }
    let ranking = rank_indices(x, y, candidates);
    Ok(smith_set_indices(&ranking)
        .iter()
        .map(|cidx| candidates[cidx.0].id.clone())
        .collect())
}

/// Head-to-head totals over a population of voters.
///
/// Candidates are addressed by their position in the candidate list.
#[derive(PartialEq, Debug, Clone)]
pub struct PairwiseMatrix {
    num_candidates: usize,
    prefs: Vec<f64>,
}

impl PairwiseMatrix {
    pub fn from_voters(
        voters: &[WeightedVoter],
        candidates: &[Candidate],
    ) -> Result<PairwiseMatrix, VotingErrors> {
        check_candidates(candidates)?;
        let rankings: Vec<(Vec<(CandidateIdx, f64)>, f64)> = voters
            .iter()
            .map(|wv| (rank_indices(wv.voter.x, wv.voter.y, candidates), wv.weight))
            .collect();
        Ok(PairwiseMatrix::from_rankings(
            rankings.iter().map(|(r, w)| (r.as_slice(), *w)),
            candidates.len(),
        ))
    }

    pub(crate) fn from_rankings<'a>(
        rankings: impl Iterator<Item = (&'a [(CandidateIdx, f64)], f64)>,
        num_candidates: usize,
    ) -> PairwiseMatrix {
        let mut prefs = vec![0.0; num_candidates * num_candidates];
        for (ranking, weight) in rankings {
            for (pos, (closer, _)) in ranking.iter().enumerate() {
                for (farther, _) in ranking[pos + 1..].iter() {
                    prefs[closer.0 * num_candidates + farther.0] += weight;
                }
            }
        }
        PairwiseMatrix {
            num_candidates,
            prefs,
        }
    }

    pub fn num_candidates(&self) -> usize {
        self.num_candidates
    }

    /// The total weight of the voters who rank `a` ahead of `b`.
    pub fn prefer(&self, a: usize, b: usize) -> f64 {
        self.prefs[a * self.num_candidates + b]
    }

    /// `a` wins the head-to-head contest against `b`.
    pub fn beats(&self, a: usize, b: usize) -> bool {
        self.prefer(a, b) > self.prefer(b, a)
    }

    /// The population Smith set, in input order.
    ///
    /// Aggregated preferences may be cyclic, so this takes the candidates that
    /// reach every other candidate through a chain of "beats or ties".
    pub(crate) fn smith_set_indices(&self) -> Vec<CandidateIdx> {
        let n = self.num_candidates;
        let mut reach: Vec<bool> = vec![false; n * n];
        for a in 0..n {
            for b in 0..n {
                reach[a * n + b] = a == b || self.prefer(a, b) >= self.prefer(b, a);
            }
        }
        for k in 0..n {
            for a in 0..n {
                if !reach[a * n + k] {
                    continue;
                }
                for b in 0..n {
                    if reach[k * n + b] {
                        reach[a * n + b] = true;
                    }
                }
            }
        }
        let smith: Vec<CandidateIdx> = (0..n)
            .filter(|&a| (0..n).all(|b| reach[a * n + b]))
            .map(CandidateIdx)
            .collect();
        debug!("smith_set_indices: {:?}", smith);
        smith
    }
}

/// The Smith set of a population of voters, in input order. Never empty.
pub fn population_smith_set(
    voters: &[WeightedVoter],
    candidates: &[Candidate],
) -> Result<Vec<String>, VotingErrors> {
    let matrix = PairwiseMatrix::from_voters(voters, candidates)?;
    Ok(matrix
        .smith_set_indices()
        .iter()
        .map(|cidx| candidates[cidx.0].id.clone())
        .collect())
}
