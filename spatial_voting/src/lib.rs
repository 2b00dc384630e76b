mod config;
mod geometry;
mod methods;
mod pairwise;
mod ranking;

pub mod builder;
pub mod manual;

use log::debug;

use std::ops::{Add, AddAssign};

pub use crate::config::*;
pub use crate::geometry::{distance, weight};
pub use crate::methods::{approval, borda, cast_ballot, irv, plurality, smith_approval};
pub use crate::pairwise::{pairwise_defeats, population_smith_set, smith_set, PairwiseMatrix};
pub use crate::ranking::rank;

use crate::methods::{approval_idx, borda_idx, plurality_idx};
use crate::ranking::{check_candidates, rank_indices, CandidateIdx};

// **** Private structures ****

type RoundId = u32;

#[derive(PartialEq, Debug, Clone, Copy, PartialOrd)]
struct VoteCount(f64);

impl VoteCount {
    const EMPTY: VoteCount = VoteCount(0.0);
}

impl std::iter::Sum for VoteCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        VoteCount(iter.map(|vc| vc.0).sum())
    }
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

impl Add for VoteCount {
    type Output = VoteCount;
    fn add(self: VoteCount, rhs: VoteCount) -> VoteCount {
        VoteCount(self.0 + rhs.0)
    }
}

// One voter's full ranking, derived once from the geometry.
#[derive(PartialEq, Debug, Clone)]
struct VoteInternal {
    ranking: Vec<(CandidateIdx, f64)>,
    count: VoteCount,
}

#[derive(PartialEq, Debug, Clone)]
struct RoundStatistics {
    // The continuing candidates, in input order.
    tally: Vec<(CandidateIdx, VoteCount)>,
    elected: Option<CandidateIdx>,
    eliminated: Option<CandidateIdx>,
}

#[derive(PartialEq, Debug, Clone)]
struct Tabulation {
    winner: CandidateIdx,
    // Every candidate, in input order.
    tally: Vec<(CandidateIdx, VoteCount)>,
    eliminated: Vec<CandidateIdx>,
    rounds: Vec<RoundStatistics>,
}

/// Runs the election for a population of voters.
///
/// Arguments:
/// * `method` the voting method
/// * `voters` the positions of the voters, each counting once
/// * `candidates` the candidates, in their tie-breaking order
/// * `params` the method parameters
pub fn run_election(
    method: VotingMethod,
    voters: &[Voter],
    candidates: &[Candidate],
    params: &VotingParams,
) -> Result<ElectionResult, VotingErrors> {
    let weighted: Vec<WeightedVoter> = voters
        .iter()
        .map(|v| WeightedVoter {
            voter: *v,
            weight: 1.0,
        })
        .collect();
    run_weighted_election(method, &weighted, candidates, params)
}

/// Runs the election for a population of voters with individual weights.
///
/// Voters with a zero weight are ignored.
pub fn run_weighted_election(
    method: VotingMethod,
    voters: &[WeightedVoter],
    candidates: &[Candidate],
    params: &VotingParams,
) -> Result<ElectionResult, VotingErrors> {
    check_candidates(candidates)?;
    debug!(
        "Processing {:?} voters, {:?} candidates, method: {}",
        voters.len(),
        candidates.len(),
        method
    );

    let votes: Vec<VoteInternal> = voters
        .iter()
        .filter(|wv| wv.weight > 0.0)
        .map(|wv| VoteInternal {
            ranking: rank_indices(wv.voter.x, wv.voter.y, candidates),
            count: VoteCount(wv.weight),
        })
        .collect();
    let all_candidates: Vec<CandidateIdx> = (0..candidates.len()).map(CandidateIdx).collect();

    // Only one candidate. It is the winner by any standard.
    if candidates.len() == 1 {
        let total: VoteCount = votes.iter().map(|v| v.count).sum();
        debug!("run_weighted_election: only one candidate, directly winning");
        let tab = single_round(vec![(CandidateIdx(0), total)]);
        return Ok(tabulation_to_result(&tab, candidates));
    }

    let tab = match method {
        VotingMethod::Plurality => {
            let tally = compute_tally(&votes, &all_candidates, |ranking| {
                vec![(plurality_idx(ranking), 1.0)]
            });
            single_round(tally)
        }
        VotingMethod::Approval => {
            let tally = compute_tally(&votes, &all_candidates, |ranking| {
                approval_idx(ranking, params.approval_threshold)
            });
            single_round(tally)
        }
        VotingMethod::Borda => {
            let tally = compute_tally(&votes, &all_candidates, |ranking| {
                borda_idx(ranking)
                    .into_iter()
                    .map(|(cidx, points)| (cidx, points as f64))
                    .collect()
            });
            single_round(tally)
        }
        VotingMethod::Irv => run_irv(&votes, &all_candidates),
        VotingMethod::SmithApproval => {
            let matrix = PairwiseMatrix::from_rankings(
                votes.iter().map(|v| (v.ranking.as_slice(), v.count.0)),
                candidates.len(),
            );
            let smith = matrix.smith_set_indices();
            debug!("run_weighted_election: population smith set {:?}", smith);
            let tally = compute_tally(&votes, &all_candidates, |ranking| {
                let restricted: Vec<(CandidateIdx, f64)> = ranking
                    .iter()
                    .filter(|(cidx, _)| smith.contains(cidx))
                    .cloned()
                    .collect();
                approval_idx(&restricted, params.approval_threshold)
            });
            single_round(tally)
        }
    };

    let res = tabulation_to_result(&tab, candidates);
    debug!("Winner: {} (method {})", res.winner, method);
    Ok(res)
}

/// Runs the election at one point of the map, with the influence of the
/// surrounding voters fading with their distance to the point.
pub fn run_election_around(
    method: VotingMethod,
    x: f64,
    y: f64,
    cloud: &InfluenceCloud,
    candidates: &[Candidate],
    params: &VotingParams,
) -> Result<ElectionResult, VotingErrors> {
    let voters = influence_voters(x, y, cloud);
    run_weighted_election(method, &voters, candidates, params)
}

/// The weighted lattice voters around `(x, y)`.
pub fn influence_voters(x: f64, y: f64, cloud: &InfluenceCloud) -> Vec<WeightedVoter> {
    if cloud.steps == 0 || cloud.radius <= 0.0 {
        return vec![WeightedVoter {
            voter: Voter::new(x, y),
            weight: 1.0,
        }];
    }
    let steps = cloud.steps as i64;
    let spacing = cloud.radius / cloud.steps as f64;
    let mut res: Vec<WeightedVoter> = Vec::new();
    for i in -steps..=steps {
        for j in -steps..=steps {
            let (dx, dy) = (i as f64 * spacing, j as f64 * spacing);
            let w = weight(distance(0.0, 0.0, dx, dy), cloud.radius);
            if w > 0.0 {
                res.push(WeightedVoter {
                    voter: Voter::new(x + dx, y + dy),
                    weight: w,
                });
            }
        }
    }
    res
}

// Initializes the tally with all the candidates to capture the ones who do
// not even get a vote.
fn compute_tally<F>(
    votes: &[VoteInternal],
    candidates: &[CandidateIdx],
    ballot: F,
) -> Vec<(CandidateIdx, VoteCount)>
where
    F: Fn(&[(CandidateIdx, f64)]) -> Vec<(CandidateIdx, f64)>,
{
    let mut tally: Vec<(CandidateIdx, VoteCount)> =
        candidates.iter().map(|cidx| (*cidx, VoteCount::EMPTY)).collect();
    for v in votes.iter() {
        for (cidx, w) in ballot(&v.ranking) {
            if let Some((_, vc)) = tally.iter_mut().find(|(c, _)| *c == cidx) {
                *vc += VoteCount(w * v.count.0);
            }
        }
    }
    tally
}

// The highest count wins, the earliest candidate on ties.
fn select_winner(tally: &[(CandidateIdx, VoteCount)]) -> CandidateIdx {
    let mut best = tally[0];
    for (cidx, vc) in tally.iter().skip(1) {
        if *vc > best.1 {
            best = (*cidx, *vc);
        }
    }
    best.0
}

fn single_round(tally: Vec<(CandidateIdx, VoteCount)>) -> Tabulation {
    let winner = select_winner(&tally);
    Tabulation {
        winner,
        tally: tally.clone(),
        eliminated: Vec::new(),
        rounds: vec![RoundStatistics {
            tally,
            elected: Some(winner),
            eliminated: None,
        }],
    }
}

fn compute_first_choices(
    votes: &[VoteInternal],
    remaining: &[CandidateIdx],
) -> Vec<(CandidateIdx, VoteCount)> {
    compute_tally(votes, remaining, |ranking| {
        ranking
            .iter()
            .find(|(cidx, _)| remaining.contains(cidx))
            .map(|(cidx, _)| vec![(*cidx, 1.0)])
            .unwrap_or_default()
    })
}

// The strictly smallest count is eliminated, the earliest candidate on ties.
fn find_eliminated_candidate(tally: &[(CandidateIdx, VoteCount)]) -> CandidateIdx {
    let mut worst = tally[0];
    for (cidx, vc) in tally.iter().skip(1) {
        if *vc < worst.1 {
            worst = (*cidx, *vc);
        }
    }
    worst.0
}

fn run_irv(votes: &[VoteInternal], candidates: &[CandidateIdx]) -> Tabulation {
    // The candidates that are still running, in input order.
    let mut remaining: Vec<CandidateIdx> = candidates.to_vec();
    let mut rounds: Vec<RoundStatistics> = Vec::new();
    let mut eliminated: Vec<CandidateIdx> = Vec::new();

    loop {
        let round_id = (rounds.len() + 1) as RoundId;
        let tally = compute_first_choices(votes, &remaining);
        let total: VoteCount = tally.iter().map(|(_, vc)| *vc).sum();
        debug!(
            "run_irv: round {:?} total {:?} tally {:?}",
            round_id, total, tally
        );

        let leader = select_winner(&tally);
        let leader_count = tally
            .iter()
            .find(|(cidx, _)| *cidx == leader)
            .map(|(_, vc)| *vc)
            .unwrap_or(VoteCount::EMPTY);
        // Without any vote there is nobody to eliminate: the tie-break elects.
        if leader_count.0 > total.0 / 2.0 || remaining.len() == 1 || total.0 <= 0.0 {
            debug!("run_irv: round {:?} elects {:?}", round_id, leader);
            let final_tally: Vec<(CandidateIdx, VoteCount)> = candidates
                .iter()
                .map(|cidx| {
                    let vc = tally
                        .iter()
                        .find(|(c, _)| c == cidx)
                        .map(|(_, vc)| *vc)
                        .unwrap_or(VoteCount::EMPTY);
                    (*cidx, vc)
                })
                .collect();
            rounds.push(RoundStatistics {
                tally,
                elected: Some(leader),
                eliminated: None,
            });
            return Tabulation {
                winner: leader,
                tally: final_tally,
                eliminated,
                rounds,
            };
        }

        let loser = find_eliminated_candidate(&tally);
        debug!("run_irv: round {:?} eliminates {:?}", round_id, loser);
        rounds.push(RoundStatistics {
            tally,
            elected: None,
            eliminated: Some(loser),
        });
        let before = remaining.len();
        remaining.retain(|cidx| *cidx != loser);
        eliminated.push(loser);
        // Invariant: exactly one candidate leaves per round.
        assert_eq!(remaining.len() + 1, before);
    }
}

fn tabulation_to_result(tab: &Tabulation, candidates: &[Candidate]) -> ElectionResult {
    let name = |cidx: &CandidateIdx| candidates[cidx.0].id.clone();
    let tally_to_pub = |tally: &[(CandidateIdx, VoteCount)]| -> Vec<(String, f64)> {
        tally.iter().map(|(cidx, vc)| (name(cidx), vc.0)).collect()
    };
    ElectionResult {
        winner: name(&tab.winner),
        tally: tally_to_pub(&tab.tally),
        elimination_order: tab.eliminated.iter().map(name).collect(),
        round_stats: tab
            .rounds
            .iter()
            .enumerate()
            .map(|(idx, r)| RoundStats {
                round: idx as RoundId + 1,
                tally: tally_to_pub(&r.tally),
                elected: r.elected.as_ref().map(name),
                eliminated: r.eliminated.as_ref().map(name),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn voters(points: &[(f64, f64)]) -> Vec<Voter> {
        points.iter().map(|(x, y)| Voter::new(*x, *y)).collect()
    }

    fn three_candidates() -> Vec<Candidate> {
        vec![
            Candidate::new("left", 0.1, 0.5),
            Candidate::new("center", 0.5, 0.5),
            Candidate::new("right", 0.9, 0.5),
        ]
    }

    #[test]
    fn plurality_counts_closest() {
        init();
        let cs = three_candidates();
        let vs = voters(&[(0.0, 0.5), (0.05, 0.5), (0.5, 0.6), (0.95, 0.5)]);
        let res = run_election(VotingMethod::Plurality, &vs, &cs, &VotingParams::DEFAULT_PARAMS)
            .unwrap();
        assert_eq!(res.winner, "left");
        assert_eq!(res.votes_for("left"), Some(2.0));
        assert_eq!(res.votes_for("center"), Some(1.0));
        assert_eq!(res.votes_for("right"), Some(1.0));
        assert!(res.elimination_order.is_empty());
    }

    #[test]
    fn tally_lists_every_candidate() {
        init();
        let cs = three_candidates();
        let vs = voters(&[(0.0, 0.5)]);
        for method in VotingMethod::ALL {
            let res = run_election(method, &vs, &cs, &VotingParams::DEFAULT_PARAMS).unwrap();
            let ids: Vec<&str> = res.tally.iter().map(|(id, _)| id.as_str()).collect();
            assert_eq!(ids, vec!["left", "center", "right"], "{}", method);
        }
    }

    #[test]
    fn empty_population_picks_first_candidate() {
        init();
        let cs = three_candidates();
        for method in VotingMethod::ALL {
            let res = run_election(method, &[], &cs, &VotingParams::DEFAULT_PARAMS).unwrap();
            assert_eq!(res.winner, "left", "{}", method);
            assert!(res.tally.iter().all(|(_, c)| *c == 0.0));
        }
    }

    #[test]
    fn borda_sums_rank_points() {
        init();
        let cs = three_candidates();
        // 3 voters near left, 2 near right: center is everyone's second choice.
        let vs = voters(&[(0.2, 0.5), (0.2, 0.5), (0.2, 0.5), (0.8, 0.5), (0.8, 0.5)]);
        let borda = run_election(VotingMethod::Borda, &vs, &cs, &VotingParams::DEFAULT_PARAMS)
            .unwrap();
        assert_eq!(borda.votes_for("left"), Some(6.0));
        assert_eq!(borda.votes_for("center"), Some(5.0));
        assert_eq!(borda.votes_for("right"), Some(4.0));
        let total: f64 = borda.tally.iter().map(|(_, c)| c).sum();
        assert_eq!(total, 5.0 * 3.0);
    }

    #[test]
    fn approval_adds_weights() {
        init();
        let cs = three_candidates();
        let params = VotingParams {
            approval_threshold: 0.3,
        };
        let vs = voters(&[(0.3, 0.5), (0.7, 0.5)]);
        let res = run_election(VotingMethod::Approval, &vs, &cs, &params).unwrap();
        assert_eq!(res.winner, "center");
        let center = res.votes_for("center").unwrap();
        let left = res.votes_for("left").unwrap();
        let right = res.votes_for("right").unwrap();
        assert!((left - right).abs() < 1e-9);
        assert!(center > left);
    }

    #[test]
    fn irv_eliminates_until_majority() {
        init();
        let cs = three_candidates();
        // First round: left 4, center 3, right 2. Right is eliminated and its
        // voters move to center, who then holds 5 of 9.
        let mut points: Vec<(f64, f64)> = vec![(0.05, 0.5); 4];
        points.extend(vec![(0.5, 0.5); 3]);
        points.extend(vec![(0.95, 0.5); 2]);
        let res = run_election(
            VotingMethod::Irv,
            &voters(&points),
            &cs,
            &VotingParams::DEFAULT_PARAMS,
        )
        .unwrap();
        assert_eq!(res.winner, "center");
        assert_eq!(res.elimination_order, vec!["right".to_string()]);
        assert_eq!(res.round_stats.len(), 2);
        assert_eq!(res.round_stats[0].eliminated, Some("right".to_string()));
        assert_eq!(res.round_stats[1].elected, Some("center".to_string()));
        assert_eq!(res.votes_for("center"), Some(5.0));
        assert_eq!(res.votes_for("left"), Some(4.0));
        assert_eq!(res.votes_for("right"), Some(0.0));
    }

    #[test]
    fn irv_rounds_shrink_by_one() {
        init();
        let cs = vec![
            Candidate::new("A", 0.1, 0.1),
            Candidate::new("B", 0.9, 0.1),
            Candidate::new("C", 0.1, 0.9),
            Candidate::new("D", 0.9, 0.9),
            Candidate::new("E", 0.5, 0.5),
        ];
        let points: Vec<(f64, f64)> = (0..20)
            .map(|i| ((i % 5) as f64 / 4.0, (i / 5) as f64 / 3.0))
            .collect();
        let res = run_election(
            VotingMethod::Irv,
            &voters(&points),
            &cs,
            &VotingParams::DEFAULT_PARAMS,
        )
        .unwrap();
        for pair in res.round_stats.windows(2) {
            assert_eq!(pair[0].tally.len(), pair[1].tally.len() + 1);
            let gone = pair[0].eliminated.clone().unwrap();
            assert!(pair[1].tally.iter().all(|(id, _)| *id != gone));
        }
        let last = res.round_stats.last().unwrap();
        assert_eq!(last.elected, Some(res.winner.clone()));
        assert_eq!(res.elimination_order.len(), res.round_stats.len() - 1);
    }

    #[test]
    fn irv_tie_eliminates_earliest_and_last_one_wins() {
        init();
        let cs = vec![Candidate::new("A", 0.0, 0.5), Candidate::new("B", 1.0, 0.5)];
        let vs = voters(&[(0.1, 0.5), (0.9, 0.5)]);
        let res = run_election(VotingMethod::Irv, &vs, &cs, &VotingParams::DEFAULT_PARAMS)
            .unwrap();
        assert_eq!(res.elimination_order, vec!["A".to_string()]);
        assert_eq!(res.winner, "B");
        assert_eq!(res.votes_for("B"), Some(2.0));
    }

    #[test]
    fn smith_approval_restricts_to_population_smith_set() {
        init();
        let cs = three_candidates();
        let params = VotingParams {
            approval_threshold: 0.5,
        };
        // Center is the Condorcet winner, so only center can collect approvals.
        let vs = voters(&[(0.1, 0.5), (0.4, 0.5), (0.9, 0.5)]);
        let res = run_election(VotingMethod::SmithApproval, &vs, &cs, &params).unwrap();
        assert_eq!(res.winner, "center");
        assert_eq!(res.votes_for("left"), Some(0.0));
        assert_eq!(res.votes_for("right"), Some(0.0));
        assert_eq!(res.votes_for("center"), Some(3.0));
    }

    #[test]
    fn smith_approval_over_a_tied_smith_set() {
        init();
        // A and B tie head-to-head and both beat Z, so the Smith set is {A, B}.
        // The voters near Z approve of Z only and fall back inside the set.
        let cs = vec![
            Candidate::new("A", 0.3, 0.5),
            Candidate::new("B", 0.7, 0.5),
            Candidate::new("Z", 0.5, 0.0),
        ];
        let wv = |x: f64, y: f64, weight: f64| WeightedVoter {
            voter: Voter::new(x, y),
            weight,
        };
        let vs = vec![
            wv(0.32, 0.5, 1.0),
            wv(0.62, 0.5, 1.0),
            wv(0.45, 0.0, 0.5),
            wv(0.55, 0.0, 0.5),
        ];
        let params = VotingParams {
            approval_threshold: 0.3,
        };
        assert_eq!(
            population_smith_set(&vs, &cs).unwrap(),
            vec!["A".to_string(), "B".to_string()]
        );

        let plain = run_weighted_election(VotingMethod::Approval, &vs, &cs, &params).unwrap();
        assert!(plain.votes_for("Z").unwrap() > 0.0);

        let res = run_weighted_election(VotingMethod::SmithApproval, &vs, &cs, &params).unwrap();
        assert_eq!(res.votes_for("Z"), Some(0.0));
        let a = res.votes_for("A").unwrap();
        let b = res.votes_for("B").unwrap();
        assert!((a - (weight(0.02, 0.3) + 0.5)).abs() < 1e-9);
        assert!((b - (weight(0.08, 0.3) + 0.5)).abs() < 1e-9);
        assert!(a < 1.5 && b < 1.5);
        assert_eq!(res.winner, "A");
    }

    #[test]
    fn single_candidate_wins_with_every_vote() {
        init();
        let cs = vec![Candidate::new("solo", 0.3, 0.3)];
        let vs = voters(&[(0.0, 0.0), (1.0, 1.0), (0.5, 0.2)]);
        for method in VotingMethod::ALL {
            let res = run_election(method, &vs, &cs, &VotingParams::DEFAULT_PARAMS).unwrap();
            assert_eq!(res.winner, "solo");
            assert_eq!(res.votes_for("solo"), Some(3.0));
        }
    }

    #[test]
    fn empty_candidates_are_rejected() {
        let vs = voters(&[(0.5, 0.5)]);
        for method in VotingMethod::ALL {
            assert!(matches!(
                run_election(method, &vs, &[], &VotingParams::DEFAULT_PARAMS),
                Err(VotingErrors::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn weighted_voters_scale_the_tally() {
        init();
        let cs = three_candidates();
        let vs = vec![
            WeightedVoter {
                voter: Voter::new(0.1, 0.5),
                weight: 0.5,
            },
            WeightedVoter {
                voter: Voter::new(0.9, 0.5),
                weight: 2.0,
            },
            WeightedVoter {
                voter: Voter::new(0.5, 0.5),
                weight: 0.0,
            },
        ];
        let res = run_weighted_election(
            VotingMethod::Plurality,
            &vs,
            &cs,
            &VotingParams::DEFAULT_PARAMS,
        )
        .unwrap();
        assert_eq!(res.winner, "right");
        assert_eq!(res.votes_for("left"), Some(0.5));
        assert_eq!(res.votes_for("center"), Some(0.0));
    }

    #[test]
    fn influence_cloud_weights() {
        let single = influence_voters(
            0.4,
            0.6,
            &InfluenceCloud {
                radius: 0.1,
                steps: 0,
            },
        );
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].weight, 1.0);

        let cloud = InfluenceCloud {
            radius: 0.2,
            steps: 4,
        };
        let vs = influence_voters(0.5, 0.5, &cloud);
        // The corners and the edge midpoints are at or beyond the radius.
        assert!(vs.len() < 81);
        assert!(vs.iter().all(|wv| wv.weight > 0.0 && wv.weight <= 1.0));
        assert!(vs
            .iter()
            .any(|wv| wv.voter == Voter::new(0.5, 0.5) && (wv.weight - 1.0).abs() < 1e-12));
    }

    #[test]
    fn election_around_a_point() {
        init();
        let cs = three_candidates();
        let cloud = InfluenceCloud {
            radius: 0.15,
            steps: 3,
        };
        let res = run_election_around(
            VotingMethod::Plurality,
            0.12,
            0.5,
            &cloud,
            &cs,
            &VotingParams::DEFAULT_PARAMS,
        )
        .unwrap();
        assert_eq!(res.winner, "left");
        assert_eq!(res.votes_for("right"), Some(0.0));
    }
}
