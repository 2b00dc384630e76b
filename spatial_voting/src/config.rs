// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;
use std::str::FromStr;

/// A candidate standing at a fixed position of the opinion square.
///
/// Only `id`, `x` and `y` matter to the scoring. The display metadata is
/// carried along for the callers that draw the candidates.
#[derive(PartialEq, Debug, Clone)]
pub struct Candidate {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub name: Option<String>,
    pub color: Option<String>,
}

impl Candidate {
    pub fn new(id: &str, x: f64, y: f64) -> Candidate {
        Candidate {
            id: id.to_string(),
            x,
            y,
            name: None,
            color: None,
        }
    }
}

/// The position of one voter. Clamping to the unit square is left to the caller.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Voter {
    pub x: f64,
    pub y: f64,
}

impl Voter {
    pub fn new(x: f64, y: f64) -> Voter {
        Voter { x, y }
    }
}

/// A voter whose contribution to every tally is scaled by `weight`.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct WeightedVoter {
    pub voter: Voter,
    pub weight: f64,
}

/// The voting methods supported by the engine.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum VotingMethod {
    Plurality,
    Approval,
    Borda,
    Irv,
    SmithApproval,
}

impl VotingMethod {
    pub const ALL: [VotingMethod; 5] = [
        VotingMethod::Plurality,
        VotingMethod::Approval,
        VotingMethod::Borda,
        VotingMethod::Irv,
        VotingMethod::SmithApproval,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            VotingMethod::Plurality => "plurality",
            VotingMethod::Approval => "approval",
            VotingMethod::Borda => "borda",
            VotingMethod::Irv => "irv",
            VotingMethod::SmithApproval => "smithApproval",
        }
    }
}

impl Display for VotingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Error returned when parsing an unknown method name.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct UnknownMethod(pub String);

impl Error for UnknownMethod {}

impl Display for UnknownMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown voting method {:?}", self.0)
    }
}

impl FromStr for VotingMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VotingMethod::ALL
            .iter()
            .find(|m| m.name() == s)
            .copied()
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

// ********* Configuration **********

#[derive(PartialEq, Debug, Clone)]
pub struct VotingParams {
    /// Distance under which a voter approves of a candidate. Must be > 0.
    pub approval_threshold: f64,
}

impl VotingParams {
    pub const DEFAULT_PARAMS: VotingParams = VotingParams {
        approval_threshold: 0.25,
    };
}

/// The weighted neighbourhood of one point of the map.
///
/// Voters sit on a square lattice of `2 * steps + 1` points per axis spanning
/// `[-radius, radius]` around the point. A lattice voter strictly inside the
/// radius counts with the falloff weight of its distance to the point.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct InfluenceCloud {
    pub radius: f64,
    pub steps: u32,
}

// ******** Output data structures *********

/// The ballot cast by a single voter, in the shape each method uses.
#[derive(PartialEq, Debug, Clone)]
pub enum Ballot {
    /// plurality: the closest candidate.
    Single(String),
    /// approval and smithApproval: the approved candidates with their weight.
    Approval(Vec<(String, f64)>),
    /// borda: the full ranking with the points of every position.
    Points(Vec<(String, u64)>),
    /// irv: the full ranking, used as a ranked ballot.
    Ranking(Vec<String>),
}

/// One candidate of a ranking, with its distance to the voter.
#[derive(PartialEq, Debug, Clone)]
pub struct RankedCandidate {
    pub id: String,
    pub dist: f64,
}

/// Statistics for one round.
#[derive(PartialEq, Debug, Clone)]
pub struct RoundStats {
    pub round: u32,
    pub tally: Vec<(String, f64)>,
    pub elected: Option<String>,
    pub eliminated: Option<String>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ElectionResult {
    pub winner: String,
    /// Every candidate, in input order.
    pub tally: Vec<(String, f64)>,
    /// Only filled by instant-runoff.
    pub elimination_order: Vec<String>,
    /// One entry per round for instant-runoff, a single round otherwise.
    pub round_stats: Vec<RoundStats>,
}

impl ElectionResult {
    pub fn votes_for(&self, id: &str) -> Option<f64> {
        self.tally
            .iter()
            .find(|(cid, _)| cid == id)
            .map(|(_, count)| *count)
    }
}

/// Errors that prevent the engine from scoring.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum VotingErrors {
    InvalidInput(String),
}

impl Error for VotingErrors {}

impl Display for VotingErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VotingErrors::InvalidInput(reason) => write!(f, "invalid input: {}", reason),
        }
    }
}
