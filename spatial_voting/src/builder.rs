pub use crate::config::*;

/// A builder for assembling a voter population.
///
/// Using the builder should be considered when voters arrive one at a time.
///
/// ```
/// pub use spatial_voting::builder::Builder;
/// pub use spatial_voting::{Candidate, VotingMethod, VotingParams};
/// # use spatial_voting::VotingErrors;
///
/// let mut builder = Builder::new(VotingMethod::Irv, &VotingParams::DEFAULT_PARAMS)?
///     .candidates(&[Candidate::new("Anna", 0.2, 0.5), Candidate::new("Bob", 0.8, 0.5)])?;
///
/// builder.add_voter(0.1, 0.5)?;
/// builder.add_voter(0.3, 0.4)?;
/// builder.add_weighted_voter(0.9, 0.5, 0.5)?;
///
/// let result = builder.run()?;
/// assert_eq!(result.winner, "Anna");
/// # Ok::<(), VotingErrors>(())
/// ```
pub struct Builder {
    pub(crate) _method: VotingMethod,
    pub(crate) _params: VotingParams,
    pub(crate) _candidates: Option<Vec<Candidate>>,
    pub(crate) _voters: Vec<WeightedVoter>,
}

impl Builder {
    pub fn new(method: VotingMethod, params: &VotingParams) -> Result<Builder, VotingErrors> {
        if params.approval_threshold.is_nan() || params.approval_threshold <= 0.0 {
            return Err(VotingErrors::InvalidInput(format!(
                "the approval threshold must be positive, got {}",
                params.approval_threshold
            )));
        }
        Ok(Builder {
            _method: method,
            _params: params.clone(),
            _candidates: None,
            _voters: Vec::new(),
        })
    }

    pub fn candidates(self, cands: &[Candidate]) -> Result<Builder, VotingErrors> {
        if cands.is_empty() {
            return Err(VotingErrors::InvalidInput(
                "the candidate list is empty".to_string(),
            ));
        }
        Ok(Builder {
            _method: self._method,
            _params: self._params,
            _candidates: Some(cands.to_vec()),
            _voters: Vec::new(),
        })
    }

    /// Adds a voter counting once.
    pub fn add_voter(&mut self, x: f64, y: f64) -> Result<(), VotingErrors> {
        self.add_weighted_voter(x, y, 1.0)
    }

    /// Adds a voter, with a weight attached to it.
    ///
    /// Negative or non-finite weights are rejected. A zero weight is accepted
    /// and does not count.
    pub fn add_weighted_voter(&mut self, x: f64, y: f64, weight: f64) -> Result<(), VotingErrors> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(VotingErrors::InvalidInput(format!(
                "invalid voter weight {}",
                weight
            )));
        }
        self._voters.push(WeightedVoter {
            voter: Voter::new(x, y),
            weight,
        });
        Ok(())
    }

    pub fn num_voters(&self) -> usize {
        self._voters.len()
    }

    pub fn run(&self) -> Result<ElectionResult, VotingErrors> {
        let candidates = self._candidates.as_deref().unwrap_or(&[]);
        crate::run_weighted_election(self._method, &self._voters, candidates, &self._params)
    }
}
