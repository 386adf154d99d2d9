//! Majority vote over three classifiers' held-out predictions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ml::Prediction;

/// Prediction sequences that cannot be combined row by row.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AlignmentError {
    #[error("nothing to vote on")]
    Empty,
    #[error("prediction lengths differ: {first}, {second} and {third}")]
    LengthMismatch {
        first: usize,
        second: usize,
        third: usize,
    },
    #[error("{votes} votes for {truth} labels")]
    TruthMismatch { votes: usize, truth: usize },
}

/// Anything that carries a binary decision.
pub trait AsVote {
    fn as_vote(&self) -> bool;
}

impl AsVote for bool {
    fn as_vote(&self) -> bool {
        *self
    }
}

impl AsVote for Prediction {
    fn as_vote(&self) -> bool {
        self.predicted_label
    }
}

/// Ensemble decisions for the held-out rows and how many of them were right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleOutcome {
    pub votes: Vec<bool>,
    pub accuracy: f64,
}

/// Row `i` is `true` when at least two of `a[i]`, `b[i]`, `c[i]` are.
pub fn vote<A: AsVote, B: AsVote, C: AsVote>(
    a: &[A],
    b: &[B],
    c: &[C],
) -> Result<Vec<bool>, AlignmentError> {
    if a.len() != b.len() || a.len() != c.len() {
        return Err(AlignmentError::LengthMismatch {
            first: a.len(),
            second: b.len(),
            third: c.len(),
        });
    }
    if a.is_empty() {
        return Err(AlignmentError::Empty);
    }
    Ok(a
        .iter()
        .zip(b)
        .zip(c)
        .map(|((a, b), c)| {
            let count = [a.as_vote(), b.as_vote(), c.as_vote()]
                .into_iter()
                .filter(|&v| v)
                .count();
            count >= 2
        })
        .collect())
}

/// Fraction of `votes` equal to `truth`.
pub fn accuracy(votes: &[bool], truth: &[bool]) -> Result<f64, AlignmentError> {
    if votes.len() != truth.len() {
        return Err(AlignmentError::TruthMismatch {
            votes: votes.len(),
            truth: truth.len(),
        });
    }
    if votes.is_empty() {
        return Err(AlignmentError::Empty);
    }
    let correct = votes.iter().zip(truth).filter(|(v, t)| v == t).count();
    Ok(correct as f64 / votes.len() as f64)
}

/// Vote, then score the votes against `truth`. All four sequences must align.
pub fn majority_vote<A: AsVote, B: AsVote, C: AsVote>(
    a: &[A],
    b: &[B],
    c: &[C],
    truth: &[bool],
) -> Result<EnsembleOutcome, AlignmentError> {
    let votes = vote(a, b, c)?;
    let accuracy = accuracy(&votes, truth)?;
    Ok(EnsembleOutcome { votes, accuracy })
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: bool = true;
    const F: bool = false;

    #[test]
    fn two_of_three_wins() {
        assert_eq!(vote(&[T, T, F], &[T, F, T], &[F, T, T]).unwrap(), vec![T, T, T]);
        assert_eq!(vote(&[F, F, F], &[F, F, T], &[F, T, F]).unwrap(), vec![F, F, F]);
    }

    #[test]
    fn accuracy_counts_matches() {
        let acc = accuracy(&[T, F, T], &[T, F, F]).unwrap();
        assert!((acc - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn votes_on_predictions() {
        let p = |score: f32| Prediction::from_score(score, 0.5);
        let a = [p(1.0), p(-1.0)];
        let b = [p(0.5), p(0.0)];
        let outcome = majority_vote(&a, &b, &[F, T], &[T, F]).unwrap();
        assert_eq!(outcome.votes, vec![T, F]);
        assert_eq!(outcome.accuracy, 1.0);
    }

    #[test]
    fn misaligned_inputs_are_rejected() {
        assert_eq!(
            vote(&[T], &[T, F], &[T]).unwrap_err(),
            AlignmentError::LengthMismatch {
                first: 1,
                second: 2,
                third: 1,
            }
        );
        assert_eq!(
            majority_vote(&[T], &[T], &[T], &[T, F]).unwrap_err(),
            AlignmentError::TruthMismatch { votes: 1, truth: 2 }
        );
        assert_eq!(
            accuracy(&[T], &[]).unwrap_err(),
            AlignmentError::TruthMismatch { votes: 1, truth: 0 }
        );
    }

    #[test]
    fn mismatch_messages_describe_the_inputs() {
        let err = vote(&[T, F], &[T], &[T, F, T]).unwrap_err();
        assert_eq!(err.to_string(), "prediction lengths differ: 2, 1 and 3");
        let err = accuracy(&[T, F, T], &[T]).unwrap_err();
        assert_eq!(err.to_string(), "3 votes for 1 labels");
    }

    #[test]
    fn empty_input_is_rejected() {
        let none: [bool; 0] = [];
        assert_eq!(vote(&none, &none, &none).unwrap_err(), AlignmentError::Empty);
        assert_eq!(accuracy(&none, &none).unwrap_err(), AlignmentError::Empty);
    }
}
