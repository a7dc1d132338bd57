//! Majority vote over repeated judge opinions.
//!
//! Opinions are grouped by exact score. The canonical response is the first
//! response (in call order) carrying the most frequent score, so ties always
//! resolve to whichever score was seen first.

use serde::{Deserialize, Serialize};

use crate::oracle::OracleResponse;

/// How far the judges agreed on the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Agreement {
    AllSame,
    PartialAgreement,
    AllDifferent,
}

/// The job's final output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusResult {
    pub response: OracleResponse,
    pub agreement: Agreement,
    /// Number of opinions the vote was taken over.
    pub votes: usize,
}

/// Occurrences of one distinct score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreTally {
    pub score: f64,
    pub count: usize,
    /// Index of the first response carrying this score.
    pub first_index: usize,
}

/// Count each distinct score, in order of first occurrence.
pub fn tally(responses: &[OracleResponse]) -> Vec<ScoreTally> {
    responses
        .iter()
        .enumerate()
        .fold(Vec::new(), |mut tallies: Vec<ScoreTally>, (index, response)| {
            match tallies.iter_mut().find(|t| t.score == response.score) {
                Some(existing) => existing.count += 1,
                None => tallies.push(ScoreTally {
                    score: response.score,
                    count: 1,
                    first_index: index,
                }),
            }
            tallies
        })
}

fn classify(distinct: usize, total: usize) -> Agreement {
    if distinct == 1 {
        Agreement::AllSame
    } else if distinct == total {
        Agreement::AllDifferent
    } else {
        Agreement::PartialAgreement
    }
}

/// Collapse a batch of successful opinions into one canonical result.
///
/// # Panics
///
/// Panics if `responses` is empty. Callers only vote over batches in which
/// every requested call succeeded.
pub fn resolve(mut responses: Vec<OracleResponse>) -> ConsensusResult {
    assert!(!responses.is_empty(), "consensus requires at least one response");

    let tallies = tally(&responses);
    let agreement = classify(tallies.len(), responses.len());

    // `tallies` is in first-occurrence order, so keeping the earlier entry on
    // equal counts is the tie-break.
    let leader = tallies
        .iter()
        .fold(tallies[0], |best, t| if t.count > best.count { *t } else { best });

    let votes = responses.len();
    let response = responses.swap_remove(leader.first_index);

    ConsensusResult {
        response,
        agreement,
        votes,
    }
}
