use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ballot::Ballot, session::VotingQuestion};

/// Aggregated ballots for one option.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionTotal {
    pub count: u64,
    pub weight: f64,
}

/// Per-option counts and weights over a set of ballots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub per_option: BTreeMap<String, OptionTotal>,
    pub total_count: u64,
    pub total_weight: f64,
}

impl Tally {
    /// Tally the given ballots, grouped by their stored option key.
    pub fn from_ballots<'a>(ballots: impl IntoIterator<Item = &'a Ballot>) -> Self {
        Self::from_weighted(
            ballots
                .into_iter()
                .map(|ballot| (ballot.option.as_str(), ballot.weight)),
        )
    }

    /// Tally `(option, weight)` pairs.
    ///
    /// Pairs are summed in a canonical order, so the result is identical
    /// for any permutation of the input, down to the last bit of the sums.
    pub fn from_weighted<'a>(votes: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        let mut votes: Vec<(&str, f64)> = votes.into_iter().collect();
        votes.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.total_cmp(&b.1)));

        let mut tally = Self::default();
        for (option, weight) in votes {
            let total = tally.per_option.entry(option.to_string()).or_default();
            total.count += 1;
            total.weight += weight;
            tally.total_count += 1;
            tally.total_weight += weight;
        }
        tally
    }

    /// Share of the total weight received by `option`, in percent.
    /// Zero when nothing has been weighed yet.
    pub fn percentage(&self, option: &str) -> f64 {
        let weight = self
            .per_option
            .get(option)
            .map(|total| total.weight)
            .unwrap_or(0.0);
        percentage_of(weight, self.total_weight)
    }
}

fn percentage_of(weight: f64, total_weight: f64) -> f64 {
    if total_weight == 0.0 {
        0.0
    } else {
        weight / total_weight * 100.0
    }
}

/// Result line for one option, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionResult {
    pub key: String,
    pub label: String,
    pub count: u64,
    pub weight: f64,
    pub percentage: f64,
}

/// A tally joined with the question it answers: every option of the
/// question appears, in question order, even without votes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    pub total_count: u64,
    pub total_weight: f64,
    pub results_visible: bool,
    /// Totals by option key. Missing, like `options`, when the caller may
    /// only see the summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_option: Option<BTreeMap<String, OptionTotal>>,
    /// Missing when the caller may only see the summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<OptionResult>>,
}

impl TallyReport {
    pub fn new(tally: &Tally, question: Option<&VotingQuestion>, results_visible: bool) -> Self {
        let mut options = Vec::with_capacity(tally.per_option.len());
        if let Some(question) = question {
            for option in &question.options {
                if options.iter().any(|o: &OptionResult| o.key == option.key) {
                    continue;
                }
                let total = tally.per_option.get(&option.key).copied().unwrap_or_default();
                options.push(OptionResult {
                    key: option.key.clone(),
                    label: option.label.clone(),
                    count: total.count,
                    weight: total.weight,
                    percentage: percentage_of(total.weight, tally.total_weight),
                });
            }
        }
        // Ballots whose option is no longer on the question still count.
        for (key, total) in &tally.per_option {
            if options.iter().any(|o| &o.key == key) {
                continue;
            }
            options.push(OptionResult {
                key: key.clone(),
                label: key.clone(),
                count: total.count,
                weight: total.weight,
                percentage: percentage_of(total.weight, tally.total_weight),
            });
        }

        Self {
            question: question.map(|q| q.title.clone()),
            total_count: tally.total_count,
            total_weight: tally.total_weight,
            results_visible,
            per_option: Some(tally.per_option.clone()),
            options: Some(options),
        }
    }

    /// Drop the per-option breakdown, keeping only the totals.
    pub fn summary_only(mut self) -> Self {
        self.per_option = None;
        self.options = None;
        self
    }
}
