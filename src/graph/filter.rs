//! Client-side filters. Every function here is pure: it reads a source
//! series or dataset and returns a new one, leaving the source untouched.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::dataset::GraphDataset;
use crate::error::{Result, VisError};

/// Share of the most frequent variables to keep. `All` disables the filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopPercentage {
	#[default]
	All,
	P5,
	P10,
	P25,
	P50,
	P75,
}

impl TopPercentage {
	pub const OPTIONS: [TopPercentage; 6] = [
		TopPercentage::All,
		TopPercentage::P5,
		TopPercentage::P10,
		TopPercentage::P25,
		TopPercentage::P50,
		TopPercentage::P75,
	];

	pub fn value(self) -> u8 {
		match self {
			TopPercentage::All => 0,
			TopPercentage::P5 => 5,
			TopPercentage::P10 => 10,
			TopPercentage::P25 => 25,
			TopPercentage::P50 => 50,
			TopPercentage::P75 => 75,
		}
	}

	pub fn from_value(value: u8) -> Option<Self> {
		Self::OPTIONS.into_iter().find(|p| p.value() == value)
	}

	pub fn description(self) -> String {
		match self {
			TopPercentage::All => "All (100%)".into(),
			other => format!("{}%", other.value()),
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartForm {
	#[default]
	Both,
	Positive,
	Negative,
	/// Variables that only ever occur with one sign.
	Singles,
}

impl ChartForm {
	pub const OPTIONS: [ChartForm; 4] = [
		ChartForm::Both,
		ChartForm::Positive,
		ChartForm::Negative,
		ChartForm::Singles,
	];

	pub fn key(self) -> &'static str {
		match self {
			ChartForm::Both => "both",
			ChartForm::Positive => "positive",
			ChartForm::Negative => "negative",
			ChartForm::Singles => "singles",
		}
	}

	pub fn from_key(key: &str) -> Option<Self> {
		Self::OPTIONS.into_iter().find(|f| f.key() == key)
	}

	pub fn description(self) -> &'static str {
		match self {
			ChartForm::Both => "Both",
			ChartForm::Positive => "Positive",
			ChartForm::Negative => "Negative",
			ChartForm::Singles => "Only positive/negative variables",
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableSelection {
	#[default]
	All,
	Subset(Vec<String>),
}

impl VariableSelection {
	/// An empty subset means "everything".
	pub fn from_list(variables: Vec<String>) -> Self {
		if variables.is_empty() {
			VariableSelection::All
		} else {
			VariableSelection::Subset(variables)
		}
	}

	/// Query value for `selectedVariables`.
	pub fn query_value(&self) -> String {
		match self {
			VariableSelection::All => String::new(),
			VariableSelection::Subset(vars) => vars.join(","),
		}
	}
}

/// Precomputed DPLL search trees bundled in one payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Heuristic {
	Dlis,
	Jw,
	#[default]
	Moms,
}

impl Heuristic {
	pub const ALL: [Heuristic; 3] = [Heuristic::Dlis, Heuristic::Jw, Heuristic::Moms];

	/// Payload key prefix (`dlis_nodes`, `dlis_edges`, ...).
	pub fn key(self) -> &'static str {
		match self {
			Heuristic::Dlis => "dlis",
			Heuristic::Jw => "jw",
			Heuristic::Moms => "moms",
		}
	}

	pub fn from_key(key: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|h| h.key() == key)
	}
}

impl fmt::Display for Heuristic {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Heuristic::Dlis => "DLIS",
			Heuristic::Jw => "Jeroslow-Wang",
			Heuristic::Moms => "MOMS",
		})
	}
}

pub type HeuristicSets = BTreeMap<Heuristic, GraphDataset>;

/// User-selected view filters for one session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
	pub top_percentage: TopPercentage,
	pub chart_form: ChartForm,
	pub selected_variables: VariableSelection,
	/// `None` picks the default heuristic.
	pub heuristic: Option<Heuristic>,
}

/// Parallel per-variable occurrence counts. A `None` side is a series the
/// chart form has hidden.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DistributionSeries {
	pub labels: Vec<String>,
	pub positive: Option<Vec<u64>>,
	pub negative: Option<Vec<u64>>,
}

impl DistributionSeries {
	pub fn new(labels: Vec<String>, positive: Vec<u64>, negative: Vec<u64>) -> Self {
		Self {
			labels,
			positive: Some(positive),
			negative: Some(negative),
		}
	}

	pub fn len(&self) -> usize {
		self.labels.len()
	}

	pub fn is_empty(&self) -> bool {
		self.labels.is_empty()
	}

	pub fn positive_at(&self, i: usize) -> u64 {
		side_at(self.positive.as_deref(), i)
	}

	pub fn negative_at(&self, i: usize) -> u64 {
		side_at(self.negative.as_deref(), i)
	}

	pub fn combined_at(&self, i: usize) -> u64 {
		self.positive_at(i) + self.negative_at(i)
	}

	fn retain_indices(&self, keep: impl Fn(usize) -> bool) -> Self {
		let indices: Vec<usize> = (0..self.len()).filter(|&i| keep(i)).collect();
		let pick = |side: &Option<Vec<u64>>| -> Option<Vec<u64>> {
			side.as_ref()
				.map(|values| indices.iter().map(|&i| side_at(Some(values.as_slice()), i)).collect())
		};
		Self {
			labels: indices.iter().map(|&i| self.labels[i].clone()).collect(),
			positive: pick(&self.positive),
			negative: pick(&self.negative),
		}
	}
}

fn side_at(side: Option<&[u64]>, i: usize) -> u64 {
	side.and_then(|values| values.get(i).copied()).unwrap_or(0)
}

pub fn filter_by_form(series: &DistributionSeries, form: ChartForm) -> DistributionSeries {
	match form {
		ChartForm::Both => series.clone(),
		ChartForm::Positive => DistributionSeries {
			negative: None,
			..series.clone()
		},
		ChartForm::Negative => DistributionSeries {
			positive: None,
			..series.clone()
		},
		ChartForm::Singles => {
			series.retain_indices(|i| (series.positive_at(i) > 0) != (series.negative_at(i) > 0))
		}
	}
}

/// Keeps the labels whose combined count reaches the count at rank
/// `floor(total * pct / 100 + 0.99)`. Ties at the threshold are all kept.
pub fn filter_by_top_percentage(
	series: &DistributionSeries,
	total_count: usize,
	percentage: TopPercentage,
) -> DistributionSeries {
	let pct = percentage.value();
	if pct == 0 {
		return series.clone();
	}
	let target = (total_count as f64 * f64::from(pct) / 100.0 + 0.99).floor() as usize;
	let mut ranked: Vec<u64> = (0..series.len()).map(|i| series.combined_at(i)).collect();
	if target == 0 || ranked.is_empty() {
		return series.retain_indices(|_| false);
	}
	ranked.sort_unstable_by(|a, b| b.cmp(a));
	let threshold = ranked[target.min(ranked.len()) - 1];
	series.retain_indices(|i| series.combined_at(i) >= threshold)
}

/// Form first, then the top-percentage threshold on what remains.
pub fn apply_chart_filters(
	series: &DistributionSeries,
	total_count: usize,
	filter: &FilterState,
) -> DistributionSeries {
	let shaped = filter_by_form(series, filter.chart_form);
	filter_by_top_percentage(&shaped, total_count, filter.top_percentage)
}

/// Outcome of a variable selection on a graph kind.
#[derive(Clone, Debug, PartialEq)]
pub enum VariableFilter {
	/// The unfiltered dataset is the answer.
	Local(GraphDataset),
	/// The server must lay out the subset; fetch again with these variables.
	Refetch(Vec<String>),
}

pub fn filter_by_variable_selection(
	full: &GraphDataset,
	selection: &VariableSelection,
) -> VariableFilter {
	match selection {
		VariableSelection::All => VariableFilter::Local(full.clone()),
		VariableSelection::Subset(vars) => VariableFilter::Refetch(vars.clone()),
	}
}

/// Picks a bundled heuristic dataset by name. A missing key is an error,
/// never a silent fallback to another heuristic.
pub fn select_heuristic(
	sets: &HeuristicSets,
	requested: Option<Heuristic>,
) -> Result<(Heuristic, &GraphDataset)> {
	let heuristic = requested.unwrap_or_default();
	sets.get(&heuristic)
		.map(|dataset| (heuristic, dataset))
		.ok_or_else(|| VisError::HeuristicUnavailable(heuristic.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::dataset::Node;
	use pretty_assertions::assert_eq;

	fn labels(n: usize) -> Vec<String> {
		(1..=n).map(|i| i.to_string()).collect()
	}

	#[test]
	fn top_25_percent_of_ten_keeps_three() {
		let series = DistributionSeries::new(labels(10), vec![10, 9, 8, 7, 6, 5, 4, 3, 2, 1], vec![0; 10]);
		let kept = filter_by_top_percentage(&series, 10, TopPercentage::P25);
		assert_eq!(kept.labels, vec!["1", "2", "3"]);
		assert_eq!(kept.positive, Some(vec![10, 9, 8]));
		assert_eq!(kept.negative, Some(vec![0, 0, 0]));
	}

	#[test]
	fn top_percentage_ranks_combined_counts() {
		let series = DistributionSeries::new(labels(4), vec![1, 4, 0, 2], vec![5, 0, 1, 2]);
		// combined [6, 4, 1, 4]; target floor(4 * 0.25 + 0.99) = 1
		let kept = filter_by_top_percentage(&series, 4, TopPercentage::P25);
		assert_eq!(kept.labels, vec!["1"]);
	}

	#[test]
	fn threshold_ties_are_all_included() {
		let series = DistributionSeries::new(labels(5), vec![5, 5, 5, 1, 0], vec![0; 5]);
		let kept = filter_by_top_percentage(&series, 5, TopPercentage::P5);
		assert_eq!(kept.labels, vec!["1", "2", "3"]);
	}

	#[test]
	fn all_is_identity() {
		let series = DistributionSeries::new(labels(3), vec![1, 2, 3], vec![0, 0, 0]);
		assert_eq!(filter_by_top_percentage(&series, 3, TopPercentage::All), series);
		assert_eq!(filter_by_form(&series, ChartForm::Both), series);
	}

	#[test]
	fn singles_keep_one_sided_variables() {
		let series = DistributionSeries::new(labels(4), vec![0, 3, 2, 0], vec![5, 0, 2, 0]);
		let kept = filter_by_form(&series, ChartForm::Singles);
		assert_eq!(kept.labels, vec!["1", "2"]);
		assert_eq!(kept.positive, Some(vec![0, 3]));
		assert_eq!(kept.negative, Some(vec![5, 0]));
	}

	#[test]
	fn positive_form_hides_the_negative_series() {
		let series = DistributionSeries::new(labels(2), vec![1, 2], vec![3, 4]);
		let shown = filter_by_form(&series, ChartForm::Positive);
		assert_eq!(shown.negative, None);
		assert_eq!(shown.combined_at(1), 2);
		let shown = filter_by_form(&series, ChartForm::Negative);
		assert_eq!(shown.positive, None);
		assert_eq!(shown.combined_at(1), 4);
	}

	#[test]
	fn form_runs_before_the_threshold() {
		let series = DistributionSeries::new(labels(3), vec![9, 0, 3], vec![9, 4, 0]);
		let filter = FilterState {
			top_percentage: TopPercentage::P25,
			chart_form: ChartForm::Singles,
			..FilterState::default()
		};
		// singles leave labels 2 and 3; target floor(3 * 0.25 + 0.99) = 1
		let kept = apply_chart_filters(&series, 3, &filter);
		assert_eq!(kept.labels, vec!["2"]);
	}

	#[test]
	fn filters_do_not_touch_the_source() {
		let series = DistributionSeries::new(labels(3), vec![1, 0, 3], vec![0, 2, 0]);
		let before = series.clone();
		let _ = apply_chart_filters(
			&series,
			3,
			&FilterState {
				top_percentage: TopPercentage::P50,
				chart_form: ChartForm::Negative,
				..FilterState::default()
			},
		);
		assert_eq!(series, before);
	}

	#[test]
	fn variable_selection_all_is_local() {
		let full = GraphDataset::from_parts(vec![Node::new(1)], vec![]);
		assert_eq!(
			filter_by_variable_selection(&full, &VariableSelection::All),
			VariableFilter::Local(full.clone())
		);
		assert_eq!(
			filter_by_variable_selection(&full, &VariableSelection::from_list(vec!["3".into()])),
			VariableFilter::Refetch(vec!["3".into()])
		);
		assert_eq!(VariableSelection::from_list(vec![]), VariableSelection::All);
	}

	#[test]
	fn missing_heuristic_is_an_error() {
		let mut sets = HeuristicSets::new();
		sets.insert(Heuristic::Moms, GraphDataset::from_parts(vec![Node::new(1)], vec![]));
		let (picked, _) = select_heuristic(&sets, None).unwrap();
		assert_eq!(picked, Heuristic::Moms);
		assert_eq!(
			select_heuristic(&sets, Some(Heuristic::Jw)).unwrap_err(),
			VisError::HeuristicUnavailable("Jeroslow-Wang".into())
		);
	}
}
