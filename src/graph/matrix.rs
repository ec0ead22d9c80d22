use serde::{Deserialize, Serialize};

/// Co-occurrence counts of one variable with another, split by the sign the
/// row variable appears with. The diagonal carries `-1/-1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
	pub positive: i64,
	pub negative: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRow {
	pub dependencies: Vec<Dependency>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyMatrix {
	pub labels: Vec<String>,
	pub rows: Vec<DependencyRow>,
}

/// How cells are printed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatrixMode {
	/// `x` when the pair co-occurs at all.
	#[default]
	Occurrence,
	/// `+`, `-` or `+/-`.
	Sign,
	/// `positive/negative`.
	Counts,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellTone {
	Plain,
	Diagonal,
	Red,
	Green,
	Yellow,
}

impl CellTone {
	pub fn css(self) -> &'static str {
		match self {
			CellTone::Plain => "",
			CellTone::Diagonal => "background-color: #000000",
			CellTone::Red => "background-color: hsl(0, 65%, 62%)",
			CellTone::Green => "background-color: hsl(101, 65%, 62%)",
			CellTone::Yellow => "background-color: hsl(54, 65%, 62%)",
		}
	}
}

impl MatrixMode {
	pub const OPTIONS: [MatrixMode; 3] = [MatrixMode::Occurrence, MatrixMode::Sign, MatrixMode::Counts];

	pub fn key(self) -> &'static str {
		match self {
			MatrixMode::Occurrence => "occurrence",
			MatrixMode::Sign => "sign",
			MatrixMode::Counts => "counts",
		}
	}

	pub fn from_key(key: &str) -> Option<Self> {
		Self::OPTIONS.into_iter().find(|m| m.key() == key)
	}

	pub fn description(self) -> &'static str {
		match self {
			MatrixMode::Occurrence => "Occurrence (x)",
			MatrixMode::Sign => "Sign (+/-)",
			MatrixMode::Counts => "Counts (positive/negative)",
		}
	}

	pub fn cell_text(self, dep: Dependency) -> String {
		match self {
			MatrixMode::Occurrence => {
				if dep.positive + dep.negative != 0 {
					"x".into()
				} else {
					" ".into()
				}
			}
			MatrixMode::Sign => {
				let mut out = String::new();
				if dep.positive > 0 {
					out.push('+');
				}
				if dep.negative > 0 {
					out.push_str(if dep.positive > 0 { "/-" } else { "-" });
				}
				out
			}
			MatrixMode::Counts => format!("{}/{}", dep.positive, dep.negative),
		}
	}

	pub fn cell_tone(self, dep: Dependency, row: usize, col: usize, colors: bool) -> CellTone {
		if row == col {
			return CellTone::Diagonal;
		}
		if !colors {
			return CellTone::Plain;
		}
		match self {
			MatrixMode::Occurrence if dep.positive + dep.negative != 0 => CellTone::Yellow,
			MatrixMode::Occurrence => CellTone::Plain,
			MatrixMode::Sign => match (dep.positive > 0, dep.negative > 0) {
				(true, true) => CellTone::Yellow,
				(true, false) => CellTone::Green,
				(false, true) => CellTone::Red,
				(false, false) => CellTone::Plain,
			},
			MatrixMode::Counts => {
				if dep.negative == dep.positive {
					if dep.negative == 0 { CellTone::Plain } else { CellTone::Yellow }
				} else if dep.negative < dep.positive {
					CellTone::Green
				} else {
					CellTone::Red
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MIXED: Dependency = Dependency { positive: 2, negative: 1 };
	const NEG: Dependency = Dependency { positive: 0, negative: 3 };
	const NONE: Dependency = Dependency { positive: 0, negative: 0 };

	#[test]
	fn cell_text_per_mode() {
		assert_eq!(MatrixMode::Occurrence.cell_text(MIXED), "x");
		assert_eq!(MatrixMode::Occurrence.cell_text(NONE), " ");
		assert_eq!(MatrixMode::Sign.cell_text(MIXED), "+/-");
		assert_eq!(MatrixMode::Sign.cell_text(NEG), "-");
		assert_eq!(MatrixMode::Counts.cell_text(MIXED), "2/1");
	}

	#[test]
	fn diagonal_is_always_black_and_colors_are_opt_in() {
		assert_eq!(MatrixMode::Sign.cell_tone(MIXED, 1, 1, false), CellTone::Diagonal);
		assert_eq!(MatrixMode::Sign.cell_tone(NEG, 0, 1, false), CellTone::Plain);
		assert_eq!(MatrixMode::Sign.cell_tone(NEG, 0, 1, true), CellTone::Red);
		assert_eq!(MatrixMode::Counts.cell_tone(MIXED, 0, 1, true), CellTone::Green);
		assert_eq!(MatrixMode::Counts.cell_tone(NONE, 0, 1, true), CellTone::Plain);
	}

	#[test]
	fn modes_round_trip_through_their_keys() {
		for mode in MatrixMode::OPTIONS {
			assert_eq!(MatrixMode::from_key(mode.key()), Some(mode));
		}
		assert_eq!(MatrixMode::from_key("heat"), None);
	}
}
