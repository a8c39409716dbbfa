//! Per-instance selection: the chosen value of each option dimension.

use serde::Serialize;

use crate::combination::{Combination, CombinationSet};

/// An option dimension of the combined listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Color,
    Size,
}

impl Dimension {
    pub const ALL: [Dimension; 2] = [Dimension::Color, Dimension::Size];

    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Dimension::Color => Dimension::Size,
            Dimension::Size => Dimension::Color,
        }
    }

    /// Input `name` used by the server-rendered option inputs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Color => "color",
            Dimension::Size => "size",
        }
    }

    /// Maps a merchant option name onto a dimension.
    #[must_use]
    pub fn from_option_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "color" | "colour" => Some(Dimension::Color),
            "size" => Some(Dimension::Size),
            _ => None,
        }
    }

    /// The value of this dimension on `combination`.
    #[must_use]
    pub fn value_of(self, combination: &Combination) -> &str {
        match self {
            Dimension::Color => &combination.color,
            Dimension::Size => &combination.size,
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The last two option indices picked in one dimension, oldest first.
///
/// Only feeds the pill animation; no business logic reads it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexHistory {
    slots: [Option<usize>; 2],
}

impl IndexHistory {
    pub fn record(&mut self, index: usize) {
        if self.slots[1] == Some(index) {
            return;
        }
        self.slots[0] = self.slots[1];
        self.slots[1] = Some(index);
    }

    #[must_use]
    pub fn current(&self) -> Option<usize> {
        self.slots[1]
    }

    #[must_use]
    pub fn previous(&self) -> Option<usize> {
        self.slots[0]
    }
}

/// Where a picker stands given its selection and combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase<'a> {
    Empty,
    PartiallySelected,
    FullySelected(&'a Combination),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionState {
    selected_color: Option<String>,
    selected_size: Option<String>,
    color_history: IndexHistory,
    size_history: IndexHistory,
}

impl SelectionState {
    /// Selection of an on-screen combination.
    #[must_use]
    pub fn seeded_from(combination: &Combination) -> Self {
        let mut state = Self::default();
        state.reset_to(combination);
        state
    }

    #[must_use]
    pub fn get(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Color => self.selected_color.as_deref(),
            Dimension::Size => self.selected_size.as_deref(),
        }
    }

    /// Records a user pick. `index` is the option's position in its row.
    pub fn select(&mut self, dimension: Dimension, value: &str, index: Option<usize>) {
        let trimmed = value.trim().to_owned();
        match dimension {
            Dimension::Color => self.selected_color = Some(trimmed),
            Dimension::Size => self.selected_size = Some(trimmed),
        }
        if let Some(index) = index {
            self.history_mut(dimension).record(index);
        }
    }

    pub fn clear(&mut self, dimension: Dimension) {
        match dimension {
            Dimension::Color => self.selected_color = None,
            Dimension::Size => self.selected_size = None,
        }
    }

    /// Hard reset of both dimensions to `combination`. Index history is kept
    /// so the pill can animate from where it was.
    pub fn reset_to(&mut self, combination: &Combination) {
        self.selected_color = non_empty(&combination.color);
        self.selected_size = non_empty(&combination.size);
    }

    #[must_use]
    pub fn history(&self, dimension: Dimension) -> &IndexHistory {
        match dimension {
            Dimension::Color => &self.color_history,
            Dimension::Size => &self.size_history,
        }
    }

    fn history_mut(&mut self, dimension: Dimension) -> &mut IndexHistory {
        match dimension {
            Dimension::Color => &mut self.color_history,
            Dimension::Size => &mut self.size_history,
        }
    }

    #[must_use]
    pub fn phase<'a>(&self, combinations: &'a CombinationSet) -> SelectionPhase<'a> {
        match (self.selected_color.as_deref(), self.selected_size.as_deref()) {
            (None, None) => SelectionPhase::Empty,
            (Some(color), Some(size)) => combinations
                .find(color, size)
                .map_or(SelectionPhase::PartiallySelected, SelectionPhase::FullySelected),
            _ => SelectionPhase::PartiallySelected,
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family() -> CombinationSet {
        CombinationSet::parse_default(
            "P1|V1|Red|S|/a|true|true:::P2|V2|Blue|S|/b|true|false:::P3|V3|Red|M|/c|false|false",
        )
    }

    #[test]
    fn phase_progresses_from_empty_to_fully_selected() {
        let set = family();
        let mut state = SelectionState::default();
        assert_eq!(state.phase(&set), SelectionPhase::Empty);

        state.select(Dimension::Color, "Blue", Some(1));
        assert_eq!(state.phase(&set), SelectionPhase::PartiallySelected);

        state.select(Dimension::Size, "S", Some(0));
        match state.phase(&set) {
            SelectionPhase::FullySelected(c) => assert_eq!(c.variant_id, "V2"),
            other => panic!("expected FullySelected, got {other:?}"),
        }
    }

    #[test]
    fn unknown_pair_stays_partially_selected() {
        let set = family();
        let mut state = SelectionState::default();
        state.select(Dimension::Color, "Blue", None);
        state.select(Dimension::Size, "M", None);
        assert_eq!(state.phase(&set), SelectionPhase::PartiallySelected);
    }

    #[test]
    fn history_keeps_last_two_indices() {
        let mut history = IndexHistory::default();
        history.record(0);
        history.record(2);
        history.record(2);
        history.record(1);
        assert_eq!(history.previous(), Some(2));
        assert_eq!(history.current(), Some(1));
    }

    #[test]
    fn reset_to_replaces_both_dimensions_and_keeps_history() {
        let set = family();
        let mut state = SelectionState::default();
        state.select(Dimension::Color, "Red", Some(0));
        state.select(Dimension::Size, "M", Some(1));
        state.reset_to(set.find_by_variant_id("V2").unwrap());
        assert_eq!(state.get(Dimension::Color), Some("Blue"));
        assert_eq!(state.get(Dimension::Size), Some("S"));
        assert_eq!(state.history(Dimension::Size).current(), Some(1));
    }

    #[test]
    fn dimension_from_option_name_accepts_british_spelling() {
        assert_eq!(Dimension::from_option_name("Colour"), Some(Dimension::Color));
        assert_eq!(Dimension::from_option_name(" SIZE "), Some(Dimension::Size));
        assert_eq!(Dimension::from_option_name("Material"), None);
    }
}
