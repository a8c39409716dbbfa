//! Picker state machine.
//!
//! One [`SelectionEngine`] per picker instance owns a single [`PickerState`].
//! The strategy differences between the main product picker, product-card
//! swatches and the combined-listing dual picker live in [`PickerKind`]
//! instead of an override chain.
//!
//! The engine never touches the network. A pick either resolves to a
//! combination worth navigating to, in which case the caller gets the
//! `Selected` envelope to publish and the target to fetch, or it only changes
//! the option views.

use serde::Serialize;

use crate::anchors::{
    COMBINATIONS_ATTR, CURRENT_INDEX_ATTR_PREFIX, OPTION_AVAILABLE_ATTR, PENDING_ATTR,
    PICKER_KIND_ATTR, PREVIOUS_INDEX_ATTR_PREFIX, PRODUCT_ID_ATTR,
};
use crate::combination::{same_value, Combination, CombinationSet, Separators};
use crate::dom::Element;
use crate::events::{Envelope, InstanceId, PickerEvent, Scope, SelectedDetail};
use crate::selection::{Dimension, SelectionPhase, SelectionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PickerKind {
    /// Plain product: every combination belongs to one product, navigation
    /// only swaps variants.
    Standalone,
    /// Product-card color swatches. Only the color dimension is exposed; a
    /// pick resolves to the first available combination of that color,
    /// falling back to its first combination.
    Swatches,
    /// Color × size across the products of a combined listing.
    CombinedListingDual,
}

impl PickerKind {
    #[must_use]
    pub fn from_attr(raw: &str) -> Option<Self> {
        match raw.trim() {
            "standalone" => Some(PickerKind::Standalone),
            "swatches" => Some(PickerKind::Swatches),
            "combined-listing-dual" => Some(PickerKind::CombinedListingDual),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_attr(self) -> &'static str {
        match self {
            PickerKind::Standalone => "standalone",
            PickerKind::Swatches => "swatches",
            PickerKind::CombinedListingDual => "combined-listing-dual",
        }
    }

    #[must_use]
    pub fn dimensions(self) -> &'static [Dimension] {
        match self {
            PickerKind::Swatches => &[Dimension::Color],
            PickerKind::Standalone | PickerKind::CombinedListingDual => &Dimension::ALL,
        }
    }

    fn resolve<'a>(self, set: &'a CombinationSet, selection: &SelectionState) -> Resolution<'a> {
        match self {
            PickerKind::Swatches => selection
                .get(Dimension::Color)
                .and_then(|color| set.first_for_color(color))
                .map_or(Resolution::Unresolved, Resolution::Navigable),
            PickerKind::Standalone | PickerKind::CombinedListingDual => {
                match selection.phase(set) {
                    SelectionPhase::FullySelected(c) if c.available => Resolution::Navigable(c),
                    SelectionPhase::FullySelected(c) => Resolution::Unavailable(c),
                    SelectionPhase::Empty | SelectionPhase::PartiallySelected => {
                        Resolution::Unresolved
                    }
                }
            }
        }
    }
}

enum Resolution<'a> {
    Navigable(&'a Combination),
    Unavailable(&'a Combination),
    Unresolved,
}

/// An option input rendered by the server inside the picker host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionInput {
    pub dimension: Dimension,
    pub value: String,
    pub input_id: Option<String>,
}

/// Derived view of one option: is it the current choice, and can it be
/// ordered given the other dimension's choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub value: String,
    pub checked: bool,
    pub available: bool,
}

/// Everything one picker instance knows, in one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickerState {
    pub instance_id: InstanceId,
    pub kind: PickerKind,
    pub scope: Scope,
    pub combinations: CombinationSet,
    pub selection: SelectionState,
    pub inputs: Vec<OptionInput>,
    /// Set from the moment `Selected` is raised until the navigation settles.
    pub controls_disabled: bool,
    pub pending_variant: Option<String>,
    pub last_source_id: Option<String>,
    /// Product id rendered on the host, used when no combination is current.
    pub host_product_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PickOutcome {
    /// Navigate to `target`; publish `selected` first.
    Navigate {
        target: Combination,
        selected: Envelope,
    },
    /// The pick resolves to what is already on screen.
    AlreadyCurrent,
    /// The pair exists but cannot be ordered: it stays selected and is shown
    /// as unavailable. No network activity.
    Unavailable(Combination),
    /// The other dimension is missing or the pair does not exist.
    Partial,
    /// Value or dimension unknown to this picker.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct SelectionEngine {
    state: PickerState,
    separators: Separators,
}

impl SelectionEngine {
    /// Connects to a picker host element. Returns `None` when the host has no
    /// `id`, since instances are addressed by it.
    #[must_use]
    pub fn connect(host: &Element, scope: Scope, separators: Separators) -> Option<Self> {
        let id = host.id()?;
        let kind = host
            .attr(PICKER_KIND_ATTR)
            .and_then(PickerKind::from_attr)
            .unwrap_or(PickerKind::CombinedListingDual);
        let mut engine = Self {
            state: PickerState {
                instance_id: InstanceId::new(id),
                kind,
                scope,
                combinations: CombinationSet::default(),
                selection: SelectionState::default(),
                inputs: Vec::new(),
                controls_disabled: false,
                pending_variant: None,
                last_source_id: None,
                host_product_id: None,
            },
            separators,
        };
        engine.rebuild_from_host(host);
        tracing::debug!(
            instance = %engine.state.instance_id,
            kind = kind.as_attr(),
            combinations = engine.state.combinations.len(),
            "picker connected"
        );
        Some(engine)
    }

    #[must_use]
    pub fn state(&self) -> &PickerState {
        &self.state
    }

    #[must_use]
    pub fn instance_id(&self) -> &InstanceId {
        &self.state.instance_id
    }

    #[must_use]
    pub fn kind(&self) -> PickerKind {
        self.state.kind
    }

    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.state.scope
    }

    /// Only page-level pickers that can change the page's product own the
    /// URL. Card and dialog pickers never write it.
    #[must_use]
    pub fn commits_url(&self) -> bool {
        !self.state.scope.is_nested() && self.state.kind != PickerKind::Swatches
    }

    #[must_use]
    pub fn current(&self) -> Option<&Combination> {
        self.state.combinations.current()
    }

    #[must_use]
    pub fn current_product_id(&self) -> Option<&str> {
        self.current()
            .map(|c| c.product_id.as_str())
            .or(self.state.host_product_id.as_deref())
    }

    /// Rebuilds combinations, option inputs and selection from the host.
    pub fn rebuild_from_host(&mut self, host: &Element) {
        self.rebuild_combinations(host);
        self.reseed_selection(host);
    }

    /// Re-reads the combinations payload and option inputs from the host.
    /// Selection is left alone.
    pub fn rebuild_combinations(&mut self, host: &Element) {
        let raw = host
            .find_by_attr(COMBINATIONS_ATTR)
            .and_then(|el| el.attr(COMBINATIONS_ATTR))
            .unwrap_or_default();
        self.state.combinations = CombinationSet::parse_with(raw, &self.separators);
        self.state.inputs = read_inputs(host);
        self.state.host_product_id = host.attr(PRODUCT_ID_ATTR).map(str::to_owned);
    }

    /// Seeds the selection from checked inputs, falling back to the current
    /// combination for any dimension without one.
    pub fn reseed_selection(&mut self, host: &Element) {
        let mut selection = self.state.selection.clone();
        match self.state.combinations.current() {
            Some(current) => selection.reset_to(current),
            None => Dimension::ALL.iter().for_each(|d| selection.clear(*d)),
        }
        for dimension in Dimension::ALL {
            if let Some(value) = checked_value(host, dimension) {
                let index = self.option_index(dimension, &value);
                selection.select(dimension, &value, index);
            }
        }
        self.state.selection = selection;
    }

    /// Applies a user pick.
    pub fn pick(&mut self, dimension: Dimension, value: &str) -> PickOutcome {
        if !self.state.kind.dimensions().contains(&dimension) {
            tracing::debug!(instance = %self.state.instance_id, %dimension, "dimension not exposed by picker");
            return PickOutcome::Ignored;
        }
        let Some(index) = self.option_index(dimension, value) else {
            tracing::debug!(instance = %self.state.instance_id, %dimension, value, "unknown option value");
            return PickOutcome::Ignored;
        };

        self.state.selection.select(dimension, value, Some(index));
        self.state.last_source_id = Some(self.source_id(dimension, value));

        match self.state.kind.resolve(&self.state.combinations, &self.state.selection) {
            Resolution::Navigable(target) => {
                if target.is_current && self.state.pending_variant.is_none() {
                    return PickOutcome::AlreadyCurrent;
                }
                let target = target.clone();
                self.state.controls_disabled = true;
                self.state.pending_variant = Some(target.variant_id.clone());
                let selected = Envelope {
                    origin: self.state.instance_id.clone(),
                    scope: self.state.scope.clone(),
                    event: PickerEvent::Selected(SelectedDetail {
                        id: target.variant_id.clone(),
                    }),
                };
                PickOutcome::Navigate { target, selected }
            }
            Resolution::Unavailable(target) => PickOutcome::Unavailable(target.clone()),
            Resolution::Unresolved => PickOutcome::Partial,
        }
    }

    /// Reacts to another instance's event. Returns `true` when the state
    /// changed.
    ///
    /// `Updated` is a hard reset: the selection is replaced by the
    /// combination matching the new variant, whatever was picked locally.
    /// Variants outside this instance's family are ignored.
    pub fn on_event(&mut self, envelope: &Envelope) -> bool {
        if envelope.origin == self.state.instance_id {
            return false;
        }
        let PickerEvent::Updated(detail) = &envelope.event else {
            return false;
        };
        let Some(matched) = self
            .state
            .combinations
            .find_by_variant_id(&detail.resource.id)
            .cloned()
        else {
            return false;
        };
        tracing::debug!(
            instance = %self.state.instance_id,
            origin = %envelope.origin,
            variant_id = %matched.variant_id,
            "resetting selection from external update"
        );
        self.state.selection.reset_to(&matched);
        true
    }

    /// Enters the pending state for a navigation not started by a pick, such
    /// as a history traversal.
    pub fn begin_pending(&mut self, variant_id: &str) {
        self.state.controls_disabled = true;
        self.state.pending_variant = Some(variant_id.to_owned());
    }

    /// Ends the pending state after a navigation settles or fails.
    pub fn release_controls(&mut self) {
        self.state.controls_disabled = false;
        self.state.pending_variant = None;
    }

    /// Puts the selection back on the combination currently on screen, after
    /// a navigation that never landed. Returns `false` when nothing is
    /// current.
    pub fn revert_to_current(&mut self) -> bool {
        let Some(current) = self.state.combinations.current().cloned() else {
            return false;
        };
        for dimension in Dimension::ALL {
            let value = dimension.value_of(&current);
            if value.is_empty() {
                self.state.selection.clear(dimension);
                continue;
            }
            let index = self.option_index(dimension, value);
            self.state.selection.select(dimension, value, index);
        }
        true
    }

    #[must_use]
    pub fn option_views(&self, dimension: Dimension) -> Vec<OptionView> {
        let set = &self.state.combinations;
        let selection = &self.state.selection;
        let single_dimension = self.state.kind.dimensions().len() == 1;
        let other = if single_dimension {
            None
        } else {
            selection.get(dimension.other())
        };
        self.values(dimension)
            .into_iter()
            .map(|value| {
                let available = match dimension {
                    Dimension::Color => set.has_available(Some(value.as_str()), other),
                    Dimension::Size => set.has_available(other, Some(value.as_str())),
                };
                let checked = selection
                    .get(dimension)
                    .is_some_and(|selected| same_value(selected, &value));
                OptionView {
                    value,
                    checked,
                    available,
                }
            })
            .collect()
    }

    /// Writes the derived view into the host: `checked` and availability on
    /// each input, the pending marker, and pill indices. Returns the number
    /// of attributes changed.
    pub fn render_into(&self, host: &mut Element) -> usize {
        let mut changed = 0;
        for dimension in Dimension::ALL {
            let views = self.option_views(dimension);
            host.for_each_mut(&mut |el: &mut Element| {
                if !is_option_input(el, dimension) {
                    return;
                }
                let Some(view) = el
                    .attr("value")
                    .and_then(|v| views.iter().find(|view| same_value(&view.value, v)))
                else {
                    return;
                };
                changed += usize::from(el.toggle_attr("checked", view.checked));
                changed += usize::from(
                    el.set_attr(OPTION_AVAILABLE_ATTR, if view.available { "true" } else { "false" }),
                );
            });

            let history = self.state.selection.history(dimension);
            for (prefix, index) in [
                (PREVIOUS_INDEX_ATTR_PREFIX, history.previous()),
                (CURRENT_INDEX_ATTR_PREFIX, history.current()),
            ] {
                let name = format!("{prefix}{dimension}");
                changed += usize::from(match index {
                    Some(i) => host.set_attr(&name, &i.to_string()),
                    None => host.remove_attr(&name),
                });
            }
        }
        changed += usize::from(host.toggle_attr(PENDING_ATTR, self.state.controls_disabled));
        changed
    }

    fn values(&self, dimension: Dimension) -> Vec<String> {
        let rendered: Vec<String> = self
            .state
            .inputs
            .iter()
            .filter(|input| input.dimension == dimension)
            .map(|input| input.value.clone())
            .collect();
        if !rendered.is_empty() {
            return rendered;
        }
        match dimension {
            Dimension::Color => self.state.combinations.available_colors(None),
            Dimension::Size => self.state.combinations.available_sizes(None),
        }
    }

    fn option_index(&self, dimension: Dimension, value: &str) -> Option<usize> {
        self.values(dimension)
            .iter()
            .position(|candidate| same_value(candidate, value))
    }

    fn source_id(&self, dimension: Dimension, value: &str) -> String {
        self.state
            .inputs
            .iter()
            .find(|input| input.dimension == dimension && same_value(&input.value, value))
            .and_then(|input| input.input_id.clone())
            .unwrap_or_else(|| format!("{}-{dimension}-{}", self.state.instance_id, value.trim()))
    }
}

fn is_option_input(el: &Element, dimension: Dimension) -> bool {
    el.tag == "input"
        && el
            .attr("name")
            .and_then(Dimension::from_option_name)
            .is_some_and(|d| d == dimension)
}

fn read_inputs(host: &Element) -> Vec<OptionInput> {
    host.find_all(&|el: &Element| el.tag == "input")
        .into_iter()
        .filter_map(|el| {
            let dimension = el.attr("name").and_then(Dimension::from_option_name)?;
            let value = el.attr("value")?.trim();
            if value.is_empty() {
                return None;
            }
            Some(OptionInput {
                dimension,
                value: value.to_owned(),
                input_id: el.id().map(str::to_owned),
            })
        })
        .collect()
}

fn checked_value(host: &Element, dimension: Dimension) -> Option<String> {
    host.find(&|el: &Element| is_option_input(el, dimension) && el.has_attr("checked"))
        .and_then(|el| el.attr("value"))
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "picker_test.rs"]
mod tests;
