//! Cross-component events and the bus that routes them.
//!
//! Two events exist:
//!
//! - [`PickerEvent::Selected`] fires as soon as a pick resolves to a
//!   combination, before any network activity, so controls can be disabled
//!   immediately.
//! - [`PickerEvent::Updated`] fires once the fetched markup has been morphed
//!   in; every listener resynchronises from it.
//!
//! Listeners live in a [`Scope`]. An event reaches listeners of its own scope
//! first. `Updated` raised inside a nested scope (a product card or the
//! quick-add dialog) stops there; everything else reaches every listener.
//! The origin of an event never receives it back.

use std::sync::Arc;

use serde::Serialize;

use crate::dom::Element;
use crate::variant::SelectedVariant;

/// Identity of a listener: the id of its host element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct InstanceId(String);

impl InstanceId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Region of the page a listener belongs to. Nested scopes carry the id of
/// their root element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Scope {
    Page,
    Card(String),
    QuickAdd(String),
}

impl Scope {
    #[must_use]
    pub fn is_nested(&self) -> bool {
        !matches!(self, Scope::Page)
    }

    /// Id of the nested scope's root element.
    #[must_use]
    pub fn root_id(&self) -> Option<&str> {
        match self {
            Scope::Page => None,
            Scope::Card(id) | Scope::QuickAdd(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedDetail {
    /// Variant id pending selection.
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProduct {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdatedData {
    /// The fetched document, for listeners extracting their own fragment.
    #[serde(skip)]
    pub html: Arc<Element>,
    pub product_id: String,
    /// Set when the navigation crossed product boundaries.
    pub new_product: Option<NewProduct>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdatedDetail {
    pub resource: SelectedVariant,
    /// Id of the option input the pick came from.
    pub source_id: String,
    pub data: UpdatedData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "detail", rename_all = "lowercase")]
pub enum PickerEvent {
    Selected(SelectedDetail),
    Updated(UpdatedDetail),
}

impl PickerEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            PickerEvent::Selected(_) => EventKind::Selected,
            PickerEvent::Updated(_) => EventKind::Updated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    Selected,
    Updated,
}

/// An event together with where it was raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub origin: InstanceId,
    pub scope: Scope,
    pub event: PickerEvent,
}

impl Envelope {
    /// `true` when the bus will not carry this event past its own scope.
    #[must_use]
    pub fn stops_at_scope(&self) -> bool {
        self.scope.is_nested() && self.event.kind() == EventKind::Updated
    }
}

#[derive(Debug, Clone)]
struct Subscription {
    listener: InstanceId,
    scope: Scope,
    kinds: Vec<EventKind>,
}

/// Subscription table. Routing is pure: [`EventBus::route`] returns the
/// listeners to deliver to, in delivery order, and the owner of the
/// listeners performs the delivery.
#[derive(Debug, Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for `kinds`. Re-subscribing replaces the previous
    /// registration.
    pub fn subscribe(&mut self, listener: InstanceId, scope: Scope, kinds: &[EventKind]) {
        self.unsubscribe(&listener);
        self.subscriptions.push(Subscription {
            listener,
            scope,
            kinds: kinds.to_vec(),
        });
    }

    pub fn unsubscribe(&mut self, listener: &InstanceId) {
        self.subscriptions.retain(|s| &s.listener != listener);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Listeners that receive `envelope`: same-scope listeners first, then,
    /// unless the event stops at its scope, everyone else. The origin is
    /// always skipped.
    #[must_use]
    pub fn route(&self, envelope: &Envelope) -> Vec<InstanceId> {
        let kind = envelope.event.kind();
        let interested = |s: &&Subscription| s.kinds.contains(&kind) && s.listener != envelope.origin;

        let mut recipients: Vec<InstanceId> = self
            .subscriptions
            .iter()
            .filter(interested)
            .filter(|s| s.scope == envelope.scope)
            .map(|s| s.listener.clone())
            .collect();

        if !envelope.stops_at_scope() {
            recipients.extend(
                self.subscriptions
                    .iter()
                    .filter(interested)
                    .filter(|s| s.scope != envelope.scope)
                    .map(|s| s.listener.clone()),
            );
        }
        recipients
    }
}

#[cfg(test)]
#[path = "events_test.rs"]
mod tests;
