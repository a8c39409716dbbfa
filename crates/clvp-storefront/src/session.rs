//! One product page with every picker and widget on it.
//!
//! The session is the single writer of the live tree. Picks start
//! navigations on the picking instance's orchestrator; outcomes come back
//! over a channel and are applied one at a time by
//! [`PageSession::apply_outcome`], which runs the morph followed by
//! [`POST_MORPH_STEPS`]. Instances never call each other: they only see
//! the events the bus routes to them.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use clvp_core::anchors::{PICKER_TAG, PRODUCT_CARD_TAG, QUICK_ADD_TAG, SECTION_ID_ATTR, WIDGET_ATTR};
use clvp_core::combination::Separators;
use clvp_core::events::{NewProduct, UpdatedData, UpdatedDetail};
use clvp_core::html::parse_html;
use clvp_core::url_state::{commit, with_params, with_variant};
use clvp_core::{
    AppConfig, Combination, Dimension, Element, Envelope, EventBus, EventKind, History,
    HistoryMode, InstanceId, MemoryHistory, Morph, MorphStats, PickOutcome, PickerEvent,
    PickerKind, ReconcilingMorph, Scope, SelectionEngine, UrlState,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use url::Url;

use crate::client::StorefrontClient;
use crate::context::StoreContext;
use crate::error::StorefrontError;
use crate::orchestrator::{
    apply_document, FetchOutcome, MorphOrchestrator, MorphTarget, NavigationTarget,
    PostMorphStep, POST_MORPH_STEPS,
};
use crate::widgets::{Widget, WidgetKind};

/// Query parameter asking the storefront to render a single section.
const SECTION_PARAM: &str = "section_id";

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub navigation_timeout: Duration,
    pub separators: Separators,
}

impl SessionOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            navigation_timeout: config.navigation_timeout(),
            separators: config.separators(),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(15),
            separators: Separators::default(),
        }
    }
}

/// How an outcome was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    /// Morphed and settled.
    Applied(MorphStats),
    /// Superseded or cancelled; nothing happened.
    Superseded,
    /// Network failure or timeout; page and state left as they were.
    Failed,
    /// Anchor missing; page and state left as they were.
    Aborted,
}

/// Result of bringing the page in line with a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncOutcome {
    /// The page already shows that URL.
    InSync,
    /// A navigation was started, with this generation.
    Navigating(u64),
    /// No combination matches the URL.
    Unresolved,
}

struct PickerSlot {
    engine: SelectionEngine,
    orchestrator: MorphOrchestrator,
}

pub struct PageSession {
    live: Element,
    history: Box<dyn History>,
    client: Arc<StorefrontClient>,
    context: StoreContext,
    morph: Box<dyn Morph>,
    options: SessionOptions,
    pickers: BTreeMap<InstanceId, PickerSlot>,
    widgets: Vec<Widget>,
    bus: EventBus,
    events: Vec<Envelope>,
    outcomes_tx: UnboundedSender<FetchOutcome>,
    outcomes_rx: UnboundedReceiver<FetchOutcome>,
}

impl std::fmt::Debug for PageSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageSession")
            .field("location", &self.history.location().as_str())
            .field("pickers", &self.pickers.keys().collect::<Vec<_>>())
            .field("widgets", &self.widgets.len())
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl PageSession {
    /// Fetches `url` and opens a session on the returned page.
    ///
    /// # Errors
    ///
    /// Returns any fetch error, or [`StorefrontError::Dom`] when the body has
    /// no document root.
    pub async fn open(
        client: Arc<StorefrontClient>,
        url: Url,
        options: SessionOptions,
    ) -> Result<Self, StorefrontError> {
        let body = client.fetch_page(&url).await?;
        let live = parse_html(&body)?;
        Ok(Self::from_document(live, url, client, options))
    }

    /// Opens a session on an already parsed page. Must be called inside a
    /// Tokio runtime once picks are made.
    #[must_use]
    pub fn from_document(
        live: Element,
        url: Url,
        client: Arc<StorefrontClient>,
        options: SessionOptions,
    ) -> Self {
        let context = StoreContext::from_document(&live, &url);
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        let mut session = Self {
            live,
            history: Box::new(MemoryHistory::new(url)),
            client,
            context,
            morph: Box::new(ReconcilingMorph),
            options,
            pickers: BTreeMap::new(),
            widgets: Vec::new(),
            bus: EventBus::new(),
            events: Vec::new(),
            outcomes_tx,
            outcomes_rx,
        };
        session.connect();
        session
    }

    #[must_use]
    pub fn with_history(mut self, history: Box<dyn History>) -> Self {
        self.history = history;
        self
    }

    #[must_use]
    pub fn with_morph(mut self, morph: Box<dyn Morph>) -> Self {
        self.morph = morph;
        self
    }

    #[must_use]
    pub fn live(&self) -> &Element {
        &self.live
    }

    #[must_use]
    pub fn history(&self) -> &dyn History {
        self.history.as_ref()
    }

    #[must_use]
    pub fn location(&self) -> &Url {
        self.history.location()
    }

    #[must_use]
    pub fn context(&self) -> &StoreContext {
        &self.context
    }

    /// Every event published so far, in publication order.
    #[must_use]
    pub fn events(&self) -> &[Envelope] {
        &self.events
    }

    #[must_use]
    pub fn picker(&self, instance: &str) -> Option<&SelectionEngine> {
        self.pickers
            .get(&InstanceId::new(instance))
            .map(|slot| &slot.engine)
    }

    pub fn instances(&self) -> impl Iterator<Item = &InstanceId> {
        self.pickers.keys()
    }

    #[must_use]
    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pickers
            .values()
            .any(|slot| slot.orchestrator.pending().is_some())
    }

    /// Connects pickers and widgets that appeared on the page and drops the
    /// ones whose host is gone. Returns the number of pickers connected.
    pub fn connect(&mut self) -> usize {
        let hosts: Vec<(String, Scope)> = self
            .live
            .find_all(&|el: &Element| el.tag == PICKER_TAG)
            .into_iter()
            .filter_map(|el| {
                let Some(id) = el.id() else {
                    tracing::warn!("skipping picker host without id");
                    return None;
                };
                Some(id.to_owned())
            })
            .map(|id| {
                let scope = scope_of(&self.live, &id);
                (id, scope)
            })
            .collect();

        let vanished: Vec<InstanceId> = self
            .pickers
            .keys()
            .filter(|id| !hosts.iter().any(|(host, _)| host == id.as_str()))
            .cloned()
            .collect();
        for id in vanished {
            tracing::debug!(instance = %id, "picker host removed, disconnecting");
            self.pickers.remove(&id);
            self.bus.unsubscribe(&id);
        }

        let mut connected = 0;
        for (id, scope) in hosts {
            let key = InstanceId::new(id.as_str());
            if self.pickers.contains_key(&key) {
                continue;
            }
            let Some(host) = self.live.find_by_id(&id) else {
                continue;
            };
            let Some(engine) =
                SelectionEngine::connect(host, scope.clone(), self.options.separators.clone())
            else {
                continue;
            };
            let orchestrator = MorphOrchestrator::new(
                key.clone(),
                Arc::clone(&self.client),
                self.options.navigation_timeout,
                self.options.separators.clone(),
                self.outcomes_tx.clone(),
            );
            self.bus.subscribe(key.clone(), scope, &[EventKind::Updated]);
            self.pickers.insert(
                key.clone(),
                PickerSlot {
                    engine,
                    orchestrator,
                },
            );
            self.render(&key);
            connected += 1;
        }

        self.connect_widgets();
        connected
    }

    fn connect_widgets(&mut self) {
        let found: Vec<Widget> = self
            .live
            .find_all(&|el: &Element| el.has_attr(WIDGET_ATTR))
            .into_iter()
            .filter_map(|el| {
                let kind = el.attr(WIDGET_ATTR).and_then(WidgetKind::from_attr)?;
                let id = el.id()?;
                Some(Widget {
                    id: InstanceId::new(id),
                    kind,
                    scope: scope_of(&self.live, id),
                })
            })
            .collect();

        for old in &self.widgets {
            if !found.iter().any(|w| w.id == old.id) {
                self.bus.unsubscribe(&old.id);
            }
        }
        for widget in &found {
            self.bus
                .subscribe(widget.id.clone(), widget.scope.clone(), widget.kind.listens_to());
        }
        self.widgets = found;
    }

    /// Applies a user pick on `instance`.
    ///
    /// `Selected` is published before the navigation starts. Picks that do
    /// not resolve to a navigable combination only re-render the picker.
    ///
    /// # Errors
    ///
    /// - [`StorefrontError::UnknownInstance`] when no picker has that id.
    /// - [`StorefrontError::InvalidUrl`] when the combination's product URL
    ///   cannot be resolved; no event is published in that case.
    pub fn pick(
        &mut self,
        instance: &str,
        dimension: Dimension,
        value: &str,
    ) -> Result<PickOutcome, StorefrontError> {
        let id = InstanceId::new(instance);
        let slot = self
            .pickers
            .get_mut(&id)
            .ok_or_else(|| StorefrontError::UnknownInstance(instance.to_owned()))?;
        let outcome = slot.engine.pick(dimension, value);

        if let PickOutcome::Navigate { target, selected } = &outcome {
            let navigation =
                match build_target(&slot.engine, &self.live, &self.context, target.clone(), false) {
                    Ok(navigation) => navigation,
                    Err(err) => {
                        tracing::warn!(instance = %id, error = %err, "cannot navigate to combination");
                        slot.engine.release_controls();
                        slot.engine.revert_to_current();
                        self.render(&id);
                        return Err(err);
                    }
                };
            self.dispatch(selected.clone());
            if let Some(slot) = self.pickers.get_mut(&id) {
                slot.orchestrator.navigate_to(navigation);
            }
        } else {
            tracing::debug!(instance = %id, outcome = ?outcome, "pick settled locally");
            // A newer selection supersedes the navigation in flight.
            let changed_selection =
                matches!(outcome, PickOutcome::Unavailable(_) | PickOutcome::Partial);
            if changed_selection && slot.orchestrator.cancel().is_some() {
                slot.engine.release_controls();
                self.release_widgets(&id);
            }
        }
        self.render(&id);
        Ok(outcome)
    }

    /// Routes `envelope` through the bus and records it in the event log.
    pub fn dispatch(&mut self, envelope: Envelope) {
        tracing::debug!(
            origin = %envelope.origin,
            kind = ?envelope.event.kind(),
            "publishing event"
        );
        self.events.push(envelope.clone());

        for recipient in self.bus.route(&envelope) {
            if let Some(slot) = self.pickers.get_mut(&recipient) {
                if slot.engine.on_event(&envelope) {
                    self.render(&recipient);
                }
            } else if let Some(widget) = self.widgets.iter().find(|w| w.id == recipient) {
                widget.on_event(&mut self.live, &envelope, &self.context, self.morph.as_ref());
            }
        }
    }

    /// Waits for every in-flight navigation to land and applies the outcomes
    /// in arrival order.
    pub async fn settle(&mut self) -> Vec<ApplyResult> {
        let mut results = Vec::new();
        while self.has_pending() {
            let Some(outcome) = self.outcomes_rx.recv().await else {
                break;
            };
            results.push(self.apply_outcome(outcome));
        }
        results
    }

    /// Applies one navigation outcome. Stale outcomes are dropped without
    /// touching the page.
    pub fn apply_outcome(&mut self, outcome: FetchOutcome) -> ApplyResult {
        let id = outcome.instance.clone();
        let Some(slot) = self.pickers.get_mut(&id) else {
            tracing::debug!(instance = %id, "outcome for disconnected picker");
            return ApplyResult::Superseded;
        };
        if !slot.orchestrator.accepts(&outcome) {
            tracing::debug!(
                instance = %id,
                generation = outcome.generation,
                "discarding stale navigation outcome"
            );
            return ApplyResult::Superseded;
        }
        slot.orchestrator.complete(outcome.generation);

        let FetchOutcome { target, result, .. } = outcome;
        let document = match result {
            Ok(document) => document,
            Err(err) => return self.fail_navigation(&id, &err),
        };
        let stats = match apply_document(&mut self.live, &document, &target.morph, self.morph.as_ref()) {
            Ok(stats) => stats,
            Err(err) => return self.fail_navigation(&id, &err),
        };

        let mut affected = Vec::new();
        for step in POST_MORPH_STEPS {
            match step {
                PostMorphStep::RebuildCombinations => {
                    self.context.absorb(&document.html);
                    self.connect();
                    affected = self.pickers_within(target.morph.anchor_id());
                    for instance in &affected {
                        if let (Some(slot), Some(host)) =
                            (self.pickers.get_mut(instance), self.live.find_by_id(instance.as_str()))
                        {
                            slot.engine.rebuild_combinations(host);
                        }
                    }
                }
                PostMorphStep::ReseedSelection => {
                    for instance in &affected {
                        if let (Some(slot), Some(host)) =
                            (self.pickers.get_mut(instance), self.live.find_by_id(instance.as_str()))
                        {
                            slot.engine.reseed_selection(host);
                        }
                        self.render(instance);
                    }
                }
                PostMorphStep::PublishUpdated => {
                    let product_id = document
                        .product_id
                        .clone()
                        .unwrap_or_else(|| target.combination.product_id.clone());
                    let new_product = target.product_changed().then(|| NewProduct {
                        id: target.combination.product_id.clone(),
                        url: target.combination.product_url.clone(),
                    });
                    self.dispatch(Envelope {
                        origin: target.origin.clone(),
                        scope: target.scope.clone(),
                        event: PickerEvent::Updated(UpdatedDetail {
                            resource: document.variant.clone(),
                            source_id: target.source_id.clone(),
                            data: UpdatedData {
                                html: Arc::clone(&document.html),
                                product_id,
                                new_product,
                            },
                        }),
                    });
                }
                PostMorphStep::CommitUrl => {
                    if let Some(mode) = target.commit {
                        commit(self.history.as_mut(), &target.page_url, mode);
                    }
                }
                PostMorphStep::ReleaseControls => {
                    if let Some(slot) = self.pickers.get_mut(&id) {
                        slot.engine.release_controls();
                    }
                    self.render(&id);
                }
            }
        }

        tracing::info!(
            instance = %id,
            variant_id = %document.variant.id,
            changes = stats.total(),
            "navigation applied"
        );
        ApplyResult::Applied(stats)
    }

    /// Moves back one history entry and resyncs the page from it. `None` at
    /// the start of history.
    pub fn back(&mut self) -> Option<ResyncOutcome> {
        let url = self.history.back()?.clone();
        Some(self.resync_from_url(&url))
    }

    /// Moves forward one history entry and resyncs the page from it. `None`
    /// at the end of history.
    pub fn forward(&mut self) -> Option<ResyncOutcome> {
        let url = self.history.forward()?.clone();
        Some(self.resync_from_url(&url))
    }

    /// Brings the URL-owning picker in line with `url`.
    ///
    /// Idempotent: when the page already shows the URL's variant nothing is
    /// fetched. History is never written, since `url` is already in it.
    pub fn resync_from_url(&mut self, url: &Url) -> ResyncOutcome {
        let Some(id) = self.url_owner() else {
            tracing::debug!(url = %url, "no picker owns the url");
            return ResyncOutcome::Unresolved;
        };
        let Some(slot) = self.pickers.get_mut(&id) else {
            return ResyncOutcome::Unresolved;
        };

        let state = UrlState::from_url(url);
        let Some(target) = match_url(&slot.engine, &self.context, &state) else {
            tracing::warn!(url = %url, instance = %id, "no combination matches url");
            return ResyncOutcome::Unresolved;
        };

        if let Some(pending) = slot.orchestrator.pending() {
            if pending.target.combination.variant_id == target.variant_id {
                return ResyncOutcome::Navigating(pending.generation);
            }
        } else if target.is_current {
            tracing::debug!(url = %url, instance = %id, "page already in sync with url");
            return ResyncOutcome::InSync;
        }

        let navigation = match build_target(&slot.engine, &self.live, &self.context, target, true) {
            Ok(navigation) => navigation,
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "cannot resync from url");
                return ResyncOutcome::Unresolved;
            }
        };
        slot.engine
            .begin_pending(&navigation.combination.variant_id);
        let generation = slot.orchestrator.navigate_to(navigation);
        self.render(&id);
        ResyncOutcome::Navigating(generation)
    }

    /// The page-level picker that writes the URL, if any.
    fn url_owner(&self) -> Option<InstanceId> {
        self.pickers
            .iter()
            .find(|(_, slot)| slot.engine.commits_url())
            .map(|(id, _)| id.clone())
    }

    fn pickers_within(&self, anchor: &str) -> Vec<InstanceId> {
        self.pickers
            .keys()
            .filter(|id| {
                id.as_str() == anchor
                    || self
                        .live
                        .ancestors_of(id.as_str())
                        .is_some_and(|chain| chain.iter().any(|el| el.id() == Some(anchor)))
            })
            .cloned()
            .collect()
    }

    fn fail_navigation(&mut self, id: &InstanceId, err: &StorefrontError) -> ApplyResult {
        let result = if err.is_missing_anchor() {
            tracing::error!(instance = %id, error = %err, "navigation aborted");
            ApplyResult::Aborted
        } else {
            tracing::warn!(instance = %id, error = %err, "navigation failed");
            ApplyResult::Failed
        };
        if let Some(slot) = self.pickers.get_mut(id) {
            slot.engine.release_controls();
            slot.engine.revert_to_current();
        }
        self.release_widgets(id);
        self.render(id);
        result
    }

    /// Undoes `Selected` on the widgets sharing `id`'s scope once its
    /// navigation is gone.
    fn release_widgets(&mut self, id: &InstanceId) {
        let Some(slot) = self.pickers.get(id) else {
            return;
        };
        let available = slot.engine.current().map_or(true, |c| c.available);
        let scope = slot.engine.scope();
        for widget in self.widgets.iter().filter(|w| &w.scope == scope) {
            widget.release(&mut self.live, available);
        }
    }

    fn render(&mut self, id: &InstanceId) {
        if let (Some(slot), Some(host)) =
            (self.pickers.get(id), self.live.find_by_id_mut(id.as_str()))
        {
            slot.engine.render_into(host);
        }
    }
}

/// Scope of the element with `id`: the nearest enclosing product card or
/// quick-add dialog, else the page.
fn scope_of(live: &Element, id: &str) -> Scope {
    live.ancestors_of(id)
        .and_then(|chain| {
            chain.into_iter().rev().find_map(|el| {
                let root = el.id()?.to_owned();
                match el.tag.as_str() {
                    PRODUCT_CARD_TAG => Some(Scope::Card(root)),
                    QUICK_ADD_TAG => Some(Scope::QuickAdd(root)),
                    _ => None,
                }
            })
        })
        .unwrap_or(Scope::Page)
}

fn build_target(
    engine: &SelectionEngine,
    live: &Element,
    context: &StoreContext,
    combination: Combination,
    replay: bool,
) -> Result<NavigationTarget, StorefrontError> {
    let page_url = with_variant(&context.resolve(&combination.product_url)?, &combination.variant_id);
    let previous_product_id = engine.current_product_id().map(str::to_owned);
    let product_changed = previous_product_id.as_deref() != Some(combination.product_id.as_str());

    let root = engine.scope().root_id();
    let morph = match root {
        Some(root) => MorphTarget::Fragment(root.to_owned()),
        None if product_changed && engine.kind() != PickerKind::Standalone => {
            MorphTarget::MainContent
        }
        None => MorphTarget::Fragment(engine.instance_id().as_str().to_owned()),
    };

    let fetch_url = match root
        .and_then(|root| live.find_by_id(root))
        .and_then(|el| el.attr(SECTION_ID_ATTR))
    {
        Some(section) => with_params(&page_url, &[(SECTION_PARAM, section)]),
        None => page_url.clone(),
    };

    let commit = match (replay, engine.commits_url(), product_changed) {
        (false, true, true) => Some(HistoryMode::Push),
        (false, true, false) => Some(HistoryMode::Replace),
        _ => None,
    };

    let source_id = engine
        .state()
        .last_source_id
        .clone()
        .unwrap_or_else(|| engine.instance_id().to_string());

    Ok(NavigationTarget {
        origin: engine.instance_id().clone(),
        scope: engine.scope().clone(),
        combination,
        fetch_url,
        page_url,
        morph,
        commit,
        previous_product_id,
        source_id,
    })
}

/// Combination a URL points at: the `variant` parameter when it is in the
/// set, else the pathname's product (current first, then first available,
/// then first).
fn match_url(
    engine: &SelectionEngine,
    context: &StoreContext,
    state: &UrlState,
) -> Option<Combination> {
    let set = &engine.state().combinations;
    if let Some(found) = state
        .variant
        .as_deref()
        .and_then(|variant| set.find_by_variant_id(variant))
    {
        return Some(found.clone());
    }
    let on_path = |c: &&Combination| {
        context
            .resolve(&c.product_url)
            .is_ok_and(|url| url.path() == state.pathname)
    };
    let candidates: Vec<&Combination> = set.iter().filter(on_path).collect();
    candidates
        .iter()
        .find(|c| c.is_current)
        .or_else(|| candidates.iter().find(|c| c.available))
        .or_else(|| candidates.first())
        .map(|c| (*c).clone())
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
