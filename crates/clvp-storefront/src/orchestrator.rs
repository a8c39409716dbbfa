//! Fetch-morph orchestration for one picker instance.
//!
//! A [`MorphOrchestrator`] owns at most one in-flight navigation. Starting a
//! new one aborts the previous task and bumps the generation, so an outcome
//! that was already queued when the abort landed is still recognised as
//! stale and dropped. Outcomes travel back over an mpsc channel; applying
//! them (morph, events, history) is the session's job, one at a time.

use std::sync::Arc;
use std::time::Duration;

use clvp_core::anchors::MAIN_CONTENT_ID;
use clvp_core::combination::Separators;
use clvp_core::{Combination, Element, HistoryMode, InstanceId, Morph, MorphStats, Scope};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::AbortHandle;
use url::Url;

use crate::client::StorefrontClient;
use crate::error::StorefrontError;
use crate::extract::ProductDocument;

/// Region of the live page a navigation morphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MorphTarget {
    /// The main content region; used when the product changed.
    MainContent,
    /// A single element by id: the picker host, a product card or the
    /// quick-add dialog.
    Fragment(String),
}

impl MorphTarget {
    #[must_use]
    pub fn anchor_id(&self) -> &str {
        match self {
            MorphTarget::MainContent => MAIN_CONTENT_ID,
            MorphTarget::Fragment(id) => id,
        }
    }
}

/// Everything needed to run and later apply one navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationTarget {
    pub origin: InstanceId,
    pub scope: Scope,
    pub combination: Combination,
    /// URL fetched, including any section-rendering parameters.
    pub fetch_url: Url,
    /// URL written to history on success.
    pub page_url: Url,
    pub morph: MorphTarget,
    /// `None` for instances that never own the URL, and for navigations
    /// replaying a URL history already holds.
    pub commit: Option<HistoryMode>,
    pub previous_product_id: Option<String>,
    pub source_id: String,
}

impl NavigationTarget {
    #[must_use]
    pub fn product_changed(&self) -> bool {
        self.previous_product_id.as_deref() != Some(self.combination.product_id.as_str())
    }
}

/// Ordered steps run after a successful morph. Each step sees the effects of
/// the ones before it; a failing morph runs none of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostMorphStep {
    /// Re-read combinations and option inputs of every picker inside the
    /// morphed region, and merge the fetched store context.
    RebuildCombinations,
    /// Re-seed those pickers' selection from their now-checked inputs.
    ReseedSelection,
    /// Publish `Updated` from the origin instance.
    PublishUpdated,
    /// Push or replace the history entry when the URL differs.
    CommitUrl,
    /// Leave the pending state and re-render the origin's controls.
    ReleaseControls,
}

pub const POST_MORPH_STEPS: [PostMorphStep; 5] = [
    PostMorphStep::RebuildCombinations,
    PostMorphStep::ReseedSelection,
    PostMorphStep::PublishUpdated,
    PostMorphStep::CommitUrl,
    PostMorphStep::ReleaseControls,
];

/// What a navigation task reports back.
#[derive(Debug)]
pub struct FetchOutcome {
    pub instance: InstanceId,
    pub generation: u64,
    pub target: NavigationTarget,
    pub result: Result<ProductDocument, StorefrontError>,
}

#[derive(Debug)]
pub struct PendingRequest {
    pub generation: u64,
    pub target: NavigationTarget,
    abort: AbortHandle,
}

#[derive(Debug)]
pub struct MorphOrchestrator {
    instance: InstanceId,
    client: Arc<StorefrontClient>,
    timeout: Duration,
    separators: Separators,
    generation: u64,
    pending: Option<PendingRequest>,
    outcomes: UnboundedSender<FetchOutcome>,
}

impl MorphOrchestrator {
    #[must_use]
    pub fn new(
        instance: InstanceId,
        client: Arc<StorefrontClient>,
        timeout: Duration,
        separators: Separators,
        outcomes: UnboundedSender<FetchOutcome>,
    ) -> Self {
        Self {
            instance,
            client,
            timeout,
            separators,
            generation: 0,
            pending: None,
            outcomes,
        }
    }

    #[must_use]
    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Starts fetching `target`, superseding any navigation in flight.
    /// Returns the new generation. Must be called inside a Tokio runtime.
    pub fn navigate_to(&mut self, target: NavigationTarget) -> u64 {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;

        tracing::info!(
            instance = %self.instance,
            generation,
            variant_id = %target.combination.variant_id,
            url = %target.fetch_url,
            "navigating"
        );

        let task = FetchTask {
            instance: self.instance.clone(),
            generation,
            target: target.clone(),
            client: Arc::clone(&self.client),
            timeout: self.timeout,
            separators: self.separators.clone(),
            outcomes: self.outcomes.clone(),
        };
        let handle = tokio::spawn(task.run());

        self.pending = Some(PendingRequest {
            generation,
            target,
            abort: handle.abort_handle(),
        });
        generation
    }

    /// Aborts the in-flight navigation, if any. Its outcome, should one
    /// already be queued, will fail [`MorphOrchestrator::accepts`].
    pub fn cancel(&mut self) -> Option<NavigationTarget> {
        let pending = self.pending.take()?;
        pending.abort.abort();
        self.generation += 1;
        tracing::debug!(
            instance = %self.instance,
            generation = pending.generation,
            variant_id = %pending.target.combination.variant_id,
            "navigation superseded"
        );
        Some(pending.target)
    }

    /// Whether `outcome` belongs to the navigation currently in flight.
    #[must_use]
    pub fn accepts(&self, outcome: &FetchOutcome) -> bool {
        outcome.instance == self.instance
            && self
                .pending
                .as_ref()
                .is_some_and(|p| p.generation == outcome.generation)
    }

    /// Clears the pending request if it is `generation`.
    pub fn complete(&mut self, generation: u64) -> Option<PendingRequest> {
        if self.pending.as_ref().is_some_and(|p| p.generation == generation) {
            self.pending.take()
        } else {
            None
        }
    }
}

impl Drop for MorphOrchestrator {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort.abort();
        }
    }
}

struct FetchTask {
    instance: InstanceId,
    generation: u64,
    target: NavigationTarget,
    client: Arc<StorefrontClient>,
    timeout: Duration,
    separators: Separators,
    outcomes: UnboundedSender<FetchOutcome>,
}

impl FetchTask {
    async fn run(self) {
        let region = self.target.morph.anchor_id().to_owned();
        let url = self.target.fetch_url.clone();
        let fetch = async {
            let body = self.client.fetch_page(&url).await?;
            ProductDocument::parse(url.clone(), &body, &region, &self.separators)
        };
        let result = match tokio::time::timeout(self.timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(StorefrontError::Timeout {
                url: url.to_string(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };
        let outcome = FetchOutcome {
            instance: self.instance,
            generation: self.generation,
            target: self.target,
            result,
        };
        if self.outcomes.send(outcome).is_err() {
            tracing::debug!("session closed before navigation finished");
        }
    }
}

/// Morphs the fetched region into the live page.
///
/// Both anchors are looked up again here: the live tree may have changed
/// while the fetch was in flight.
///
/// # Errors
///
/// Returns [`StorefrontError::Dom`] when either side lacks the target
/// anchor. Nothing is mutated in that case.
pub fn apply_document(
    live: &mut Element,
    document: &ProductDocument,
    target: &MorphTarget,
    morph: &dyn Morph,
) -> Result<MorphStats, StorefrontError> {
    let anchor = target.anchor_id();
    let desired = document.fragment(anchor).ok_or_else(|| {
        StorefrontError::from(clvp_core::DomError::MissingAnchor {
            anchor: format!("#{anchor}"),
            context: "fetched document",
        })
    })?;
    let region = live.find_by_id_mut(anchor).ok_or_else(|| {
        StorefrontError::from(clvp_core::DomError::MissingAnchor {
            anchor: format!("#{anchor}"),
            context: "live page",
        })
    })?;
    Ok(morph.morph(region, desired))
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
