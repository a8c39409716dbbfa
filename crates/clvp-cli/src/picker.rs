//! Picker command handlers for the CLI.
//!
//! Each handler opens a [`PageSession`] on the requested page, drives it the
//! way a shopper would and prints what happened. Navigations are settled
//! after every pick so each one lands before the next starts.

use std::sync::Arc;

use anyhow::Context;
use clvp_core::{AppConfig, Dimension, InstanceId, PickOutcome, PickerEvent};
use clvp_storefront::{ApplyResult, PageSession, SessionOptions, StorefrontClient};
use url::Url;

/// Resolves a CLI URL argument: absolute `http(s)` URLs are used as-is,
/// anything else is joined onto `CLVP_STORE_URL`.
///
/// # Errors
///
/// Returns an error when the argument is relative and no store URL is
/// configured, or when the joined URL is invalid.
pub(crate) fn resolve_page_url(config: &AppConfig, raw: &str) -> anyhow::Result<Url> {
    if let Ok(url) = Url::parse(raw) {
        if matches!(url.scheme(), "http" | "https") {
            return Ok(url);
        }
        anyhow::bail!("unsupported URL scheme: {}", url.scheme());
    }
    let base = config
        .store_url
        .as_ref()
        .context("CLVP_STORE_URL is required for relative product paths")?;
    base.join(raw)
        .with_context(|| format!("cannot resolve {raw} against {base}"))
}

/// Parses a `<color>/<size>` walk step.
///
/// # Errors
///
/// Returns an error when either side of the `/` is missing.
pub(crate) fn parse_step(raw: &str) -> anyhow::Result<(String, String)> {
    let (color, size) = raw
        .split_once('/')
        .with_context(|| format!("expected <color>/<size>, got {raw:?}"))?;
    let (color, size) = (color.trim(), size.trim());
    if color.is_empty() || size.is_empty() {
        anyhow::bail!("expected <color>/<size>, got {raw:?}");
    }
    Ok((color.to_owned(), size.to_owned()))
}

async fn open_session(config: &AppConfig, raw_url: &str) -> anyhow::Result<PageSession> {
    let url = resolve_page_url(config, raw_url)?;
    let client = StorefrontClient::from_config(config).context("failed to build HTTP client")?;
    tracing::info!(url = %url, "opening product page");
    let session = PageSession::open(Arc::new(client), url.clone(), SessionOptions::from_config(config))
        .await
        .with_context(|| format!("failed to open {url}"))?;
    if session.instances().next().is_none() {
        tracing::warn!(url = %url, "page has no variant picker");
    }
    Ok(session)
}

/// The picker that owns the URL, else the first one on the page.
fn default_instance(session: &PageSession) -> Option<InstanceId> {
    session
        .instances()
        .find(|id| {
            session
                .picker(id.as_str())
                .is_some_and(clvp_core::SelectionEngine::commits_url)
        })
        .or_else(|| session.instances().next())
        .cloned()
}

/// Print the combinations of every picker on the page.
///
/// # Errors
///
/// Returns an error if the page cannot be fetched or parsed.
pub(crate) async fn run_combos(config: &AppConfig, raw_url: &str, json: bool) -> anyhow::Result<()> {
    let session = open_session(config, raw_url).await?;

    for id in session.instances() {
        let Some(engine) = session.picker(id.as_str()) else {
            continue;
        };
        let state = engine.state();
        if json {
            println!("{}", serde_json::to_string_pretty(&state.combinations)?);
            continue;
        }

        println!(
            "{id} ({}, {:?}): {} combinations",
            state.kind.as_attr(),
            state.scope,
            state.combinations.len()
        );
        for c in state.combinations.iter() {
            let marker = if c.is_current { "*" } else { " " };
            let available = if c.available { "available" } else { "sold out" };
            println!(
                "  {marker} {:<12} {:<8} {:<6} {:<10} {:<9} {}",
                c.product_id, c.variant_id, c.color, c.size, available, c.product_url
            );
        }
    }
    Ok(())
}

/// Pick `color` and/or `size` on one picker and print the result.
///
/// # Errors
///
/// Returns an error if the page cannot be opened or the instance is unknown.
pub(crate) async fn run_pick(
    config: &AppConfig,
    raw_url: &str,
    instance: Option<&str>,
    color: Option<&str>,
    size: Option<&str>,
) -> anyhow::Result<()> {
    let mut session = open_session(config, raw_url).await?;
    let instance = match instance {
        Some(id) => id.to_owned(),
        None => default_instance(&session)
            .context("page has no variant picker")?
            .to_string(),
    };

    let picks = [(Dimension::Color, color), (Dimension::Size, size)];
    for (dimension, value) in picks {
        let Some(value) = value else { continue };
        let outcome = session.pick(&instance, dimension, value)?;
        println!("pick {dimension}={value}: {}", describe_outcome(&outcome));
        report_results(&session.settle().await);
    }

    print_summary(&session);
    Ok(())
}

/// Walk through `steps`, then go back `back` times.
///
/// # Errors
///
/// Returns an error if the page cannot be opened, a step is malformed, or
/// the page has no picker.
pub(crate) async fn run_walk(
    config: &AppConfig,
    raw_url: &str,
    steps: &[String],
    back: usize,
) -> anyhow::Result<()> {
    let steps = steps
        .iter()
        .map(|raw| parse_step(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let mut session = open_session(config, raw_url).await?;
    let instance = default_instance(&session)
        .context("page has no variant picker")?
        .to_string();

    for (color, size) in &steps {
        for (dimension, value) in [(Dimension::Color, color), (Dimension::Size, size)] {
            let outcome = session.pick(&instance, dimension, value)?;
            tracing::debug!(%dimension, value = %value, outcome = %describe_outcome(&outcome), "walk pick");
            report_results(&session.settle().await);
        }
        println!("{color}/{size} -> {}", session.location());
    }

    for step in 1..=back {
        let Some(outcome) = session.back() else {
            println!("back #{step}: start of history");
            break;
        };
        report_results(&session.settle().await);
        println!("back #{step} ({outcome:?}) -> {}", session.location());
    }

    print_summary(&session);
    Ok(())
}

fn describe_outcome(outcome: &PickOutcome) -> String {
    match outcome {
        PickOutcome::Navigate { target, .. } => format!(
            "navigating to {} ({}/{})",
            target.variant_id, target.color, target.size
        ),
        PickOutcome::AlreadyCurrent => "already showing that combination".to_owned(),
        PickOutcome::Unavailable(c) => format!("{}/{} is sold out", c.color, c.size),
        PickOutcome::Partial => "waiting for the other option".to_owned(),
        PickOutcome::Ignored => "not an option of this picker".to_owned(),
    }
}

fn report_results(results: &[ApplyResult]) {
    for result in results {
        match result {
            ApplyResult::Applied(stats) => println!("  applied ({} changes)", stats.total()),
            ApplyResult::Superseded => println!("  superseded"),
            ApplyResult::Failed => println!("  failed; page left unchanged"),
            ApplyResult::Aborted => println!("  aborted; fetched page missing its anchors"),
        }
    }
}

fn print_summary(session: &PageSession) {
    println!("location: {}", session.location());
    println!("events:");
    for envelope in session.events() {
        match &envelope.event {
            PickerEvent::Selected(detail) => {
                println!("  {} selected {} ({:?})", envelope.origin, detail.id, envelope.scope);
            }
            PickerEvent::Updated(detail) => println!(
                "  {} updated {} product={}{} ({:?})",
                envelope.origin,
                detail.resource.id,
                detail.data.product_id,
                if detail.data.new_product.is_some() { " [new product]" } else { "" },
                envelope.scope
            ),
        }
    }
}
