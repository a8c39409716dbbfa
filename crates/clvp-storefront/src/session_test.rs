use super::*;

const FAMILY: &str = "P1|101|Red|S|/products/red-s|true|true\
    :::P2|102|Blue|S|/products/blue-s|true|false\
    :::P3|103|Red|M|/products/red-m|false|false";

const PAGE: &str = r#"<html><body>
<main id="MainContent" data-product-id="P1">
  <variant-picker id="main-picker" data-picker-kind="combined-listing-dual" data-combinations="FAMILY">
    <input type="radio" id="main-color-Red" name="color" value="Red" checked>
    <input type="radio" id="main-color-Blue" name="color" value="Blue">
    <input type="radio" id="main-size-S" name="size" value="S" checked>
    <input type="radio" id="main-size-M" name="size" value="M">
    <script type="application/json" data-selected-variant>{"id": 101, "price": 1000}</script>
  </variant-picker>
  <div id="price-main" data-widget="price">$10</div>
  <button id="atc-main" data-widget="add-to-cart">Add</button>
</main>
<product-card id="card-1" data-section-id="card-section">
  <variant-picker id="card-1-picker" data-picker-kind="swatches" data-combinations="FAMILY">
    <input type="radio" id="card-color-Red" name="color" value="Red" checked>
    <input type="radio" id="card-color-Blue" name="color" value="Blue">
  </variant-picker>
  <div id="price-card-1" data-widget="price">$10</div>
</product-card>
</body></html>"#;

fn session() -> PageSession {
    let live = parse_html(&PAGE.replace("FAMILY", FAMILY)).unwrap();
    let url = Url::parse("https://shop.test/products/red-s?variant=101").unwrap();
    let client = StorefrontClient::new(5, "clvp-test/0.1", 0, 0).unwrap();
    PageSession::from_document(live, url, Arc::new(client), SessionOptions::default())
}

fn main_engine(session: &PageSession) -> &SelectionEngine {
    session.picker("main-picker").unwrap()
}

#[test]
fn connect_discovers_pickers_with_their_scopes() {
    let session = session();
    let ids: Vec<&str> = session.instances().map(InstanceId::as_str).collect();
    assert_eq!(ids, vec!["card-1-picker", "main-picker"]);
    assert_eq!(main_engine(&session).scope(), &Scope::Page);
    assert_eq!(
        session.picker("card-1-picker").unwrap().scope(),
        &Scope::Card("card-1".to_owned())
    );
}

#[test]
fn connect_discovers_widgets_with_their_scopes() {
    let session = session();
    let scopes: Vec<(&str, &Scope)> = session
        .widgets()
        .iter()
        .map(|w| (w.id.as_str(), &w.scope))
        .collect();
    assert!(scopes.contains(&("price-main", &Scope::Page)));
    assert!(scopes.contains(&("price-card-1", &Scope::Card("card-1".to_owned()))));
    assert!(scopes.contains(&("atc-main", &Scope::Page)));
}

#[test]
fn connect_renders_initial_availability() {
    let session = session();
    let m = session.live().find_by_id("main-size-M").unwrap();
    assert_eq!(m.attr("data-option-available"), Some("false"));
}

#[test]
fn connect_is_idempotent() {
    let mut session = session();
    assert_eq!(session.connect(), 0);
    assert_eq!(session.instances().count(), 2);
}

#[test]
fn pick_on_unknown_instance_fails() {
    let mut session = session();
    let err = session.pick("nope", Dimension::Color, "Blue").unwrap_err();
    assert!(matches!(err, StorefrontError::UnknownInstance(ref id) if id == "nope"));
}

#[test]
fn unavailable_pick_publishes_nothing_and_starts_nothing() {
    let mut session = session();
    let outcome = session.pick("main-picker", Dimension::Size, "M").unwrap();
    assert!(matches!(outcome, PickOutcome::Unavailable(_)));
    assert!(session.events().is_empty());
    assert!(!session.has_pending());
    let m = session.live().find_by_id("main-size-M").unwrap();
    assert!(m.has_attr("checked"), "selected-but-unavailable stays checked");
    assert!(!session.live().find_by_id("main-picker").unwrap().has_attr("data-pending"));
}

#[test]
fn build_target_for_main_picker_pushes_on_product_change() {
    let session = session();
    let engine = main_engine(&session);
    let blue = engine.state().combinations.find("Blue", "S").unwrap().clone();
    let target = build_target(engine, session.live(), session.context(), blue, false).unwrap();
    assert_eq!(target.morph, MorphTarget::MainContent);
    assert_eq!(target.commit, Some(HistoryMode::Push));
    assert_eq!(
        target.page_url.as_str(),
        "https://shop.test/products/blue-s?variant=102"
    );
    assert_eq!(target.fetch_url, target.page_url);
    assert!(target.product_changed());
}

#[test]
fn build_target_replay_never_commits() {
    let session = session();
    let engine = main_engine(&session);
    let blue = engine.state().combinations.find("Blue", "S").unwrap().clone();
    let target = build_target(engine, session.live(), session.context(), blue, true).unwrap();
    assert_eq!(target.commit, None);
}

#[test]
fn build_target_for_card_morphs_card_via_section_rendering() {
    let session = session();
    let engine = session.picker("card-1-picker").unwrap();
    let blue = engine.state().combinations.first_for_color("Blue").unwrap().clone();
    let target = build_target(engine, session.live(), session.context(), blue, false).unwrap();
    assert_eq!(target.morph, MorphTarget::Fragment("card-1".to_owned()));
    assert_eq!(target.commit, None);
    assert_eq!(
        target.fetch_url.as_str(),
        "https://shop.test/products/blue-s?variant=102&section_id=card-section"
    );
}

#[test]
fn resync_to_current_url_is_in_sync() {
    let mut session = session();
    let url = session.location().clone();
    assert_eq!(session.resync_from_url(&url), ResyncOutcome::InSync);
    assert!(!session.has_pending());
}

#[test]
fn resync_to_unknown_variant_is_unresolved() {
    let mut session = session();
    let url = Url::parse("https://shop.test/products/other?variant=999").unwrap();
    assert_eq!(session.resync_from_url(&url), ResyncOutcome::Unresolved);
}

#[test]
fn match_url_falls_back_to_pathname() {
    let session = session();
    let state = UrlState {
        pathname: "/products/blue-s".to_owned(),
        variant: None,
    };
    let found = match_url(main_engine(&session), session.context(), &state).unwrap();
    assert_eq!(found.variant_id, "102");
}

#[test]
fn back_at_start_of_history_does_nothing() {
    let mut session = session();
    assert!(session.back().is_none());
}

#[tokio::test]
async fn stale_outcome_leaves_page_untouched() {
    let mut session = session();
    let before = session.live().clone();
    let engine = main_engine(&session);
    let blue = engine.state().combinations.find("Blue", "S").unwrap().clone();
    let target = build_target(engine, session.live(), session.context(), blue, false).unwrap();

    let body = PAGE.replace("FAMILY", FAMILY).replace("$10", "$15");
    let document = crate::extract::ProductDocument::parse(
        target.page_url.clone(),
        &body,
        "MainContent",
        &Separators::default(),
    )
    .unwrap();
    let stale = FetchOutcome {
        instance: InstanceId::new("main-picker"),
        generation: 7,
        target,
        result: Ok(document),
    };

    assert_eq!(session.apply_outcome(stale), ApplyResult::Superseded);
    assert_eq!(session.live(), &before);
    assert!(session.events().is_empty());
}

#[test]
fn dispatch_records_external_events_and_skips_origin() {
    let mut session = session();
    let envelope = Envelope {
        origin: InstanceId::new("main-picker"),
        scope: Scope::Page,
        event: PickerEvent::Selected(clvp_core::events::SelectedDetail { id: "102".to_owned() }),
    };
    session.dispatch(envelope.clone());
    assert_eq!(session.events(), &[envelope]);
    assert!(session.live().find_by_id("atc-main").unwrap().has_attr("disabled"));
}
