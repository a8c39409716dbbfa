use clvp_core::{AppConfig, Environment};
use url::Url;

use super::*;

fn config(store_url: Option<&str>) -> AppConfig {
    AppConfig {
        env: Environment::Test,
        log_level: "info".to_string(),
        store_url: store_url.map(|u| Url::parse(u).unwrap()),
        request_timeout_secs: 30,
        navigation_timeout_secs: 15,
        user_agent: "clvp-test/0.1".to_string(),
        max_retries: 0,
        retry_backoff_base_ms: 0,
        entry_separator: ":::".to_string(),
        field_separator: '|',
    }
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["clvp"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_combos_command() {
    let cli = Cli::try_parse_from(["clvp", "combos", "/products/red-s", "--json"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Combos { ref url, json: true }) if url == "/products/red-s"
    ));
}

#[test]
fn parses_pick_with_both_options() {
    let cli = Cli::try_parse_from([
        "clvp",
        "pick",
        "https://shop.test/products/red-s",
        "--color",
        "Blue",
        "--size",
        "M",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Pick {
            instance: None,
            color: Some(ref c),
            size: Some(ref s),
            ..
        }) if c == "Blue" && s == "M"
    ));
}

#[test]
fn parses_pick_on_named_instance() {
    let cli = Cli::try_parse_from([
        "clvp",
        "pick",
        "/products/red-s",
        "--instance",
        "card-1-picker",
        "--color",
        "Blue",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Pick { instance: Some(ref i), size: None, .. }) if i == "card-1-picker"
    ));
}

#[test]
fn parses_walk_with_repeated_steps_and_back() {
    let cli = Cli::try_parse_from([
        "clvp",
        "walk",
        "/products/red-s",
        "--to",
        "Blue/S",
        "--to",
        "Blue/M",
        "--back",
        "2",
    ])
    .unwrap();
    match cli.command {
        Some(Commands::Walk { to, back, .. }) => {
            assert_eq!(to, vec!["Blue/S".to_string(), "Blue/M".to_string()]);
            assert_eq!(back, 2);
        }
        other => panic!("expected walk, got {other:?}"),
    }
}

#[test]
fn walk_back_defaults_to_zero() {
    let cli = Cli::try_parse_from(["clvp", "walk", "/products/red-s"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Walk { back: 0, .. })));
}

#[test]
fn parse_step_splits_color_and_size() {
    assert_eq!(
        picker::parse_step(" Blue / M ").unwrap(),
        ("Blue".to_string(), "M".to_string())
    );
}

#[test]
fn parse_step_rejects_missing_half() {
    assert!(picker::parse_step("Blue").is_err());
    assert!(picker::parse_step("Blue/").is_err());
    assert!(picker::parse_step("/M").is_err());
}

#[test]
fn absolute_urls_are_used_as_is() {
    let url = picker::resolve_page_url(&config(None), "https://shop.test/products/red-s").unwrap();
    assert_eq!(url.as_str(), "https://shop.test/products/red-s");
}

#[test]
fn relative_paths_join_the_store_url() {
    let url = picker::resolve_page_url(
        &config(Some("https://shop.test/")),
        "/products/red-s?variant=101",
    )
    .unwrap();
    assert_eq!(url.as_str(), "https://shop.test/products/red-s?variant=101");
}

#[test]
fn relative_paths_need_a_store_url() {
    let err = picker::resolve_page_url(&config(None), "/products/red-s").unwrap_err();
    assert!(err.to_string().contains("CLVP_STORE_URL"));
}

#[test]
fn non_http_schemes_are_rejected() {
    assert!(picker::resolve_page_url(&config(None), "ftp://shop.test/x").is_err());
}
