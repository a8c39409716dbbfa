use super::*;

/// The three-product family used throughout the picker tests.
fn family() -> CombinationSet {
    CombinationSet::parse_default(
        "P1|V1|Red|S|/products/red-s|true|true\
         :::P2|V2|Blue|S|/products/blue-s|true|false\
         :::P3|V3|Red|M|/products/red-m|false|false",
    )
}

// -----------------------------------------------------------------------
// parse
// -----------------------------------------------------------------------

#[test]
fn parse_reads_all_fields() {
    let set = family();
    assert_eq!(set.len(), 3);
    let first = set.iter().next().unwrap();
    assert_eq!(first.product_id, "P1");
    assert_eq!(first.variant_id, "V1");
    assert_eq!(first.color, "Red");
    assert_eq!(first.size, "S");
    assert_eq!(first.product_url, "/products/red-s");
    assert!(first.available);
    assert!(first.is_current);
}

#[test]
fn parse_empty_string_yields_empty_set() {
    assert!(CombinationSet::parse_default("").is_empty());
    assert!(CombinationSet::parse_default("  ").is_empty());
}

#[test]
fn parse_drops_entry_with_wrong_field_count_and_keeps_the_rest() {
    let set = CombinationSet::parse_default(
        "P1|V1|Red|S|/a|true|true:::P2|V2|Blue|S|/b|true:::P3|V3|Red|M|/c|false|false",
    );
    let ids: Vec<&str> = set.iter().map(|c| c.variant_id.as_str()).collect();
    assert_eq!(ids, vec!["V1", "V3"]);
}

#[test]
fn parse_drops_entry_with_non_boolean_flag() {
    let set = CombinationSet::parse_default("P1|V1|Red|S|/a|yes|true:::P2|V2|Blue|S|/b|true|false");
    assert_eq!(set.len(), 1);
    assert_eq!(set.iter().next().unwrap().variant_id, "V2");
}

#[test]
fn parse_drops_entry_with_empty_ids() {
    let set = CombinationSet::parse_default("|V1|Red|S|/a|true|true:::P2||Blue|S|/b|true|false");
    assert!(set.is_empty());
}

#[test]
fn parse_ignores_trailing_separator() {
    let set = CombinationSet::parse_default("P1|V1|Red|S|/a|true|true:::");
    assert_eq!(set.len(), 1);
}

#[test]
fn parse_honours_custom_separators() {
    let set = CombinationSet::parse("P1;V1;Red;S;/a;true;false###P2;V2;Blue;S;/b;true;true", "###", ';');
    assert_eq!(set.len(), 2);
    assert_eq!(set.current().unwrap().variant_id, "V2");
}

#[test]
fn parse_keeps_only_first_current_flag() {
    let set = CombinationSet::parse_default("P1|V1|Red|S|/a|true|true:::P2|V2|Blue|S|/b|true|true");
    let current: Vec<&str> = set
        .iter()
        .filter(|c| c.is_current)
        .map(|c| c.variant_id.as_str())
        .collect();
    assert_eq!(current, vec!["V1"]);
}

#[test]
fn parse_keeps_first_of_duplicate_pairs() {
    let set = CombinationSet::parse_default("P1|V1|Red|S|/a|true|false:::P9|V9| red |s |/z|true|false");
    assert_eq!(set.len(), 1);
    assert_eq!(set.find("RED", "S").unwrap().variant_id, "V1");
}

#[test]
fn serialize_round_trips_color_size_pairs() {
    let set = family();
    let raw = set.serialize(ENTRY_SEPARATOR, FIELD_SEPARATOR);
    let reparsed = CombinationSet::parse_default(&raw);
    let pairs = |s: &CombinationSet| {
        let mut v: Vec<(String, String)> =
            s.iter().map(|c| (c.color.clone(), c.size.clone())).collect();
        v.sort();
        v
    };
    assert_eq!(pairs(&set), pairs(&reparsed));
    assert_eq!(set, reparsed);
}

// -----------------------------------------------------------------------
// queries
// -----------------------------------------------------------------------

#[test]
fn available_colors_unconstrained_lists_every_color_once() {
    assert_eq!(family().available_colors(None), vec!["Red", "Blue"]);
}

#[test]
fn available_sizes_for_red_includes_unavailable_combination() {
    assert_eq!(family().available_sizes(Some("Red")), vec!["S", "M"]);
}

#[test]
fn available_colors_for_size_excludes_colors_without_that_size() {
    let set = family();
    for size in set.available_sizes(None) {
        let colors = set.available_colors(Some(&size));
        for color in &colors {
            assert!(
                set.find(color, &size).is_some(),
                "{color} listed for size {size} without a combination"
            );
        }
    }
    assert_eq!(set.available_colors(Some("M")), vec!["Red"]);
}

#[test]
fn find_matches_exact_pair() {
    let set = family();
    let found = set.find("Blue", "S").expect("Blue/S exists");
    assert_eq!(found.product_id, "P2");
    assert_eq!(found.variant_id, "V2");
    assert!(set.find("Blue", "M").is_none());
}

#[test]
fn find_is_case_insensitive_and_trimmed() {
    let set = family();
    assert_eq!(set.find("  blue ", "s").unwrap().variant_id, "V2");
}

#[test]
fn find_by_variant_id_returns_matching_entry() {
    let set = family();
    assert_eq!(set.find_by_variant_id("V3").unwrap().product_id, "P3");
    assert!(set.find_by_variant_id("V404").is_none());
}

#[test]
fn first_for_color_prefers_available_entry() {
    let set = CombinationSet::parse_default(
        "P1|V1|Red|S|/a|false|false:::P2|V2|Red|M|/b|true|false:::P3|V3|Blue|S|/c|false|false",
    );
    assert_eq!(set.first_for_color("Red").unwrap().variant_id, "V2");
    assert_eq!(set.first_for_color("Blue").unwrap().variant_id, "V3");
    assert!(set.first_for_color("Green").is_none());
}

#[test]
fn has_available_respects_both_constraints() {
    let set = family();
    assert!(set.has_available(Some("Red"), Some("S")));
    assert!(!set.has_available(Some("Red"), Some("M")));
    assert!(set.has_available(None, Some("S")));
    assert!(!set.has_available(None, Some("M")));
}

#[test]
fn is_single_product_detects_combined_listing() {
    assert!(!family().is_single_product());
    let single = CombinationSet::parse_default("P1|V1|Red|S|/a|true|true:::P1|V2|Red|M|/a|true|false");
    assert!(single.is_single_product());
}
