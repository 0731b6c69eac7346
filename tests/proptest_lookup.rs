//! Property-based tests using proptest
//!
//! These tests verify the matching rules of the resolver and the
//! flattener's null handling using randomized inputs.

use proptest::prelude::*;
use serde_json::{json, Value};
use zpa_lookup::datasource::flatten::{flatten, FieldDef, FieldKind};
use zpa_lookup::datasource::resolver::find_position;
use zpa_lookup::datasource::{AttrValue, Presence};

/// Entities with distinct lowercase ids and names
fn arb_entities() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::hash_set("[a-z]{1,12}", 1..30).prop_map(|names| {
        names
            .into_iter()
            .enumerate()
            .map(|(i, name)| json!({"id": format!("id{}x", i), "name": name}))
            .collect()
    })
}

/// Randomly change the case of each character
fn recase(s: &str, mask: &[bool]) -> String {
    s.chars()
        .zip(mask.iter().cycle())
        .map(|(c, upper)| if *upper { c.to_ascii_uppercase() } else { c })
        .collect()
}

fn group_fields() -> Vec<FieldDef> {
    vec![
        FieldDef::new("name", "name", FieldKind::String),
        FieldDef::new("domains", "domainNames", FieldKind::StringList),
        FieldDef::object_list(
            "servers",
            "servers",
            vec![
                FieldDef::new("id", "id", FieldKind::String),
                FieldDef::new("address", "address", FieldKind::String),
            ],
        ),
    ]
}

fn arb_group() -> impl Strategy<Value = Value> {
    (
        "[a-zA-Z ]{0,20}",
        prop::collection::vec("[a-z]{1,8}\\.example\\.com", 0..5),
        prop::collection::vec(("[0-9]{1,6}", "10\\.[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}"), 0..6),
    )
        .prop_map(|(name, domains, servers)| {
            let servers: Vec<Value> = servers
                .into_iter()
                .map(|(id, address)| json!({"id": id, "address": address}))
                .collect();
            json!({"name": name, "domainNames": domains, "servers": servers})
        })
}

proptest! {
    /// Names match regardless of case
    #[test]
    fn name_match_ignores_case(
        items in arb_entities(),
        pick in any::<prop::sample::Index>(),
        mask in prop::collection::vec(any::<bool>(), 1..12),
    ) {
        let index = pick.index(items.len());
        let name = items[index]["name"].as_str().unwrap().to_string();
        let query = recase(&name, &mask);

        prop_assert_eq!(find_position(&items, None, Some(&query), "id", "name"), Some(index));
    }

    /// Ids match exactly, never by case folding
    #[test]
    fn id_match_is_exact(items in arb_entities(), pick in any::<prop::sample::Index>()) {
        let index = pick.index(items.len());
        let id = items[index]["id"].as_str().unwrap().to_string();

        prop_assert_eq!(find_position(&items, Some(&id), None, "id", "name"), Some(index));
        prop_assert_eq!(
            find_position(&items, Some(&id.to_uppercase()), None, "id", "name"),
            None
        );
    }

    /// An id match wins over a name match on another entry
    #[test]
    fn id_wins_over_name(
        items in arb_entities(),
        a in any::<prop::sample::Index>(),
        b in any::<prop::sample::Index>(),
    ) {
        let by_id = a.index(items.len());
        let by_name = b.index(items.len());
        let id = items[by_id]["id"].as_str().unwrap().to_string();
        let name = items[by_name]["name"].as_str().unwrap().to_string();

        prop_assert_eq!(
            find_position(&items, Some(&id), Some(&name), "id", "name"),
            Some(by_id)
        );
    }

    /// Flattening the same entity twice yields the same record
    #[test]
    fn flatten_is_deterministic(group in arb_group()) {
        let fields = group_fields();
        prop_assert_eq!(flatten(&group, &fields), flatten(&group, &fields));
    }

    /// Empty collections flatten to null, non-empty ones keep every entry in order
    #[test]
    fn null_list_marker(group in arb_group()) {
        let record = flatten(&group, &group_fields());

        let servers = group["servers"].as_array().unwrap();
        if servers.is_empty() {
            prop_assert_eq!(&record["servers"], &AttrValue::Null);
        } else {
            let flattened = record["servers"].as_list().unwrap();
            prop_assert_eq!(flattened.len(), servers.len());
            for (out, src) in flattened.iter().zip(servers) {
                match out {
                    AttrValue::Object(obj) => {
                        prop_assert_eq!(obj["id"].as_str(), src["id"].as_str());
                    }
                    other => prop_assert!(false, "expected object, got {:?}", other),
                }
            }
        }

        let domains = group["domainNames"].as_array().unwrap();
        prop_assert_eq!(record["domains"].is_null(), domains.is_empty());

        let name = group["name"].as_str().unwrap();
        prop_assert_eq!(record["name"].is_null(), name.is_empty());
    }

    /// Whitespace-only inputs are empty, never present
    #[test]
    fn blank_inputs_are_empty(blank in "[ \\t]{0,8}") {
        let presence = Presence::from_option(Some(blank.as_str()));
        prop_assert_eq!(presence, Presence::Empty);
    }
}
