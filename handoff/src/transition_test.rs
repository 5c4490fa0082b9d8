use super::*;

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

#[test]
fn from_query_reads_known_params() {
    let t = PendingTransition::from_query(&params(&[("token", "abc123"), ("code", "xyz"), ("nextUrl", "/cases/7")]));
    assert_eq!(t.query_token.as_deref(), Some("abc123"));
    assert_eq!(t.provider_code.as_deref(), Some("xyz"));
    assert_eq!(t.next_url.as_deref(), Some("/cases/7"));
    assert!(t.referrer_tag.is_none());
}

#[test]
fn from_query_treats_empty_values_as_absent() {
    let t = PendingTransition::from_query(&params(&[("token", ""), ("code", "  ")]));
    assert!(t.query_token.is_none());
    assert!(t.provider_code.is_none());
}

#[test]
fn from_query_ignores_unknown_params() {
    let t = PendingTransition::from_query(&params(&[("jwt", "abc")]));
    assert!(t.query_token.is_none());
}

#[test]
fn each_transition_gets_a_fresh_id() {
    assert_ne!(PendingTransition::new().id(), PendingTransition::new().id());
}

#[test]
fn clone_keeps_id() {
    let t = PendingTransition::new();
    assert_eq!(t.clone().id(), t.id());
}

#[test]
fn destination_prefers_next_url() {
    let t = PendingTransition::new()
        .with_requested_url(Some("/instances/1".into()))
        .with_next_url("/cases/2");
    assert_eq!(t.destination(), Some("/cases/2"));
}

#[test]
fn destination_falls_back_to_requested_url() {
    let t = PendingTransition::new().with_requested_url(Some("/instances/1".into()));
    assert_eq!(t.destination(), Some("/instances/1"));
    assert_eq!(PendingTransition::new().destination(), None);
}

#[test]
fn off_site_destinations_are_ignored() {
    let t = PendingTransition::new()
        .with_requested_url(Some("/instances/1".into()))
        .with_next_url("https://evil.example/phish");
    assert_eq!(t.destination(), Some("/instances/1"));

    let t = PendingTransition::new()
        .with_requested_url(Some("//evil.example".into()))
        .with_next_url("/\\evil.example");
    assert_eq!(t.destination(), None);
}

#[test]
fn public_route_detection() {
    let public = PendingTransition::new().with_from_route(Some("public-instances.detail".into()));
    let private = PendingTransition::new().with_from_route(Some("instances.edit".into()));
    assert!(public.from_public_route());
    assert!(!private.from_public_route());
    assert!(!PendingTransition::new().from_public_route());
}

#[test]
fn referrer_tag_parse() {
    assert_eq!(ReferrerTag::parse("internal"), Some(ReferrerTag::Internal));
    assert_eq!(ReferrerTag::parse(" External "), Some(ReferrerTag::External));
    assert_eq!(ReferrerTag::parse("portal"), None);
}

#[test]
fn blank_referrer_is_absent() {
    let t = PendingTransition::new().with_referrer(Some(String::new()));
    assert!(t.referrer.is_none());
}
