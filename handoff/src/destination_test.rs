use super::*;

#[test]
fn first_write_wins() {
    let mut memory = DestinationMemory::new("/");
    assert!(memory.remember("/cases/1"));
    assert!(!memory.remember("/cases/2"));
    assert_eq!(memory.recall(), "/cases/1");
}

#[test]
fn recall_without_write_returns_fallback() {
    let memory = DestinationMemory::new("/dashboard");
    assert_eq!(memory.recall(), "/dashboard");
    assert!(!memory.is_set());
}

#[test]
fn blank_urls_are_not_stored() {
    let mut memory = DestinationMemory::new("/");
    assert!(!memory.remember(""));
    assert!(!memory.remember("   "));
    assert!(memory.remember("/cases/3"));
    assert_eq!(memory.recall(), "/cases/3");
}

#[test]
fn clear_allows_next_attempt_to_write() {
    let mut memory = DestinationMemory::new("/");
    memory.remember("/a");
    memory.clear();
    assert_eq!(memory.recall(), "/");
    assert!(memory.remember("/b"));
    assert_eq!(memory.recall(), "/b");
}

#[test]
fn take_returns_and_clears() {
    let mut memory = DestinationMemory::new("/");
    memory.remember("/cases/9");
    assert_eq!(memory.take(), "/cases/9");
    assert!(!memory.is_set());
    assert_eq!(memory.take(), "/");
}

#[test]
fn only_app_paths_are_stored() {
    let mut memory = DestinationMemory::new("/");
    for url in [
        "https://evil.example/phish",
        "//evil.example",
        "/\\evil.example",
        "/\t/evil.example",
        "javascript:alert(1)",
        "cases/1",
    ] {
        assert!(!memory.remember(url), "{url:?}");
    }
    assert!(!memory.is_set());
    assert!(memory.remember(" /cases/1?tab=2 "));
    assert_eq!(memory.recall(), "/cases/1?tab=2");
}

#[test]
fn app_path_check() {
    assert!(is_app_path("/"));
    assert!(is_app_path("/instances/5#docs"));
    assert!(!is_app_path(""));
    assert!(!is_app_path("http://app.example/"));
    assert!(!is_app_path("//app.example/"));
}
