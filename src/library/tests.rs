use super::*;

fn sample() -> Library {
    Library::new(vec![
        Track::new(0, "Alone", "Marshmello", "file:///m/alone.mp3"),
        Track::new(1, "Blue", "Eiffel 65", "file:///m/blue.mp3"),
        Track::new(2, "Happier", "Marshmello", "file:///m/happier.mp3"),
    ])
}

#[test]
fn lookups_resolve_by_id_locator_and_title() {
    let lib = sample();
    assert_eq!(lib.len(), 3);
    assert_eq!(lib.by_id(TrackId(1)).unwrap().title, "Blue");
    assert_eq!(
        lib.by_locator("file:///m/happier.mp3").unwrap().id,
        TrackId(2)
    );
    assert_eq!(lib.by_title("Alone").unwrap().id, TrackId(0));
    assert!(lib.by_title("alone").is_none());
    assert!(lib.by_id(TrackId(9)).is_none());
}

#[test]
fn by_artist_keeps_catalog_order() {
    let titles: Vec<String> = sample()
        .by_artist("Marshmello")
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, vec!["Alone".to_string(), "Happier".to_string()]);
}

#[test]
fn tracks_compare_by_id_only() {
    let a = Track::new(7, "One", "X", "file:///a.mp3");
    let renamed = Track::new(7, "Other", "Y", "file:///b.mp3");
    let other = Track::new(8, "One", "X", "file:///a.mp3");
    assert_eq!(a, renamed);
    assert_ne!(a, other);
}

#[test]
fn refresh_reads_the_catalog_once() {
    let catalog = sample().tracks().to_vec();
    let lib = Library::refresh(&catalog);
    assert_eq!(lib.locators().len(), 3);
    assert!(lib.locators().contains("file:///m/blue.mp3"));
}
