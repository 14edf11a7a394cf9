use super::*;

fn origin() -> Url {
    Url::parse("https://www.rottentomatoes.com").unwrap()
}

// -----------------------------------------------------------------------
// normalize_url
// -----------------------------------------------------------------------

#[test]
fn strips_query_and_fragment() {
    assert_eq!(
        normalize_url("https://site/m/foo?x=1#y", &origin()),
        "https://site/m/foo"
    );
}

#[test]
fn resolves_root_relative_href_against_origin() {
    assert_eq!(
        normalize_url("/m/the_matrix", &origin()),
        "https://www.rottentomatoes.com/m/the_matrix"
    );
}

#[test]
fn resolves_scheme_relative_href_with_https() {
    assert_eq!(
        normalize_url("//www.rottentomatoes.com/m/alien/", &origin()),
        "https://www.rottentomatoes.com/m/alien"
    );
}

#[test]
fn strips_trailing_slash() {
    assert_eq!(
        normalize_url("https://www.rottentomatoes.com/m/alien/", &origin()),
        "https://www.rottentomatoes.com/m/alien"
    );
}

#[test]
fn trailing_slash_before_query_is_stripped_too() {
    assert_eq!(
        normalize_url("/m/alien/?ref=browse", &origin()),
        "https://www.rottentomatoes.com/m/alien"
    );
}

#[test]
fn normalization_is_idempotent() {
    let inputs = [
        "/m/the_matrix?x=1",
        "//www.rottentomatoes.com/m/alien/#reviews",
        "https://site/m/foo?x=1#y",
        "https://www.rottentomatoes.com/",
    ];
    for input in inputs {
        let once = normalize_url(input, &origin());
        let twice = normalize_url(&once, &origin());
        assert_eq!(once, twice, "not idempotent for {input}");
    }
}

#[test]
fn preserves_http_scheme() {
    assert_eq!(
        normalize_url("http://example.com/m/foo?x=1", &origin()),
        "http://example.com/m/foo"
    );
}

#[test]
fn empty_href_normalizes_to_empty() {
    assert_eq!(normalize_url("   ", &origin()), "");
}

#[test]
fn non_http_scheme_normalizes_to_empty() {
    assert_eq!(normalize_url("javascript:void(0)", &origin()), "");
    assert_eq!(normalize_url("mailto:someone@example.com", &origin()), "");
}

// -----------------------------------------------------------------------
// normalize_title
// -----------------------------------------------------------------------

#[test]
fn title_normalization_ignores_case_whitespace_and_punctuation() {
    assert_eq!(normalize_title("The Matrix!"), normalize_title("the   matrix"));
    assert_eq!(normalize_title("The Matrix!"), "the matrix");
}

#[test]
fn title_normalization_trims_and_collapses_tabs_and_newlines() {
    assert_eq!(normalize_title("  Alien:\n\tRomulus "), "alien romulus");
}

#[test]
fn title_normalization_keeps_digits_and_underscores() {
    assert_eq!(normalize_title("Blade Runner 2049"), "blade runner 2049");
    assert_eq!(normalize_title("snake_case"), "snake_case");
}

#[test]
fn title_normalization_keeps_non_ascii_letters() {
    assert_eq!(normalize_title("Amélie"), "amélie");
}

#[test]
fn punctuation_only_title_normalizes_to_empty() {
    assert_eq!(normalize_title("?!..."), "");
}
