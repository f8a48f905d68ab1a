use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static NOT_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("static regex"));
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").expect("static regex"));

/// Builds a group slug out of its title. Unicode letters are kept (NFKC) so
/// that non latin titles still produce a usable identifier.
pub fn slugify(title: &str) -> String {
    let normalized = title.nfkc().collect::<String>().to_lowercase();
    let cleaned = NOT_SLUG_CHARS.replace_all(&normalized, "");
    SEPARATORS
        .replace_all(cleaned.trim(), "-")
        .trim_matches(|c| c == '-' || c == '_')
        .to_owned()
}

/// Slugs travel in urls, so only word characters and hyphens are accepted.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && slug.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

/// First `limit` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Everything but unreserved characters (plus the `@` and `+` usernames may
/// hold) is encoded so the segment can be used in a `Location` header.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'@')
    .remove(b'+');

pub fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", encode_path_segment(username))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_title() {
        assert_eq!(slugify("Rust & Friends: Weekly!"), "rust-friends-weekly");
        assert_eq!(slugify("  spaced   out  "), "spaced-out");
    }

    #[test]
    fn test_slugify_keeps_unicode_letters() {
        assert_eq!(slugify("Тестовая группа"), "тестовая-группа");
    }

    #[test]
    fn test_slugify_only_punctuation_is_empty() {
        assert_eq!(slugify("?!."), "");
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("test-slug"));
        assert!(is_valid_slug("test_slug_2"));
        assert!(!is_valid_slug("with space"));
        assert!(!is_valid_slug(""));
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("Тестовый пост длиннее", 15), "Тестовый пост д");
        assert_eq!(truncate_chars("short", 15), "short");
    }

    #[test]
    fn test_profile_url_is_header_safe() {
        assert_eq!(profile_url("leo.b@x+y"), "/profile/leo.b@x+y/");
        assert_eq!(profile_url("лев"), "/profile/%D0%BB%D0%B5%D0%B2/");
        assert_eq!(encode_path_segment("a b/c?"), "a%20b%2Fc%3F");
    }
}
