/// URL and title normalization for series identity
///
/// Episode pages carry a trailing episode marker in both the URL slug and the
/// display title. Stripping it recovers the parent series, which is what a
/// favorite is keyed on.
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Trailing episode marker in a URL slug: `-الحلقة-12`, `-episode-3`, `-ep-7`, `-ح-4`, ...
static URL_EPISODE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)-(?:الحلقة|الحلقه|حلقة|ح|episode|ep)-\d+$").expect("valid url suffix pattern")
});

/// Trailing episode marker in a title, with or without a leading dash.
static TITLE_EPISODE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(?:-\s*)?(?:(?:ال)?حلق[ةه]|episode|ح)\s*\d+\s*$")
        .expect("valid title suffix pattern")
});

/// Bare trailing number, only when introduced by a dash (`Show - 3`).
static TITLE_NUMBER_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*-\s*\d+\s*$").expect("valid title number pattern"));

/// Recover the series URL from an episode URL.
///
/// The result is `origin + path` with every trailing episode marker removed and
/// exactly one trailing slash. Query and fragment are dropped. Non-ASCII path
/// segments come back percent-encoded, the same form the browser reports.
///
/// Examples:
/// - https://wwv.qeseh.com/watch/show-episode-12/ → https://wwv.qeseh.com/watch/show/
/// - https://wwv.qeseh.com/series/show → https://wwv.qeseh.com/series/show/
///
/// Unparseable input is returned unchanged.
pub fn normalize_series_url(episode_url: &str) -> String {
    let trimmed = episode_url.trim();

    let mut url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(e) => {
            log::warn!("Cannot normalize series URL {:?}: {}", trimmed, e);
            return trimmed.to_string();
        }
    };

    let origin = url.origin();
    if !origin.is_tuple() {
        return trimmed.to_string();
    }

    let raw_path = url.path().to_string();
    let raw_path = raw_path.strip_suffix('/').unwrap_or(&raw_path);
    let mut segments: Vec<&str> = raw_path.split('/').collect();
    let last = segments.pop().unwrap_or_default();

    let mut path: Vec<String> = segments.into_iter().map(|segment| canonical_segment(segment, false)).collect();
    let slug = canonical_segment(last, true);
    if !slug.is_empty() || path.is_empty() {
        path.push(slug);
    }

    url.set_path(&format!("{}/", path.join("/")));
    format!("{}{}", origin.ascii_serialization(), url.path())
}

/// Decode one path segment, optionally strip episode markers, and encode it again.
///
/// Markers are matched on the decoded text since the browser reports Arabic
/// slugs encoded. Re-encoding keeps a decoded `%` or `/` from turning into
/// live syntax. A segment that is not valid UTF-8 once decoded is kept raw.
fn canonical_segment(raw: &str, strip_markers: bool) -> String {
    let strip = |mut segment: String| {
        if strip_markers {
            while let Some(m) = URL_EPISODE_SUFFIX.find(&segment) {
                segment.truncate(m.start());
            }
        }
        segment
    };

    match urlencoding::decode(raw) {
        Ok(decoded) => urlencoding::encode(&strip(decoded.into_owned())).into_owned(),
        Err(_) => strip(raw.to_string()),
    }
}

/// Recover the series title from an episode title.
///
/// Strips Arabic (`الحلقة 5`, `حلقه 5`, `ح 5`) and English (`Episode 5`)
/// markers, and a dash-separated trailing number, then trims whitespace.
pub fn normalize_series_title(full_title: &str) -> String {
    let mut title = full_title.trim().to_string();

    loop {
        let suffix = TITLE_EPISODE_SUFFIX
            .find(&title)
            .or_else(|| TITLE_NUMBER_SUFFIX.find(&title));

        match suffix {
            Some(m) if m.start() < title.len() => title.truncate(m.start()),
            _ => break,
        }
    }

    title.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(url: &str) -> String {
        Url::parse(url).unwrap().to_string()
    }

    #[test]
    fn test_normalize_url_english_suffix() {
        assert_eq!(
            normalize_series_url("https://wwv.qeseh.com/watch/kurulus-osman-episode-150/"),
            "https://wwv.qeseh.com/watch/kurulus-osman/"
        );
        assert_eq!(
            normalize_series_url("https://wwv.qeseh.com/watch/kurulus-osman-ep-3"),
            "https://wwv.qeseh.com/watch/kurulus-osman/"
        );
        assert_eq!(
            normalize_series_url("https://wwv.qeseh.com/watch/kurulus-osman-EPISODE-9/"),
            "https://wwv.qeseh.com/watch/kurulus-osman/"
        );
    }

    #[test]
    fn test_normalize_url_arabic_suffix() {
        let expected = canonical("https://wwv.qeseh.com/watch/مسلسل-المؤسس/");

        assert_eq!(normalize_series_url("https://wwv.qeseh.com/watch/مسلسل-المؤسس-الحلقة-12/"), expected);
        assert_eq!(normalize_series_url("https://wwv.qeseh.com/watch/مسلسل-المؤسس-الحلقه-12"), expected);
        assert_eq!(normalize_series_url("https://wwv.qeseh.com/watch/مسلسل-المؤسس-حلقة-7/"), expected);
        assert_eq!(normalize_series_url("https://wwv.qeseh.com/watch/مسلسل-المؤسس-ح-4/"), expected);
    }

    #[test]
    fn test_normalize_url_percent_encoded_input() {
        let encoded = canonical("https://wwv.qeseh.com/watch/مسلسل-المؤسس-الحلقة-12/");
        let expected = canonical("https://wwv.qeseh.com/watch/مسلسل-المؤسس/");

        assert_eq!(normalize_series_url(&encoded), expected);
    }

    #[test]
    fn test_normalize_url_without_suffix() {
        assert_eq!(
            normalize_series_url("https://wwv.qeseh.com/series/kurulus-osman"),
            "https://wwv.qeseh.com/series/kurulus-osman/"
        );
        assert_eq!(normalize_series_url("https://wwv.qeseh.com"), "https://wwv.qeseh.com/");
    }

    #[test]
    fn test_normalize_url_drops_query_and_fragment() {
        assert_eq!(
            normalize_series_url("https://wwv.qeseh.com/watch/show-episode-2/?server=1#player"),
            "https://wwv.qeseh.com/watch/show/"
        );
    }

    #[test]
    fn test_normalize_url_keeps_inner_numbers() {
        assert_eq!(
            normalize_series_url("https://wwv.qeseh.com/series/show-2024/"),
            "https://wwv.qeseh.com/series/show-2024/"
        );
    }

    #[test]
    fn test_normalize_url_idempotent() {
        let inputs = [
            "https://wwv.qeseh.com/watch/show-episode-12/",
            "https://wwv.qeseh.com/watch/مسلسل-المؤسس-الحلقة-12/",
            "https://wwv.qeseh.com/series/show",
            "https://wwv.qeseh.com/watch/show-episode-1-ep-2",
            "https://wwv.qeseh.com/watch/a%2541-episode-3/",
            "https://wwv.qeseh.com/watch/a%2Fb-episode-3/",
            "https://wwv.qeseh.com/watch/-episode-3/",
            "https://wwv.qeseh.com/watch/%FF-episode-3/",
        ];

        for input in inputs {
            let once = normalize_series_url(input);
            assert_eq!(normalize_series_url(&once), once, "input: {}", input);
            assert!(once.ends_with('/'));
            assert!(!once.ends_with("//"));
        }
    }

    #[test]
    fn test_normalize_url_keeps_escaped_percent_and_slash() {
        assert_eq!(
            normalize_series_url("https://wwv.qeseh.com/watch/a%2541-episode-3/"),
            "https://wwv.qeseh.com/watch/a%2541/"
        );
        assert_eq!(
            normalize_series_url("https://wwv.qeseh.com/watch/a%2Fb-episode-3/"),
            "https://wwv.qeseh.com/watch/a%2Fb/"
        );
    }

    #[test]
    fn test_normalize_url_invalid_input() {
        assert_eq!(normalize_series_url("not a url"), "not a url");
        assert_eq!(normalize_series_url(""), "");
    }

    #[test]
    fn test_normalize_title_arabic() {
        assert_eq!(normalize_series_title("مسلسل المؤسس عثمان الحلقة 150"), "مسلسل المؤسس عثمان");
        assert_eq!(normalize_series_title("مسلسل المؤسس عثمان - الحلقه 3"), "مسلسل المؤسس عثمان");
        assert_eq!(normalize_series_title("مسلسل المؤسس عثمان حلقة 8 "), "مسلسل المؤسس عثمان");
        assert_eq!(normalize_series_title("مسلسل المؤسس عثمان ح 4"), "مسلسل المؤسس عثمان");
    }

    #[test]
    fn test_normalize_title_english() {
        assert_eq!(normalize_series_title("Kurulus Osman - Episode 150"), "Kurulus Osman");
        assert_eq!(normalize_series_title("Kurulus Osman episode 2"), "Kurulus Osman");
        assert_eq!(normalize_series_title("Kurulus Osman - 7"), "Kurulus Osman");
    }

    #[test]
    fn test_normalize_title_without_marker() {
        assert_eq!(normalize_series_title("  Kurulus Osman  "), "Kurulus Osman");
        assert_eq!(normalize_series_title("Part 2"), "Part 2");
        assert_eq!(normalize_series_title(""), "");
    }

    #[test]
    fn test_normalize_title_idempotent() {
        let inputs = [
            "مسلسل المؤسس عثمان الحلقة 150",
            "Show - Episode 1 - 2",
            "Show - 3",
            "Plain Title",
        ];

        for input in inputs {
            let once = normalize_series_title(input);
            assert_eq!(normalize_series_title(&once), once, "input: {}", input);
        }
        assert_eq!(normalize_series_title("Show - Episode 1 - 2"), "Show");
    }
}
