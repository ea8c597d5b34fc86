//! Input validation: watch-URL checks and form field limits.
//! Keep logic minimal and deterministic; nothing here touches storage.

use url::form_urlencoded;

use crate::{CoreError, NewVideo, UrlRejection, VideoDraft, VideoId, MAX_NAME_CHARS, MAX_URL_CHARS};

const WATCH_SCHEME: &str = "https";
const WATCH_HOST: &str = "www.youtube.com";
const WATCH_PATH: &str = "/watch";
const VIDEO_PARAM: &str = "v";

/// A URL split into its components exactly as written, with no path
/// resolution, host lowercasing or port normalisation.
#[derive(Debug, PartialEq, Eq)]
struct RawUrl<'a> {
    scheme: &'a str,
    authority: &'a str,
    path: &'a str,
    query: &'a str,
}

impl<'a> RawUrl<'a> {
    /// `None` when the input has no scheme. An authority is only present
    /// after a literal `//`; otherwise it is empty.
    fn split(raw: &'a str) -> Option<Self> {
        let (scheme, rest) = raw.split_once(':')?;
        let mut chars = scheme.chars();
        let valid_scheme = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !valid_scheme {
            return None;
        }

        let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
        let (rest, query) = rest.split_once('?').unwrap_or((rest, ""));
        let (authority, path) = match rest.strip_prefix("//") {
            Some(tail) => tail.split_at(tail.find('/').unwrap_or(tail.len())),
            None => ("", rest),
        };
        Some(Self {
            scheme,
            authority,
            path,
            query,
        })
    }
}

/// Extract the video identifier from a watch URL.
///
/// Checks run in order and the first failure wins: scheme, host, path,
/// non-empty query, strict `key=value` query, and finally a non-empty `v`
/// parameter. Components are compared as written: `/./watch` is not `/watch`
/// and `https:www.youtube.com` has no host. Only the scheme is matched
/// case-insensitively. The first non-empty `v` value is returned
/// percent-decoded and otherwise untouched.
pub fn extract_video_id(raw: &str) -> Result<VideoId, CoreError> {
    let reject = |reason| CoreError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    // No scheme at all (including protocol-relative `//host/...`)
    let parts = RawUrl::split(raw).ok_or_else(|| reject(UrlRejection::Scheme))?;

    if !parts.scheme.eq_ignore_ascii_case(WATCH_SCHEME) {
        return Err(reject(UrlRejection::Scheme));
    }

    // An unbalanced IPv6 bracket cannot be split into host and port
    if parts.authority.contains('[') != parts.authority.contains(']') {
        return Err(reject(UrlRejection::Unparseable));
    }

    // The whole authority must be the bare host: no credentials, no port.
    if parts.authority != WATCH_HOST {
        return Err(reject(UrlRejection::Host));
    }

    if parts.path != WATCH_PATH {
        return Err(reject(UrlRejection::Path));
    }

    if parts.query.is_empty() {
        return Err(reject(UrlRejection::EmptyQuery));
    }

    let pairs =
        parse_query_strict(parts.query).ok_or_else(|| reject(UrlRejection::MalformedQuery))?;

    let value = pairs
        .into_iter()
        .find(|(k, v)| k == VIDEO_PARAM && !v.is_empty())
        .map(|(_, v)| v)
        .ok_or_else(|| reject(UrlRejection::MissingVideoParam))?;

    VideoId::new(value)
}

/// Split a query string into decoded pairs, refusing any segment that is not
/// `key=value` (an empty segment such as `a=1&&b=2` is refused too).
fn parse_query_strict(query: &str) -> Option<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for segment in query.split('&') {
        if !segment.contains('=') {
            return None;
        }
        pairs.extend(
            form_urlencoded::parse(segment.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned())),
        );
    }
    Some(pairs)
}

/// Check form fields and derive the video id, producing a draft for storage.
///
/// Name and URL are trimmed; blank notes become `None`. Field limits are
/// checked before the URL rules so an oversized URL is reported as such.
pub fn validate_new_video(input: NewVideo) -> Result<VideoDraft, CoreError> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(CoreError::InvalidInput("name is required".into()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(CoreError::InvalidInput(format!(
            "name must be at most {MAX_NAME_CHARS} characters"
        )));
    }

    let url = input.url.trim().to_string();
    if url.chars().count() > MAX_URL_CHARS {
        return Err(CoreError::InvalidInput(format!(
            "url must be at most {MAX_URL_CHARS} characters"
        )));
    }

    let notes = input.notes.filter(|n| !n.trim().is_empty());
    let video_id = extract_video_id(&url)?;

    Ok(VideoDraft {
        name,
        url,
        notes,
        video_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejection(url: &str) -> UrlRejection {
        match extract_video_id(url) {
            Err(CoreError::InvalidUrl { reason, .. }) => reason,
            other => panic!("expected InvalidUrl for {url}, got {other:?}"),
        }
    }

    #[test]
    fn extracts_plain_watch_url() {
        let id = extract_video_id("https://www.youtube.com/watch?v=0r5PJx7rlds").unwrap();
        assert_eq!(id.as_str(), "0r5PJx7rlds");
    }

    #[test]
    fn extra_params_are_ignored() {
        for url in [
            "https://www.youtube.com/watch?v=abc123&t=42s",
            "https://www.youtube.com/watch?list=PL1&v=abc123",
            "https://www.youtube.com/watch?v=abc123&list=PL1&index=3#frag",
        ] {
            assert_eq!(extract_video_id(url).unwrap().as_str(), "abc123", "{url}");
        }
    }

    #[test]
    fn first_non_empty_v_wins() {
        let id = extract_video_id("https://www.youtube.com/watch?v=first&v=second").unwrap();
        assert_eq!(id.as_str(), "first");
        let id = extract_video_id("https://www.youtube.com/watch?v=&v=second").unwrap();
        assert_eq!(id.as_str(), "second");
    }

    #[test]
    fn value_is_percent_decoded_but_not_otherwise_checked() {
        let id = extract_video_id("https://www.youtube.com/watch?v=a%2Fb+c").unwrap();
        assert_eq!(id.as_str(), "a/b c");
    }

    #[test]
    fn same_url_yields_same_id() {
        let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
        assert_eq!(extract_video_id(url).unwrap(), extract_video_id(url).unwrap());
    }

    #[test]
    fn rejects_each_failure_class() {
        assert_eq!(rejection("https://www.youtube.com/watch"), UrlRejection::EmptyQuery);
        assert_eq!(rejection("https://www.youtube.com/watch?"), UrlRejection::EmptyQuery);
        assert_eq!(rejection("https://www.youtube.com/watch/something"), UrlRejection::Path);
        assert_eq!(
            rejection("https://www.youtube.com/watch/something?v=12345"),
            UrlRejection::Path
        );
        assert_eq!(rejection("https://www.youtube.com/watch/?v=12345"), UrlRejection::Path);
        assert_eq!(
            rejection("https://www.youtube.com/watch?abc=123"),
            UrlRejection::MissingVideoParam
        );
        assert_eq!(
            rejection("https://www.youtube.com/watch?v="),
            UrlRejection::MissingVideoParam
        );
        assert_eq!(rejection("https://github.com"), UrlRejection::Host);
        assert_eq!(rejection("https://minneapolis.edu"), UrlRejection::Host);
        assert_eq!(rejection("https://minneapolis.edu?v=123456789"), UrlRejection::Host);
        assert_eq!(rejection("https:www.youtube.com/watch?v=abc"), UrlRejection::Host);
        assert_eq!(rejection("https://www.youtube.com/./watch?v=abc"), UrlRejection::Path);
    }

    #[test]
    fn scheme_is_checked_before_anything_else() {
        assert_eq!(rejection("http://www.youtube.com/watch?v=abc"), UrlRejection::Scheme);
        assert_eq!(rejection("ftp://github.com/nothing"), UrlRejection::Scheme);
        assert_eq!(rejection("//www.youtube.com/watch?v=abc"), UrlRejection::Scheme);
        assert_eq!(rejection("www.youtube.com/watch?v=abc"), UrlRejection::Scheme);
        assert_eq!(rejection(""), UrlRejection::Scheme);
    }

    #[test]
    fn host_must_match_exactly() {
        assert_eq!(rejection("https://youtube.com/watch?v=abc"), UrlRejection::Host);
        assert_eq!(rejection("https://m.youtube.com/watch?v=abc"), UrlRejection::Host);
        assert_eq!(rejection("https://www.youtube.com:8443/watch?v=abc"), UrlRejection::Host);
        assert_eq!(rejection("https://me@www.youtube.com/watch?v=abc"), UrlRejection::Host);
        assert_eq!(rejection("https://www.youtube.com:443/watch?v=abc"), UrlRejection::Host);
        assert_eq!(rejection("https://WWW.YOUTUBE.COM/watch?v=abc"), UrlRejection::Host);
        assert_eq!(rejection("https://"), UrlRejection::Host);
        assert_eq!(rejection("https://exa mple.com/watch?v=1"), UrlRejection::Host);
        assert_eq!(rejection("https:/www.youtube.com/watch?v=abc"), UrlRejection::Host);
    }

    #[test]
    fn path_and_authority_are_taken_literally() {
        assert_eq!(rejection("https:www.youtube.com/watch?v=abc"), UrlRejection::Host);
        assert_eq!(rejection("https:/www.youtube.com/watch?v=abc"), UrlRejection::Host);
        assert_eq!(
            rejection("https:\\\\www.youtube.com\\watch?v=abc"),
            UrlRejection::Host
        );
        assert_eq!(rejection("https://www.youtube.com/foo/../watch?v=abc"), UrlRejection::Path);
        assert_eq!(rejection("https://www.youtube.com/./watch?v=abc"), UrlRejection::Path);
        assert_eq!(rejection("https://www.youtube.com//watch?v=abc"), UrlRejection::Path);
        assert_eq!(rejection("https://www.youtube.com/watch#?v=abc"), UrlRejection::EmptyQuery);
    }

    #[test]
    fn scheme_case_is_ignored() {
        let id = extract_video_id("HTTPS://www.youtube.com/watch?v=abc").unwrap();
        assert_eq!(id.as_str(), "abc");
    }

    #[test]
    fn malformed_query_is_rejected_outright() {
        assert_eq!(
            rejection("https://www.youtube.com/watch?v=abc&flag"),
            UrlRejection::MalformedQuery
        );
        assert_eq!(
            rejection("https://www.youtube.com/watch?v=abc&&t=1"),
            UrlRejection::MalformedQuery
        );
        assert_eq!(rejection("https://www.youtube.com/watch?v"), UrlRejection::MalformedQuery);
    }

    #[test]
    fn unbalanced_ipv6_brackets_are_unparseable() {
        assert_eq!(rejection("https://[::1/watch?v=1"), UrlRejection::Unparseable);
        assert_eq!(rejection("https://www.youtube.com]/watch?v=1"), UrlRejection::Unparseable);
    }

    #[test]
    fn new_video_fields_are_checked_and_trimmed() {
        let draft = validate_new_video(NewVideo::new(
            "  Zelda ",
            " https://www.youtube.com/watch?v=zz ",
            Some("   ".into()),
        ))
        .unwrap();
        assert_eq!(draft.name, "Zelda");
        assert_eq!(draft.url, "https://www.youtube.com/watch?v=zz");
        assert_eq!(draft.notes, None);
        assert_eq!(draft.video_id.as_str(), "zz");

        let blank = validate_new_video(NewVideo::new(" ", "https://www.youtube.com/watch?v=zz", None));
        assert!(matches!(blank, Err(CoreError::InvalidInput(_))));

        let long_name = "n".repeat(MAX_NAME_CHARS + 1);
        let res = validate_new_video(NewVideo::new(long_name, "https://www.youtube.com/watch?v=zz", None));
        assert!(matches!(res, Err(CoreError::InvalidInput(_))));

        let long_url = format!("https://www.youtube.com/watch?v={}", "x".repeat(MAX_URL_CHARS));
        let res = validate_new_video(NewVideo::new("ok", long_url, None));
        assert!(matches!(res, Err(CoreError::InvalidInput(_))));
    }
}
