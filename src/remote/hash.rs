//! Page identity
//!
//! Pages are keyed on the peer by a 32-bit DJB2 hash of `host[:port]` plus
//! path. Scheme, query and fragment do not contribute, so the same article
//! reached over http, https or with tracking parameters shares highlights.

use reqwest::Url;

/// DJB2 (xor variant) over UTF-16 code units, consumed last to first
///
/// Matches the hash browser clients compute, so both sides agree on page
/// keys for non-ASCII URLs too.
pub fn djb2(input: &str) -> u32 {
    let units: Vec<u16> = input.encode_utf16().collect();
    units
        .iter()
        .rev()
        .fold(5381u32, |hash, &unit| hash.wrapping_mul(33) ^ u32::from(unit))
}

/// Query parameter a share link uses to name the highlighted element
pub const SHARE_PARAM: &str = "xPath";

#[derive(Debug, thiserror::Error)]
#[error("Invalid page URL {url}: {message}")]
pub struct InvalidPageUrl {
    pub url: String,
    pub message: String,
}

/// The page a highlighter is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageIdentity {
    url: Url,
    hash: u32,
}

impl PageIdentity {
    pub fn parse(page_url: &str) -> Result<Self, InvalidPageUrl> {
        let url = Url::parse(page_url).map_err(|e| InvalidPageUrl {
            url: page_url.to_string(),
            message: e.to_string(),
        })?;
        let hash = djb2(&page_key(&url));
        Ok(Self { url, hash })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Peer-side key of this page
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Path named by the page's share parameter, if the page was opened
    /// from a share link
    pub fn queried_path(&self) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == SHARE_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    }

    /// Link to this page that points at the element at `path`
    pub fn share_url(&self, path: &str) -> Url {
        let mut url = self.url.clone();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != SHARE_PARAM)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair(SHARE_PARAM, path);
        url
    }
}

/// `host[:port]` followed by the path
fn page_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}{}", host, port, url.path()),
        None => format!("{}{}", host, url.path()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_djb2_known_values() {
        assert_eq!(djb2(""), 5381);
        assert_eq!(djb2("a"), 177604);
        // "ab" hashes 'b' first
        assert_eq!(djb2("ab"), (5381u32 * 33 ^ 98).wrapping_mul(33) ^ 97);
    }

    #[test]
    fn test_hash_ignores_scheme_query_and_fragment() {
        let plain = PageIdentity::parse("http://example.com/post/1").unwrap();
        let decorated = PageIdentity::parse("https://example.com/post/1?utm=x#top").unwrap();
        let other = PageIdentity::parse("https://example.com/post/2").unwrap();

        assert_eq!(plain.hash(), decorated.hash());
        assert_ne!(plain.hash(), other.hash());
        assert_eq!(plain.hash(), djb2("example.com/post/1"));
    }

    #[test]
    fn test_port_is_part_of_identity() {
        let page = PageIdentity::parse("http://localhost:8080/a").unwrap();
        assert_eq!(page.hash(), djb2("localhost:8080/a"));
    }

    #[test]
    fn test_share_url_sets_parameter() {
        let page = PageIdentity::parse("https://example.com/post?lang=en&xPath=old").unwrap();
        let shared = page.share_url("id(\"main\")/P[2]");

        let shared_page = PageIdentity::parse(shared.as_str()).unwrap();
        assert_eq!(shared_page.queried_path().as_deref(), Some("id(\"main\")/P[2]"));
        assert_eq!(shared.query_pairs().filter(|(k, _)| k == SHARE_PARAM).count(), 1);
        assert!(shared.query_pairs().any(|(k, v)| k == "lang" && v == "en"));
    }

    #[test]
    fn test_invalid_url() {
        assert!(PageIdentity::parse("not a url").is_err());
        assert_eq!(PageIdentity::parse("https://example.com/").unwrap().queried_path(), None);
    }
}
