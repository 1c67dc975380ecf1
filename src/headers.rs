//! Browser header profiles
//!
//! Outbound headers that make requests look like they come from a desktop
//! browser. Every profile is kept in two variants: one advertising
//! `Accept-Encoding` and one without it, for callers that want the server to
//! send an uncompressed body.

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, USER_AGENT,
};

use crate::error::{FetchError, Result};

/// Only encodings the retrieval pipeline knows how to undo.
const SUPPORTED_ENCODINGS: &str = "gzip, deflate";

const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const DEFAULT_ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.8,en-US;q=0.5,en;q=0.3";
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:38.0) Gecko/20100101 Firefox/38.0 Iceweasel/38.2.1";

const CHROME_VERSIONS: &[(&str, &str)] = &[
    ("131", "131.0.6778.205"),
    ("132", "132.0.6834.160"),
    ("133", "133.0.6943.98"),
];
const FIREFOX_VERSIONS: &[&str] = &["133.0", "134.0", "135.0"];
const SAFARI_VERSIONS: &[(&str, &str)] = &[("17.6", "605.1.15"), ("18.2", "605.1.15")];

/// Header pair: with and without compression negotiation.
///
/// Invariant: every key of `full` except `Accept-Encoding` is present in
/// `no_compression` with the same value, and `no_compression` never holds
/// `Accept-Encoding`.
#[derive(Debug, Clone)]
pub struct HeaderProfile {
    full: HeaderMap,
    no_compression: HeaderMap,
}

impl HeaderProfile {
    /// Build a profile from a header map; the no-compression variant is derived.
    pub fn new(full: HeaderMap) -> Self {
        let mut no_compression = full.clone();
        no_compression.remove(ACCEPT_ENCODING);
        Self {
            full,
            no_compression,
        }
    }

    /// Realistic Chrome headers
    #[must_use]
    pub fn chrome() -> Self {
        let mut rng = rand::thread_rng();
        let platform = Platform::random();
        let (major, full) = CHROME_VERSIONS
            .choose(&mut rng)
            .copied()
            .unwrap_or(CHROME_VERSIONS[0]);

        let mut headers = browser_headers(
            &format!(
                "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{full} Safari/537.36",
                platform.os_string()
            ),
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
        );

        let brands = format!(
            "\"Google Chrome\";v=\"{major}\", \"Chromium\";v=\"{major}\", \"Not_A Brand\";v=\"24\""
        );
        if let Ok(value) = HeaderValue::from_str(&brands) {
            headers.insert(HeaderName::from_static("sec-ch-ua"), value);
        }
        headers.insert(
            HeaderName::from_static("sec-ch-ua-mobile"),
            HeaderValue::from_static("?0"),
        );
        headers.insert(
            HeaderName::from_static("sec-ch-ua-platform"),
            HeaderValue::from_static(platform.sec_ch_platform()),
        );

        Self::new(headers)
    }

    /// Realistic Firefox headers
    #[must_use]
    pub fn firefox() -> Self {
        let mut rng = rand::thread_rng();
        let platform = Platform::random();
        let version = FIREFOX_VERSIONS
            .choose(&mut rng)
            .copied()
            .unwrap_or(FIREFOX_VERSIONS[0]);

        // Firefox doesn't send Sec-CH-UA headers
        Self::new(browser_headers(
            &format!(
                "Mozilla/5.0 ({}; rv:{version}) Gecko/20100101 Firefox/{version}",
                platform.os_string()
            ),
            DEFAULT_ACCEPT,
        ))
    }

    /// Realistic Safari headers (always macOS)
    #[must_use]
    pub fn safari() -> Self {
        let mut rng = rand::thread_rng();
        let (version, webkit) = SAFARI_VERSIONS
            .choose(&mut rng)
            .copied()
            .unwrap_or(SAFARI_VERSIONS[0]);

        Self::new(browser_headers(
            &format!(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/{webkit} (KHTML, like Gecko) Version/{version} Safari/{webkit}"
            ),
            DEFAULT_ACCEPT,
        ))
    }

    /// Random browser, weighted by market share
    #[must_use]
    pub fn random() -> Self {
        let roll: f32 = rand::thread_rng().gen();
        if roll < 0.65 {
            Self::chrome()
        } else if roll < 0.85 {
            Self::safari()
        } else {
            Self::firefox()
        }
    }

    /// Set `key` to `value`, last write wins.
    ///
    /// `Accept-Encoding` only lands in the full variant.
    pub fn add_header(&mut self, key: &str, value: &str) -> Result<()> {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| FetchError::InvalidHeader(format!("name {key:?}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| FetchError::InvalidHeader(format!("value for {key}")))?;
        self.insert(name, value);
        Ok(())
    }

    /// Typed variant of [`add_header`](Self::add_header).
    pub fn insert(&mut self, name: HeaderName, value: HeaderValue) {
        if name != ACCEPT_ENCODING {
            self.no_compression.insert(name.clone(), value.clone());
        }
        self.full.insert(name, value);
    }

    /// Headers including compression negotiation
    pub fn full(&self) -> &HeaderMap {
        &self.full
    }

    /// Headers without `Accept-Encoding`
    pub fn without_compression(&self) -> &HeaderMap {
        &self.no_compression
    }
}

impl Default for HeaderProfile {
    /// Desktop Firefox on Linux.
    fn default() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(SUPPORTED_ENCODINGS));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        Self::new(headers)
    }
}

/// Platform configurations
#[derive(Debug, Clone, Copy)]
enum Platform {
    MacOS,
    Windows,
    Linux,
}

impl Platform {
    fn random() -> Self {
        // Realistic distribution: Windows 65%, macOS 20%, Linux 15%
        let roll: f32 = rand::thread_rng().gen();
        if roll < 0.65 {
            Platform::Windows
        } else if roll < 0.85 {
            Platform::MacOS
        } else {
            Platform::Linux
        }
    }

    fn os_string(self) -> &'static str {
        match self {
            Platform::MacOS => "Macintosh; Intel Mac OS X 10_15_7",
            Platform::Windows => "Windows NT 10.0; Win64; x64",
            Platform::Linux => "X11; Linux x86_64",
        }
    }

    fn sec_ch_platform(self) -> &'static str {
        match self {
            Platform::MacOS => "\"macOS\"",
            Platform::Windows => "\"Windows\"",
            Platform::Linux => "\"Linux\"",
        }
    }
}

fn random_accept_language() -> &'static str {
    let languages = [
        "en-US,en;q=0.9",
        "en-GB,en;q=0.9",
        "en-US,en;q=0.9,de;q=0.8",
        "en-US,en;q=0.9,ja;q=0.8",
        "fi-FI,fi;q=0.9,en;q=0.8",
    ];
    languages
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(languages[0])
}

/// Headers shared by all presets.
fn browser_headers(user_agent: &str, accept: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    // User agents are assembled from the static version tables above
    if let Ok(value) = HeaderValue::from_str(user_agent) {
        headers.insert(USER_AGENT, value);
    }
    headers.insert(ACCEPT, HeaderValue::from_static(accept));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(random_accept_language()),
    );
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(SUPPORTED_ENCODINGS));
    headers.insert(
        HeaderName::from_static("upgrade-insecure-requests"),
        HeaderValue::from_static("1"),
    );
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_in_sync(profile: &HeaderProfile) {
        assert!(!profile.without_compression().contains_key(ACCEPT_ENCODING));
        for (name, value) in profile.full() {
            if name != ACCEPT_ENCODING {
                assert_eq!(profile.without_compression().get(name), Some(value));
            }
        }
        assert_eq!(
            profile.full().len(),
            profile.without_compression().len()
                + usize::from(profile.full().contains_key(ACCEPT_ENCODING))
        );
    }

    #[test]
    fn default_profile_negotiates_gzip_and_deflate() {
        let profile = HeaderProfile::default();
        assert_eq!(profile.full()[ACCEPT_ENCODING], "gzip, deflate");
        assert!(profile.full()[USER_AGENT]
            .to_str()
            .unwrap()
            .contains("Firefox"));
        assert_in_sync(&profile);
    }

    #[test]
    fn add_header_updates_both_variants() {
        let mut profile = HeaderProfile::default();
        profile.add_header("Referer", "https://example.com/").unwrap();
        assert_eq!(profile.full()["referer"], "https://example.com/");
        assert_eq!(profile.without_compression()["referer"], "https://example.com/");
        assert_in_sync(&profile);
    }

    #[test]
    fn add_header_overwrites_case_insensitively() {
        let mut profile = HeaderProfile::default();
        profile.add_header("user-agent", "first").unwrap();
        profile.add_header("User-Agent", "second").unwrap();
        assert_eq!(profile.full()[USER_AGENT], "second");
        assert_eq!(profile.without_compression()[USER_AGENT], "second");
        assert_in_sync(&profile);
    }

    #[test]
    fn accept_encoding_never_reaches_no_compression() {
        let mut profile = HeaderProfile::default();
        profile.add_header("Accept-Encoding", "identity").unwrap();
        profile.add_header("ACCEPT-ENCODING", "gzip").unwrap();
        assert_eq!(profile.full()[ACCEPT_ENCODING], "gzip");
        assert_in_sync(&profile);
    }

    #[test]
    fn sync_holds_across_mixed_sequences() {
        let mut profile = HeaderProfile::random();
        let edits = [
            ("Cookie", "a=1"),
            ("Accept-Encoding", "deflate"),
            ("Referer", "https://a/"),
            ("Cookie", "a=2"),
            ("Accept", "*/*"),
        ];
        for (key, value) in edits {
            profile.add_header(key, value).unwrap();
            assert_in_sync(&profile);
        }
        assert_eq!(profile.without_compression()["cookie"], "a=2");
    }

    #[test]
    fn add_header_rejects_invalid_name() {
        let mut profile = HeaderProfile::default();
        let err = profile.add_header("bad header", "x").unwrap_err();
        assert!(matches!(err, FetchError::InvalidHeader(_)));
        assert_in_sync(&profile);
    }

    #[test]
    fn chrome_sends_client_hints() {
        let profile = HeaderProfile::chrome();
        assert!(profile.full()[USER_AGENT].to_str().unwrap().contains("Chrome"));
        assert!(profile.full().contains_key("sec-ch-ua"));
        assert_in_sync(&profile);
    }

    #[test]
    fn firefox_and_safari_skip_client_hints() {
        for profile in [HeaderProfile::firefox(), HeaderProfile::safari()] {
            assert!(!profile.full().contains_key("sec-ch-ua"));
            assert_in_sync(&profile);
        }
        let safari = HeaderProfile::safari();
        assert!(safari.full()[USER_AGENT].to_str().unwrap().contains("Macintosh"));
    }

    #[test]
    fn presets_only_advertise_supported_encodings() {
        for profile in [
            HeaderProfile::chrome(),
            HeaderProfile::firefox(),
            HeaderProfile::safari(),
        ] {
            assert_eq!(profile.full()[ACCEPT_ENCODING], SUPPORTED_ENCODINGS);
        }
    }
}
