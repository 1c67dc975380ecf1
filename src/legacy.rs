//! Size/info helpers kept for old call sites. They perform no requests.

/// Result of [`url_info`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlInfo {
    /// Always empty
    pub mime: String,
    /// Suffix of the last path segment, without the dot
    pub ext: String,
    /// Always zero
    pub size: u64,
}

/// Always 0.
#[deprecated(since = "0.1.0", note = "no request is made; always returns 0")]
pub fn url_size(_url: &str) -> u64 {
    0
}

/// Sum of [`url_size`] over `urls`, i.e. 0.
#[deprecated(since = "0.1.0", note = "no request is made; always returns 0")]
#[allow(deprecated)]
pub fn urls_size<I, S>(urls: I) -> u64
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    urls.into_iter().map(|url| url_size(url.as_ref())).sum()
}

/// Guess the file extension from `url`; mime and size stay empty.
///
/// For `http(s)://host/a/b/c.dd?ee&ff` the extension is `dd`.
#[deprecated(since = "0.1.0", note = "only the extension is computed")]
pub fn url_info(url: &str) -> UrlInfo {
    let path = url.split('?').next().unwrap_or(url);
    let file = path.rsplit('/').next().unwrap_or(path);
    let ext = file
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_string())
        .unwrap_or_default();

    UrlInfo {
        mime: String::new(),
        ext,
        size: 0,
    }
}
