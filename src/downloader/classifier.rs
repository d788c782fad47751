// URL classification - decides whether a message is a supported video link

use url::Url;

/// Host suffixes accepted by default
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &["tiktok.com", "vm.tiktok.com", "vt.tiktok.com"];

/// Allow-list classifier over the URL's host component
#[derive(Debug, Clone)]
pub struct UrlClassifier {
    allowed_hosts: Vec<String>,
}

impl UrlClassifier {
    pub fn new() -> Self {
        Self::with_hosts(DEFAULT_ALLOWED_HOSTS.iter().copied())
    }

    pub fn with_hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_hosts: hosts
                .into_iter()
                .map(|h| h.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// True iff `url` parses and its host equals, or is a subdomain of, an allowed host
    pub fn is_supported(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url.trim()) else {
            return false;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return false;
        }
        let Some(host) = parsed.host_str() else {
            return false;
        };

        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.allowed_hosts.iter().any(|allowed| {
            host == *allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

impl Default for UrlClassifier {
    fn default() -> Self {
        Self::new()
    }
}
