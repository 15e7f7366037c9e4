use parking_lot::RwLock;
use url::Url;

/// Pure predicate over navigation targets, seeded at startup and
/// union-extended by the peer at handshake. Never shrinks within a process
/// lifetime.
pub struct OriginAllowlist {
    entries: RwLock<Vec<String>>,
}

impl OriginAllowlist {
    /// Seed the allowlist from configured entries plus the hardcoded
    /// loopback hosts.
    pub fn new(seed: impl IntoIterator<Item = String>) -> Self {
        let mut entries: Vec<String> = vec!["localhost".to_string(), "127.0.0.1".to_string()];
        for entry in seed {
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Union-extend the allowlist with origins supplied by the authenticating
    /// peer. Duplicates are collapsed; nothing is ever removed.
    pub fn extend(&self, origins: impl IntoIterator<Item = String>) {
        let mut entries = self.entries.write();
        for origin in origins {
            if !entries.contains(&origin) {
                entries.push(origin);
            }
        }
    }

    /// Snapshot the current entries, e.g. to seed `auth_result.allowedOrigins`.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.read().clone()
    }

    /// Whether `target` may be navigated to.
    ///
    /// `file:` URLs are always allowed. Otherwise the URL's host must equal
    /// an allowlist entry's host, or be a subdomain of it.
    pub fn is_allowed(&self, target: &str) -> bool {
        let Ok(url) = Url::parse(target) else {
            return false;
        };
        if url.scheme() == "file" {
            return true;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        self.entries
            .read()
            .iter()
            .any(|entry| Self::host_matches(host, entry))
    }

    fn host_matches(host: &str, entry: &str) -> bool {
        let entry_url = if entry.contains("://") {
            Url::parse(entry).ok()
        } else {
            Url::parse(&format!("https://{entry}")).ok()
        };
        let Some(entry_host) = entry_url.as_ref().and_then(Url::host_str) else {
            return false;
        };
        host == entry_host || host.ends_with(&format!(".{entry_host}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_urls_always_allowed() {
        let allowlist = OriginAllowlist::new([]);
        assert!(allowlist.is_allowed("file:///tmp/page.html"));
    }

    #[test]
    fn unparseable_url_is_rejected() {
        let allowlist = OriginAllowlist::new([]);
        assert!(!allowlist.is_allowed("not a url"));
    }

    #[test]
    fn exact_host_match() {
        let allowlist = OriginAllowlist::new(["example.com".to_string()]);
        assert!(allowlist.is_allowed("https://example.com/path"));
    }

    #[test]
    fn subdomain_match() {
        let allowlist = OriginAllowlist::new(["example.com".to_string()]);
        assert!(allowlist.is_allowed("https://sub.example.com/path"));
    }

    #[test]
    fn unrelated_host_rejected() {
        let allowlist = OriginAllowlist::new(["localhost"].map(str::to_string));
        assert!(!allowlist.is_allowed("https://evil.example/"));
    }

    #[test]
    fn extend_is_additive_only() {
        let allowlist = OriginAllowlist::new([]);
        let before = allowlist.snapshot().len();
        allowlist.extend(["new-origin.test".to_string()]);
        assert_eq!(allowlist.snapshot().len(), before + 1);
        allowlist.extend(["new-origin.test".to_string()]);
        assert_eq!(allowlist.snapshot().len(), before + 1);
    }
}
