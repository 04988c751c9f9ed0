//! Platform detection logic.

use tracing::debug;

use crate::registry::{PlatformProfile, Registry};
use crate::{PageInspector, Result};

/// Match the current page against the registry.
///
/// Hostname substring match alone is not enough — a tool can be embedded in an
/// iframe of an unrelated domain, and hostnames collide. A profile only
/// matches when the hostname matches AND the page carries at least one of its
/// structural selectors or one of its global markers. First match in registry
/// order wins.
pub async fn detect<'r>(
    page: &dyn PageInspector,
    registry: &'r Registry,
) -> Result<Option<&'r PlatformProfile>> {
    let hostname = page.hostname().await?;
    for profile in registry.profiles() {
        if !profile
            .host_patterns
            .iter()
            .any(|pat| hostname.contains(pat.as_str()))
        {
            continue;
        }
        if confirm(page, profile).await? {
            debug!("detected platform {} on {}", profile.name, hostname);
            return Ok(Some(profile));
        }
        debug!(
            "hostname {} matched {} but no structural confirmation",
            hostname, profile.name
        );
    }
    Ok(None)
}

/// Require structural or global-state evidence beyond the hostname.
async fn confirm(page: &dyn PageInspector, profile: &PlatformProfile) -> Result<bool> {
    for sel in profile.structural_selectors() {
        if page.has_selector(sel).await? {
            return Ok(true);
        }
    }
    for marker in &profile.global_markers {
        if page.has_global(marker).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ScanCapabilities;
    use crate::scan::DomAudit;
    use async_trait::async_trait;
    use std::collections::HashSet;

    struct FakePage {
        hostname: String,
        selectors: HashSet<String>,
        globals: HashSet<String>,
    }

    impl FakePage {
        fn new(hostname: &str) -> Self {
            Self {
                hostname: hostname.into(),
                selectors: HashSet::new(),
                globals: HashSet::new(),
            }
        }

        fn with_selector(mut self, sel: &str) -> Self {
            self.selectors.insert(sel.into());
            self
        }

        fn with_global(mut self, g: &str) -> Self {
            self.globals.insert(g.into());
            self
        }
    }

    #[async_trait]
    impl PageInspector for FakePage {
        async fn hostname(&self) -> Result<String> {
            Ok(self.hostname.clone())
        }

        async fn has_selector(&self, selector: &str) -> Result<bool> {
            Ok(self.selectors.contains(selector))
        }

        async fn has_global(&self, path: &str) -> Result<bool> {
            Ok(self.globals.contains(path))
        }

        async fn audit(&self) -> Result<DomAudit> {
            Ok(DomAudit::default())
        }
    }

    fn profile(name: &str, host: &str, input: &str) -> PlatformProfile {
        PlatformProfile {
            name: name.into(),
            host_patterns: vec![host.into()],
            input_selector: input.into(),
            submit_selector: format!("{input}-submit"),
            response_selector: format!("{input}-response"),
            global_markers: vec![],
            capabilities: ScanCapabilities::none(),
        }
    }

    #[tokio::test]
    async fn test_detect_by_hostname_and_selector() {
        let reg = Registry::builtin();
        let page = FakePage::new("chatgpt.com").with_selector("#prompt-textarea");
        let found = detect(&page, &reg).await.unwrap().unwrap();
        assert_eq!(found.name, "ChatGPT");
    }

    #[tokio::test]
    async fn test_hostname_alone_is_not_enough() {
        let reg = Registry::builtin();
        let page = FakePage::new("chatgpt.com");
        assert!(detect(&page, &reg).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_global_marker_confirms() {
        let reg = Registry::builtin();
        let page = FakePage::new("gemini.google.com").with_global("WIZ_global_data");
        let found = detect(&page, &reg).await.unwrap().unwrap();
        assert_eq!(found.name, "Gemini");
    }

    #[tokio::test]
    async fn test_unknown_host_detects_nothing() {
        let reg = Registry::builtin();
        let page = FakePage::new("example.com").with_selector("#prompt-textarea");
        assert!(detect(&page, &reg).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_registry_order_breaks_ties() {
        let mut reg = Registry::new();
        reg.push(profile("First", "shared.host", "#in-a"));
        reg.push(profile("Second", "shared.host", "#in-b"));
        // Page confirms both profiles; earlier entry must win.
        let page = FakePage::new("shared.host")
            .with_selector("#in-a")
            .with_selector("#in-b");
        let found = detect(&page, &reg).await.unwrap().unwrap();
        assert_eq!(found.name, "First");
    }

    #[tokio::test]
    async fn test_disjoint_hosts_each_detected() {
        let mut reg = Registry::new();
        reg.push(profile("A", "a.example", "#in-a"));
        reg.push(profile("B", "b.example", "#in-b"));
        let page_a = FakePage::new("a.example").with_selector("#in-a");
        let page_b = FakePage::new("b.example").with_selector("#in-b");
        assert_eq!(detect(&page_a, &reg).await.unwrap().unwrap().name, "A");
        assert_eq!(detect(&page_b, &reg).await.unwrap().unwrap().name, "B");
    }
}
