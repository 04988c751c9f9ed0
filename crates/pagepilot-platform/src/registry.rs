//! Static table of known platforms and their DOM conventions.

use std::fmt;

/// Which issue classes a platform supports scanning.
///
/// Chat assistants render their own UI, not the user's page, so scanning them
/// for SEO or design problems is meaningless; site builders preview the
/// generated page and support the full set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanCapabilities {
    pub accessibility: bool,
    pub performance: bool,
    pub seo: bool,
    pub design: bool,
}

impl ScanCapabilities {
    /// All issue classes enabled.
    pub const fn full() -> Self {
        Self {
            accessibility: true,
            performance: true,
            seo: true,
            design: true,
        }
    }

    /// No scanning supported.
    pub const fn none() -> Self {
        Self {
            accessibility: false,
            performance: false,
            seo: false,
            design: false,
        }
    }

    pub fn any(&self) -> bool {
        self.accessibility || self.performance || self.seo || self.design
    }
}

/// Immutable description of one recognized platform.
#[derive(Debug, Clone)]
pub struct PlatformProfile {
    /// Human-readable name, e.g. "ChatGPT".
    pub name: String,
    /// Hostname substrings that suggest this platform.
    pub host_patterns: Vec<String>,
    /// CSS selector for the prompt input widget.
    pub input_selector: String,
    /// CSS selector for the submit control.
    pub submit_selector: String,
    /// CSS selector for the response container.
    pub response_selector: String,
    /// Page-global objects that fingerprint this tool (dotted paths).
    pub global_markers: Vec<String>,
    /// Issue classes this platform supports scanning.
    pub capabilities: ScanCapabilities,
}

impl PlatformProfile {
    /// Selectors that structurally identify this platform on a page.
    pub fn structural_selectors(&self) -> [&str; 2] {
        [&self.input_selector, &self.response_selector]
    }
}

impl fmt::Display for PlatformProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.host_patterns.join(", "))
    }
}

/// Ordered set of platform profiles. Earlier entries win detection ties.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    profiles: Vec<PlatformProfile>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table of known platforms.
    pub fn builtin() -> Self {
        let mut reg = Self::new();
        reg.push(PlatformProfile {
            name: "ChatGPT".into(),
            host_patterns: vec!["chatgpt.com".into(), "chat.openai.com".into()],
            input_selector: "#prompt-textarea".into(),
            submit_selector: "button[data-testid=\"send-button\"]".into(),
            response_selector: "div[data-message-author-role=\"assistant\"]".into(),
            global_markers: vec!["__remixContext".into()],
            capabilities: ScanCapabilities::none(),
        });
        reg.push(PlatformProfile {
            name: "Claude".into(),
            host_patterns: vec!["claude.ai".into()],
            input_selector: "div[contenteditable=\"true\"].ProseMirror".into(),
            submit_selector: "button[aria-label=\"Send message\"]".into(),
            response_selector: "div[data-testid=\"assistant-message\"]".into(),
            global_markers: vec![],
            capabilities: ScanCapabilities::none(),
        });
        reg.push(PlatformProfile {
            name: "Gemini".into(),
            host_patterns: vec!["gemini.google.com".into()],
            input_selector: "rich-textarea div[contenteditable=\"true\"]".into(),
            submit_selector: "button.send-button".into(),
            response_selector: "message-content".into(),
            global_markers: vec!["WIZ_global_data".into()],
            capabilities: ScanCapabilities::none(),
        });
        reg.push(PlatformProfile {
            name: "Lovable".into(),
            host_patterns: vec!["lovable.dev".into(), "lovable.app".into()],
            input_selector: "textarea[placeholder*=\"Lovable\"]".into(),
            submit_selector: "button[type=\"submit\"]".into(),
            response_selector: "div[data-message-role=\"assistant\"]".into(),
            global_markers: vec![],
            capabilities: ScanCapabilities::full(),
        });
        reg.push(PlatformProfile {
            name: "Bolt".into(),
            host_patterns: vec!["bolt.new".into()],
            input_selector: "textarea[placeholder*=\"help\"]".into(),
            submit_selector: "button.absolute[class*=\"send\"]".into(),
            response_selector: "div[data-role=\"assistant\"]".into(),
            global_markers: vec!["__remixContext".into()],
            capabilities: ScanCapabilities::full(),
        });
        reg.push(PlatformProfile {
            name: "v0".into(),
            host_patterns: vec!["v0.dev".into(), "v0.app".into()],
            input_selector: "textarea[placeholder*=\"Ask v0\"]".into(),
            submit_selector: "button[type=\"submit\"]".into(),
            response_selector: "div[data-testid=\"message\"]".into(),
            global_markers: vec!["__NEXT_DATA__".into(), "next".into()],
            capabilities: ScanCapabilities::full(),
        });
        reg
    }

    /// Append a profile. Later entries lose detection ties.
    pub fn push(&mut self, profile: PlatformProfile) {
        self.profiles.push(profile);
    }

    /// Profiles in registry order.
    pub fn profiles(&self) -> &[PlatformProfile] {
        &self.profiles
    }

    /// Look up a profile by name (case-insensitive).
    pub fn by_name(&self, name: &str) -> Option<&PlatformProfile> {
        self.profiles
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
