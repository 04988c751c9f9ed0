//! Static DOM inspection for structural issues.
//!
//! One audit snapshot is taken per scan; every check is a pure function over
//! that snapshot, so scanning is side-effect-free and idempotent for an
//! unchanged DOM. A check that has nothing to say contributes no issues; no
//! check can abort the scan.

use serde::{Deserialize, Serialize};

use crate::registry::PlatformProfile;
use crate::{PageInspector, Result};

/// Issue classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Accessibility,
    Performance,
    Seo,
    Design,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::Accessibility => "accessibility",
            IssueCategory::Performance => "performance",
            IssueCategory::Seo => "seo",
            IssueCategory::Design => "design",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A structural defect paired with a remediation template.
///
/// `selectors` reference live DOM nodes and are only valid for the current
/// page load; never cache them across navigations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedIssue {
    pub category: IssueCategory,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub remediation: String,
    pub selectors: Vec<String>,
}

// ---------------------------------------------------------------------------
// Audit snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageFacts {
    pub selector: String,
    pub has_alt: bool,
    pub lazy: bool,
    /// True for next-gen formats (webp, avif).
    pub next_gen: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkFacts {
    pub selector: String,
    pub text: String,
    pub aria_label: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeadingFacts {
    pub selector: String,
    /// 1 for `<h1>` .. 6 for `<h6>`, in document order.
    pub level: u8,
}

/// Structural facts snapshotted from the page in one pass.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DomAudit {
    pub title: String,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageFacts>,
    #[serde(default)]
    pub links: Vec<LinkFacts>,
    #[serde(default)]
    pub headings: Vec<HeadingFacts>,
    #[serde(default)]
    pub blocking_scripts: u32,
    /// Distinct computed colors in use.
    #[serde(default)]
    pub colors: Vec<String>,
    /// Distinct font families in use.
    #[serde(default)]
    pub font_families: Vec<String>,
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

const MAX_BLOCKING_SCRIPTS: u32 = 3;
const MAX_COLORS: usize = 20;
const MAX_FONTS: usize = 4;
const TITLE_RANGE: (usize, usize) = (30, 60);
const MIN_META_DESCRIPTION: usize = 50;

/// Run all checks the profile's capability flags allow.
pub async fn scan_for_issues(
    page: &dyn PageInspector,
    profile: &PlatformProfile,
) -> Result<Vec<DetectedIssue>> {
    if !profile.capabilities.any() {
        return Ok(Vec::new());
    }
    let audit = page.audit().await?;
    let mut issues = Vec::new();
    if profile.capabilities.accessibility {
        issues.extend(check_image_alts(&audit));
        issues.extend(check_link_text(&audit));
        issues.extend(check_heading_skips(&audit));
    }
    if profile.capabilities.performance {
        issues.extend(check_image_loading(&audit));
        issues.extend(check_blocking_scripts(&audit));
    }
    if profile.capabilities.seo {
        issues.extend(check_title(&audit));
        issues.extend(check_meta_description(&audit));
        issues.extend(check_h1_count(&audit));
    }
    if profile.capabilities.design {
        issues.extend(check_color_count(&audit));
        issues.extend(check_font_count(&audit));
    }
    Ok(issues)
}

fn check_image_alts(audit: &DomAudit) -> Option<DetectedIssue> {
    let missing: Vec<String> = audit
        .images
        .iter()
        .filter(|i| !i.has_alt)
        .map(|i| i.selector.clone())
        .collect();
    if missing.is_empty() {
        return None;
    }
    Some(DetectedIssue {
        category: IssueCategory::Accessibility,
        severity: Severity::High,
        title: format!("{} image(s) missing alt text", missing.len()),
        description: "Images without alt attributes are invisible to screen readers.".into(),
        remediation: "Add a descriptive alt attribute to each listed image.".into(),
        selectors: missing,
    })
}

fn check_link_text(audit: &DomAudit) -> Option<DetectedIssue> {
    let empty: Vec<String> = audit
        .links
        .iter()
        .filter(|l| l.text.trim().is_empty() && l.aria_label.trim().is_empty())
        .map(|l| l.selector.clone())
        .collect();
    if empty.is_empty() {
        return None;
    }
    Some(DetectedIssue {
        category: IssueCategory::Accessibility,
        severity: Severity::Medium,
        title: format!("{} link(s) without descriptive text", empty.len()),
        description: "Links with no visible text and no aria-label announce as \"link\" only."
            .into(),
        remediation: "Give each listed link visible text or an aria-label.".into(),
        selectors: empty,
    })
}

fn check_heading_skips(audit: &DomAudit) -> Option<DetectedIssue> {
    let mut skips = Vec::new();
    let mut prev: Option<u8> = None;
    for h in &audit.headings {
        if let Some(p) = prev {
            if h.level > p + 1 {
                skips.push(h.selector.clone());
            }
        }
        prev = Some(h.level);
    }
    if skips.is_empty() {
        return None;
    }
    Some(DetectedIssue {
        category: IssueCategory::Accessibility,
        severity: Severity::Low,
        title: format!("{} heading level skip(s)", skips.len()),
        description: "Heading levels jump (e.g. h1 straight to h3), breaking document outline."
            .into(),
        remediation: "Restructure headings so levels increase one step at a time.".into(),
        selectors: skips,
    })
}

fn check_image_loading(audit: &DomAudit) -> Option<DetectedIssue> {
    let heavy: Vec<String> = audit
        .images
        .iter()
        .filter(|i| !i.lazy && !i.next_gen)
        .map(|i| i.selector.clone())
        .collect();
    if heavy.is_empty() {
        return None;
    }
    Some(DetectedIssue {
        category: IssueCategory::Performance,
        severity: Severity::Medium,
        title: format!("{} image(s) not optimized for loading", heavy.len()),
        description: "Images are neither lazy-loaded nor served in a next-gen format.".into(),
        remediation: "Add loading=\"lazy\" and serve WebP/AVIF where possible.".into(),
        selectors: heavy,
    })
}

fn check_blocking_scripts(audit: &DomAudit) -> Option<DetectedIssue> {
    if audit.blocking_scripts <= MAX_BLOCKING_SCRIPTS {
        return None;
    }
    Some(DetectedIssue {
        category: IssueCategory::Performance,
        severity: Severity::High,
        title: format!("{} render-blocking scripts", audit.blocking_scripts),
        description: format!(
            "More than {} synchronous scripts in <head> delay first paint.",
            MAX_BLOCKING_SCRIPTS
        ),
        remediation: "Add defer/async to non-critical scripts or move them to the body end.".into(),
        selectors: Vec::new(),
    })
}

fn check_title(audit: &DomAudit) -> Option<DetectedIssue> {
    let len = audit.title.chars().count();
    if (TITLE_RANGE.0..=TITLE_RANGE.1).contains(&len) {
        return None;
    }
    let (severity, what) = if len == 0 {
        (Severity::High, "missing".to_string())
    } else if len < TITLE_RANGE.0 {
        (Severity::Medium, format!("too short ({} chars)", len))
    } else {
        (Severity::Low, format!("too long ({} chars)", len))
    };
    Some(DetectedIssue {
        category: IssueCategory::Seo,
        severity,
        title: format!("Page title {}", what),
        description: format!(
            "Search engines favor titles between {} and {} characters.",
            TITLE_RANGE.0, TITLE_RANGE.1
        ),
        remediation: "Rewrite the <title> to a descriptive 30-60 character phrase.".into(),
        selectors: vec!["title".into()],
    })
}

fn check_meta_description(audit: &DomAudit) -> Option<DetectedIssue> {
    let desc = audit.meta_description.as_deref().unwrap_or("");
    if desc.chars().count() >= MIN_META_DESCRIPTION {
        return None;
    }
    let what = if desc.is_empty() { "missing" } else { "too short" };
    Some(DetectedIssue {
        category: IssueCategory::Seo,
        severity: Severity::Medium,
        title: format!("Meta description {}", what),
        description: format!(
            "Descriptions under {} characters get rewritten by search engines.",
            MIN_META_DESCRIPTION
        ),
        remediation: "Add a meta description summarizing the page in 50-160 characters.".into(),
        selectors: vec!["meta[name=\"description\"]".into()],
    })
}

fn check_h1_count(audit: &DomAudit) -> Option<DetectedIssue> {
    let h1s: Vec<String> = audit
        .headings
        .iter()
        .filter(|h| h.level == 1)
        .map(|h| h.selector.clone())
        .collect();
    if h1s.len() == 1 {
        return None;
    }
    let (title, severity) = if h1s.is_empty() {
        ("No top-level heading".to_string(), Severity::Medium)
    } else {
        (format!("{} top-level headings", h1s.len()), Severity::Low)
    };
    Some(DetectedIssue {
        category: IssueCategory::Seo,
        severity,
        title,
        description: "Pages should carry exactly one <h1>.".into(),
        remediation: "Keep a single <h1> and demote or add headings accordingly.".into(),
        selectors: h1s,
    })
}

fn check_color_count(audit: &DomAudit) -> Option<DetectedIssue> {
    if audit.colors.len() <= MAX_COLORS {
        return None;
    }
    Some(DetectedIssue {
        category: IssueCategory::Design,
        severity: Severity::Low,
        title: format!("{} distinct colors in use", audit.colors.len()),
        description: format!(
            "More than {} computed colors usually means an inconsistent palette.",
            MAX_COLORS
        ),
        remediation: "Consolidate colors into a small design-token palette.".into(),
        selectors: Vec::new(),
    })
}

fn check_font_count(audit: &DomAudit) -> Option<DetectedIssue> {
    if audit.font_families.len() <= MAX_FONTS {
        return None;
    }
    Some(DetectedIssue {
        category: IssueCategory::Design,
        severity: Severity::Low,
        title: format!("{} font families in use", audit.font_families.len()),
        description: format!("More than {} font families hurts visual cohesion.", MAX_FONTS),
        remediation: "Reduce to at most two families plus a monospace fallback.".into(),
        selectors: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Registry, ScanCapabilities};
    use crate::Result;
    use async_trait::async_trait;
    use std::collections::HashSet;

    struct AuditPage {
        audit: DomAudit,
    }

    #[async_trait]
    impl PageInspector for AuditPage {
        async fn hostname(&self) -> Result<String> {
            Ok("lovable.dev".into())
        }

        async fn has_selector(&self, _selector: &str) -> Result<bool> {
            Ok(false)
        }

        async fn has_global(&self, _path: &str) -> Result<bool> {
            Ok(false)
        }

        async fn audit(&self) -> Result<DomAudit> {
            Ok(self.audit.clone())
        }
    }

    fn full_profile() -> crate::PlatformProfile {
        Registry::builtin().by_name("Lovable").unwrap().clone()
    }

    fn messy_audit() -> DomAudit {
        DomAudit {
            title: "Hi".into(),
            meta_description: None,
            images: vec![
                ImageFacts {
                    selector: "img:nth-of-type(1)".into(),
                    has_alt: false,
                    lazy: false,
                    next_gen: false,
                },
                ImageFacts {
                    selector: "img:nth-of-type(2)".into(),
                    has_alt: true,
                    lazy: true,
                    next_gen: true,
                },
            ],
            links: vec![LinkFacts {
                selector: "a:nth-of-type(1)".into(),
                text: "".into(),
                aria_label: "".into(),
            }],
            headings: vec![
                HeadingFacts {
                    selector: "h1".into(),
                    level: 1,
                },
                HeadingFacts {
                    selector: "h3".into(),
                    level: 3,
                },
            ],
            blocking_scripts: 5,
            colors: (0..25).map(|i| format!("rgb({i},0,0)")).collect(),
            font_families: (0..6).map(|i| format!("Font{i}")).collect(),
        }
    }

    #[tokio::test]
    async fn test_messy_page_yields_issues_in_every_category() {
        let page = AuditPage {
            audit: messy_audit(),
        };
        let issues = scan_for_issues(&page, &full_profile()).await.unwrap();
        let cats: HashSet<_> = issues.iter().map(|i| i.category).collect();
        assert!(cats.contains(&IssueCategory::Accessibility));
        assert!(cats.contains(&IssueCategory::Performance));
        assert!(cats.contains(&IssueCategory::Seo));
        assert!(cats.contains(&IssueCategory::Design));
    }

    #[tokio::test]
    async fn test_clean_page_yields_no_issues() {
        let page = AuditPage {
            audit: DomAudit {
                title: "A perfectly sized page title for search results".into(),
                meta_description: Some(
                    "A meta description that is comfortably over the fifty character floor.".into(),
                ),
                headings: vec![HeadingFacts {
                    selector: "h1".into(),
                    level: 1,
                }],
                ..DomAudit::default()
            },
        };
        let issues = scan_for_issues(&page, &full_profile()).await.unwrap();
        assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
    }

    #[tokio::test]
    async fn test_scan_is_idempotent_on_unchanged_dom() {
        let page = AuditPage {
            audit: messy_audit(),
        };
        let profile = full_profile();
        let mut a: Vec<String> = scan_for_issues(&page, &profile)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.title)
            .collect();
        let mut b: Vec<String> = scan_for_issues(&page, &profile)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.title)
            .collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_capability_flags_gate_checks() {
        let mut profile = full_profile();
        profile.capabilities = ScanCapabilities {
            accessibility: true,
            performance: false,
            seo: false,
            design: false,
        };
        let page = AuditPage {
            audit: messy_audit(),
        };
        let issues = scan_for_issues(&page, &profile).await.unwrap();
        assert!(!issues.is_empty());
        assert!(issues
            .iter()
            .all(|i| i.category == IssueCategory::Accessibility));
    }

    #[tokio::test]
    async fn test_no_capabilities_skips_audit_entirely() {
        let mut profile = full_profile();
        profile.capabilities = ScanCapabilities::none();
        let page = AuditPage {
            audit: messy_audit(),
        };
        assert!(scan_for_issues(&page, &profile).await.unwrap().is_empty());
    }

    #[test]
    fn test_heading_skip_detection() {
        let audit = DomAudit {
            headings: vec![
                HeadingFacts {
                    selector: "h2".into(),
                    level: 2,
                },
                HeadingFacts {
                    selector: "h5".into(),
                    level: 5,
                },
            ],
            ..DomAudit::default()
        };
        let issue = check_heading_skips(&audit).unwrap();
        assert_eq!(issue.selectors, vec!["h5".to_string()]);
    }

    #[test]
    fn test_title_boundaries() {
        for (len, expect_issue) in [(0, true), (29, true), (30, false), (60, false), (61, true)] {
            let audit = DomAudit {
                title: "x".repeat(len),
                ..DomAudit::default()
            };
            assert_eq!(check_title(&audit).is_some(), expect_issue, "len {}", len);
        }
    }
}
