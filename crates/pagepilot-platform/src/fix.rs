//! Turns a detected issue into a corrective instruction for the platform.

use crate::registry::PlatformProfile;
use crate::scan::DetectedIssue;

/// Deterministic template substitution; no network, no page access.
///
/// The output is a self-contained instruction suitable for handing to the
/// automation runtime (or a prompt optimizer) as-is.
pub fn generate_fix_prompt(issue: &DetectedIssue, profile: &PlatformProfile) -> String {
    let mut prompt = format!(
        "Fix the following {} issue in the current {} project: {}. {}",
        issue.category.as_str(),
        profile.name,
        issue.title,
        issue.description
    );
    if !issue.selectors.is_empty() {
        let listed: Vec<&str> = issue.selectors.iter().map(|s| s.as_str()).take(10).collect();
        prompt.push_str(&format!(" Affected elements: {}.", listed.join(", ")));
        if issue.selectors.len() > listed.len() {
            prompt.push_str(&format!(
                " ({} more not listed.)",
                issue.selectors.len() - listed.len()
            ));
        }
    }
    prompt.push(' ');
    prompt.push_str(&issue.remediation);
    prompt
}
