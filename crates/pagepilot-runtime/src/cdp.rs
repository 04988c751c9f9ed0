//! CDP-backed page driver.
//!
//! Everything goes through JavaScript evaluated over the devtools protocol;
//! results come back as `JSON.stringify` strings parsed with serde.

use async_trait::async_trait;
use eoka::Page;
use tracing::debug;

use crate::driver::{PageDriver, PageEvent};
use crate::{Error, Result};
use pagepilot_platform::{self as platform, DomAudit, PageInspector};

/// Structural snapshot of the page for the issue scanner.
const AUDIT_JS: &str = r#"(() => {
    const sel = (el) => {
        if (el.id) return '#' + CSS.escape(el.id);
        const parts = [];
        let node = el;
        while (node && node !== document.body && parts.length < 4) {
            let s = node.tagName.toLowerCase();
            if (node.id) { parts.unshift('#' + CSS.escape(node.id)); break; }
            const parent = node.parentElement;
            if (parent) {
                const siblings = Array.from(parent.children).filter(c => c.tagName === node.tagName);
                if (siblings.length > 1) s += ':nth-of-type(' + (siblings.indexOf(node) + 1) + ')';
            }
            parts.unshift(s);
            node = parent;
        }
        return parts.join(' > ');
    };

    const images = Array.from(document.querySelectorAll('img')).map(img => ({
        selector: sel(img),
        has_alt: img.hasAttribute('alt') && img.getAttribute('alt').trim() !== '',
        lazy: img.loading === 'lazy',
        next_gen: /\.(webp|avif)(\?|$)/i.test(img.currentSrc || img.src || ''),
    }));

    const links = Array.from(document.querySelectorAll('a')).map(a => ({
        selector: sel(a),
        text: (a.textContent || '').trim(),
        aria_label: a.getAttribute('aria-label') || '',
    }));

    const headings = Array.from(document.querySelectorAll('h1,h2,h3,h4,h5,h6')).map(h => ({
        selector: sel(h),
        level: parseInt(h.tagName[1], 10),
    }));

    const blocking = Array.from(document.head.querySelectorAll('script[src]'))
        .filter(s => !s.defer && !s.async && s.type !== 'module').length;

    const colors = new Set();
    const fonts = new Set();
    const nodes = document.querySelectorAll('body *');
    const cap = Math.min(nodes.length, 1500);
    for (let i = 0; i < cap; i++) {
        const st = getComputedStyle(nodes[i]);
        colors.add(st.color);
        colors.add(st.backgroundColor);
        (st.fontFamily || '').split(',').slice(0, 1).forEach(f => fonts.add(f.trim()));
    }
    colors.delete('rgba(0, 0, 0, 0)');

    const meta = document.querySelector('meta[name="description"]');
    return JSON.stringify({
        title: document.title || '',
        meta_description: meta ? meta.getAttribute('content') : null,
        images,
        links,
        headings,
        blocking_scripts: blocking,
        colors: Array.from(colors),
        font_families: Array.from(fonts),
    });
})()"#;

/// Installs the mutation observer and visibility/focus hooks. Events pile up
/// in `window.__pp_events` until drained.
const INSTALL_WATCHERS_JS: &str = r#"(() => {
    if (window.__pp_watching) return 'already';
    window.__pp_watching = true;
    window.__pp_events = [];

    const sel = (el) => {
        if (el.id) return '#' + CSS.escape(el.id);
        const parts = [];
        let node = el;
        while (node && node !== document.body && parts.length < 4) {
            let s = node.tagName.toLowerCase();
            const parent = node.parentElement;
            if (parent) {
                const siblings = Array.from(parent.children).filter(c => c.tagName === node.tagName);
                if (siblings.length > 1) s += ':nth-of-type(' + (siblings.indexOf(node) + 1) + ')';
            }
            parts.unshift(s);
            node = parent;
        }
        return parts.join(' > ');
    };

    const report = (node) => {
        if (node.nodeType !== 1) return;
        const buttons = node.matches('button, [role="button"]')
            ? [node]
            : Array.from(node.querySelectorAll('button, [role="button"]'));
        for (const b of buttons) {
            window.__pp_events.push({
                kind: 'button_added',
                selector: sel(b),
                label: (b.textContent || b.getAttribute('aria-label') || '').trim(),
                disabled: !!b.disabled,
            });
        }
        const NOTICE = '[role="alert"], [role="status"], [aria-live], .notification, .toast, .banner, .alert';
        const notices = node.matches(NOTICE) ? [node] : Array.from(node.querySelectorAll(NOTICE));
        for (const n of notices) {
            const text = (n.textContent || '').trim();
            if (text) window.__pp_events.push({ kind: 'notice_added', selector: sel(n), text: text.slice(0, 300) });
        }
    };

    const observer = new MutationObserver((mutations) => {
        for (const m of mutations) {
            for (const added of m.addedNodes) report(added);
        }
    });
    observer.observe(document.body, { childList: true, subtree: true });

    document.addEventListener('visibilitychange', () => {
        window.__pp_events.push({ kind: 'visibility', hidden: document.hidden });
    });
    window.addEventListener('blur', () => {
        window.__pp_events.push({ kind: 'focus', focused: false });
    });
    window.addEventListener('focus', () => {
        window.__pp_events.push({ kind: 'focus', focused: true });
    });
    return 'installed';
})()"#;

const DRAIN_EVENTS_JS: &str =
    "JSON.stringify((window.__pp_events || []).splice(0, (window.__pp_events || []).length))";

fn page_err(e: eoka::Error) -> platform::Error {
    platform::Error::Page(e.to_string())
}

/// [`PageDriver`] over a live CDP page.
pub struct CdpDriver {
    page: Page,
}

impl CdpDriver {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// The underlying page, for callers that need navigation or screenshots.
    pub fn page(&self) -> &Page {
        &self.page
    }

    fn quoted(s: &str) -> String {
        serde_json::to_string(s).unwrap_or_else(|_| "\"\"".into())
    }
}

#[async_trait]
impl PageInspector for CdpDriver {
    async fn hostname(&self) -> platform::Result<String> {
        self.page
            .evaluate("location.hostname")
            .await
            .map_err(page_err)
    }

    async fn has_selector(&self, selector: &str) -> platform::Result<bool> {
        let js = format!("!!document.querySelector({})", Self::quoted(selector));
        self.page.evaluate(&js).await.map_err(page_err)
    }

    async fn has_global(&self, path: &str) -> platform::Result<bool> {
        let js = format!(
            r#"(() => {{
                try {{
                    const v = {path}.split('.').reduce((o, k) => (o == null ? o : o[k]), window);
                    return v !== undefined && v !== null;
                }} catch (e) {{ return false; }}
            }})()"#,
            path = Self::quoted(path)
        );
        self.page.evaluate(&js).await.map_err(page_err)
    }

    async fn audit(&self) -> platform::Result<DomAudit> {
        let json: String = self.page.evaluate(AUDIT_JS).await.map_err(page_err)?;
        serde_json::from_str(&json)
            .map_err(|e| platform::Error::Parse(format!("audit parse error: {}", e)))
    }
}

#[async_trait]
impl PageDriver for CdpDriver {
    async fn inject_prompt(&self, selector: &str, text: &str) -> Result<()> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return 'not_found';
                el.focus();
                const text = {text};
                const tag = el.tagName;
                if (tag === 'TEXTAREA' || tag === 'INPUT') {{
                    const proto = tag === 'TEXTAREA' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
                    const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
                    setter.call(el, text);
                }} else if (el.isContentEditable) {{
                    el.textContent = text;
                }} else {{
                    el.innerText = text;
                }}
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                el.dispatchEvent(new KeyboardEvent('keydown', {{ key: 'Enter', bubbles: true }}));
                return 'ok';
            }})()"#,
            sel = Self::quoted(selector),
            text = Self::quoted(text),
        );
        let result: String = self.page.evaluate(&js).await?;
        match result.as_str() {
            "ok" => Ok(()),
            _ => Err(Error::ElementNotFound(selector.to_string())),
        }
    }

    async fn click_if_actionable(&self, selector: &str) -> Result<bool> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el || el.disabled) return false;
                const rect = el.getBoundingClientRect();
                if (rect.width === 0 || rect.height === 0) return false;
                el.click();
                return true;
            }})()"#,
            sel = Self::quoted(selector)
        );
        let clicked: bool = self.page.evaluate(&js).await?;
        debug!("click_if_actionable {}: {}", selector, clicked);
        Ok(clicked)
    }

    async fn press_enter_with_modifier(&self, selector: &str) -> Result<()> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({sel}) || document.activeElement || document.body;
                const opts = {{ key: 'Enter', code: 'Enter', keyCode: 13, ctrlKey: true, bubbles: true }};
                el.dispatchEvent(new KeyboardEvent('keydown', opts));
                el.dispatchEvent(new KeyboardEvent('keyup', opts));
                return true;
            }})()"#,
            sel = Self::quoted(selector)
        );
        let _: bool = self.page.evaluate(&js).await?;
        Ok(())
    }

    async fn element_text(&self, selector: &str) -> Result<Option<String>> {
        let js = format!(
            r#"JSON.stringify((() => {{
                const nodes = document.querySelectorAll({sel});
                if (!nodes.length) return null;
                return (nodes[nodes.length - 1].textContent || '').trim();
            }})())"#,
            sel = Self::quoted(selector)
        );
        let json: String = self.page.evaluate(&js).await?;
        serde_json::from_str(&json).map_err(|e| Error::Parse(format!("text parse error: {}", e)))
    }

    async fn fill_value(&self, selector: &str, value: &str) -> Result<()> {
        self.page.fill(selector, value).await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.page.click(selector).await?;
        Ok(())
    }

    async fn install_watchers(&self) -> Result<()> {
        let status: String = self.page.evaluate(INSTALL_WATCHERS_JS).await?;
        debug!("watchers: {}", status);
        Ok(())
    }

    async fn drain_events(&self) -> Result<Vec<PageEvent>> {
        let json: String = self.page.evaluate(DRAIN_EVENTS_JS).await?;
        serde_json::from_str(&json).map_err(|e| Error::Parse(format!("event parse error: {}", e)))
    }

    async fn ping(&self) -> Result<()> {
        let _: f64 = self.page.evaluate("Date.now()").await?;
        Ok(())
    }
}
