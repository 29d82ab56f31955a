//! Page scripts generated per locator
//!
//! Every script is a self-contained expression. User-provided strings go through
//! `serde_json::to_string` so they land in the page as valid JS string literals.

use action_locator::{Locator, NamePattern};
use surefoot_core_types::ScrollDirection;

/// Attribute used to hand a resolved element over to a CDP element handle
pub const MARK_ATTRIBUTE: &str = "data-surefoot-ref";

const VISIBLE_FN: &str = "const visible = (el) => { \
const st = getComputedStyle(el); \
if (st.display === 'none' || st.visibility === 'hidden' || parseFloat(st.opacity) === 0) return false; \
const r = el.getBoundingClientRect(); return r.width > 0 && r.height > 0; };";

const ACCESSIBLE_NAME_FN: &str = "const accName = (el) => { \
const label = el.getAttribute('aria-label'); if (label) return label; \
const by = el.getAttribute('aria-labelledby'); \
if (by) { const t = by.split(/\\s+/).map(id => document.getElementById(id)).filter(Boolean).map(n => n.innerText || '').join(' ').trim(); if (t) return t; } \
if (el.id) { const l = document.querySelector('label[for=\"' + CSS.escape(el.id) + '\"]'); if (l && l.innerText) return l.innerText; } \
if (el.labels && el.labels.length) return el.labels[0].innerText || ''; \
return el.getAttribute('placeholder') || el.getAttribute('title') || el.getAttribute('alt') || el.innerText || el.value || ''; };";

fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// CSS selector approximating implicit ARIA roles
pub fn role_selector(role: &str) -> String {
    let explicit = format!("[role=\"{role}\"]");
    let implicit = match role {
        "button" => "button, input[type=button], input[type=submit], input[type=reset]",
        "link" => "a[href]",
        "textbox" => {
            "input:not([type]), input[type=text], input[type=email], input[type=tel], \
             input[type=url], input[type=password], textarea"
        }
        "searchbox" => "input[type=search]",
        "checkbox" => "input[type=checkbox]",
        "radio" => "input[type=radio]",
        "combobox" => "select",
        "heading" => "h1, h2, h3, h4, h5, h6",
        "img" => "img[alt]",
        "dialog" => "dialog",
        "navigation" => "nav",
        _ => return explicit,
    };
    format!("{implicit}, {explicit}")
}

fn name_predicate(name: &Option<NamePattern>) -> String {
    match name {
        None => "(n) => true".to_string(),
        Some(NamePattern::Exact { value }) => format!("(n) => n.trim() === {}", quote(value)),
        Some(NamePattern::Contains { value }) => format!(
            "(n) => n.toLowerCase().includes({})",
            quote(&value.to_lowercase())
        ),
        Some(NamePattern::Regex {
            source,
            case_insensitive,
        }) => format!(
            "(n) => new RegExp({}, {}).test(n)",
            quote(source),
            quote(if *case_insensitive { "i" } else { "" })
        ),
    }
}

/// Expression evaluating to the array of elements matching `locator`, in document order
pub fn finder(locator: &Locator) -> String {
    match locator {
        Locator::Css { selector } => {
            format!("Array.from(document.querySelectorAll({}))", quote(selector))
        }
        Locator::XPath { expression } => format!(
            "(() => {{ const snap = document.evaluate({}, document, null, \
             XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; \
             for (let i = 0; i < snap.snapshotLength; i++) {{ const n = snap.snapshotItem(i); \
             if (n.nodeType === 1) out.push(n); }} return out; }})()",
            quote(expression)
        ),
        Locator::Text { content, exact } => {
            let test = if *exact {
                format!("(t) => t.trim() === {}", quote(content))
            } else {
                format!(
                    "(t) => t.toLowerCase().includes({})",
                    quote(&content.to_lowercase())
                )
            };
            format!(
                "(() => {{ const test = {test}; \
                 const all = Array.from(document.querySelectorAll('body *')).filter(el => test(el.innerText || '')); \
                 return all.filter(el => !all.some(other => other !== el && el.contains(other))); }})()"
            )
        }
        Locator::Role { role, name } => format!(
            "(() => {{ {ACCESSIBLE_NAME_FN} const pred = {}; \
             return Array.from(document.querySelectorAll({})).filter(el => pred(accName(el))); }})()",
            name_predicate(name),
            quote(&role_selector(role))
        ),
    }
}

pub fn count_script(locator: &Locator) -> String {
    format!("({}).length", finder(locator))
}

/// True when the first match is visible
pub fn visible_script(locator: &Locator) -> String {
    format!(
        "(() => {{ {VISIBLE_FN} const els = {}; return els.length > 0 && visible(els[0]); }})()",
        finder(locator)
    )
}

/// Tag the first visible match (or the first match) with `token`; returns whether one was tagged
pub fn mark_script(locator: &Locator, token: &str) -> String {
    format!(
        "(() => {{ {VISIBLE_FN} \
         document.querySelectorAll('[{MARK_ATTRIBUTE}]').forEach(el => el.removeAttribute('{MARK_ATTRIBUTE}')); \
         const els = {}; const el = els.find(visible) || els[0]; \
         if (!el) return false; el.setAttribute('{MARK_ATTRIBUTE}', {}); return true; }})()",
        finder(locator),
        quote(token)
    )
}

pub fn marked_selector(token: &str) -> String {
    format!("[{MARK_ATTRIBUTE}={}]", quote(token))
}

/// Empty an input or textarea and fire `input`
pub fn clear_script(token: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); if (!el) return false; \
         el.value = ''; el.dispatchEvent(new Event('input', {{ bubbles: true }})); return true; }})()",
        quote(&marked_selector(token))
    )
}

/// Pick a `<select>` option by value, then by visible text.
///
/// Returns `{ ok, reason }`; `reason` is `not_select` or `no_option` on failure.
pub fn select_script(token: &str, value: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); \
         if (!el || el.tagName !== 'SELECT') return {{ ok: false, reason: 'not_select' }}; \
         const want = {}; const opts = Array.from(el.options); \
         const opt = opts.find(o => o.value === want) || opts.find(o => (o.text || '').trim() === want) \
           || opts.find(o => (o.text || '').toLowerCase().includes(want.toLowerCase())); \
         if (!opt) return {{ ok: false, reason: 'no_option' }}; \
         el.value = opt.value; \
         el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
         return {{ ok: true, reason: null }}; }})()",
        quote(&marked_selector(token)),
        quote(value)
    )
}

/// Window scroll; `amount` defaults to one viewport height
pub fn scroll_script(direction: ScrollDirection, amount: Option<i64>) -> String {
    let step = amount
        .map(|amount| amount.abs().to_string())
        .unwrap_or_else(|| "window.innerHeight".to_string());
    match direction {
        ScrollDirection::Down => format!("(window.scrollBy(0, {step}), window.scrollY)"),
        ScrollDirection::Up => format!("(window.scrollBy(0, -({step})), window.scrollY)"),
        ScrollDirection::Top => "(window.scrollTo(0, 0), window.scrollY)".to_string(),
        ScrollDirection::Bottom => {
            "(window.scrollTo(0, document.documentElement.scrollHeight), window.scrollY)"
                .to_string()
        }
    }
}

pub const HISTORY_BACK_SCRIPT: &str = "(history.back(), true)";
pub const HISTORY_FORWARD_SCRIPT: &str = "(history.forward(), true)";
