//! Hand-curated fallback locators per element category
//!
//! Order matters: the resolver stops at the first visible match, so the most specific patterns
//! come first.

use surefoot_core_types::ElementCategory;

use crate::types::Locator;

const SEARCH: &[&str] = &[
    "role=searchbox",
    "role=textbox[name=/search|find|query/i]",
    "input[type=search]",
    "input[name*=search i]",
    "input[name=q]",
    "input[placeholder*=search i]",
    "input[aria-label*=search i]",
    "textarea[name=q]",
];

const SUBMIT: &[&str] = &[
    "button[type=submit]",
    "input[type=submit]",
    "role=button[name=/submit|search|go|send|continue|next/i]",
];

const BUTTON: &[&str] = &["role=button", "button:not([disabled])", "input[type=button]"];

const INPUT: &[&str] = &[
    "role=textbox",
    "input[type=text]",
    "input:not([type])",
    "input[type=email]",
    "textarea",
];

const LINK: &[&str] = &["role=link", "a[href]"];

const CHECKBOX: &[&str] = &["role=checkbox", "input[type=checkbox]"];

const SELECT: &[&str] = &["role=combobox", "select", "role=listbox"];

const CLOSE: &[&str] = &[
    "role=button[name=/close|dismiss|accept|agree|got it|no thanks/i]",
    "button[aria-label*=close i]",
    "[data-dismiss]",
    ".btn-close",
    ".close",
];

/// Raw heuristic locator strings for a category
pub fn heuristic_candidates(category: ElementCategory) -> &'static [&'static str] {
    match category {
        ElementCategory::Search => SEARCH,
        ElementCategory::Submit => SUBMIT,
        ElementCategory::Button => BUTTON,
        ElementCategory::Input => INPUT,
        ElementCategory::Link => LINK,
        ElementCategory::Checkbox => CHECKBOX,
        ElementCategory::Select => SELECT,
        ElementCategory::Close => CLOSE,
        ElementCategory::Unknown => &[],
    }
}

/// Parsed heuristic locators paired with their source string
pub fn heuristics_for(category: ElementCategory) -> Vec<(String, Locator)> {
    heuristic_candidates(category)
        .iter()
        .filter_map(|raw| Locator::parse(raw).ok().map(|loc| (raw.to_string(), loc)))
        .collect()
}
