//! Overlay detection probe

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Script returning `{ present, kind, closeSelector, coverage }` for the largest fixed/sticky
/// element covering the viewport centre, or cookie/consent banners.
pub const OVERLAY_PROBE_SCRIPT: &str = r#"(() => {
  const vw = window.innerWidth || 1, vh = window.innerHeight || 1;
  const cssPath = (el) => {
    if (el.id) return '#' + CSS.escape(el.id);
    const parts = [];
    let node = el;
    while (node && node.nodeType === 1 && parts.length < 5) {
      let part = node.tagName.toLowerCase();
      const parent = node.parentElement;
      if (parent) {
        const same = Array.from(parent.children).filter(c => c.tagName === node.tagName);
        if (same.length > 1) part += ':nth-of-type(' + (same.indexOf(node) + 1) + ')';
      }
      parts.unshift(part);
      if (node.id) { parts[0] = '#' + CSS.escape(node.id); break; }
      node = parent;
    }
    return parts.join(' > ');
  };
  const closeIn = (root) => {
    const picks = root.querySelectorAll(
      'button[aria-label*="close" i], button[aria-label*="dismiss" i], [data-dismiss], ' +
      '.close, .btn-close, button[id*="accept" i], button[class*="accept" i], button[title*="close" i]'
    );
    for (const el of picks) {
      const r = el.getBoundingClientRect();
      if (r.width > 0 && r.height > 0) return cssPath(el);
    }
    for (const el of root.querySelectorAll('button, [role="button"]')) {
      const t = (el.innerText || '').trim().toLowerCase();
      if (/^(×|x|close|accept|accept all|agree|got it|ok|no thanks|dismiss)$/.test(t)) return cssPath(el);
    }
    return null;
  };
  let best = null, bestArea = 0;
  for (const el of document.querySelectorAll('body *')) {
    const st = getComputedStyle(el);
    if (st.display === 'none' || st.visibility === 'hidden' || parseFloat(st.opacity) === 0) continue;
    const dialog = el.getAttribute('role') === 'dialog' || el.getAttribute('aria-modal') === 'true';
    if (!dialog && st.position !== 'fixed' && st.position !== 'sticky') continue;
    const r = el.getBoundingClientRect();
    const area = Math.max(0, Math.min(r.right, vw) - Math.max(r.left, 0)) *
                 Math.max(0, Math.min(r.bottom, vh) - Math.max(r.top, 0));
    if (area > bestArea) { best = el; bestArea = area; }
  }
  if (!best) return { present: false };
  const coverage = bestArea / (vw * vh);
  const text = ((best.id || '') + ' ' + (best.className || '') + ' ' + (best.innerText || '').slice(0, 300)).toLowerCase();
  const cookie = /cookie|consent|gdpr|privacy/.test(text);
  const dialog = best.getAttribute('role') === 'dialog' || best.getAttribute('aria-modal') === 'true';
  if (coverage < 0.3 && !cookie && !dialog) return { present: false, coverage };
  return {
    present: true,
    kind: cookie ? 'cookie_banner' : (dialog ? 'dialog' : 'overlay'),
    closeSelector: closeIn(best),
    coverage
  };
})()"#;

/// Result of [`OVERLAY_PROBE_SCRIPT`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayReport {
    #[serde(default)]
    pub present: bool,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub close_selector: Option<String>,
    #[serde(default)]
    pub coverage: f64,
}

impl OverlayReport {
    /// Lenient conversion; anything unexpected reads as "no overlay".
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_overlay_report_parsing() {
        let report = OverlayReport::from_value(json!({
            "present": true,
            "kind": "cookie_banner",
            "closeSelector": "#accept",
            "coverage": 0.4
        }));
        assert!(report.present);
        assert_eq!(report.close_selector.as_deref(), Some("#accept"));

        assert!(!OverlayReport::from_value(json!("garbage")).present);
        assert!(!OverlayReport::from_value(Value::Null).present);
    }
}
