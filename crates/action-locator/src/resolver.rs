//! Element resolver with first-visible-match semantics

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use surefoot_core_types::{ElementCategory, ElementTarget, SelectorSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    errors::LocatorError,
    heuristics::heuristics_for,
    probe::ElementProbe,
    types::{Locator, Resolution, ResolutionSource},
};

/// Resolver tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Bounded wait for each candidate to become visible
    pub visibility_timeout_ms: u64,

    /// Poll interval inside that wait
    pub poll_interval_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            visibility_timeout_ms: 1000,
            poll_interval_ms: 100,
        }
    }
}

/// Adaptive multi-candidate resolver.
///
/// Worst-case latency is `candidates x visibility_timeout`; there are no retries beyond the
/// per-candidate wait.
pub struct SelectorResolver {
    probe: Arc<dyn ElementProbe>,
    config: ResolverConfig,
}

impl SelectorResolver {
    pub fn new(probe: Arc<dyn ElementProbe>) -> Self {
        Self::with_config(probe, ResolverConfig::default())
    }

    pub fn with_config(probe: Arc<dyn ElementProbe>, config: ResolverConfig) -> Self {
        Self { probe, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve an action target using its own category hint
    pub async fn resolve_target(&self, target: &ElementTarget) -> Result<Resolution, LocatorError> {
        self.resolve(&target.selectors, target.category).await
    }

    /// Return the first candidate that exists and is visible, falling back to category
    /// heuristics when every explicit candidate fails.
    pub async fn resolve(
        &self,
        candidates: &SelectorSet,
        category: Option<ElementCategory>,
    ) -> Result<Resolution, LocatorError> {
        debug!(candidates = %candidates, ?category, "resolving selector set");

        for (index, raw) in candidates.candidates().into_iter().enumerate() {
            let locator = match Locator::parse(raw) {
                Ok(locator) => locator,
                Err(err) => {
                    warn!(candidate = raw, error = %err, "skipping unparsable candidate");
                    continue;
                }
            };
            if self.matches(&locator).await {
                debug!(candidate = raw, index, "candidate resolved");
                return Ok(Resolution {
                    locator,
                    candidate: raw.to_string(),
                    index: Some(index),
                    source: ResolutionSource::Explicit,
                });
            }
        }

        if let Some(category) = category {
            for (raw, locator) in heuristics_for(category) {
                if self.matches(&locator).await {
                    info!(
                        category = category.name(),
                        heuristic = raw.as_str(),
                        "explicit candidates failed; resolved via heuristic"
                    );
                    return Ok(Resolution {
                        locator,
                        candidate: raw,
                        index: None,
                        source: ResolutionSource::Heuristic(category),
                    });
                }
            }
        }

        Err(LocatorError::ResolutionFailure(format!(
            "no visible match for [{}]{}",
            candidates,
            category
                .map(|c| format!(" (category {})", c.name()))
                .unwrap_or_default()
        )))
    }

    /// Visible candidates, explicit first then heuristics, excluding `exclude`.
    ///
    /// Used by recovery to build an alternative selector list after an action failed against
    /// its preferred candidate.
    pub async fn visible_alternatives(
        &self,
        target: &ElementTarget,
        exclude: &[String],
        limit: usize,
    ) -> Vec<String> {
        let mut pool: Vec<(String, Locator)> = target
            .selectors
            .candidates()
            .into_iter()
            .filter_map(|raw| Locator::parse(raw).ok().map(|loc| (raw.to_string(), loc)))
            .collect();
        if let Some(category) = target.category {
            pool.extend(heuristics_for(category));
        }

        let mut found = Vec::new();
        for (raw, locator) in pool {
            if found.len() >= limit {
                break;
            }
            if exclude.iter().any(|e| e == &raw) || found.contains(&raw) {
                continue;
            }
            if self.matches_now(&locator).await {
                found.push(raw);
            }
        }
        found
    }

    /// Exists and becomes visible within the bounded wait; both are re-checked on every poll
    async fn matches(&self, locator: &Locator) -> bool {
        let timeout = Duration::from_millis(self.config.visibility_timeout_ms);
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let deadline = Instant::now() + timeout;
        loop {
            let present = match self.probe.count(locator).await {
                Ok(count) => count > 0,
                Err(err) => {
                    debug!(locator = %locator, error = %err, "count failed");
                    return false;
                }
            };
            if present {
                match self.probe.is_visible(locator).await {
                    Ok(true) => return true,
                    Ok(false) => {}
                    Err(err) => {
                        debug!(locator = %locator, error = %err, "visibility check failed");
                        return false;
                    }
                }
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            tokio::time::sleep(poll.min(deadline - now)).await;
        }
    }

    /// Exists and is visible right now
    async fn matches_now(&self, locator: &Locator) -> bool {
        matches!(self.probe.count(locator).await, Ok(n) if n > 0)
            && matches!(self.probe.is_visible(locator).await, Ok(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory page: locator string -> (count, visible after N visibility polls)
    #[derive(Default)]
    struct FakeProbe {
        elements: HashMap<String, (usize, Option<usize>)>,
        /// Elements absent from the DOM until counted this many times
        inserted_after: HashMap<String, usize>,
        polls: Mutex<HashMap<String, usize>>,
        counts: Mutex<HashMap<String, usize>>,
        queries: AtomicUsize,
    }

    impl FakeProbe {
        fn with(mut self, selector: &str, count: usize, visible_after: Option<usize>) -> Self {
            self.elements
                .insert(selector.to_string(), (count, visible_after));
            self
        }

        fn inserted_later(mut self, selector: &str, after_counts: usize) -> Self {
            self.inserted_after.insert(selector.to_string(), after_counts);
            self.with(selector, 1, Some(0))
        }
    }

    #[async_trait]
    impl ElementProbe for FakeProbe {
        async fn count(&self, locator: &Locator) -> Result<usize, LocatorError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            let key = locator.to_string();
            let mut counts = self.counts.lock().unwrap();
            let seen = counts.entry(key.clone()).or_insert(0);
            *seen += 1;
            if self.inserted_after.get(&key).is_some_and(|after| *seen <= *after) {
                return Ok(0);
            }
            Ok(self.elements.get(&key).map(|(count, _)| *count).unwrap_or(0))
        }

        async fn is_visible(&self, locator: &Locator) -> Result<bool, LocatorError> {
            let key = locator.to_string();
            let mut polls = self.polls.lock().unwrap();
            let seen = polls.entry(key.clone()).or_insert(0);
            *seen += 1;
            Ok(match self.elements.get(&key) {
                Some((_, Some(after))) => *seen > *after,
                _ => false,
            })
        }
    }

    fn fast() -> ResolverConfig {
        ResolverConfig {
            visibility_timeout_ms: 30,
            poll_interval_ms: 5,
        }
    }

    fn resolver(probe: FakeProbe) -> SelectorResolver {
        SelectorResolver::with_config(Arc::new(probe), fast())
    }

    fn set(items: &[&str]) -> SelectorSet {
        SelectorSet::Candidates(items.iter().map(|s| s.to_string()).collect())
    }

    #[tokio::test]
    async fn test_first_visible_candidate_wins() {
        let probe = FakeProbe::default()
            .with("#present-hidden", 1, None)
            .with("#present-visible", 1, Some(0));
        let resolver = resolver(probe);

        let resolution = resolver
            .resolve(
                &set(&["#missing", "#present-hidden", "#present-visible"]),
                None,
            )
            .await
            .unwrap();

        assert_eq!(resolution.candidate, "#present-visible");
        assert_eq!(resolution.index, Some(2));
        assert!(resolution.is_fallback());
        assert_eq!(resolution.source, ResolutionSource::Explicit);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let probe = FakeProbe::default()
            .with("#a", 1, Some(0))
            .with("#b", 1, Some(0));
        let resolver = resolver(probe);
        let candidates = set(&["#a", "#b"]);

        let first = tokio_test::block_on(resolver.resolve(&candidates, None)).unwrap();
        let second = tokio_test::block_on(resolver.resolve(&candidates, None)).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.candidate, "#a");
        assert!(!first.is_fallback());
    }

    #[tokio::test]
    async fn test_waits_for_late_visibility() {
        let probe = FakeProbe::default().with("#late", 1, Some(2));
        let resolver = resolver(probe);

        let resolution = resolver.resolve(&"#late".into(), None).await.unwrap();
        assert_eq!(resolution.candidate, "#late");
    }

    #[tokio::test]
    async fn test_heuristic_fallback_for_search() {
        let probe = FakeProbe::default().with("textarea[name=q]", 1, Some(0));
        let resolver = resolver(probe);

        let resolution = resolver
            .resolve(&set(&["#gone"]), Some(ElementCategory::Search))
            .await
            .unwrap();

        assert_eq!(resolution.candidate, "textarea[name=q]");
        assert_eq!(resolution.index, None);
        assert_eq!(
            resolution.source,
            ResolutionSource::Heuristic(ElementCategory::Search)
        );
        assert_eq!(resolution.strategy_label(), "heuristic:search");
    }

    #[tokio::test]
    async fn test_role_heuristic_precedes_css() {
        let probe = FakeProbe::default()
            .with("role=textbox[name=/search|find|query/i]", 1, Some(0))
            .with("textarea[name=q]", 1, Some(0));
        let resolver = resolver(probe);

        let resolution = resolver
            .resolve(&set(&["#gone"]), Some(ElementCategory::Search))
            .await
            .unwrap();
        assert_eq!(
            resolution.candidate,
            "role=textbox[name=/search|find|query/i]"
        );
    }

    #[tokio::test]
    async fn test_failure_without_hint() {
        let probe = FakeProbe::default().with("textarea[name=q]", 1, Some(0));
        let resolver = resolver(probe);

        let err = resolver.resolve(&set(&["#gone", ""]), None).await.unwrap_err();
        assert!(matches!(err, LocatorError::ResolutionFailure(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_late_inserted_element_found_within_wait() {
        let probe = FakeProbe::default().inserted_later("#spinner-replaced", 3);
        let resolver = resolver(probe);

        let resolution = resolver
            .resolve(&set(&["#spinner-replaced"]), None)
            .await
            .unwrap();
        assert_eq!(resolution.candidate, "#spinner-replaced");
    }

    #[tokio::test]
    async fn test_missing_candidates_bounded_by_wait() {
        let probe = Arc::new(FakeProbe::default());
        let resolver = SelectorResolver::with_config(probe.clone(), fast());

        let started = std::time::Instant::now();
        assert!(resolver.resolve(&set(&["#a", "#b", "#c"]), None).await.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
        // each candidate is re-counted while its wait runs
        assert!(probe.queries.load(Ordering::SeqCst) > 3);
    }

    #[tokio::test]
    async fn test_visible_alternatives_excludes_current() {
        let probe = FakeProbe::default()
            .with("#primary", 1, Some(0))
            .with("#secondary", 1, Some(0))
            .with("input[name=q]", 1, Some(0));
        let resolver = resolver(probe);
        let target = ElementTarget::candidates(["#primary", "#secondary", "#hidden"])
            .with_category(ElementCategory::Search);

        let alternatives = resolver
            .visible_alternatives(&target, &["#primary".to_string()], 5)
            .await;

        assert_eq!(alternatives, vec!["#secondary", "input[name=q]"]);
    }
}
