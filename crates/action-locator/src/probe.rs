//! Page query seam used by the resolver

use async_trait::async_trait;

use crate::{errors::LocatorError, types::Locator};

/// Answers existence and visibility questions about the current page.
///
/// Implemented by browser drivers; the resolver itself never touches the page.
#[async_trait]
pub trait ElementProbe: Send + Sync {
    /// Number of elements matching the locator
    async fn count(&self, locator: &Locator) -> Result<usize, LocatorError>;

    /// Whether the first matching element is currently visible
    async fn is_visible(&self, locator: &Locator) -> Result<bool, LocatorError>;
}
