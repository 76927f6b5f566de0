//! Browsing context used by the frame-embedding check.

/// The document the client runs in.
pub trait BrowsingContext: Send + Sync {
    /// True when the current document is embedded by a different top-level context.
    fn is_framed(&self) -> bool;

    /// Origin of the current document (e.g. `https://app.example.com`).
    fn current_origin(&self) -> String;

    /// Navigate the top-level context to `url`.
    fn navigate_top(&self, url: &str);
}

/// Context for hosts without a document (CLIs, services, tests).
/// Never framed, so navigation is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessContext;

impl BrowsingContext for HeadlessContext {
    fn is_framed(&self) -> bool {
        false
    }

    fn current_origin(&self) -> String {
        String::new()
    }

    fn navigate_top(&self, url: &str) {
        tracing::debug!(url = %url, "Headless context ignores top navigation");
    }
}
