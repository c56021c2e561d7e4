//! Pluggable URI scheme handlers.

use std::io;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Resolves a URI of a registered scheme to a local filesystem path. The
/// returned string may still contain path variables. An empty string signals
/// failure; the handler should describe the problem on the given writer.
pub type UriSchemeHandler = Arc<dyn Fn(&str, &mut dyn io::Write) -> String + Send + Sync>;

/// Registry of URI scheme handlers, keyed by scheme name without the
/// `://` separator.
#[derive(Default)]
pub struct UriSchemeRegistry {
    handlers: Mutex<FxHashMap<String, UriSchemeHandler>>,
}

impl UriSchemeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry shared by readers that are not given their
    /// own instance.
    pub fn instance() -> &'static Arc<UriSchemeRegistry> {
        static INSTANCE: OnceLock<Arc<UriSchemeRegistry>> = OnceLock::new();
        INSTANCE.get_or_init(|| Arc::new(UriSchemeRegistry::new()))
    }

    /// Registers `handler` for `scheme`, replacing any previous handler.
    pub fn register(&self, scheme: impl Into<String>, handler: UriSchemeHandler) {
        self.handlers.lock().insert(scheme.into(), handler);
    }

    /// Looks up the handler for `scheme`. The handler is cloned out so the
    /// registry lock is never held across a handler call.
    #[must_use]
    pub fn handler(&self, scheme: &str) -> Option<UriSchemeHandler> {
        self.handlers.lock().get(scheme).cloned()
    }
}

impl std::fmt::Debug for UriSchemeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let schemes: Vec<String> = self.handlers.lock().keys().cloned().collect();
        f.debug_struct("UriSchemeRegistry")
            .field("schemes", &schemes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_handler_is_found() {
        let registry = UriSchemeRegistry::new();
        registry.register("model", Arc::new(|rest, _os| format!("/models/{rest}")));
        let handler = registry.handler("model").unwrap();
        let mut sink = io::sink();
        assert_eq!(handler("robot/base.yaml", &mut sink), "/models/robot/base.yaml");
        assert!(registry.handler("unknown").is_none());
    }
}
