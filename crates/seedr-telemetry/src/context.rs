//! Application-level span management.

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Keeps the `app` span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the application span tagged with the run mode and build id.
    #[must_use]
    pub fn new(mode: impl Into<String>) -> Self {
        let mode = mode.into();
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "app",
            mode = %mode,
            build_sha = %build_sha(),
            driver = tracing::field::Empty,
        )));
        Self {
            _guard: span.enter(),
        }
    }
}

/// Record the active torrent driver on the current span.
pub fn record_driver(driver: &str) {
    Span::current().record("driver", tracing::field::display(driver));
}
