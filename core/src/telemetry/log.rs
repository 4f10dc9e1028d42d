use log::{debug, info};

/// Thin wrapper over the `log` facade that tags records with a component name.
#[derive(Debug, Clone)]
pub struct LogManager {
    component: &'static str,
}

impl LogManager {
    pub const fn new(component: &'static str) -> Self {
        Self { component }
    }

    pub fn record(&self, message: &str) {
        info!(target: self.component, "{}", message);
    }

    /// Per-channel or per-pulse detail, only shown at debug level.
    pub fn detail(&self, message: &str) {
        debug!(target: self.component, "{}", message);
    }

    pub fn component(&self) -> &'static str {
        self.component
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("pulsecore")
    }
}
