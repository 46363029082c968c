//! Lifecycle notifications emitted around each patch application.

use crate::error::PatchError;
use crate::patch::Patch;

/// A notification about one patch.
#[derive(Debug)]
pub enum PatchEvent<'a> {
    /// About to fetch and apply `patch`.
    PreApply {
        /// The patch being applied.
        patch: &'a Patch,
    },
    /// `patch` applied cleanly at `level`.
    PostApply {
        /// The patch that was applied.
        patch: &'a Patch,
        /// Strip-level that succeeded.
        level: &'a str,
    },
    /// `patch` could not be fetched or applied.
    ApplyFailed {
        /// The patch that failed.
        patch: &'a Patch,
        /// Why it failed.
        error: &'a PatchError,
    },
}

impl PatchEvent<'_> {
    /// The patch this event is about.
    #[must_use]
    pub fn patch(&self) -> &Patch {
        match self {
            Self::PreApply { patch }
            | Self::PostApply { patch, .. }
            | Self::ApplyFailed { patch, .. } => patch,
        }
    }

    /// Short event name, e.g. for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PreApply { .. } => "pre-patch-apply",
            Self::PostApply { .. } => "post-patch-apply",
            Self::ApplyFailed { .. } => "patch-apply-failed",
        }
    }
}

/// Receives patch lifecycle notifications.
pub trait PatchListener {
    /// Called synchronously for every event.
    fn on_patch_event(&self, event: &PatchEvent<'_>);
}

impl<F> PatchListener for F
where
    F: Fn(&PatchEvent<'_>),
{
    fn on_patch_event(&self, event: &PatchEvent<'_>) {
        self(event);
    }
}

/// Fans events out to every registered listener, in registration order.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: Vec<Box<dyn PatchListener>>,
}

impl EventDispatcher {
    /// Creates a dispatcher with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener.
    pub fn add_listener(&mut self, listener: Box<dyn PatchListener>) {
        self.listeners.push(listener);
    }

    /// Delivers `event` to every listener.
    pub fn dispatch(&self, event: &PatchEvent<'_>) {
        tracing::trace!(event = event.name(), package = %event.patch().package, "dispatching");
        for listener in &self.listeners {
            listener.on_patch_event(event);
        }
    }
}
