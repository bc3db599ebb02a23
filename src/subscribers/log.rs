//! # LogWriter — runtime events as tracing records
//!
//! A subscriber that forwards every runtime [`Event`] to [`tracing`]. Failures
//! are logged at `warn`, lifecycle at `info`/`debug`. Install any tracing
//! subscriber in the host process to see them.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO kindsource: watch started gvk="apps/v1, Kind=Deployment"
//! WARN kindsource: watch failed gvk="apps/v1, Kind=Deployment" reason="connection reset"
//! WARN kindsource: notification dropped gvk="apps/v1, Kind=Deployment" object="ns/web" source="web-controller" reason="..."
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Tracing-backed event writer.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let gvk = e.gvk.as_deref().unwrap_or("-");
        let source = e.source.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::WatchStarted => info!(target: "kindsource", gvk, "watch started"),
            EventKind::CacheSynced => {
                info!(target: "kindsource", gvk, objects = e.count, "cache synced")
            }
            EventKind::WatchFailed => warn!(target: "kindsource", gvk, reason, "watch failed"),
            EventKind::WatchClosed => debug!(target: "kindsource", gvk, "watch closed by remote"),
            EventKind::ListFailed => warn!(target: "kindsource", gvk, reason, "list failed"),
            EventKind::Resynced => {
                debug!(target: "kindsource", gvk, objects = e.count, "resync delivered")
            }
            EventKind::TranslationFailed => warn!(
                target: "kindsource",
                gvk,
                object = e.object.as_deref().unwrap_or("-"),
                source,
                reason,
                "notification dropped"
            ),
            EventKind::SourceStarted => info!(target: "kindsource", gvk, source, "source started"),
            EventKind::CallbackBacklog => warn!(
                target: "kindsource",
                gvk,
                source,
                pending = e.count,
                "handler is falling behind"
            ),
            EventKind::CallbackPanicked => {
                warn!(target: "kindsource", gvk, source, reason, "handler panicked")
            }
            EventKind::SubscriberOverflow => {
                warn!(target: "kindsource", subscriber = source, reason, "subscriber dropped event")
            }
            EventKind::SubscriberPanicked => {
                warn!(target: "kindsource", subscriber = source, reason, "subscriber panicked")
            }
            EventKind::ShutdownRequested => info!(target: "kindsource", "shutdown requested"),
            EventKind::AllStoppedWithin => info!(target: "kindsource", "all watches stopped within grace"),
            EventKind::GraceExceeded => warn!(target: "kindsource", "shutdown grace exceeded"),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
