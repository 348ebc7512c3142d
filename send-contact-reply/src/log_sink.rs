use tracing::debug;

/// Structured diagnostics a [`ContactReplyNotification`](crate::contact_reply::ContactReplyNotification)
/// emits over its lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyLogEvent<'a> {
    Constructed {
        contact_id: u64,
        email: &'a str,
        response_length: usize,
    },
    Building {
        email: &'a str,
    },
}

#[derive(Debug, thiserror::Error)]
#[error("Unable to record log event: {0}")]
pub struct LogSinkError(pub String);

/// Destination for [`ReplyLogEvent`]s.
///
/// Recording is best-effort: callers discard the returned error, so an implementation must never
/// rely on it to stop the send.
pub trait ReplyLogSink {
    fn record(&self, event: &ReplyLogEvent<'_>) -> Result<(), LogSinkError>;
}

/// Writes events as `tracing` debug records.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogSink;

impl ReplyLogSink for TracingLogSink {
    fn record(&self, event: &ReplyLogEvent<'_>) -> Result<(), LogSinkError> {
        match event {
            ReplyLogEvent::Constructed {
                contact_id,
                email,
                response_length,
            } => debug!(
                contact_id,
                email,
                response_length,
                "Contact reply notification constructed"
            ),
            ReplyLogEvent::Building { email } => {
                debug!(email, "Building contact reply notification")
            }
        }
        Ok(())
    }
}
