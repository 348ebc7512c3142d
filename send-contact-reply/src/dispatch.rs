//! Queue between the reply action and mail delivery.
//!
//! Callers enqueue [`EmailSpec`] values, never the notification itself. A single worker task owns
//! the [`MailDelivery`], renders each spec and delivers it, then reports the outcome back on a
//! per-request channel. Nothing is retried.

use crate::{
    contact_reply::EmailSpec,
    mailer::{DeliveryError, MailDelivery},
    templates::{render_email, RenderError},
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

const QUEUE_CAPACITY: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error("Reply dispatcher is no longer running")]
    Closed,
}

struct DispatchRequest {
    spec: EmailSpec,
    reply: oneshot::Sender<Result<(), DispatchError>>,
}

#[derive(Clone)]
pub struct ReplyDispatcher {
    sender: mpsc::Sender<DispatchRequest>,
}

impl ReplyDispatcher {
    /// Starts the worker on the current Tokio runtime.
    pub fn spawn<MailDeliveryT: MailDelivery + 'static>(delivery: MailDeliveryT) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(run_worker(delivery, receiver));
        Self { sender }
    }

    pub async fn dispatch(&self, spec: EmailSpec) -> Result<(), DispatchError> {
        let (reply, outcome) = oneshot::channel();
        self.sender
            .send(DispatchRequest { spec, reply })
            .await
            .map_err(|_| DispatchError::Closed)?;
        outcome.await.map_err(|_| DispatchError::Closed)?
    }
}

async fn run_worker<MailDeliveryT: MailDelivery>(
    delivery: MailDeliveryT,
    mut receiver: mpsc::Receiver<DispatchRequest>,
) {
    while let Some(DispatchRequest { spec, reply }) = receiver.recv().await {
        let to = spec.to.clone();
        let outcome = render_and_deliver(&delivery, spec).await;
        if let Err(error) = &outcome {
            warn!(to = %to, "Contact reply not delivered: {error}");
        }
        // The caller may have given up waiting.
        let _ = reply.send(outcome);
    }
    debug!("Reply dispatcher stopped");
}

async fn render_and_deliver<MailDeliveryT: MailDelivery>(
    delivery: &MailDeliveryT,
    spec: EmailSpec,
) -> Result<(), DispatchError> {
    let rendered = render_email(&spec)?;
    delivery.deliver(rendered).await?;
    Ok(())
}

#[cfg(test)]
impl ReplyDispatcher {
    /// A dispatcher whose worker is already gone.
    pub(crate) fn closed() -> Self {
        let (sender, _) = mpsc::channel(1);
        Self { sender }
    }
}
