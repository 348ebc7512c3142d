use crate::{
    secrets::{EnvironmentError, SecretRepository},
    templates::RenderedEmail,
};
use async_once_cell::OnceCell;
use async_trait::async_trait;
use lettre::{
    address::AddressError,
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::{Credentials, Mechanism},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::Deserialize;
use std::{borrow::Cow, sync::Arc};
use tracing::info;

pub const SMTP_CREDENTIALS_NAME: &str = "smtp-credentials";

const SMTP_URL: &str = "smtps://email-smtp.eu-north-1.amazonaws.com";
const FROM_ADDRESS: &str = "ACOS Football Academy <noreply@acosfootballacademy.com>";

/// Hands a rendered email over for transmission.
#[async_trait]
pub trait MailDelivery: Send + Sync {
    async fn deliver(&self, email: RenderedEmail) -> Result<(), DeliveryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Invalid address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: AddressError,
    },
    #[error("Error building message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("Unable to connect to SMTP server: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Error sending message: {0}")]
    Send(#[from] lettre::transport::smtp::Error),
}

impl From<EnvironmentError> for DeliveryError {
    fn from(error: EnvironmentError) -> Self {
        DeliveryError::Connection(Box::new(error))
    }
}

#[derive(Deserialize, Debug)]
pub(crate) struct SmtpCredentials {
    #[serde(rename = "SMTP_USERNAME")]
    pub(crate) username: String,
    #[serde(rename = "SMTP_PASSWORD")]
    pub(crate) password: String,
}

/// Sends mail through the relay named by `SMTP_URL`.
///
/// The transport is created on the first delivery. If creating it fails, the next delivery tries
/// again.
pub struct SmtpMailDelivery<SecretRepositoryT: SecretRepository> {
    secrets_repository: SecretRepositoryT,
    mailer: OnceCell<AsyncSmtpTransport<Tokio1Executor>>,
}

impl<SecretRepositoryT: SecretRepository> SmtpMailDelivery<SecretRepositoryT> {
    pub fn new(secrets_repository: SecretRepositoryT) -> Self {
        Self {
            secrets_repository,
            mailer: Default::default(),
        }
    }

    fn build_message(email: RenderedEmail) -> Result<Message, DeliveryError> {
        let from = parse_mailbox(from_address().as_ref())?;
        let to = parse_mailbox(&email.to)?;
        Ok(Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject)
            .multipart(MultiPart::alternative_plain_html(email.text, email.html))?)
    }

    async fn initialise_mailer(
        &self,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, DeliveryError> {
        let smtp_url = smtp_url();
        info!("initialise_mailer: Connecting to {smtp_url}");
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::from_url(&smtp_url)
            .map_err(|e| DeliveryError::Connection(Box::new(e)))?
            .authentication(vec![Mechanism::Plain]);

        // Credentials only go over TLS. A plain smtp:// relay which demands them will reject the
        // session instead.
        if smtp_url.starts_with("smtps://") {
            let parsed_credentials: SmtpCredentials = self
                .secrets_repository
                .get_secret(SMTP_CREDENTIALS_NAME)
                .await?;
            builder = builder.credentials(Credentials::new(
                parsed_credentials.username,
                parsed_credentials.password,
            ));
        }

        Ok(builder.build())
    }
}

#[async_trait]
impl<SecretRepositoryT: SecretRepository> MailDelivery for SmtpMailDelivery<SecretRepositoryT> {
    async fn deliver(&self, email: RenderedEmail) -> Result<(), DeliveryError> {
        let to = email.to.clone();
        let message = Self::build_message(email)?;
        let mailer = self
            .mailer
            .get_or_try_init(self.initialise_mailer())
            .await?;
        mailer.send(message).await?;
        info!(to = %to, "Contact reply sent");
        Ok(())
    }
}

#[async_trait]
impl<T: MailDelivery + ?Sized> MailDelivery for Arc<T> {
    async fn deliver(&self, email: RenderedEmail) -> Result<(), DeliveryError> {
        (**self).deliver(email).await
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address
        .parse()
        .map_err(|source| DeliveryError::InvalidAddress {
            address: address.into(),
            source,
        })
}

fn smtp_url() -> Cow<'static, str> {
    std::env::var("SMTP_URL")
        .map(Cow::Owned)
        .unwrap_or(SMTP_URL.into())
}

fn from_address() -> Cow<'static, str> {
    std::env::var("MAIL_FROM")
        .map(Cow::Owned)
        .unwrap_or(FROM_ADDRESS.into())
}
