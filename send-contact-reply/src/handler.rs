use crate::{
    contact_reply::{BuildsEmail, Contact, ContactReplyNotification},
    dispatch::{DispatchError, ReplyDispatcher},
    error_page::render_error_page,
    log_sink::TracingLogSink,
    mailer::SmtpMailDelivery,
    redirect_page::REDIRECT_PAGE,
    secrets::SecretRepository,
};
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, RequestPayloadExt, Response,
};
use serde::Deserialize;
use std::marker::PhantomData;
use tracing::error;

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// The application's "reply to contact" action, plus the static diagnostic redirect.
pub struct ContactReplyHandler<SecretRepositoryT: SecretRepository> {
    dispatcher: ReplyDispatcher,
    secrets_repository: PhantomData<SecretRepositoryT>,
}

impl<SecretRepositoryT: SecretRepository + 'static> ContactReplyHandler<SecretRepositoryT> {
    pub async fn new() -> Self {
        let delivery = SmtpMailDelivery::new(SecretRepositoryT::open().await);
        Self::with_dispatcher(ReplyDispatcher::spawn(delivery))
    }
}

impl<SecretRepositoryT: SecretRepository> ContactReplyHandler<SecretRepositoryT> {
    pub fn with_dispatcher(dispatcher: ReplyDispatcher) -> Self {
        Self {
            dispatcher,
            secrets_repository: PhantomData,
        }
    }

    pub async fn handle(&self, event: Request) -> Result<Response<Body>, Error> {
        match *event.method() {
            Method::GET | Method::HEAD => Ok(Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", HTML_CONTENT_TYPE)
                .body(REDIRECT_PAGE.into())?),
            Method::POST => self.handle_reply(event).await,
            _ => Ok(Response::builder()
                .status(StatusCode::METHOD_NOT_ALLOWED)
                .header("Allow", "GET, HEAD, POST")
                .body("".into())?),
        }
    }

    async fn handle_reply(&self, event: Request) -> Result<Response<Body>, Error> {
        let request: Option<ContactReplyRequest> = match event.payload() {
            Ok(request) => request,
            Err(e) => {
                let error = ContactReplyError::ClientError(format!("Malformed payload: {e}"));
                error.log();
                return error.into_response();
            }
        };
        let Some(request) = request else {
            let error = ContactReplyError::ClientError("Missing event payload".into());
            error.log();
            return error.into_response();
        };
        match self.process_reply(request).await {
            Ok(()) => Ok(Response::builder()
                .status(StatusCode::OK)
                .body("".into())?),
            Err(error) => {
                error.log();
                error.into_response()
            }
        }
    }

    async fn process_reply(&self, request: ContactReplyRequest) -> Result<(), ContactReplyError> {
        let (contact, response) = request.validate()?;
        let spec = ContactReplyNotification::new(&contact, response.as_str(), &TracingLogSink)
            .build();
        self.dispatcher
            .dispatch(spec)
            .await
            .map_err(|source| ContactReplyError::InternalError {
                source,
                contact: Box::new(contact),
                response,
            })
    }
}

#[derive(Deserialize, Debug)]
struct ContactReplyRequest {
    contact: Option<ContactPayload>,
    response: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ContactPayload {
    id: Option<u64>,
    email: Option<String>,
    name: Option<String>,
    message: Option<String>,
}

impl ContactReplyRequest {
    fn validate(self) -> Result<(Contact, String), ContactReplyError> {
        let ContactReplyRequest {
            contact:
                Some(ContactPayload {
                    id: Some(id),
                    email: Some(email),
                    name: Some(name),
                    message: Some(message),
                }),
            response: Some(response),
        } = self
        else {
            return Err(ContactReplyError::ClientError(
                "Missing fields in request".into(),
            ));
        };
        if email.trim().is_empty() {
            return Err(ContactReplyError::ClientError(format!(
                "Contact {id} has no email address"
            )));
        }

        Ok((
            Contact {
                id,
                email,
                name,
                message,
            },
            response,
        ))
    }
}

#[derive(Debug, thiserror::Error)]
enum ContactReplyError {
    #[error("Internal error: {source}")]
    InternalError {
        source: DispatchError,
        contact: Box<Contact>,
        response: String,
    },
    #[error("Client error: {0}")]
    ClientError(String),
}

impl ContactReplyError {
    fn log(&self) {
        match self {
            ContactReplyError::InternalError {
                source, contact, ..
            } => {
                error!(
                    contact_id = contact.id,
                    "Internal error sending contact reply: {source}"
                );
            }
            ContactReplyError::ClientError(description) => {
                error!("Client error sending contact reply: {description}");
            }
        }
    }

    fn into_response(self) -> Result<Response<Body>, Error> {
        Ok(match self {
            ContactReplyError::InternalError {
                contact, response, ..
            } => Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .header("Content-Type", HTML_CONTENT_TYPE)
                .body(render_error_page(&contact, &response).into())?,
            ContactReplyError::ClientError(description) => Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .body(format!("Client error: {description}").into())?,
        })
    }
}
