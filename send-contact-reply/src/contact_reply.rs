//! The reply an administrator sends back to someone who used the contact form.

use crate::log_sink::{ReplyLogEvent, ReplyLogSink};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const CONTACT_REPLY_SUBJECT: &str = "Reply to your message - ACOS Football Academy";
pub const CONTACT_REPLY_TEMPLATE: &str = "emails.contact-reply";

/// A contact-form submission as stored by the application.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub message: String,
}

/// Everything the delivery side needs to render and send an email, as a plain value which can be
/// queued.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailSpec {
    pub subject: String,
    pub to: String,
    pub template: String,
    pub variables: BTreeMap<String, String>,
}

pub trait BuildsEmail {
    fn build(self) -> EmailSpec;
}

/// Reply to a [`Contact`], alive from the reply action until it is handed to delivery.
///
/// `build` consumes the notification, so it is built at most once.
pub struct ContactReplyNotification<'a> {
    contact: &'a Contact,
    response: String,
    log: &'a dyn ReplyLogSink,
}

impl<'a> ContactReplyNotification<'a> {
    pub fn new(
        contact: &'a Contact,
        response: impl Into<String>,
        log: &'a dyn ReplyLogSink,
    ) -> Self {
        let response = response.into();
        let _ = log.record(&ReplyLogEvent::Constructed {
            contact_id: contact.id,
            email: &contact.email,
            response_length: response.len(),
        });
        Self {
            contact,
            response,
            log,
        }
    }

    pub fn contact(&self) -> &Contact {
        self.contact
    }

    pub fn response(&self) -> &str {
        &self.response
    }
}

impl BuildsEmail for ContactReplyNotification<'_> {
    fn build(self) -> EmailSpec {
        let _ = self.log.record(&ReplyLogEvent::Building {
            email: &self.contact.email,
        });
        let variables = BTreeMap::from([
            ("name".to_string(), self.contact.name.clone()),
            ("originalMessage".to_string(), self.contact.message.clone()),
            ("response".to_string(), self.response),
        ]);
        EmailSpec {
            subject: CONTACT_REPLY_SUBJECT.into(),
            // Set from the contact here rather than trusting anything downstream to fill it in.
            to: self.contact.email.clone(),
            template: CONTACT_REPLY_TEMPLATE.into(),
            variables,
        }
    }
}
