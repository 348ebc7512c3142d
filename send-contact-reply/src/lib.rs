pub mod contact_reply;
pub mod dispatch;
mod error_page;
pub mod handler;
pub mod log_sink;
pub mod mailer;
pub mod redirect_page;
pub mod secrets;
pub mod templates;
