use crate::contact_reply::{EmailSpec, CONTACT_REPLY_TEMPLATE};
use serde_json::Value;
use tinytemplate::{error::Error, format, format_unescaped, TinyTemplate};

const HTML_TEMPLATE_NAME: &str = "html";
const TEXT_TEMPLATE_NAME: &str = "text";

/// The HTML and plain-text sources registered under one template id.
#[derive(Debug)]
pub struct TemplateSource {
    pub id: &'static str,
    pub html: &'static str,
    pub text: &'static str,
}

const TEMPLATES: &[TemplateSource] = &[TemplateSource {
    id: CONTACT_REPLY_TEMPLATE,
    html: include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/assets/contact-reply.html"
    )),
    text: include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/assets/contact-reply.txt"
    )),
}];

/// An [`EmailSpec`] with its template resolved into bodies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Unknown email template {0}")]
    UnknownTemplate(String),
    #[error("Error rendering email template: {0}")]
    Template(#[from] Error),
}

pub fn lookup_template(id: &str) -> Option<&'static TemplateSource> {
    TEMPLATES.iter().find(|source| source.id == id)
}

pub fn render_email(spec: &EmailSpec) -> Result<RenderedEmail, RenderError> {
    let source = lookup_template(&spec.template)
        .ok_or_else(|| RenderError::UnknownTemplate(spec.template.clone()))?;

    let mut html = TinyTemplate::new();
    html.add_formatter("render_paragraphs", render_paragraphs);
    html.add_template(HTML_TEMPLATE_NAME, source.html)?;

    let mut text = TinyTemplate::new();
    text.set_default_formatter(&format_unescaped);
    text.add_template(TEXT_TEMPLATE_NAME, source.text)?;

    Ok(RenderedEmail {
        to: spec.to.clone(),
        subject: spec.subject.clone(),
        html: html.render(HTML_TEMPLATE_NAME, &spec.variables)?,
        text: text.render(TEXT_TEMPLATE_NAME, &spec.variables)?,
    })
}

/// Escapes the value, then turns blank-line separated blocks into paragraphs and remaining line
/// breaks into `<br>`.
pub(crate) fn render_paragraphs(value: &Value, output: &mut String) -> Result<(), Error> {
    output.push_str("<p>");
    let mut formatted = String::new();
    format(value, &mut formatted)?;
    output.push_str(
        &formatted
            .replace("\r\n", "\n")
            .replace("\n\n", "</p><p>")
            .replace('\n', "<br>"),
    );
    output.push_str("</p>");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{lookup_template, render_email, RenderError};
    use crate::{
        contact_reply::{
            BuildsEmail, Contact, ContactReplyNotification, EmailSpec, CONTACT_REPLY_TEMPLATE,
        },
        log_sink::TracingLogSink,
    };
    use googletest::prelude::*;

    const MALICIOUS_CONTENT: &str = "<script>doEvil();</script>";

    fn spec_for(name: &str, message: &str, response: &str) -> EmailSpec {
        let contact = Contact {
            id: 7,
            email: "visitor@example.com".into(),
            name: name.into(),
            message: message.into(),
        };
        ContactReplyNotification::new(&contact, response, &TracingLogSink).build()
    }

    #[test]
    fn contact_reply_template_is_registered() -> Result<()> {
        verify_that!(lookup_template(CONTACT_REPLY_TEMPLATE), some(anything()))
    }

    #[googletest::test]
    fn renders_all_variables() {
        let rendered = render_email(&spec_for("Alice", "Hello", "Thanks!")).unwrap();

        expect_that!(rendered.to, eq("visitor@example.com"));
        expect_that!(
            rendered.subject,
            eq("Reply to your message - ACOS Football Academy")
        );
        expect_that!(
            rendered.html,
            contains_substring("Hello Alice,")
                .and(contains_substring("<p>Hello</p>"))
                .and(contains_substring("<p>Thanks!</p>"))
        );
        expect_that!(
            rendered.text,
            contains_substring("Hello Alice,")
                .and(contains_substring("Hello\n"))
                .and(contains_substring("Thanks!"))
        );
    }

    #[test]
    fn escapes_user_input_in_name() -> Result<()> {
        let rendered = render_email(&spec_for(MALICIOUS_CONTENT, "Hello", "Thanks!")).unwrap();

        verify_that!(rendered.html, not(contains_substring(MALICIOUS_CONTENT)))
    }

    #[test]
    fn escapes_user_input_in_original_message() -> Result<()> {
        let rendered = render_email(&spec_for("Alice", MALICIOUS_CONTENT, "Thanks!")).unwrap();

        verify_that!(rendered.html, not(contains_substring(MALICIOUS_CONTENT)))
    }

    #[test]
    fn escapes_user_input_in_response() -> Result<()> {
        let rendered = render_email(&spec_for("Alice", "Hello", MALICIOUS_CONTENT)).unwrap();

        verify_that!(rendered.html, not(contains_substring(MALICIOUS_CONTENT)))
    }

    #[test]
    fn keeps_plain_text_body_unescaped() -> Result<()> {
        let rendered = render_email(&spec_for("Alice & Bob", "Hello", "Fish & chips")).unwrap();

        verify_that!(
            rendered.text,
            contains_substring("Hello Alice & Bob,").and(contains_substring("Fish & chips"))
        )
    }

    #[test]
    fn renders_paragraphs_in_response() -> Result<()> {
        let rendered = render_email(&spec_for(
            "Alice",
            "Hello",
            "A paragraph\n\nAnother paragraph\nsame paragraph",
        ))
        .unwrap();

        verify_that!(
            rendered.html,
            contains_substring("<p>A paragraph</p><p>Another paragraph<br>same paragraph</p>")
        )
    }

    #[test]
    fn renders_empty_response() -> Result<()> {
        let rendered = render_email(&spec_for("Alice", "Hello", "")).unwrap();

        verify_that!(rendered.html, contains_substring("<p></p>"))
    }

    #[test]
    fn rejects_unknown_template() -> Result<()> {
        let spec = EmailSpec {
            template: "emails.does-not-exist".into(),
            ..spec_for("Alice", "Hello", "Thanks!")
        };

        verify_that!(
            render_email(&spec),
            err(matches_pattern!(RenderError::UnknownTemplate(eq(
                "emails.does-not-exist"
            ))))
        )
    }
}
