use crate::{contact_reply::Contact, templates::render_paragraphs};
use serde::Serialize;
use tinytemplate::TinyTemplate;
use tracing::error;

const BASE_HOST: &str = "acosfootballacademy.com";

const SEND_ERROR_TEMPLATE_NAME: &str = "send-error-template";
const SEND_ERROR_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/send-error.html"
));
const FALLBACK_ERROR_PAGE: &str =
    "<!DOCTYPE html><html><body><h1>Something went wrong</h1><p>The reply could not be sent.</p></body></html>";

#[derive(Serialize)]
struct Context<'a> {
    site_root: String,
    name: &'a str,
    email: &'a str,
    response: &'a str,
}

/// Page shown to the administrator when a reply could not be delivered. It repeats the unsent
/// response so that it is not lost.
pub fn render_error_page(contact: &Contact, response: &str) -> String {
    let mut tt = TinyTemplate::new();
    tt.add_formatter("render_paragraphs", render_paragraphs);
    let context = Context {
        site_root: format!("https://{BASE_HOST}"),
        name: &contact.name,
        email: &contact.email,
        response,
    };
    match tt
        .add_template(SEND_ERROR_TEMPLATE_NAME, SEND_ERROR_TEMPLATE)
        .and_then(|()| tt.render(SEND_ERROR_TEMPLATE_NAME, &context))
    {
        Ok(page) => page,
        Err(e) => {
            error!("Unable to render error page: {e}");
            FALLBACK_ERROR_PAGE.into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::render_error_page;
    use crate::contact_reply::Contact;
    use googletest::prelude::*;

    const MALICIOUS_CONTENT: &str = "<script>doEvil();</script>";

    fn contact_named(name: &str) -> Contact {
        Contact {
            id: 3,
            email: "visitor@example.com".into(),
            name: name.into(),
            message: "A question".into(),
        }
    }

    #[test]
    fn escapes_user_input_in_name() -> Result<()> {
        let output = render_error_page(&contact_named(MALICIOUS_CONTENT), "A reply");

        verify_that!(output, not(contains_substring(MALICIOUS_CONTENT)))
    }

    #[test]
    fn escapes_user_input_in_response() -> Result<()> {
        let output = render_error_page(&contact_named("Alice"), MALICIOUS_CONTENT);

        verify_that!(output, not(contains_substring(MALICIOUS_CONTENT)))
    }

    #[test]
    fn renders_paragraphs_in_response() -> Result<()> {
        let output = render_error_page(
            &contact_named("Alice"),
            "A paragraph\n\nAnother paragraph",
        );

        verify_that!(
            output,
            contains_substring("<p>A paragraph</p><p>Another paragraph</p>")
        )
    }

    #[test]
    fn names_the_recipient() -> Result<()> {
        let output = render_error_page(&contact_named("Alice"), "A reply");

        verify_that!(
            output,
            contains_substring("Something went wrong")
                .and(contains_substring("Alice &lt;visitor@example.com&gt;"))
        )
    }
}
