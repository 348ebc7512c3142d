/// Target of the diagnostic redirect.
pub const DIAGNOSTIC_PATH: &str = "/cloudinary-diagnostic.php";

/// Static page which sends the browser to [`DIAGNOSTIC_PATH`] immediately, with a fallback link.
pub const REDIRECT_PAGE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/cloudinary-diagnostic.html"
));
