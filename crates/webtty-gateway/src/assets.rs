//! Static assets embedded at compile time from the crate's `static/`
//! directory, plus the tiny placeholder substitution used to render the
//! listing and index pages.

use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "static/"]
pub(crate) struct StaticAssets;

/// Serve one embedded asset, or 404.
pub(crate) fn asset_response(path: &str) -> Response {
    match StaticAssets::get(path) {
        Some(content) => {
            let mime = content.metadata.mimetype();
            Response::builder()
                .status(StatusCode::OK)
                .header("content-type", mime)
                .body(Body::from(content.data.to_vec()))
                .unwrap()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Fetch an embedded page template as UTF-8. The templates ship inside the
/// binary; a missing or non-UTF-8 one is a build defect, hence the panic.
pub(crate) fn template(path: &str) -> String {
    let content = StaticAssets::get(path)
        .unwrap_or_else(|| panic!("embedded template missing: {path}"));
    String::from_utf8(content.data.to_vec())
        .unwrap_or_else(|_| panic!("embedded template not utf-8: {path}"))
}

/// Substitute `{{name}}` placeholders. Unknown placeholders are left as-is.
pub(crate) fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{{{name}}}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_placeholders() {
        let html = render(
            "<title>{{title}}</title><p>{{title}} / {{other}}</p>",
            &[("title", "demo"), ("other", "x")],
        );
        assert_eq!(html, "<title>demo</title><p>demo / x</p>");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let html = render("{{unknown}}", &[("title", "demo")]);
        assert_eq!(html, "{{unknown}}");
    }

    #[test]
    fn test_page_templates_are_embedded() {
        assert!(StaticAssets::get("index.html").is_some());
        assert!(StaticAssets::get("list.html").is_some());
    }
}
