//! 403 block page rendering.

use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use http::{HeaderValue, Response, StatusCode};

use crate::site::BlockPage;

/// A rendered block page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockResponse {
    title: String,
    message: String,
    body: String,
}

impl BlockResponse {
    /// The only status the gate ever produces.
    pub const STATUS: StatusCode = StatusCode::FORBIDDEN;

    /// Render a site's block page. Title, message and hostname are escaped.
    pub fn render(page: &BlockPage, hostname: &str) -> Self {
        let title = escape_html(&page.title);
        let message = escape_html(&page.message);
        let hostname = escape_html(hostname);
        let body = format!(
            "<!DOCTYPE html>\n\
             <html lang=\"en\">\n\
             <head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
             <body>\n\
             <h1>{title}</h1>\n\
             <p>{message}</p>\n\
             <p><small>{hostname}</small></p>\n\
             </body>\n\
             </html>\n"
        );
        Self {
            title: page.title.clone(),
            message: page.message.clone(),
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        Self::STATUS
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Convert into an HTTP response.
    pub fn into_http(self) -> Response<String> {
        let mut response = Response::new(self.body);
        *response.status_mut() = Self::STATUS;
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        response
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
