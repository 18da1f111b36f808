use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

pub const API_VERSION_HEADER: &str = "Caramella-Api-Version";

pub async fn add_response_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert(API_VERSION_HEADER, HeaderValue::from_static("1"));
    response
}
