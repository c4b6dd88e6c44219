use crate::tracing::RequestId;
use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Header name for the request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Upper bound on a caller-supplied request id; longer values are replaced.
const MAX_REQUEST_ID_LEN: usize = 128;

fn inbound_request_id(request: &Request) -> Option<(RequestId, HeaderValue)> {
    let raw = request.headers().get(REQUEST_ID_HEADER)?;
    let value = raw.to_str().ok()?.trim();
    if value.is_empty() || value.len() > MAX_REQUEST_ID_LEN {
        return None;
    }
    let header = HeaderValue::from_str(value).ok()?;
    Some((RequestId::new(value), header))
}

fn generated_request_id() -> (RequestId, HeaderValue) {
    let id = RequestId::default();
    // uuid text is always a valid header value
    let header = HeaderValue::from_str(id.as_str()).unwrap_or(HeaderValue::from_static("unknown"));
    (id, header)
}

/// Attaches a request id to the request (extension + header), the task-local
/// scope used by error bodies, and the response headers.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let (request_id, header) =
        inbound_request_id(&request).unwrap_or_else(generated_request_id);
    let header_name = HeaderName::from_static(REQUEST_ID_HEADER);

    request
        .headers_mut()
        .insert(header_name.clone(), header.clone());
    request.extensions_mut().insert(request_id.clone());

    let mut response =
        crate::tracing::scope_request_id(request_id, async move { next.run(request).await })
            .await;

    response.headers_mut().insert(header_name, header);
    response
}
