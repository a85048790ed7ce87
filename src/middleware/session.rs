use axum::{
    extract::Request,
    http::{HeaderValue, header},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const SESSION_HEADER: &str = "x-session-token";

const MAX_SESSION_TOKEN_LEN: usize = 128;

pub fn is_valid_session_token(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_SESSION_TOKEN_LEN
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Issues a session token to callers that present neither a bearer token nor
/// a session token. The token is visible to handlers through the request
/// header and returned to the client in the response header.
pub async fn ensure_session(mut request: Request, next: Next) -> Response {
    let headers = request.headers();
    let issued = if headers.contains_key(header::AUTHORIZATION) || headers.contains_key(SESSION_HEADER)
    {
        None
    } else {
        HeaderValue::from_str(&Uuid::new_v4().simple().to_string()).ok()
    };

    if let Some(token) = &issued {
        tracing::debug!("issuing anonymous session token");
        request.headers_mut().insert(SESSION_HEADER, token.clone());
    }

    let mut response = next.run(request).await;
    if let Some(token) = issued {
        response.headers_mut().insert(SESSION_HEADER, token);
    }
    response
}
