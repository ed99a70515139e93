//! Utilities for generating HTTP responses on authorization failures
//!
//! Every failure response carries the JSON envelope used throughout the
//! service, `{"success": false, "error": <status>, "message": "…"}`, and
//! bearer-token failures additionally carry the `www-authenticate`
//! challenge described by [RFC 6750, Section 3][RFC6750 3].
//!
//!   [RFC6750 3]: https://datatracker.ietf.org/doc/html/rfc6750#section-3

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::{header, HeaderValue, StatusCode};
use kafejo_oauth2::{PermissionPolicy, PermissionSet};
use serde::Serialize;

/// The JSON envelope carried by failure responses
#[derive(Clone, Debug, Serialize)]
pub struct ErrorBody {
    /// Always `false` on a failure response
    pub success: bool,
    /// The HTTP status code, repeated in the body
    pub error: u16,
    /// A human-readable description of the failure
    pub message: String,
}

/// Builds a failure response carrying the JSON envelope
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            success: false,
            error: status.as_u16(),
            message: message.to_owned(),
        }),
    )
        .into_response()
}

/// Builds a `401 Unauthorized` envelope response with the appropriate
/// `www-authenticate` header
///
/// The message provided will be automatically escaped to make sure it
/// is header-friendly.
///
/// The prepared response will have the form:
///
/// ```http
/// HTTP/1.1 401 Unauthorized
/// www-authenticate: Bearer error="invalid_token" error_description="{message}"
/// ```
///
/// `error_description` is omitted if `message` is empty.
pub fn unauthorized(message: &str) -> Response {
    let mut resp = error_response(StatusCode::UNAUTHORIZED, message);
    resp.headers_mut()
        .insert(header::WWW_AUTHENTICATE, invalid_token(message));
    resp
}

/// Builds a `403 Forbidden` envelope response with the appropriate
/// `www-authenticate` header(s)
///
/// The message provided will be automatically escaped to make sure it
/// is header-friendly.
///
/// When no policy is given, the prepared response will have the form:
///
/// ```http
/// HTTP/1.1 403 Forbidden
/// www-authenticate: Bearer error="insufficient_scope" error_description="{message}"
/// ```
///
/// If a `policy` is given, then a `www-authenticate` header will be added
/// for each permission alternative allowed by the policy.
///
/// ```http
/// HTTP/1.1 403 Forbidden
/// www-authenticate: Bearer error="insufficient_scope" error_description="{message}" scope="delete:drinks"
/// www-authenticate: Bearer error="insufficient_scope" error_description="{message}" scope="admin"
/// ```
///
/// `error_description` is omitted if `message` is empty.
pub fn forbidden(message: &str, policy: Option<&PermissionPolicy>) -> Response {
    let mut resp = error_response(StatusCode::FORBIDDEN, message);

    match policy {
        Some(policy) if policy != &PermissionPolicy::deny_all() => {
            for permissions in policy {
                resp.headers_mut().append(
                    header::WWW_AUTHENTICATE,
                    insufficient_scope(message, permissions),
                );
            }
        }
        _ => {
            resp.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                insufficient_scope_no_policy(message),
            );
        }
    }

    resp
}

fn invalid_token(message: &str) -> HeaderValue {
    if message.is_empty() {
        HeaderValue::from_static(r#"Bearer error="invalid_token""#)
    } else {
        HeaderValue::try_from(format!(
            r#"Bearer error="invalid_token" error_description="{}""#,
            message.escape_default()
        ))
        .expect("escaped description is a valid header value")
    }
}

// Because of the definition of a `Permission`, this never needs to escape
// `scope`, as permissions can only be printable ASCII characters and won't
// include `\` or `"`. Thus the attribute is always a valid `HeaderValue`.
fn insufficient_scope(message: &str, permissions: &PermissionSet) -> HeaderValue {
    if message.is_empty() {
        HeaderValue::try_from(format!(
            r#"Bearer error="insufficient_scope" scope="{permissions}""#
        ))
        .expect("scope is always a valid header value")
    } else {
        HeaderValue::try_from(format!(
            r#"Bearer error="insufficient_scope" error_description="{}" scope="{permissions}""#,
            message.escape_default()
        ))
        .expect("escaped description is a valid header value")
    }
}

fn insufficient_scope_no_policy(message: &str) -> HeaderValue {
    if message.is_empty() {
        HeaderValue::from_static(r#"Bearer error="insufficient_scope""#)
    } else {
        HeaderValue::try_from(format!(
            r#"Bearer error="insufficient_scope" error_description="{}""#,
            message.escape_default()
        ))
        .expect("escaped description is a valid header value")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use kafejo_oauth2::{permissions, policy};

    use super::*;

    #[tokio::test]
    async fn unauthorized_carries_envelope_and_challenge() {
        let resp = unauthorized("Token expired");

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let headers = extract_www_authenticate_headers(&resp);
        let expected =
            BTreeSet::from([r#"Bearer error="invalid_token" error_description="Token expired""#]);
        assert_eq!(headers, expected);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "error": 401,
                "message": "Token expired",
            })
        );
    }

    #[test]
    fn in_unauthorized_description_unicode_and_non_printing_message_does_not_panic() {
        let resp = unauthorized("\ttrinkaĵo \"akvo\"");

        let headers = extract_www_authenticate_headers(&resp);

        let expected = BTreeSet::from([
            r#"Bearer error="invalid_token" error_description="\ttrinka\u{135}o \"akvo\"""#,
        ]);

        assert_eq!(headers, expected);
    }

    #[test]
    fn in_forbidden_with_multiple_alternatives_returns_multiple_headers() {
        let resp = forbidden(
            "Permission not found",
            Some(&policy![permissions!["delete:drinks"], permissions!["admin"]]),
        );

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let headers = extract_www_authenticate_headers(&resp);

        let expected = BTreeSet::from([
            r#"Bearer error="insufficient_scope" error_description="Permission not found" scope="delete:drinks""#,
            r#"Bearer error="insufficient_scope" error_description="Permission not found" scope="admin""#,
        ]);

        assert_eq!(headers, expected);
    }

    #[test]
    fn in_forbidden_with_deny_all_returns_one_header_without_scope() {
        let resp = forbidden("Permission not found", Some(&policy![]));

        let headers = extract_www_authenticate_headers(&resp);

        let expected = BTreeSet::from([
            r#"Bearer error="insufficient_scope" error_description="Permission not found""#,
        ]);

        assert_eq!(headers, expected);
    }

    #[test]
    fn in_forbidden_with_no_policy_returns_one_header_without_scope() {
        let resp = forbidden("Permission not found", None);

        let headers = extract_www_authenticate_headers(&resp);

        let expected = BTreeSet::from([
            r#"Bearer error="insufficient_scope" error_description="Permission not found""#,
        ]);

        assert_eq!(headers, expected);
    }

    #[test]
    fn in_forbidden_with_empty_message_doesnt_include_description() {
        let resp = forbidden("", None);

        let headers = extract_www_authenticate_headers(&resp);

        let expected = BTreeSet::from([r#"Bearer error="insufficient_scope""#]);

        assert_eq!(headers, expected);
    }

    #[tokio::test]
    async fn error_response_reflects_status_in_envelope() {
        let resp = error_response(StatusCode::NOT_FOUND, "resource not found");

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(resp.headers().get(header::WWW_AUTHENTICATE).is_none());

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "error": 404,
                "message": "resource not found",
            })
        );
    }

    fn extract_www_authenticate_headers(resp: &Response) -> BTreeSet<&str> {
        resp.headers()
            .get_all(header::WWW_AUTHENTICATE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect::<BTreeSet<_>>()
    }
}
