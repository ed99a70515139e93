//! End-to-end tests exercising the menu routes through the router

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use kafejo::{jwa, jwk, jws, jwt, Base64Url, Jwk, Jwks};
use kafejo_api::AppState;
use kafejo_oauth2::Authority;
use serde_json::{json, Value};
use tower::ServiceExt;

const KEY_ID: &str = "gxYpPdRnW";
const AUDIENCE: &str = "k_cafe";
const ISSUER: &str = "https://cafe.example.com/";

struct Cafe {
    rsa: openssl::rsa::Rsa<openssl::pkey::Private>,
    app: Router,
}

fn cafe() -> Cafe {
    let rsa = openssl::rsa::Rsa::generate(2048).unwrap();
    let jwk = Jwk::from(
        jwa::rsa::PublicKey::from_components(rsa.n().to_vec(), rsa.e().to_vec()).unwrap(),
    )
    .with_key_id(jwk::KeyId::from_static(KEY_ID))
    .with_algorithm(jws::Algorithm::RS256);

    let mut jwks = Jwks::default();
    jwks.add_key(jwk);

    let validator = jwt::CoreValidator::default()
        .add_approved_algorithm(jws::Algorithm::RS256)
        .add_allowed_audience(jwt::Audience::from_static(AUDIENCE))
        .require_issuer(jwt::Issuer::from_static(ISSUER));

    let app = kafejo_api::router(AppState::new(), Authority::new(jwks, validator));
    Cafe { rsa, app }
}

impl Cafe {
    fn token(&self, claims: Value) -> String {
        mint(
            &self.rsa,
            &json!({ "alg": "RS256", "kid": KEY_ID }),
            &claims,
            openssl::hash::MessageDigest::sha256(),
        )
    }
}

fn mint(
    rsa: &openssl::rsa::Rsa<openssl::pkey::Private>,
    header: &Value,
    claims: &Value,
    digest: openssl::hash::MessageDigest,
) -> String {
    let h_raw = Base64Url::from_raw(serde_json::to_vec(header).unwrap());
    let p_raw = Base64Url::from_raw(serde_json::to_vec(claims).unwrap());
    let message = format!("{h_raw}.{p_raw}");

    let pkey = openssl::pkey::PKey::from_rsa(rsa.clone()).unwrap();
    let mut signer = openssl::sign::Signer::new(digest, &pkey).unwrap();
    signer.update(message.as_bytes()).unwrap();
    let signature = Base64Url::from_raw(signer.sign_to_vec().unwrap());

    format!("{message}.{signature}")
}

fn claims(permissions: &[&str]) -> Value {
    json!({
        "aud": AUDIENCE,
        "iss": ISSUER,
        "sub": "auth0|barista",
        "exp": now() + 300,
        "permissions": permissions,
    })
}

fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn request(method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap();
    (status, body)
}

fn assert_envelope(status: StatusCode, body: &Value, expected: StatusCode, message: &str) {
    assert_eq!(status, expected);
    assert_eq!(
        body,
        &json!({
            "success": false,
            "error": expected.as_u16(),
            "message": message,
        })
    );
}

#[tokio::test]
async fn the_menu_is_public() {
    let cafe = cafe();
    let (status, body) = send(&cafe.app, request(Method::GET, "/drinks", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["drinks"][0]["title"], "water");
    assert_eq!(body["drinks"][0]["recipe"][0]["color"], "blue");
    assert!(
        body["drinks"][0]["recipe"][0].get("name").is_none(),
        "the public menu must not reveal ingredient names"
    );
}

#[tokio::test]
async fn health_reports_ok() {
    let cafe = cafe();
    let (status, body) = send(&cafe.app, request(Method::GET, "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn unknown_paths_get_the_envelope_404() {
    let cafe = cafe();
    let (status, body) = send(&cafe.app, request(Method::GET, "/coffee", None, None)).await;

    assert_envelope(status, &body, StatusCode::NOT_FOUND, "resource not found");
}

#[tokio::test]
async fn requests_without_credentials_are_challenged() {
    let cafe = cafe();
    let response = cafe
        .app
        .clone()
        .oneshot(request(Method::GET, "/drinks-detail", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        &r#"Bearer error="invalid_token" error_description="Authorization header is expected""#
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        body,
        json!({
            "success": false,
            "error": 401,
            "message": "Authorization header is expected",
        })
    );
}

#[tokio::test]
async fn malformed_authorization_headers_are_rejected() {
    let cafe = cafe();
    let cases = [
        ("Token abc", "Authorization header must start with Bearer"),
        ("Bearer", "Token not found"),
        ("Bearer one two", "Authorization header must be bearer token"),
    ];

    for (value, message) in cases {
        let req = Request::builder()
            .uri("/drinks-detail")
            .header(header::AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&cafe.app, req).await;
        assert_envelope(status, &body, StatusCode::UNAUTHORIZED, message);
    }
}

#[tokio::test]
async fn undecipherable_tokens_are_rejected() {
    let cafe = cafe();
    let (status, body) = send(
        &cafe.app,
        request(Method::GET, "/drinks-detail", Some("garbage"), None),
    )
    .await;

    assert_envelope(
        status,
        &body,
        StatusCode::UNAUTHORIZED,
        "Authorization malformed",
    );
}

#[tokio::test]
async fn tokens_without_a_key_id_are_rejected() {
    let cafe = cafe();
    let token = mint(
        &cafe.rsa,
        &json!({ "alg": "RS256" }),
        &claims(&["get:drinks-detail"]),
        openssl::hash::MessageDigest::sha256(),
    );

    let (status, body) = send(
        &cafe.app,
        request(Method::GET, "/drinks-detail", Some(&token), None),
    )
    .await;

    assert_envelope(
        status,
        &body,
        StatusCode::UNAUTHORIZED,
        "Authorization malformed",
    );
}

#[tokio::test]
async fn tokens_with_an_unknown_key_id_are_rejected() {
    let cafe = cafe();
    let token = mint(
        &cafe.rsa,
        &json!({ "alg": "RS256", "kid": "somebody-else" }),
        &claims(&["get:drinks-detail"]),
        openssl::hash::MessageDigest::sha256(),
    );

    let (status, body) = send(
        &cafe.app,
        request(Method::GET, "/drinks-detail", Some(&token), None),
    )
    .await;

    assert_envelope(
        status,
        &body,
        StatusCode::BAD_REQUEST,
        "Unable to find the appropriate key",
    );
}

#[tokio::test]
async fn tokens_signed_with_another_algorithm_find_no_key() {
    let cafe = cafe();

    // The published key declares RS256, so an RS384 token cannot match it
    let token = mint(
        &cafe.rsa,
        &json!({ "alg": "RS384", "kid": KEY_ID }),
        &claims(&["get:drinks-detail"]),
        openssl::hash::MessageDigest::sha384(),
    );

    let (status, body) = send(
        &cafe.app,
        request(Method::GET, "/drinks-detail", Some(&token), None),
    )
    .await;

    assert_envelope(
        status,
        &body,
        StatusCode::BAD_REQUEST,
        "Unable to find the appropriate key",
    );
}

#[tokio::test]
async fn expired_tokens_are_rejected() {
    let cafe = cafe();
    let mut expired = claims(&["get:drinks-detail"]);
    expired["exp"] = json!(1_000);
    let token = cafe.token(expired);

    let (status, body) = send(
        &cafe.app,
        request(Method::GET, "/drinks-detail", Some(&token), None),
    )
    .await;

    assert_envelope(status, &body, StatusCode::UNAUTHORIZED, "Token expired");
}

#[tokio::test]
async fn tokens_for_another_audience_are_rejected() {
    let cafe = cafe();
    let mut other = claims(&["get:drinks-detail"]);
    other["aud"] = json!("other_api");
    let token = cafe.token(other);

    let (status, body) = send(
        &cafe.app,
        request(Method::GET, "/drinks-detail", Some(&token), None),
    )
    .await;

    assert_envelope(
        status,
        &body,
        StatusCode::UNAUTHORIZED,
        "Incorrect claims. Please, check the audience and issuer",
    );
}

#[tokio::test]
async fn signatures_from_an_unrecognized_key_are_rejected() {
    let cafe = cafe();

    // Signed by a different key that claims the well-known key's id
    let impostor = openssl::rsa::Rsa::generate(2048).unwrap();
    let token = mint(
        &impostor,
        &json!({ "alg": "RS256", "kid": KEY_ID }),
        &claims(&["get:drinks-detail"]),
        openssl::hash::MessageDigest::sha256(),
    );

    let (status, body) = send(
        &cafe.app,
        request(Method::GET, "/drinks-detail", Some(&token), None),
    )
    .await;

    assert_envelope(
        status,
        &body,
        StatusCode::UNAUTHORIZED,
        "Incorrect claims. Please, check the audience and issuer",
    );
}

#[tokio::test]
async fn tokens_without_the_permissions_claim_are_rejected() {
    let cafe = cafe();
    let mut bare = claims(&[]);
    bare.as_object_mut().unwrap().remove("permissions");
    let token = cafe.token(bare);

    let (status, body) = send(
        &cafe.app,
        request(Method::GET, "/drinks-detail", Some(&token), None),
    )
    .await;

    assert_envelope(
        status,
        &body,
        StatusCode::BAD_REQUEST,
        "Permissions not included in JWT",
    );
}

#[tokio::test]
async fn holders_of_other_permissions_are_refused() {
    let cafe = cafe();
    let token = cafe.token(claims(&["post:drinks"]));

    let response = cafe
        .app
        .clone()
        .oneshot(request(Method::GET, "/drinks-detail", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        &r#"Bearer error="insufficient_scope" error_description="Permission not found" scope="get:drinks-detail""#
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["message"], "Permission not found");
}

#[tokio::test]
async fn the_detail_view_reveals_recipes() {
    let cafe = cafe();
    let token = cafe.token(claims(&["get:drinks-detail"]));

    let (status, body) = send(
        &cafe.app,
        request(Method::GET, "/drinks-detail", Some(&token), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["drinks"][0]["recipe"][0]["name"], "water");
}

#[tokio::test]
async fn baristas_can_add_drinks() {
    let cafe = cafe();
    let token = cafe.token(claims(&["post:drinks"]));

    let (status, body) = send(
        &cafe.app,
        request(
            Method::POST,
            "/drinks",
            Some(&token),
            Some(json!({
                "title": "matcha latte",
                "recipe": { "name": "matcha", "color": "green", "parts": 3 },
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "drinks": [{
                "id": 2,
                "title": "matcha latte",
                "recipe": [{ "name": "matcha", "color": "green", "parts": 3 }],
            }],
        })
    );

    let (_, menu) = send(&cafe.app, request(Method::GET, "/drinks", None, None)).await;
    assert_eq!(menu["drinks"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn adding_a_drink_requires_a_title() {
    let cafe = cafe();
    let token = cafe.token(claims(&["post:drinks"]));

    let (status, body) = send(
        &cafe.app,
        request(
            Method::POST,
            "/drinks",
            Some(&token),
            Some(json!({
                "recipe": [{ "name": "espresso", "color": "brown", "parts": 1 }],
            })),
        ),
    )
    .await;

    assert_envelope(status, &body, StatusCode::BAD_REQUEST, "title is required");
}

#[tokio::test]
async fn adding_a_drink_requires_a_recipe() {
    let cafe = cafe();
    let token = cafe.token(claims(&["post:drinks"]));

    let (status, body) = send(
        &cafe.app,
        request(
            Method::POST,
            "/drinks",
            Some(&token),
            Some(json!({ "title": "espresso" })),
        ),
    )
    .await;

    assert_envelope(status, &body, StatusCode::BAD_REQUEST, "recipe is required");
}

#[tokio::test]
async fn duplicate_titles_are_rejected() {
    let cafe = cafe();
    let token = cafe.token(claims(&["post:drinks"]));

    let (status, body) = send(
        &cafe.app,
        request(
            Method::POST,
            "/drinks",
            Some(&token),
            Some(json!({
                "title": "water",
                "recipe": [{ "name": "water", "color": "blue", "parts": 1 }],
            })),
        ),
    )
    .await;

    assert_envelope(
        status,
        &body,
        StatusCode::BAD_REQUEST,
        "title must be unique",
    );
}

#[tokio::test]
async fn unreadable_bodies_are_rejected() {
    let cafe = cafe();
    let token = cafe.token(claims(&["post:drinks"]));

    let req = Request::builder()
        .method(Method::POST)
        .uri("/drinks")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("this is not json"))
        .unwrap();

    let (status, body) = send(&cafe.app, req).await;
    assert_envelope(status, &body, StatusCode::BAD_REQUEST, "bad request");
}

#[tokio::test]
async fn baristas_cannot_exceed_their_permissions() {
    let cafe = cafe();
    let token = cafe.token(claims(&["get:drinks-detail"]));

    let (status, body) = send(
        &cafe.app,
        request(
            Method::POST,
            "/drinks",
            Some(&token),
            Some(json!({
                "title": "espresso",
                "recipe": [{ "name": "espresso", "color": "brown", "parts": 1 }],
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Permission not found");
}

#[tokio::test]
async fn editors_can_retitle_drinks() {
    let cafe = cafe();
    let token = cafe.token(claims(&["patch:drinks"]));

    let (status, body) = send(
        &cafe.app,
        request(
            Method::PATCH,
            "/drinks/1",
            Some(&token),
            Some(json!({ "title": "sparkling water" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["drinks"][0]["title"], "sparkling water");
    // An omitted recipe leaves the existing one in place
    assert_eq!(body["drinks"][0]["recipe"][0]["name"], "water");
}

#[tokio::test]
async fn editing_with_an_empty_recipe_keeps_the_old_one() {
    let cafe = cafe();
    let token = cafe.token(claims(&["patch:drinks"]));

    let (status, body) = send(
        &cafe.app,
        request(
            Method::PATCH,
            "/drinks/1",
            Some(&token),
            Some(json!({ "title": "still water", "recipe": [] })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["drinks"][0]["title"], "still water");
    assert_eq!(body["drinks"][0]["recipe"][0]["name"], "water");
}

#[tokio::test]
async fn editing_a_missing_drink_is_a_404() {
    let cafe = cafe();
    let token = cafe.token(claims(&["patch:drinks"]));

    let (status, body) = send(
        &cafe.app,
        request(
            Method::PATCH,
            "/drinks/99",
            Some(&token),
            Some(json!({ "title": "phantom" })),
        ),
    )
    .await;

    assert_envelope(status, &body, StatusCode::NOT_FOUND, "drink not found");
}

#[tokio::test]
async fn editing_requires_a_title() {
    let cafe = cafe();
    let token = cafe.token(claims(&["patch:drinks"]));

    let (status, body) = send(
        &cafe.app,
        request(
            Method::PATCH,
            "/drinks/1",
            Some(&token),
            Some(json!({
                "recipe": [{ "name": "seltzer", "color": "blue", "parts": 1 }],
            })),
        ),
    )
    .await;

    assert_envelope(status, &body, StatusCode::BAD_REQUEST, "title is required");
}

#[tokio::test]
async fn a_non_numeric_id_names_no_drink() {
    let cafe = cafe();
    let token = cafe.token(claims(&["patch:drinks"]));

    let (status, body) = send(
        &cafe.app,
        request(
            Method::PATCH,
            "/drinks/latte",
            Some(&token),
            Some(json!({ "title": "latte" })),
        ),
    )
    .await;

    assert_envelope(status, &body, StatusCode::NOT_FOUND, "drink not found");
}

#[tokio::test]
async fn managers_can_remove_drinks() {
    let cafe = cafe();
    let token = cafe.token(claims(&["delete:drinks"]));

    let (status, body) = send(
        &cafe.app,
        request(Method::DELETE, "/drinks/1", Some(&token), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "delete": 1 }));

    let (_, menu) = send(&cafe.app, request(Method::GET, "/drinks", None, None)).await;
    assert_eq!(menu["drinks"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn removing_a_missing_drink_is_a_404() {
    let cafe = cafe();
    let token = cafe.token(claims(&["delete:drinks"]));

    let (status, body) = send(
        &cafe.app,
        request(Method::DELETE, "/drinks/42", Some(&token), None),
    )
    .await;

    assert_envelope(status, &body, StatusCode::NOT_FOUND, "drink not found");
}
