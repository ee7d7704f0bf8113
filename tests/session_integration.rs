use actix_web::cookie::Cookie;
use reqwest::header::{COOKIE, SET_COOKIE};
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;
use vidshare_auth::configuration::{JwtSettings, PasswordSettings};
use vidshare_auth::middleware::REQUEST_ID_HEADER;
use vidshare_auth::startup::run;
use vidshare_auth::store::InMemoryUserStore;

const ALICE_PASSWORD: &str = "Wonderland123";

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryUserStore>,
    pub client: reqwest::Client,
}

fn jwt_settings() -> JwtSettings {
    JwtSettings {
        access_token_secret: "integration-access-secret-at-least-32".to_string(),
        access_token_expiry: 900,
        refresh_token_secret: "integration-refresh-secret-at-least-32".to_string(),
        refresh_token_expiry: 864000,
        issuer: "test".to_string(),
    }
}

fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let store = Arc::new(InMemoryUserStore::new());
    let server = run(
        listener,
        store.clone(),
        jwt_settings(),
        PasswordSettings { hash_cost: 4 },
    )
    .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/users{}", self.address, path)
    }

    async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn register_alice(&self) {
        let response = self
            .post_json(
                "/register",
                &json!({
                    "fullName": "Alice Liddell",
                    "email": "alice@example.com",
                    "username": "alice",
                    "password": ALICE_PASSWORD,
                    "avatar": "https://media.example.com/alice.png"
                }),
            )
            .await;
        assert_eq!(201, response.status().as_u16());
    }

    /// Log alice in and return (access token, refresh token)
    async fn login_alice(&self) -> (String, String) {
        let response = self
            .post_json("/login", &json!({"username": "alice", "password": ALICE_PASSWORD}))
            .await;
        assert_eq!(200, response.status().as_u16());

        let body: Value = response.json().await.expect("Failed to parse response");
        (
            body["data"]["accessToken"].as_str().unwrap().to_string(),
            body["data"]["refreshToken"].as_str().unwrap().to_string(),
        )
    }

    fn stored_refresh_token(&self) -> Option<String> {
        self.store
            .get_by_username("alice")
            .expect("alice is not registered")
            .refresh_token
    }
}

fn set_cookies(response: &reqwest::Response) -> Vec<Cookie<'static>> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| Cookie::parse(v.to_string()).ok())
        .collect()
}

fn flip_signature(token: &str) -> String {
    let (head, signature) = token.rsplit_once('.').unwrap();
    let mut chars: Vec<char> = signature.chars().collect();
    chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
    format!("{}.{}", head, chars.into_iter().collect::<String>())
}

// --- Registration Tests ---

#[tokio::test]
async fn register_returns_201_without_secrets() {
    let app = spawn_app();

    let response = app
        .post_json(
            "/register",
            &json!({
                "fullName": "Alice Liddell",
                "email": "alice@example.com",
                "username": "alice",
                "password": ALICE_PASSWORD,
                "avatar": "https://media.example.com/alice.png",
                "coverImage": "https://media.example.com/alice-cover.png"
            }),
        )
        .await;

    assert_eq!(201, response.status().as_u16());
    assert!(set_cookies(&response).is_empty(), "registration must not start a session");

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["coverImage"], "https://media.example.com/alice-cover.png");
    assert!(body["data"].get("passwordHash").is_none());
    assert!(body["data"].get("refreshToken").is_none());

    let stored = app.store.get_by_username("alice").unwrap();
    assert_ne!(stored.password_hash, ALICE_PASSWORD);
    assert!(stored.refresh_token.is_none());
}

#[tokio::test]
async fn register_returns_409_for_duplicate_username_or_email() {
    let app = spawn_app();
    app.register_alice().await;

    let cases = vec![
        (json!({"username": "alice", "email": "other@example.com"}), "same username"),
        (json!({"username": "alice2", "email": "alice@example.com"}), "same email"),
    ];

    for (identity, reason) in cases {
        let mut body = json!({
            "fullName": "Alice Again",
            "password": ALICE_PASSWORD,
            "avatar": "https://media.example.com/alice.png"
        });
        body["username"] = identity["username"].clone();
        body["email"] = identity["email"].clone();

        let response = app.post_json("/register", &body).await;
        assert_eq!(409, response.status().as_u16(), "Should reject: {}", reason);
    }
}

#[tokio::test]
async fn register_returns_400_for_missing_or_invalid_fields() {
    let app = spawn_app();

    let valid = json!({
        "fullName": "Alice Liddell",
        "email": "alice@example.com",
        "username": "alice",
        "password": ALICE_PASSWORD,
        "avatar": "https://media.example.com/alice.png"
    });

    let cases = vec![
        ("fullName", json!("   "), "blank full name"),
        ("email", Value::Null, "missing email"),
        ("email", json!("not-an-email"), "invalid email"),
        ("username", json!(""), "empty username"),
        ("password", json!("weak"), "weak password"),
        ("avatar", Value::Null, "missing avatar"),
    ];

    for (field, value, reason) in cases {
        let mut body = valid.clone();
        body[field] = value;

        let response = app.post_json("/register", &body).await;
        assert_eq!(400, response.status().as_u16(), "Should reject: {}", reason);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], false);
    }
}

// --- Login Tests ---

#[tokio::test]
async fn login_returns_200_with_user_tokens_and_cookies() {
    let app = spawn_app();
    app.register_alice().await;

    let response = app
        .post_json("/login", &json!({"username": "alice", "password": ALICE_PASSWORD}))
        .await;

    assert_eq!(200, response.status().as_u16());

    let cookies = set_cookies(&response);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["user"]["username"], "alice");
    assert!(body["data"]["user"].get("refreshToken").is_none());

    let access_token = body["data"]["accessToken"].as_str().unwrap();
    let refresh_token = body["data"]["refreshToken"].as_str().unwrap();

    assert_eq!(app.stored_refresh_token().as_deref(), Some(refresh_token));

    let access_cookie = cookies.iter().find(|c| c.name() == "accessToken").unwrap();
    let refresh_cookie = cookies.iter().find(|c| c.name() == "refreshToken").unwrap();
    assert_eq!(access_cookie.value(), access_token);
    assert_eq!(refresh_cookie.value(), refresh_token);
    for cookie in [access_cookie, refresh_cookie] {
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
    }
}

#[tokio::test]
async fn login_accepts_email() {
    let app = spawn_app();
    app.register_alice().await;

    let response = app
        .post_json(
            "/login",
            &json!({"email": "alice@example.com", "password": ALICE_PASSWORD}),
        )
        .await;

    assert_eq!(200, response.status().as_u16());
}

// Unknown user and wrong password are reported differently on login, while
// refresh never reveals whether the user exists.
#[tokio::test]
async fn login_distinguishes_unknown_user_from_wrong_password() {
    let app = spawn_app();
    app.register_alice().await;

    let unknown = app
        .post_json("/login", &json!({"username": "bob", "password": ALICE_PASSWORD}))
        .await;
    assert_eq!(404, unknown.status().as_u16());
    let body: Value = unknown.json().await.unwrap();
    assert_eq!(body["message"], "User does not exist");

    let wrong = app
        .post_json("/login", &json!({"username": "alice", "password": "NotHerPassword1"}))
        .await;
    assert_eq!(401, wrong.status().as_u16());
    assert!(set_cookies(&wrong).is_empty());
    let body: Value = wrong.json().await.unwrap();
    assert_eq!(body["message"], "Invalid user credentials");
}

#[tokio::test]
async fn login_returns_400_for_missing_fields() {
    let app = spawn_app();
    app.register_alice().await;

    let test_cases = vec![
        (json!({"password": ALICE_PASSWORD}), "username or email is required"),
        (json!({"username": "", "password": ALICE_PASSWORD}), "username or email is required"),
        (json!({"username": "alice"}), "password is required"),
    ];

    for (body, message) in test_cases {
        let response = app.post_json("/login", &body).await;

        assert_eq!(400, response.status().as_u16(), "Should reject: {}", message);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["message"], message);
    }
}

#[tokio::test]
async fn login_with_failing_store_returns_500_without_tokens() {
    let app = spawn_app();
    app.register_alice().await;
    app.store.set_fail_writes(true);

    let response = app
        .post_json("/login", &json!({"username": "alice", "password": ALICE_PASSWORD}))
        .await;

    assert_eq!(500, response.status().as_u16());
    assert!(set_cookies(&response).is_empty());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "Something went wrong while generating refresh and access token"
    );
    assert!(body["data"].is_null());
    assert!(app.stored_refresh_token().is_none());
}

// --- Token Refresh Tests ---

#[tokio::test]
async fn refresh_with_just_issued_token_rotates_session() {
    let app = spawn_app();
    app.register_alice().await;
    let (old_access, old_refresh) = app.login_alice().await;

    let response = app
        .post_json("/refresh-token", &json!({"refreshToken": old_refresh}))
        .await;

    assert_eq!(200, response.status().as_u16());
    let cookies = set_cookies(&response);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Access token refreshed");

    let new_access = body["data"]["accessToken"].as_str().unwrap();
    let new_refresh = body["data"]["refreshToken"].as_str().unwrap();
    assert_ne!(old_access, new_access);
    assert_ne!(old_refresh, new_refresh);
    assert_eq!(app.stored_refresh_token().as_deref(), Some(new_refresh));

    let refresh_cookie = cookies.iter().find(|c| c.name() == "refreshToken").unwrap();
    assert_eq!(refresh_cookie.value(), new_refresh);
}

#[tokio::test]
async fn refresh_accepts_cookie_and_header() {
    let app = spawn_app();
    app.register_alice().await;
    let (_, refresh) = app.login_alice().await;

    let via_cookie = app
        .client
        .post(&app.url("/refresh-token"))
        .header(COOKIE, format!("refreshToken={}", refresh))
        .send()
        .await
        .unwrap();
    assert_eq!(200, via_cookie.status().as_u16());
    let body: Value = via_cookie.json().await.unwrap();
    let rotated = body["data"]["refreshToken"].as_str().unwrap().to_string();

    let via_header = app
        .client
        .post(&app.url("/refresh-token"))
        .header("X-Refresh-Token", rotated)
        .send()
        .await
        .unwrap();
    assert_eq!(200, via_header.status().as_u16());
}

#[tokio::test]
async fn refresh_without_credential_returns_401() {
    let app = spawn_app();

    let without_body = app.client.post(&app.url("/refresh-token")).send().await.unwrap();
    assert_eq!(401, without_body.status().as_u16());
    let body: Value = without_body.json().await.unwrap();
    assert_eq!(body["message"], "Unauthorized request");

    let empty_body = app.post_json("/refresh-token", &json!({})).await;
    assert_eq!(401, empty_body.status().as_u16());
    let body: Value = empty_body.json().await.unwrap();
    assert_eq!(body["message"], "Unauthorized request");
}

#[tokio::test]
async fn refresh_with_rotated_token_returns_401() {
    let app = spawn_app();
    app.register_alice().await;
    let (_, first) = app.login_alice().await;

    let rotated = app.post_json("/refresh-token", &json!({"refreshToken": first})).await;
    assert_eq!(200, rotated.status().as_u16());
    let stored_after_rotation = app.stored_refresh_token();

    let replay = app.post_json("/refresh-token", &json!({"refreshToken": first})).await;
    assert_eq!(401, replay.status().as_u16());
    assert!(set_cookies(&replay).is_empty());

    let text = replay.text().await.unwrap();
    assert!(!text.contains(&first), "error body must not echo the token");
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["message"], "Refresh token is expired or used");

    // a rejected replay leaves the live session alone
    assert_eq!(app.stored_refresh_token(), stored_after_rotation);
}

#[tokio::test]
async fn refresh_with_tampered_token_returns_401_invalid() {
    let app = spawn_app();
    app.register_alice().await;
    let (_, refresh) = app.login_alice().await;

    let response = app
        .post_json("/refresh-token", &json!({"refreshToken": flip_signature(&refresh)}))
        .await;

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Invalid refresh token");
    assert_eq!(app.stored_refresh_token(), Some(refresh));
}

#[tokio::test]
async fn refresh_rejects_access_token() {
    let app = spawn_app();
    app.register_alice().await;
    let (access, _) = app.login_alice().await;

    let response = app.post_json("/refresh-token", &json!({"refreshToken": access})).await;

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Invalid refresh token");
}

// --- Logout Tests ---

#[tokio::test]
async fn logout_clears_session_and_cookies() {
    let app = spawn_app();
    app.register_alice().await;
    let (access, refresh) = app.login_alice().await;

    let response = app
        .client
        .post(&app.url("/logout"))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();

    assert_eq!(200, response.status().as_u16());
    assert!(app.stored_refresh_token().is_none());

    let cookies = set_cookies(&response);
    for name in ["accessToken", "refreshToken"] {
        let cookie = cookies.iter().find(|c| c.name() == name).unwrap();
        assert!(cookie.value().is_empty());
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
    }

    let replay = app.post_json("/refresh-token", &json!({"refreshToken": refresh})).await;
    assert_eq!(401, replay.status().as_u16());
}

#[tokio::test]
async fn logout_twice_is_harmless() {
    let app = spawn_app();
    app.register_alice().await;
    let (access, _) = app.login_alice().await;

    for _ in 0..2 {
        let response = app
            .client
            .post(&app.url("/logout"))
            .header(COOKIE, format!("accessToken={}", access))
            .send()
            .await
            .unwrap();
        assert_eq!(200, response.status().as_u16());
        assert!(app.stored_refresh_token().is_none());
    }
}

// --- Protected Route Tests ---

#[tokio::test]
async fn protected_routes_require_access_token() {
    let app = spawn_app();

    let cases = vec![
        (reqwest::Method::POST, "/logout"),
        (reqwest::Method::POST, "/change-password"),
        (reqwest::Method::GET, "/current-user"),
        (reqwest::Method::PATCH, "/update-account"),
        (reqwest::Method::PATCH, "/avatar"),
        (reqwest::Method::PATCH, "/cover-image"),
    ];

    for (method, path) in cases {
        let response = app
            .client
            .request(method, &app.url(path))
            .send()
            .await
            .unwrap();

        assert_eq!(401, response.status().as_u16(), "{} should require auth", path);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["message"], "Unauthorized request");
    }
}

#[tokio::test]
async fn error_responses_carry_request_id() {
    let app = spawn_app();

    let guard_rejection = app
        .client
        .get(&app.url("/current-user"))
        .send()
        .await
        .unwrap();
    let handler_rejection = app
        .post_json("/login", &json!({"username": "nobody", "password": ALICE_PASSWORD}))
        .await;

    assert_eq!(401, guard_rejection.status().as_u16());
    assert_eq!(404, handler_rejection.status().as_u16());

    let ids: Vec<String> = [&guard_rejection, &handler_rejection]
        .iter()
        .map(|r| {
            r.headers()
                .get(REQUEST_ID_HEADER)
                .expect("missing request id")
                .to_str()
                .unwrap()
                .to_string()
        })
        .collect();
    assert_ne!(ids[0], ids[1]);

    let body: Value = guard_rejection.json().await.unwrap();
    assert_eq!(body["message"], "Unauthorized request");
}

#[tokio::test]
async fn protected_route_rejects_invalid_token() {
    let app = spawn_app();
    app.register_alice().await;
    let (access, refresh) = app.login_alice().await;

    for token in [flip_signature(&access), refresh, "invalid.token.here".to_string()] {
        let response = app
            .client
            .get(&app.url("/current-user"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();

        assert_eq!(401, response.status().as_u16());
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["message"], "Invalid access token");
    }
}

#[tokio::test]
async fn current_user_returns_profile() {
    let app = spawn_app();
    app.register_alice().await;
    let (access, _) = app.login_alice().await;

    let response = app
        .client
        .get(&app.url("/current-user"))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["email"], "alice@example.com");
    assert!(body["data"].get("refreshToken").is_none());
}

#[tokio::test]
async fn change_password_keeps_session() {
    let app = spawn_app();
    app.register_alice().await;
    let (access, refresh) = app.login_alice().await;

    let wrong_old = app
        .client
        .post(&app.url("/change-password"))
        .bearer_auth(&access)
        .json(&json!({"oldPassword": "NotHerPassword1", "newPassword": "LookingGlass456"}))
        .send()
        .await
        .unwrap();
    assert_eq!(400, wrong_old.status().as_u16());
    let body: Value = wrong_old.json().await.unwrap();
    assert_eq!(body["message"], "Invalid old password");

    let changed = app
        .client
        .post(&app.url("/change-password"))
        .bearer_auth(&access)
        .json(&json!({"oldPassword": ALICE_PASSWORD, "newPassword": "LookingGlass456"}))
        .send()
        .await
        .unwrap();
    assert_eq!(200, changed.status().as_u16());
    assert_eq!(app.stored_refresh_token(), Some(refresh));

    let old_login = app
        .post_json("/login", &json!({"username": "alice", "password": ALICE_PASSWORD}))
        .await;
    assert_eq!(401, old_login.status().as_u16());

    let new_login = app
        .post_json("/login", &json!({"username": "alice", "password": "LookingGlass456"}))
        .await;
    assert_eq!(200, new_login.status().as_u16());
}

#[tokio::test]
async fn update_account_keeps_session() {
    let app = spawn_app();
    app.register_alice().await;
    let (access, refresh) = app.login_alice().await;

    let response = app
        .client
        .patch(&app.url("/update-account"))
        .bearer_auth(&access)
        .json(&json!({"fullName": "Alice Pleasance Liddell", "email": "alice@wonderland.example"}))
        .send()
        .await
        .unwrap();

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["fullName"], "Alice Pleasance Liddell");
    assert_eq!(body["data"]["email"], "alice@wonderland.example");
    assert_eq!(app.stored_refresh_token(), Some(refresh));

    let missing = app
        .client
        .patch(&app.url("/update-account"))
        .bearer_auth(&access)
        .json(&json!({"fullName": "Alice"}))
        .send()
        .await
        .unwrap();
    assert_eq!(400, missing.status().as_u16());
}

#[tokio::test]
async fn update_avatar_keeps_session() {
    let app = spawn_app();
    app.register_alice().await;
    let (access, refresh) = app.login_alice().await;

    let response = app
        .client
        .patch(&app.url("/avatar"))
        .bearer_auth(&access)
        .json(&json!({"avatar": "https://media.example.com/alice-new.png"}))
        .send()
        .await
        .unwrap();

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["avatar"], "https://media.example.com/alice-new.png");
    assert!(body["data"].get("refreshToken").is_none());
    assert_eq!(app.stored_refresh_token(), Some(refresh));

    let test_cases = vec![
        (json!({}), "missing avatar"),
        (json!({"avatar": "  "}), "blank avatar"),
        (json!({"avatar": "ftp://media.example.com/a.png"}), "non-http avatar"),
    ];
    for (body, reason) in test_cases {
        let response = app
            .client
            .patch(&app.url("/avatar"))
            .bearer_auth(&access)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(400, response.status().as_u16(), "Should reject: {}", reason);
    }
}

#[tokio::test]
async fn update_cover_image_keeps_session() {
    let app = spawn_app();
    app.register_alice().await;
    let (access, refresh) = app.login_alice().await;

    let response = app
        .client
        .patch(&app.url("/cover-image"))
        .header(COOKIE, format!("accessToken={}", access))
        .json(&json!({"coverImage": "https://media.example.com/alice-cover.png"}))
        .send()
        .await
        .unwrap();

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Cover image updated successfully");
    assert_eq!(body["data"]["coverImage"], "https://media.example.com/alice-cover.png");
    assert_eq!(app.stored_refresh_token(), Some(refresh));

    let missing = app
        .client
        .patch(&app.url("/cover-image"))
        .bearer_auth(&access)
        .json(&json!({"avatar": "https://media.example.com/alice-cover.png"}))
        .send()
        .await
        .unwrap();
    assert_eq!(400, missing.status().as_u16());
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["message"], "coverImage is required");
}
