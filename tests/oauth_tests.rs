//! OAuth linking against mocked GitHub, Mendeley and Zotero endpoints.

mod test_utils;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use osf_web::config::ProviderCredentials;
use osf_web::repositories::ExternalAccountRepository;
use test_utils::{TestApp, body_json, location, test_config};

async fn app_with_github(server: &MockServer) -> TestApp {
    let mut config = test_config();
    config.github = ProviderCredentials {
        client_id: Some("gh-client".into()),
        client_secret: Some("gh-secret".into()),
        oauth_base: Some(server.uri()),
        api_base: Some(server.uri()),
    };
    TestApp::new(config).await.unwrap()
}

async fn mock_github(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .and(body_string_contains("code=the-code"))
        .and(body_string_contains("client_secret=gh-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "gho_access",
            "token_type": "bearer",
            "scope": "repo,user"
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("authorization", "Bearer gho_access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 583231,
            "login": "octocat",
            "html_url": "https://github.com/octocat"
        })))
        .mount(server)
        .await;
}

/// Start a dance and return the `state` sent to the provider.
async fn start_flow(app: &TestApp, token: &str, server: &MockServer) -> String {
    let response = app
        .request("GET", "/oauth/connect/github", Some(token), None)
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let url = Url::parse(&location(&response)).unwrap();
    assert!(url.as_str().starts_with(&format!("{}/login/oauth/authorize", server.uri())));

    let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
    assert_eq!(params["client_id"], "gh-client");
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["scope"], "repo");
    assert_eq!(
        params["redirect_uri"],
        "http://localhost:5000/oauth/callback/github/"
    );
    params["state"].clone()
}

#[tokio::test]
async fn full_flow_links_account_and_hides_credentials() {
    let server = MockServer::start().await;
    mock_github(&server).await;
    let app = app_with_github(&server).await;
    let (_, token) = app.create_user("linker").await.unwrap();

    let state = start_flow(&app, &token, &server).await;
    let response = app
        .request(
            "GET",
            &format!("/oauth/callback/github/?code=the-code&state={state}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["provider"], "github");
    assert_eq!(body["provider_name"], "GitHub");
    assert_eq!(body["provider_id"], "583231");
    assert_eq!(body["display_name"], "octocat");
    assert_eq!(body["scopes"], json!(["repo", "user"]));
    assert!(body.get("oauth_key").is_none());

    let response = app
        .request("GET", "/v2/users/me/external_accounts", Some(&token), None)
        .await;
    let listed = body_json(response).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    assert_eq!(listed["data"][0]["id"], body["id"]);

    let accounts = ExternalAccountRepository::new(app.db(), app.state.crypto_key.clone());
    let stored = accounts
        .find_by_provider_id("github", "583231")
        .await
        .unwrap()
        .unwrap();
    assert_ne!(stored.oauth_key.as_deref(), Some(b"gho_access".as_slice()));
    let opened = accounts.open_credentials(&stored).unwrap();
    assert_eq!(opened.oauth_key.as_deref(), Some("gho_access"));
}

#[tokio::test]
async fn callback_state_is_consumed() {
    let server = MockServer::start().await;
    mock_github(&server).await;
    let app = app_with_github(&server).await;
    let (_, token) = app.create_user("linker").await.unwrap();

    let state = start_flow(&app, &token, &server).await;
    let uri = format!("/oauth/callback/github?code=the-code&state={state}");

    let first = app.request("GET", &uri, Some(&token), None).await;
    assert_eq!(first.status(), StatusCode::OK);

    let replay = app.request("GET", &uri, Some(&token), None).await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(replay).await["message"], "OAuth flow not recognized.");
}

#[tokio::test]
async fn mismatched_state_is_unauthorized() {
    let server = MockServer::start().await;
    mock_github(&server).await;
    let app = app_with_github(&server).await;
    let (_, token) = app.create_user("linker").await.unwrap();

    start_flow(&app, &token, &server).await;
    let response = app
        .request(
            "GET",
            "/oauth/callback/github?code=the-code&state=forged",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["message"],
        "Request token does not match"
    );
}

#[tokio::test]
async fn callback_without_code_is_bad_request() {
    let server = MockServer::start().await;
    let app = app_with_github(&server).await;
    let (_, token) = app.create_user("linker").await.unwrap();

    let state = start_flow(&app, &token, &server).await;
    let response = app
        .request(
            "GET",
            &format!("/oauth/callback/github?state={state}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failed_token_exchange_is_service_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    let app = app_with_github(&server).await;
    let (_, token) = app.create_user("linker").await.unwrap();

    let state = start_flow(&app, &token, &server).await;
    let response = app
        .request(
            "GET",
            &format!("/oauth/callback/github?code=the-code&state={state}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn unconfigured_provider_is_not_found() {
    let app = TestApp::new(test_config()).await.unwrap();
    let (_, token) = app.create_user("linker").await.unwrap();

    for provider in ["github", "dropbox"] {
        let response = app
            .request("GET", &format!("/oauth/connect/{provider}"), Some(&token), None)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn connecting_requires_login() {
    let server = MockServer::start().await;
    let app = app_with_github(&server).await;

    let response = app.request("GET", "/oauth/connect/github", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unlinking_only_touches_own_accounts() {
    let server = MockServer::start().await;
    mock_github(&server).await;
    let app = app_with_github(&server).await;
    let (_, token) = app.create_user("linker").await.unwrap();
    let (_, other_token) = app.create_user("other").await.unwrap();

    let state = start_flow(&app, &token, &server).await;
    let response = app
        .request(
            "GET",
            &format!("/oauth/callback/github?code=the-code&state={state}"),
            Some(&token),
            None,
        )
        .await;
    let account_id = body_json(response).await["id"].as_str().unwrap().to_string();
    let uri = format!("/v2/users/me/external_accounts/{account_id}");

    let response = app.request("DELETE", &uri, Some(&other_token), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.request("DELETE", &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request("GET", "/v2/users/me/external_accounts", Some(&token), None)
        .await;
    assert!(body_json(response).await["data"].as_array().unwrap().is_empty());

    let response = app.request("DELETE", &uri, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mendeley_flow_keeps_refresh_token_and_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=mendeley-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "mdl_access",
            "refresh_token": "mdl_refresh",
            "expires_in": 3600,
            "token_type": "bearer"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/profiles/me"))
        .and(header("authorization", "Bearer mdl_access"))
        .and(header("accept", "application/vnd.mendeley-profiles.1+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "a1b2c3",
            "display_name": "Ada Reader",
            "link": "https://www.mendeley.com/profiles/ada-reader/"
        })))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.mendeley = ProviderCredentials {
        client_id: Some("mdl-client".into()),
        client_secret: Some("mdl-secret".into()),
        oauth_base: Some(server.uri()),
        api_base: Some(server.uri()),
    };
    let app = TestApp::new(config).await.unwrap();
    let (_, token) = app.create_user("reader").await.unwrap();

    let response = app
        .request("GET", "/oauth/connect/mendeley", Some(&token), None)
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    let url = Url::parse(&location(&response)).unwrap();
    assert_eq!(url.path(), "/oauth/authorize");
    let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
    assert_eq!(params["scope"], "all");

    let response = app
        .request(
            "GET",
            &format!("/oauth/callback/mendeley/?code=mendeley-code&state={}", params["state"]),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["provider"], "mendeley");
    assert_eq!(body["provider_name"], "Mendeley");
    assert_eq!(body["provider_id"], "a1b2c3");
    assert_eq!(body["display_name"], "Ada Reader");
    assert_eq!(
        body["profile_url"],
        "https://www.mendeley.com/profiles/ada-reader/"
    );
    assert!(body.get("refresh_token").is_none());

    let accounts = ExternalAccountRepository::new(app.db(), app.state.crypto_key.clone());
    let stored = accounts
        .find_by_provider_id("mendeley", "a1b2c3")
        .await
        .unwrap()
        .unwrap();
    let remaining = stored.expires_at.unwrap().with_timezone(&Utc) - Utc::now();
    assert!(remaining > Duration::minutes(55) && remaining <= Duration::hours(1));
    assert_ne!(stored.refresh_token.as_deref(), Some(b"mdl_refresh".as_slice()));

    let opened = accounts.open_credentials(&stored).unwrap();
    assert_eq!(opened.oauth_key.as_deref(), Some("mdl_access"));
    assert_eq!(opened.refresh_token.as_deref(), Some("mdl_refresh"));
}

#[tokio::test]
async fn oauth1_flow_signs_requests_and_links_account() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/request"))
        .and(header_regex("authorization", r#"^OAuth .*oauth_callback="#))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("oauth_token=req-token&oauth_token_secret=req-secret"),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/access"))
        .and(header_regex("authorization", r#"oauth_verifier="the-verifier""#))
        .and(header_regex("authorization", r#"oauth_token="req-token""#))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "oauth_token=acc-token&oauth_token_secret=acc-secret&userID=475425&username=jdoe",
        ))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.zotero = ProviderCredentials {
        client_id: Some("zotero-key".into()),
        client_secret: Some("zotero-secret".into()),
        oauth_base: Some(server.uri()),
        api_base: None,
    };
    let app = TestApp::new(config).await.unwrap();
    let (_, token) = app.create_user("reader").await.unwrap();

    let response = app
        .request("GET", "/oauth/connect/zotero", Some(&token), None)
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        format!("{}/oauth/authorize?oauth_token=req-token", server.uri())
    );

    let response = app
        .request(
            "GET",
            "/oauth/callback/zotero/?oauth_token=other-token&oauth_verifier=the-verifier",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    app.request("GET", "/oauth/connect/zotero", Some(&token), None)
        .await;
    let response = app
        .request(
            "GET",
            "/oauth/callback/zotero/?oauth_token=req-token&oauth_verifier=the-verifier",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["provider"], "zotero");
    assert_eq!(body["provider_id"], "475425");
    assert_eq!(body["display_name"], "jdoe");

    let accounts = ExternalAccountRepository::new(app.db(), app.state.crypto_key.clone());
    let stored = accounts
        .find_by_provider_id("zotero", "475425")
        .await
        .unwrap()
        .unwrap();
    let opened = accounts.open_credentials(&stored).unwrap();
    assert_eq!(opened.oauth_key.as_deref(), Some("acc-token"));
    assert_eq!(opened.oauth_secret.as_deref(), Some("acc-secret"));
}
