//! Integration tests for the HTTP client against a mock API server.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wykop_monitor::{ClientError, Credentials, HttpClient, Listing, TagContent, WykopApi};

fn environment(server: &MockServer) -> Option<String> {
    Some(format!("{}/api/v3", server.uri()))
}

fn with_token(server: &MockServer, token: &str) -> Credentials {
    Credentials {
        token: Some(token.to_string()),
        environment: environment(server),
        ..Credentials::default()
    }
}

#[tokio::test]
async fn test_connect_requests_app_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/auth"))
        .and(body_json(json!({ "data": { "key": "app", "secret": "shh" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "token": "app-token" } })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/entries"))
        .and(header("authorization", "Bearer app-token"))
        .and(query_param("sort", "newest"))
        .and(query_param("category", "hot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": 2, "created_at": "2024-03-01 12:02:00" },
                { "id": 1, "created_at": "2024-03-01 12:01:00" }
            ],
            "pagination": { "next": "abc" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::connect(
        &Credentials {
            appkey: Some("app".to_string()),
            secret: Some("shh".to_string()),
            environment: environment(&server),
            ..Credentials::default()
        },
        true,
    )
    .await
    .unwrap();

    let result = client
        .entries(&Listing {
            category: Some("hot".to_string()),
            bucket: None,
        })
        .await
        .unwrap();

    assert_eq!(result.items.len(), 2);
    assert_eq!(result.items[0].get("id"), Some(&json!(2)));
    assert!(result.items[0].content_id() > result.items[1].content_id());
}

#[tokio::test]
async fn test_connect_without_credentials_fails() {
    let server = MockServer::start().await;

    let err = HttpClient::connect(
        &Credentials {
            environment: environment(&server),
            ..Credentials::default()
        },
        false,
    )
    .await
    .err()
    .unwrap();

    assert!(matches!(err, ClientError::Other(_)));
}

#[tokio::test]
async fn test_connect_rejects_invalid_environment() {
    let err = HttpClient::connect(
        &Credentials {
            token: Some("t".to_string()),
            environment: Some("not a url".to_string()),
            ..Credentials::default()
        },
        false,
    )
    .await
    .err()
    .unwrap();

    assert!(matches!(err, ClientError::Other(_)));
}

#[tokio::test]
async fn test_supplied_token_skips_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/auth"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/tags/rust/stream"))
        .and(header("authorization", "Bearer user-token"))
        .and(query_param("sort", "all"))
        .and(query_param("type", "entry"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::connect(&with_token(&server, "user-token"), false)
        .await
        .unwrap();
    let result = client
        .tag_stream("rust", Some(TagContent::Entry))
        .await
        .unwrap();

    assert!(result.items.is_empty());
}

#[tokio::test]
async fn test_conversation_returns_messages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/pm/conversations/bob"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "user": { "username": "bob" },
                "messages": [
                    { "created_at": "2024-03-01 12:01:00", "type": 1 },
                    { "created_at": "2024-03-01 12:02:00", "type": 0 }
                ]
            }
        })))
        .mount(&server)
        .await;

    let client = HttpClient::connect(&with_token(&server, "t"), false)
        .await
        .unwrap();
    let result = client.conversation("bob").await.unwrap();

    assert!(result.items.is_empty());
    assert_eq!(result.messages.len(), 2);
    assert!(result.messages[1].is_self_authored());
    assert_eq!(result.extra["user"]["username"], "bob");
}

#[tokio::test]
async fn test_entry_comments_come_back_newest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/entries/42/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": 1, "created_at": "2024-03-01 12:01:00" },
                { "id": 2, "created_at": "2024-03-01 12:02:00" }
            ]
        })))
        .mount(&server)
        .await;

    let client = HttpClient::connect(&with_token(&server, "t"), false)
        .await
        .unwrap();
    let result = client.entry_comments(42).await.unwrap();

    assert_eq!(result.items[0].get("id"), Some(&json!(2)));
}

#[tokio::test]
async fn test_api_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/notifications/entries"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({ "code": 429, "error": { "message": "Too many requests" } })),
        )
        .mount(&server)
        .await;

    let client = HttpClient::connect(&with_token(&server, "t"), false)
        .await
        .unwrap();
    let err = client.notifications().await.unwrap_err();

    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 429);
            assert_eq!(message, "Too many requests");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_expired_token_is_refreshed_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/links"))
        .and(header("authorization", "Bearer old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v3/refresh-token"))
        .and(body_json(json!({ "data": { "refresh_token": "r1" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "token": "new", "refresh_token": "r2" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/links"))
        .and(header("authorization", "Bearer new"))
        .and(query_param("type", "upcoming"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "title": "A link", "created_at": "2024-03-01 12:00:00" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::connect(
        &Credentials {
            refresh_token: Some("r1".to_string()),
            ..with_token(&server, "old")
        },
        false,
    )
    .await
    .unwrap();
    let result = client.links(&Listing::default()).await.unwrap();

    assert_eq!(result.items.len(), 1);
}

#[tokio::test]
async fn test_unauthorized_without_refresh_token_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/pm/conversations"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let client = HttpClient::connect(&with_token(&server, "t"), false)
        .await
        .unwrap();
    let err = client.conversations().await.unwrap_err();

    assert!(matches!(err, ClientError::Api { status: 401, .. }));
}

#[tokio::test]
async fn test_login_replaces_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/login"))
        .and(body_json(json!({ "data": { "username": "alice", "password": "pw" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "token": "user", "refresh_token": "r" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/profile/users/alice/entries/added"))
        .and(header("authorization", "Bearer user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::connect(&with_token(&server, "app"), false)
        .await
        .unwrap();
    client.login("alice", "pw").await.unwrap();
    client
        .profile("alice", wykop_monitor::ProfileFeed::EntriesAdded)
        .await
        .unwrap();
}
