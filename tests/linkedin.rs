//! LinkedIn OAuth and publishing against a mock LinkedIn.

use postgen::content::placeholder_image;
use postgen::linkedin::LinkedInEndpoints;
use postgen::models::ImageFormat;
use postgen::{
    AccessToken, CallbackParams, LinkedInClient, LinkedInConfig, OAuthSession, PostGenError,
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AUTHOR: &str = "urn:li:person:abc";

fn client(server: &MockServer) -> LinkedInClient {
    LinkedInClient::new(
        &LinkedInConfig::new()
            .with_credentials("client-123", "shh")
            .with_redirect_uri("http://localhost:8080/auth/linkedin/callback"),
    )
    .unwrap()
    .with_endpoints(LinkedInEndpoints::with_base(&server.uri()))
}

async fn mount_token(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth/v2/accessToken"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=the-code"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "tok-1", "expires_in": 5184000 })),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_register(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v2/assets"))
        .and(query_param("action", "registerUpload"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": {
                "uploadMechanism": {
                    "com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest": {
                        "uploadUrl": format!("{}/upload/img-1", server.uri())
                    }
                },
                "asset": "urn:li:digitalmediaAsset:img-1"
            }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_mismatched_state_never_reaches_token_endpoint() {
    let server = MockServer::start().await;
    mount_token(&server, 0).await;

    let mut session = OAuthSession::with_state("abc123");
    let err = session
        .complete_authorization(&client(&server), &CallbackParams::new("the-code", "wrong"))
        .await
        .unwrap_err();

    assert!(matches!(err, PostGenError::StateMismatch));
    assert!(!session.is_connected());
}

#[tokio::test]
async fn test_matching_state_exchanges_code() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    let client = client(&server);
    let mut session = OAuthSession::new();
    let url = session.authorization_url(&client).unwrap();
    let state = session.state().unwrap().to_string();
    assert!(url.contains(&format!("state={}", state)));

    session
        .complete_authorization(&client, &CallbackParams::new("the-code", state))
        .await
        .unwrap();

    assert!(session.is_connected());
    assert_eq!(session.token().unwrap().secret(), "tok-1");
}

#[tokio::test]
async fn test_denied_consent_is_reported() {
    let server = MockServer::start().await;
    mount_token(&server, 0).await;

    let mut session = OAuthSession::with_state("abc123");
    let callback = CallbackParams::from_redirect_url(
        "http://localhost:8080/auth/linkedin/callback?error=user_cancelled_login&state=abc123",
    )
    .unwrap();
    let err = session
        .complete_authorization(&client(&server), &callback)
        .await
        .unwrap_err();
    assert!(matches!(err, PostGenError::OAuthError(_)));
}

#[tokio::test]
async fn test_member_urn_from_userinfo() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/userinfo"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "abc",
            "name": "Ada Lovelace"
        })))
        .mount(&server)
        .await;

    let urn = client(&server)
        .member_urn(&AccessToken::new("tok-1"))
        .await
        .unwrap();
    assert_eq!(urn, AUTHOR);
}

#[tokio::test]
async fn test_image_post_registers_uploads_then_posts() {
    let server = MockServer::start().await;
    mount_register(&server).await;

    Mock::given(method("PUT"))
        .and(path("/upload/img-1"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2/ugcPosts"))
        .and(header("X-Restli-Protocol-Version", "2.0.0"))
        .and(body_string_contains("urn:li:digitalmediaAsset:img-1"))
        .respond_with(
            ResponseTemplate::new(201).insert_header("x-restli-id", "urn:li:share:42"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let image = placeholder_image(ImageFormat::Png).unwrap();
    let post = client(&server)
        .publish(&AccessToken::new("tok-1"), AUTHOR, "Hello #AI", Some(&image))
        .await
        .unwrap();

    assert_eq!(post.id, "urn:li:share:42");
    assert!(post.with_image);

    let order: Vec<(String, String)> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| (r.method.to_string(), r.url.path().to_string()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("POST".to_string(), "/v2/assets".to_string()),
            ("PUT".to_string(), "/upload/img-1".to_string()),
            ("POST".to_string(), "/v2/ugcPosts".to_string()),
        ]
    );

    let put = &server.received_requests().await.unwrap()[1];
    assert_eq!(put.body, image.bytes);
}

#[tokio::test]
async fn test_failed_registration_aborts_publish() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/assets"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/ugcPosts"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let image = placeholder_image(ImageFormat::Png).unwrap();
    let err = client(&server)
        .publish(&AccessToken::new("tok-1"), AUTHOR, "Hello #AI", Some(&image))
        .await
        .unwrap_err();

    match err {
        PostGenError::HttpStatus { status, .. } => assert_eq!(status, 500),
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_upload_aborts_publish() {
    let server = MockServer::start().await;
    mount_register(&server).await;

    Mock::given(method("PUT"))
        .and(path("/upload/img-1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("storage down"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/ugcPosts"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let image = placeholder_image(ImageFormat::Png).unwrap();
    let err = client(&server)
        .publish(&AccessToken::new("tok-1"), AUTHOR, "Hello #AI", Some(&image))
        .await
        .unwrap_err();

    match err {
        PostGenError::HttpStatus {
            context, status, ..
        } => {
            assert_eq!(status, 500);
            assert_eq!(context, "LinkedIn image upload");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_post_is_error() {
    let server = MockServer::start().await;
    mount_register(&server).await;

    Mock::given(method("PUT"))
        .and(path("/upload/img-1"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/ugcPosts"))
        .respond_with(
            ResponseTemplate::new(422).set_body_string("{\"message\":\"duplicate post\"}"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let image = placeholder_image(ImageFormat::Png).unwrap();
    let err = client(&server)
        .publish(&AccessToken::new("tok-1"), AUTHOR, "Hello #AI", Some(&image))
        .await
        .unwrap_err();

    match err {
        PostGenError::HttpStatus {
            context,
            status,
            body,
        } => {
            assert_eq!(status, 422);
            assert_eq!(context, "LinkedIn create post");
            assert!(body.contains("duplicate post"));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_text_only_post_skips_upload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/assets"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/ugcPosts"))
        .and(body_string_contains("\"shareMediaCategory\":\"NONE\""))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "urn:li:share:7" })))
        .expect(1)
        .mount(&server)
        .await;

    let post = client(&server)
        .publish(&AccessToken::new("tok-1"), AUTHOR, "Hello #AI", None)
        .await
        .unwrap();
    assert_eq!(post.id, "urn:li:share:7");
    assert!(!post.with_image);
}
