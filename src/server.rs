//! HTTP surface for browser use: generate content, connect LinkedIn through
//! the OAuth redirect, then publish, share or download. Sessions are keyed by
//! a cookie and never leave process memory.

use crate::{
    error::{PostGenError, Result},
    linkedin::{CallbackParams, DemoConnection, DemoEvent},
    pipeline::{Delivery, Pipeline, PublishStrategy, Session, StageFailure, WorkflowState},
};
use actix_web::{
    cookie::Cookie, http::header, http::StatusCode, web, App, HttpRequest, HttpResponse,
    HttpServer, ResponseError,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "postgen_session";

type SharedSession = Arc<tokio::sync::Mutex<Session>>;

/// Sessions idle longer than this are dropped, token and image included.
pub const SESSION_TTL: Duration = Duration::from_secs(30 * 60);
pub const MAX_SESSIONS: usize = 1024;

struct StoredSession {
    session: SharedSession,
    last_seen: Instant,
}

pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, StoredSession>>,
    ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(SESSION_TTL, MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn with_limits(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Returns the session named by the request cookie, creating one if the
    /// cookie is missing or unknown. The flag is true for a new session.
    pub fn resolve(&self, req: &HttpRequest) -> (Uuid, SharedSession, bool) {
        let requested = req
            .cookie(SESSION_COOKIE)
            .and_then(|c| Uuid::parse_str(c.value()).ok());
        self.resolve_id(requested)
    }

    /// Like [`SessionStore::resolve`], keyed directly by session id. Idle
    /// sessions are swept first; at capacity the least recently seen one goes.
    pub fn resolve_id(&self, requested: Option<Uuid>) -> (Uuid, SharedSession, bool) {
        let mut sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|_, stored| now.duration_since(stored.last_seen) < self.ttl);
        if sessions.len() < before {
            log::debug!("Expired {} idle sessions", before - sessions.len());
        }

        if let Some(id) = requested {
            if let Some(stored) = sessions.get_mut(&id) {
                stored.last_seen = now;
                return (id, stored.session.clone(), false);
            }
        }

        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, stored)| stored.last_seen)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                    log::debug!("Evicted session {} at capacity", id);
                }
                None => break,
            }
        }

        let session = Session::new();
        let id = session.id();
        let shared = Arc::new(tokio::sync::Mutex::new(session));
        sessions.insert(
            id,
            StoredSession {
                session: shared.clone(),
                last_seen: now,
            },
        );
        log::debug!("Created session {}", id);
        (id, shared, true)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct AppState {
    pub pipeline: Pipeline,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            sessions: SessionStore::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub topic: String,
    pub tone: Option<String>,
}

#[derive(Debug, Serialize)]
struct ContentView {
    session_id: Uuid,
    state: WorkflowState,
    post: String,
    image_prompt: String,
    image_url: &'static str,
    image_format: String,
    failures: Vec<StageFailure>,
}

#[derive(Debug, Serialize)]
struct SessionView {
    session_id: Uuid,
    state: WorkflowState,
    has_content: bool,
    linkedin_connected: bool,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

impl ResponseError for PostGenError {
    fn status_code(&self) -> StatusCode {
        match self {
            PostGenError::ValidationError(_) | PostGenError::StateMismatch => {
                StatusCode::BAD_REQUEST
            }
            PostGenError::OAuthError(_) => StatusCode::UNAUTHORIZED,
            PostGenError::InvalidTransition { .. } => StatusCode::CONFLICT,
            PostGenError::HttpStatus { .. }
            | PostGenError::RequestError(_)
            | PostGenError::ResponseError(_)
            | PostGenError::AwsError(_)
            | PostGenError::AwsServiceError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
            kind: self.kind(),
        })
    }
}

fn with_session_cookie(mut response: HttpResponse, id: Uuid, created: bool) -> HttpResponse {
    if created {
        let cookie = Cookie::build(SESSION_COOKIE, id.to_string())
            .path("/")
            .http_only(true)
            .finish();
        if let Err(e) = response.add_cookie(&cookie) {
            log::warn!("Could not set session cookie: {}", e);
        }
    }
    response
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, location))
        .finish()
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

async fn session_status(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let (id, shared, created) = state.sessions.resolve(&req);
    let session = shared.lock().await;
    let view = SessionView {
        session_id: id,
        state: session.state(),
        has_content: session.content().is_some(),
        linkedin_connected: session.oauth.is_connected(),
    };
    with_session_cookie(HttpResponse::Ok().json(view), id, created)
}

async fn generate(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<GenerateRequest>,
) -> Result<HttpResponse> {
    let (id, shared, created) = state.sessions.resolve(&req);
    let mut session = shared.lock().await;

    let content = state
        .pipeline
        .generate(&mut session, &body.topic, body.tone.as_deref())
        .await?;

    let view = ContentView {
        session_id: id,
        state: WorkflowState::Generated,
        post: content.post_text().to_string(),
        image_prompt: content.image_prompt_text().to_string(),
        image_url: "/image",
        image_format: content.image().format.to_string(),
        failures: content.failures().into_iter().cloned().collect(),
    };
    Ok(with_session_cookie(HttpResponse::Ok().json(view), id, created))
}

async fn image(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let (id, shared, created) = state.sessions.resolve(&req);
    let session = shared.lock().await;
    let content = session.content().ok_or_else(|| PostGenError::InvalidTransition {
        from: session.state().to_string(),
        action: "show image".to_string(),
    })?;

    let image = content.image();
    let response = HttpResponse::Ok()
        .content_type(image.format.mime_type())
        .body(image.bytes.clone());
    Ok(with_session_cookie(response, id, created))
}

async fn download(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let (id, shared, created) = state.sessions.resolve(&req);
    let mut session = shared.lock().await;

    match state.pipeline.deliver(&mut session, PublishStrategy::Zip).await? {
        Delivery::Archive { file_name, bytes } => {
            let response = HttpResponse::Ok()
                .content_type("application/zip")
                .append_header((
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file_name),
                ))
                .body(bytes);
            Ok(with_session_cookie(response, id, created))
        }
        other => Err(PostGenError::ExportError(format!(
            "Unexpected delivery {:?}",
            other
        ))),
    }
}

async fn share(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let (id, shared, created) = state.sessions.resolve(&req);
    let mut session = shared.lock().await;

    match state
        .pipeline
        .deliver(&mut session, PublishStrategy::ShareLink)
        .await?
    {
        Delivery::ShareLink(url) => Ok(with_session_cookie(redirect(&url), id, created)),
        other => Err(PostGenError::ExportError(format!(
            "Unexpected delivery {:?}",
            other
        ))),
    }
}

async fn connect_linkedin(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let (id, shared, created) = state.sessions.resolve(&req);
    let mut session = shared.lock().await;
    let url = state.pipeline.authorization_url(&mut session)?;
    Ok(with_session_cookie(redirect(&url), id, created))
}

async fn linkedin_callback(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<CallbackParams>,
) -> Result<HttpResponse> {
    let (id, shared, created) = state.sessions.resolve(&req);
    let mut session = shared.lock().await;

    state
        .pipeline
        .complete_authorization(&mut session, &query)
        .await?;

    let body = serde_json::json!({ "linkedin_connected": true });
    Ok(with_session_cookie(HttpResponse::Ok().json(body), id, created))
}

async fn publish(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let (id, shared, created) = state.sessions.resolve(&req);
    let mut session = shared.lock().await;

    match state.pipeline.deliver(&mut session, PublishStrategy::Direct).await? {
        Delivery::Published(post) => {
            Ok(with_session_cookie(HttpResponse::Ok().json(post), id, created))
        }
        other => Err(PostGenError::ExportError(format!(
            "Unexpected delivery {:?}",
            other
        ))),
    }
}

async fn disconnect_linkedin(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let (id, shared, created) = state.sessions.resolve(&req);
    let mut session = shared.lock().await;
    session.oauth.disconnect();
    let body = serde_json::json!({ "linkedin_connected": false });
    with_session_cookie(HttpResponse::Ok().json(body), id, created)
}

#[derive(Debug, Deserialize)]
pub struct DemoQuery {
    pub state: Option<String>,
}

/// Drives the simulated connection one event at a time.
async fn demo_event(
    state: web::Data<AppState>,
    req: HttpRequest,
    event: web::Path<String>,
    query: web::Query<DemoQuery>,
) -> Result<HttpResponse> {
    let event = match event.as_str() {
        "connect" => DemoEvent::Connect,
        "approve" => DemoEvent::Approve {
            state: query.state.clone().unwrap_or_default(),
        },
        "deny" => DemoEvent::Deny,
        "post" => DemoEvent::Post,
        "disconnect" => DemoEvent::Disconnect,
        other => {
            return Err(PostGenError::ValidationError(format!(
                "Unknown demo event '{}'",
                other
            )))
        }
    };

    let (id, shared, created) = state.sessions.resolve(&req);
    let mut session = shared.lock().await;
    session.demo = session.demo.clone().apply(event)?;

    let view = demo_view(&session.demo);
    Ok(with_session_cookie(HttpResponse::Ok().json(view), id, created))
}

fn demo_view(connection: &DemoConnection) -> serde_json::Value {
    let mut view = serde_json::json!({
        "status": connection.label(),
        "connected": connection.is_connected(),
    });
    match connection {
        DemoConnection::AwaitingApproval { state } => view["state"] = state.clone().into(),
        DemoConnection::Connected { member } => view["member"] = member.clone().into(),
        DemoConnection::Posted { member, post_id } => {
            view["member"] = member.clone().into();
            view["post_id"] = post_id.clone().into();
        }
        DemoConnection::Disconnected => {}
    }
    view
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/session", web::get().to(session_status))
        .route("/generate", web::post().to(generate))
        .route("/image", web::get().to(image))
        .route("/download", web::get().to(download))
        .route("/share", web::get().to(share))
        .route("/publish", web::post().to(publish))
        .route("/auth/linkedin", web::get().to(connect_linkedin))
        .route("/auth/linkedin/callback", web::get().to(linkedin_callback))
        .route("/auth/linkedin/disconnect", web::post().to(disconnect_linkedin))
        .route("/demo/{event}", web::post().to(demo_event));
}

pub async fn run(pipeline: Pipeline, port: u16) -> std::io::Result<()> {
    let data = web::Data::new(AppState::new(pipeline));

    log::info!("🌐 Server will run on http://127.0.0.1:{}", port);

    HttpServer::new(move || App::new().app_data(data.clone()).configure(routes))
        .bind(("127.0.0.1", port))?
        .run()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkedInConfig;
    use crate::content::placeholder_image;
    use crate::linkedin::{LinkedInClient, LinkedInEndpoints};
    use crate::models::{ImageFormat, ImageGenerationRequest, TextGenerationRequest};
    use crate::providers::{ImageProvider, ProviderSet, TextProvider};
    use actix_web::test;
    use async_trait::async_trait;

    struct EchoText;

    #[async_trait]
    impl TextProvider for EchoText {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate_text(&self, _request: TextGenerationRequest) -> Result<String> {
            Ok("Hello #AI".to_string())
        }
    }

    struct GreyImage;

    #[async_trait]
    impl ImageProvider for GreyImage {
        fn name(&self) -> &str {
            "grey"
        }

        async fn generate_image(&self, _request: ImageGenerationRequest) -> Result<Vec<u8>> {
            Ok(placeholder_image(ImageFormat::Png)?.bytes)
        }
    }

    fn state() -> web::Data<AppState> {
        let providers = ProviderSet::new(Arc::new(EchoText), Arc::new(GreyImage));
        let linkedin = LinkedInClient::new(
            &LinkedInConfig::new()
                .with_credentials("id", "secret")
                .with_redirect_uri("http://localhost:8080/auth/linkedin/callback"),
        )
        .unwrap()
        .with_endpoints(LinkedInEndpoints::with_base("http://127.0.0.1:9"));
        let pipeline = Pipeline::new(providers, ImageFormat::Png).with_linkedin(linkedin);
        web::Data::new(AppState::new(pipeline))
    }

    #[actix_web::test]
    async fn test_generate_then_download() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;

        let req = test::TestRequest::post()
            .uri("/generate")
            .set_json(serde_json::json!({ "topic": "AI" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
            .expect("session cookie")
            .into_owned();

        let req = test::TestRequest::get()
            .uri("/download")
            .cookie(cookie)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/zip"
        );
    }

    #[actix_web::test]
    async fn test_callback_with_foreign_state_is_rejected() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;

        let req = test::TestRequest::get()
            .uri("/auth/linkedin")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
            .unwrap()
            .into_owned();

        let req = test::TestRequest::get()
            .uri("/auth/linkedin/callback?code=abc&state=wrong")
            .cookie(cookie)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_demo_rejects_foreign_state() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;

        let req = test::TestRequest::post().uri("/demo/connect").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
            .unwrap()
            .into_owned();

        let req = test::TestRequest::post()
            .uri("/demo/approve?state=nope")
            .cookie(cookie.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // still awaiting approval, so denying is allowed
        let req = test::TestRequest::post()
            .uri("/demo/deny")
            .cookie(cookie)
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "disconnected");
    }

    #[test]
    fn test_session_store_is_capped() {
        let store = SessionStore::with_limits(SESSION_TTL, 3);
        let (first, _, _) = store.resolve_id(None);
        for _ in 0..10_000 {
            store.resolve_id(None);
        }
        assert_eq!(store.len(), 3);

        let (id, _, created) = store.resolve_id(Some(first));
        assert!(created);
        assert_ne!(id, first);
    }

    #[test]
    fn test_recently_used_session_survives_eviction() {
        let store = SessionStore::with_limits(SESSION_TTL, 2);
        let (kept, _, _) = store.resolve_id(None);
        std::thread::sleep(Duration::from_millis(2));
        store.resolve_id(None);
        std::thread::sleep(Duration::from_millis(2));
        store.resolve_id(Some(kept));
        store.resolve_id(None);

        let (id, _, created) = store.resolve_id(Some(kept));
        assert_eq!(id, kept);
        assert!(!created);
    }

    #[test]
    fn test_idle_sessions_expire() {
        let store = SessionStore::with_limits(Duration::from_millis(20), MAX_SESSIONS);
        let (id, _, _) = store.resolve_id(None);
        store.resolve_id(None);
        assert_eq!(store.len(), 2);

        std::thread::sleep(Duration::from_millis(40));
        let (fresh, _, created) = store.resolve_id(Some(id));
        assert!(created);
        assert_ne!(fresh, id);
        assert_eq!(store.len(), 1);
    }

    #[actix_web::test]
    async fn test_download_before_generate_conflicts() {
        let app = test::init_service(App::new().app_data(state()).configure(routes)).await;
        let req = test::TestRequest::get().uri("/download").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
