#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use chrono::Utc;
use docket_core::{EmployeeStatus, Permission};
use docket_db::repo::{EmployeeRepo, NewEmployee};
use docket_db::{connect_sqlite, migrate, SqlitePool};
use docket_server::app::{build_router, AppState};
use docket_server::config::ServerConfig;
use docket_server::infra::mailer::RecordingMailer;
use docket_server::passwords::hash_password;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use tracing_subscriber::EnvFilter;

pub const ADMIN_LOGIN: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password";
const JWT_SECRET: &str = "test-secret-test-secret-test-secret";

pub struct TestApp {
    pub app: axum::Router,
    pub pool: SqlitePool,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    pub config: ServerConfig,
    _uploads: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub fn tune_test_kdf(config: &mut ServerConfig) {
    config.auth.kdf.iterations = 1;
    config.auth.kdf.memory_kb = 8;
    config.auth.kdf.parallelism = 1;
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut ServerConfig)) -> Self {
        static INIT: std::sync::Once = std::sync::Once::new();
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("docket_server=debug"))
                .with_test_writer()
                .try_init();
        });

        let pool = connect_sqlite("sqlite::memory:").await.expect("connect");
        migrate(&pool).await.expect("migrate");

        let uploads = tempfile::tempdir().expect("upload dir");
        let mut config = ServerConfig::default();
        tune_test_kdf(&mut config);
        config.uploads.dir = uploads.path().to_string_lossy().to_string();
        adjust(&mut config);

        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(pool.clone(), config.clone(), JWT_SECRET.to_string())
            .with_mailer(mailer.clone());
        let app = build_router(state.clone());
        Self {
            app,
            pool,
            state,
            mailer,
            config,
            _uploads: uploads,
        }
    }

    pub async fn seed_employee(
        &self,
        login_id: &str,
        password: &str,
        permissions: &[Permission],
    ) -> i64 {
        self.seed_employee_with_status(login_id, password, permissions, EmployeeStatus::Active)
            .await
    }

    pub async fn seed_employee_with_status(
        &self,
        login_id: &str,
        password: &str,
        permissions: &[Permission],
        status: EmployeeStatus,
    ) -> i64 {
        let password_hash = hash_password(password, &self.config.auth.kdf).expect("hash");
        let repo = EmployeeRepo::new(&self.pool);
        let id = repo
            .create(&NewEmployee {
                login_id,
                name: login_id,
                email: None,
                phone: None,
                position: None,
                password_hash: &password_hash,
                status,
                created_at: Utc::now(),
            })
            .await
            .expect("create employee");
        let ids: Vec<i32> = permissions.iter().map(|p| p.id()).collect();
        repo.set_permissions(id, &ids).await.expect("permissions");
        id
    }

    pub async fn login(&self, login_id: &str, password: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/v1/auth/login",
                None,
                Some(json!({ "login_id": login_id, "password": password })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);
        response.body["token"]
            .as_str()
            .expect("token")
            .to_string()
    }

    /// Seeds the super admin and returns a session token for it.
    pub async fn admin_token(&self) -> String {
        self.seed_employee(ADMIN_LOGIN, ADMIN_PASSWORD, &[Permission::SuperAdmin])
            .await;
        self.login(ADMIN_LOGIN, ADMIN_PASSWORD).await
    }

    /// Seeds an employee holding `permissions` and logs in.
    pub async fn staff_token(&self, login_id: &str, permissions: &[Permission]) -> String {
        self.seed_employee(login_id, "staff-password", permissions)
            .await;
        self.login(login_id, "staff-password").await
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).expect("encode json")))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Adds the peer address axum would take from the socket.
pub fn with_peer(mut request: Request<Body>, ip: [u8; 4]) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((ip, 40_000))));
    request
}

pub fn multipart_request(
    uri: &str,
    token: Option<&str>,
    field: &str,
    file_name: &str,
    data: &[u8],
) -> Request<Body> {
    let boundary = "docket-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        );
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).expect("request")
}

pub fn png_bytes() -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 30, 30, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}
