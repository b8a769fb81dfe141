//! Web surface: routes, session cookie handling and page rendering.
//!
//! | Route           | Purpose                                   |
//! |-----------------|-------------------------------------------|
//! | `GET /`         | landing page                              |
//! | `GET /predict`  | survey form                               |
//! | `POST /predict` | run the pipeline, redirect to `/result`   |
//! | `GET /result`   | latest prediction for the caller          |
//! | `GET /health`   | JSON liveness and model summary           |

mod cookies;
mod handlers;
mod pages;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::adapters::{load_model_dir, LoadOptions, MemorySessionStore, SqliteSessionStore};
use crate::application::PredictionService;
use crate::config::{Config, SessionBackend};
use crate::ports::SessionStore;

pub use cookies::{session_cookie, session_from_headers, SESSION_COOKIE};
pub use pages::html_escape;

/// Shared state handed to every handler.
pub struct AppState {
    pub service: PredictionService,
    pub sessions: Arc<dyn SessionStore>,
    /// Mark the session cookie `Secure`
    pub cookie_secure: bool,
}

impl AppState {
    /// Load the model bundle and open the configured session store.
    ///
    /// # Errors
    /// Returns error if the artifacts fail to load or the store cannot be opened.
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let options = LoadOptions {
            require_manifest: config.require_manifest,
        };
        let artifacts = load_model_dir(&config.model_dir, &options)?;

        let ttl = config.session_ttl();
        let sessions: Arc<dyn SessionStore> = match config.session.backend {
            SessionBackend::Memory => Arc::new(MemorySessionStore::new(ttl)),
            SessionBackend::Sqlite => {
                let path = &config.session.sqlite_path;
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                Arc::new(SqliteSessionStore::new(path, ttl)?)
            }
        };
        tracing::info!("Session backend: {}", sessions.backend());

        Ok(Self {
            service: PredictionService::new(Arc::new(artifacts)),
            sessions,
            cookie_secure: config.session.cookie_secure,
        })
    }
}

/// Build the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route(
            "/predict",
            get(handlers::survey_form).post(handlers::submit_survey),
        )
        .route("/result", get(handlers::show_result))
        .route("/health", get(handlers::health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::artifacts::{LabelEncoder, LogisticModel, StandardScaler};
    use crate::application::ModelArtifacts;
    use crate::HeartcheckError;
    use crate::domain::schema::categorical_columns;
    use crate::domain::{DefaultTable, FeatureSchema};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::collections::BTreeMap;
    use std::path::Path;
    use tower::ServiceExt;

    const REFERENCE_FORM: [(&str, &str); 12] = [
        ("PhysicalHealthDays", "2"),
        ("MentalHealthDays", "3"),
        ("SleepHours", "7"),
        ("HeightInMeters", "1.75"),
        ("WeightInKilograms", "70"),
        ("BMI", "22.9"),
        ("Sex", "Male"),
        ("GeneralHealth", "Good"),
        ("PhysicalActivities", "Yes"),
        ("HadDiabetes", "No"),
        ("SmokerStatus", "Never smoked"),
        ("AgeCategory", "40-44"),
    ];

    fn test_state(service: PredictionService) -> (Arc<AppState>, Arc<MemorySessionStore>) {
        let sessions = Arc::new(MemorySessionStore::new(chrono::Duration::hours(1)));
        let state = Arc::new(AppState {
            service,
            sessions: Arc::clone(&sessions) as Arc<dyn SessionStore>,
            cookie_secure: false,
        });
        (state, sessions)
    }

    fn shipped_service() -> PredictionService {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("models");
        let artifacts = load_model_dir(&dir, &LoadOptions::default()).expect("Models should load");
        PredictionService::new(Arc::new(artifacts))
    }

    /// Two-column bundle whose classifier is one column too wide.
    fn broken_service() -> PredictionService {
        let schema = FeatureSchema::new(vec!["Sex".into(), "BMI".into()]).expect("schema");
        let mut vocab = BTreeMap::new();
        vocab.insert("Sex".to_string(), vec!["Female".to_string(), "Male".to_string()]);
        let artifacts = ModelArtifacts::new(
            schema,
            DefaultTable::standard(),
            categorical_columns(),
            Arc::new(LabelEncoder::per_field(vocab).expect("encoder")),
            Arc::new(StandardScaler::new(vec![0.0, 0.0], vec![1.0, 1.0], None).expect("scaler")),
            Arc::new(LogisticModel::new(vec![0.1, 0.1, 0.1], 0.0).expect("classifier")),
        );
        PredictionService::new(Arc::new(artifacts))
    }

    fn form_body(pairs: &[(&str, &str)]) -> String {
        pairs
            .iter()
            .map(|(k, v)| format!("{k}={}", v.replace(' ', "+")))
            .collect::<Vec<_>>()
            .join("&")
    }

    fn post_form(body: String, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::post("/predict")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body)).unwrap()
    }

    fn get_with_cookie(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::get(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_text(resp: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// `name=value` part of the response's `Set-Cookie` header.
    fn cookie_pair(resp: &axum::response::Response) -> String {
        let raw = resp
            .headers()
            .get(header::SET_COOKIE)
            .expect("Set-Cookie present")
            .to_str()
            .unwrap();
        raw.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_home_and_form_render() {
        let (state, _) = test_state(shipped_service());
        let app = build_router(state);

        let resp = app.clone().oneshot(get_with_cookie("/", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("href=\"/predict\""));

        let resp = app.oneshot(get_with_cookie("/predict", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let page = body_text(resp).await;
        assert!(page.contains("<form method=\"post\" action=\"/predict\">"));
        assert!(page.contains(r#"<select id="Sex" name="Sex" required>"#));
    }

    #[tokio::test]
    async fn test_reference_submission_then_result() {
        let (state, sessions) = test_state(shipped_service());
        let app = build_router(state);

        let resp = app
            .clone()
            .oneshot(post_form(form_body(&REFERENCE_FORM), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/result");
        let cookie = cookie_pair(&resp);
        assert!(cookie.starts_with(&format!("{SESSION_COOKIE}=")));
        assert_eq!(sessions.count().unwrap(), 1);

        let resp = app
            .oneshot(get_with_cookie("/result", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let page = body_text(resp).await;
        assert!(page.contains("Estimated probability of heart disease"));
        assert!(page.contains('%'));
    }

    #[tokio::test]
    async fn test_resubmission_reuses_session() {
        let (state, sessions) = test_state(shipped_service());
        let app = build_router(state);

        let resp = app
            .clone()
            .oneshot(post_form(form_body(&REFERENCE_FORM), None))
            .await
            .unwrap();
        let cookie = cookie_pair(&resp);

        let resp = app
            .oneshot(post_form(form_body(&REFERENCE_FORM), Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(cookie_pair(&resp), cookie);
        assert_eq!(sessions.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_session_id_is_replaced() {
        let (state, sessions) = test_state(shipped_service());
        let app = build_router(state);

        let planted_id = crate::domain::SessionId::generate();
        let planted = format!("{SESSION_COOKIE}={planted_id}");
        let resp = app
            .oneshot(post_form(form_body(&REFERENCE_FORM), Some(&planted)))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let issued = cookie_pair(&resp);
        assert_ne!(issued, planted);
        assert!(sessions.load_prediction(&planted_id).unwrap().is_none());
        assert_eq!(sessions.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_non_numeric_answer_rerenders_form() {
        let (state, sessions) = test_state(shipped_service());
        let app = build_router(state);

        let mut pairs = REFERENCE_FORM;
        pairs[4] = ("WeightInKilograms", "abc");
        let resp = app.oneshot(post_form(form_body(&pairs), None)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(resp.headers().get(header::SET_COOKIE).is_none());
        let page = body_text(resp).await;
        assert!(page.contains("Error:"));
        assert!(page.contains("abc"));
        assert_eq!(sessions.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_submission_keeps_previous_result() {
        let (state, sessions) = test_state(shipped_service());
        let app = build_router(state);

        let resp = app
            .clone()
            .oneshot(post_form(form_body(&REFERENCE_FORM), None))
            .await
            .unwrap();
        let cookie = cookie_pair(&resp);
        let session = crate::domain::SessionId::parse(
            cookie.trim_start_matches(&format!("{SESSION_COOKIE}=")),
        )
        .expect("session id");
        let before = sessions.load_prediction(&session).unwrap();

        let mut pairs = REFERENCE_FORM;
        pairs[2] = ("SleepHours", "lots");
        let resp = app
            .oneshot(post_form(form_body(&pairs), Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(sessions.load_prediction(&session).unwrap(), before);
    }

    #[tokio::test]
    async fn test_stage_failure_is_server_error() {
        let (state, sessions) = test_state(broken_service());
        let app = build_router(state);

        let resp = app
            .oneshot(post_form(form_body(&REFERENCE_FORM), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(resp).await.contains("inference stage failed"));
        assert_eq!(sessions.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_result_without_session_redirects() {
        let (state, _) = test_state(shipped_service());
        let app = build_router(state);

        let resp = app
            .clone()
            .oneshot(get_with_cookie("/result", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/predict");

        let unknown = format!("{SESSION_COOKIE}={}", crate::domain::SessionId::generate());
        let resp = app
            .oneshot(get_with_cookie("/result", Some(&unknown)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    }

    #[test]
    fn test_state_from_config_with_sqlite_sessions() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut config = Config::default();
        config.model_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("models");
        config.require_manifest = true;
        config.session.backend = SessionBackend::Sqlite;
        config.session.sqlite_path = temp.path().join("nested").join("sessions.db");

        let state = AppState::from_config(&config).expect("state");
        assert_eq!(state.sessions.backend(), "sqlite");
        assert!(config.session.sqlite_path.exists());
    }

    #[test]
    fn test_state_from_config_missing_models() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut config = Config::default();
        config.model_dir = temp.path().join("absent");

        let err = AppState::from_config(&config).err().expect("no models");
        assert!(matches!(err, HeartcheckError::Artifact(_)));
    }

    #[tokio::test]
    async fn test_health_reports_model() {
        let (state, _) = test_state(shipped_service());
        let app = build_router(state);

        let resp = app.oneshot(get_with_cookie("/health", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["features"], 39);
        assert_eq!(json["classifier"], "logistic_regression");
        assert_eq!(json["session_backend"], "memory");
        assert_eq!(json["sessions_stored"], 0);
    }
}
