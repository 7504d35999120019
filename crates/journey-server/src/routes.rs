use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use journey_core::{JourneyStore, QueryError};
use journey_narrate::Narrator;

pub struct AppState {
    pub store: Arc<JourneyStore>,
    pub narrator: Narrator,
}

type SharedState = Arc<AppState>;

/// A query condition rendered as an HTTP error with a `{"detail": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.into(),
        }
    }

    fn unprocessable(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: detail.into(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::unprocessable(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::unprocessable(rejection.body_text())
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        let status = match err {
            QueryError::DataUnavailable | QueryError::NotFound(_) => StatusCode::NOT_FOUND,
            QueryError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

type ApiResult = Result<Response, ApiError>;

pub fn build_router(state: SharedState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(|| async { "ok" }))
        .route("/messages", get(all_messages))
        .route("/messages/timeline", get(timeline))
        .route("/messages/decision/:id", get(decision))
        .route("/messages/month/:month", get(month_entries))
        .route("/months", get(months))
        .route("/metrics/internal", get(internal_metrics))
        .route("/metrics/sentiment", get(sentiment))
        .route("/reports/weekly", get(weekly_report))
        .route("/analysis/:month", get(analyze_month))
        .route("/chat", post(chat))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(event = "invalid_cors_origin", origin = %origin, error = %err);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Welcome to the Elyx Member Journey API" }))
}

async fn all_messages(State(state): State<SharedState>) -> ApiResult {
    Ok(Json(state.store.all_entries()?).into_response())
}

async fn timeline(State(state): State<SharedState>) -> ApiResult {
    match state.store.timeline() {
        Ok(milestones) if !milestones.is_empty() => Ok(Json(milestones).into_response()),
        Ok(_) | Err(QueryError::DataUnavailable) => {
            Err(ApiError::not_found("No milestone events found."))
        }
        Err(err) => Err(err.into()),
    }
}

async fn decision(
    State(state): State<SharedState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult {
    let Path(id) = id?;
    let found = state
        .store
        .find_decision_with_reasons(id)
        .map_err(|err| match err {
            QueryError::DataUnavailable => {
                ApiError::not_found(format!("Decision with ID {id} not found."))
            }
            other => other.into(),
        })?;
    Ok(Json(found).into_response())
}

async fn month_entries(State(state): State<SharedState>, Path(month): Path<String>) -> ApiResult {
    Ok(Json(state.store.entries_for_month(&month)?).into_response())
}

async fn months(State(state): State<SharedState>) -> ApiResult {
    let labels: Vec<String> = state.store.months()?.iter().map(|m| m.label()).collect();
    Ok(Json(labels).into_response())
}

async fn internal_metrics(State(state): State<SharedState>) -> ApiResult {
    Ok(Json(state.store.count_team_interactions()?).into_response())
}

async fn sentiment(State(state): State<SharedState>) -> ApiResult {
    Ok(Json(state.store.sentiment_trend()?).into_response())
}

async fn weekly_report(State(state): State<SharedState>) -> ApiResult {
    Ok(Json(state.narrator.weekly_report().await).into_response())
}

async fn analyze_month(State(state): State<SharedState>, Path(month): Path<String>) -> ApiResult {
    Ok(Json(state.narrator.analyze_month(&month).await?).into_response())
}

#[derive(Debug, Deserialize)]
struct ChatQuery {
    query: String,
}

async fn chat(
    State(state): State<SharedState>,
    body: Result<Json<ChatQuery>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body?;
    Ok(Json(state.narrator.chat(&body.query).await?).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use http_body_util::BodyExt;
    use journey_narrate::{GenerateError, TextGenerator, UNAVAILABLE};
    use serde_json::Value;
    use tower::ServiceExt;

    struct Canned(Option<&'static str>);

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, _system: &str, _prompt: &str) -> Result<String, GenerateError> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| GenerateError::Request("offline".into()))
        }
    }

    const FIXTURE: &str = r#"[
        {"id": 1, "timestamp": "2025-01-15T09:00:00", "sender": "Rohan Patel", "role": "Member",
         "content": "Feeling anxious about my numbers.", "tags": {"type": null, "linked_id": null}},
        {"id": 2, "timestamp": "2025-01-16T10:00:00", "sender": "Dr. Warren", "role": "Medical Strategist",
         "content": "We will run a full panel.", "tags": {"type": "decision", "linked_id": null}},
        {"id": 3, "timestamp": "2025-01-16T10:05:00", "sender": "Dr. Warren", "role": "Medical Strategist",
         "content": "A baseline is needed first.", "tags": {"type": "reason", "linked_id": 2}},
        {"id": 4, "timestamp": "2025-02-01T12:00:00", "sender": "Ruby", "role": "Concierge",
         "content": "Panel booked.", "tags": {"type": "milestone", "linked_id": null}},
        {"id": 5, "timestamp": "2025-02-02T12:00:00", "sender": "Neel", "role": "Personal Assistant",
         "content": "Calendar updated.", "tags": {}},
        {"id": 6, "timestamp": "2025-02-20T18:30:00", "sender": "Rohan Patel", "role": "Member",
         "content": "Great results, thank you.", "tags": {}}
    ]"#;

    fn app_with(store: JourneyStore, reply: Option<&'static str>) -> Router {
        let store = Arc::new(store);
        let narrator = Narrator::new(store.clone(), Arc::new(Canned(reply)));
        let origins = vec!["http://localhost:3000".to_string()];
        build_router(Arc::new(AppState { store, narrator }), &origins)
    }

    fn app() -> Router {
        app_with(JourneyStore::parse(FIXTURE).expect("fixture"), None)
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(req).await.expect("response");
        let status = response.status();
        let bytes = response.into_body().collect().await.expect("body").to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).expect("request");
        send(app, req).await
    }

    #[tokio::test]
    async fn root_welcomes() {
        let (status, body) = get_json(app(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Welcome to the Elyx Member Journey API");
    }

    #[tokio::test]
    async fn messages_keep_source_order() {
        let (status, body) = get_json(app(), "/messages").await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<i64> = body
            .as_array()
            .expect("array")
            .iter()
            .map(|m| m["id"].as_i64().expect("id"))
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(body[0]["timestamp"], "2025-01-15T09:00:00");
        assert_eq!(body[1]["tags"]["type"], "decision");
    }

    #[tokio::test]
    async fn empty_store_is_not_loaded() {
        let (status, body) = get_json(app_with(JourneyStore::empty(), None), "/messages").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Journey data not loaded.");

        let (status, body) = get_json(app_with(JourneyStore::empty(), None), "/messages/timeline").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "No milestone events found.");
    }

    #[tokio::test]
    async fn timeline_lists_milestones() {
        let (status, body) = get_json(app(), "/messages/timeline").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().expect("array").len(), 1);
        assert_eq!(body[0]["id"], 4);
    }

    #[tokio::test]
    async fn decision_with_reasons_and_missing_decision() {
        let (status, body) = get_json(app(), "/messages/decision/2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["decision"]["id"], 2);
        assert_eq!(body["reasons"][0]["id"], 3);

        let (status, body) = get_json(app(), "/messages/decision/3").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Decision with ID 3 not found.");
    }

    #[tokio::test]
    async fn month_route_separates_invalid_from_empty() {
        let (status, body) = get_json(app(), "/messages/month/February%202025").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().expect("array").len(), 3);

        let (status, _) = get_json(app(), "/messages/month/Not%20A%20Month").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = get_json(app(), "/messages/month/December%202099").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn months_listed_in_order() {
        let (_, body) = get_json(app(), "/months").await;
        assert_eq!(body, serde_json::json!(["January 2025", "February 2025"]));
    }

    #[tokio::test]
    async fn internal_metrics_exclude_member_and_assistant() {
        let (status, body) = get_json(app(), "/metrics/internal").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_elyx_team_interactions"], 3);
        assert_eq!(body["interactions_by_role"]["Medical Strategist"], 2);
        assert_eq!(body["interactions_by_role"]["Concierge"], 1);
        assert!(body["interactions_by_role"].get("Member").is_none());
        assert!(body["interactions_by_role"].get("Personal Assistant").is_none());
    }

    #[tokio::test]
    async fn sentiment_is_computed_per_month() {
        let (status, body) = get_json(app(), "/metrics/sentiment").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!([
                {"month": "Jan 2025", "score": -1.0},
                {"month": "Feb 2025", "score": 1.0}
            ])
        );
    }

    #[tokio::test]
    async fn analysis_falls_back_when_generation_is_down() {
        let (status, body) = get_json(app(), "/analysis/January%202025").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["month_name"], "January 2025");
        assert_eq!(body["primary_goal_trigger"], "Ongoing health optimization.");
        assert_eq!(body["persona_analysis"]["after"], "More consistent.");

        let (status, _) = get_json(app(), "/analysis/Jan%202025").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn weekly_report_uses_generated_summary() {
        let store = JourneyStore::parse(FIXTURE).expect("fixture");
        let (status, body) = get_json(app_with(store, Some("<ul><li>Panel booked</li></ul>")), "/reports/weekly").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["week_of"], "August 11, 2025");
        assert_eq!(body["summary"], "<ul><li>Panel booked</li></ul>");
    }

    #[tokio::test]
    async fn chat_answers_or_rejects() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"query": "What was decided in January?"}"#))
            .expect("request");
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], UNAVAILABLE);

        let req = Request::builder()
            .method(Method::POST)
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"query": "  "}"#))
            .expect("request");
        let (status, _) = send(app(), req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn malformed_requests_get_a_detail_body() {
        let (status, body) = get_json(app(), "/messages/decision/abc").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().expect("detail").contains("abc"));

        let req = Request::builder()
            .method(Method::POST)
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .expect("request");
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().expect("detail").contains("query"));

        let req = Request::builder()
            .method(Method::POST)
            .uri("/chat")
            .body(Body::from(r#"{"query": "hi"}"#))
            .expect("request");
        let (status, body) = send(app(), req).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn decision_on_empty_journey_is_not_found() {
        let (status, body) = get_json(app_with(JourneyStore::empty(), None), "/messages/decision/42").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Decision with ID 42 not found.");
    }

    #[tokio::test]
    async fn cors_allows_configured_origin_only() {
        let req = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .expect("request");
        let response = app().oneshot(req).await.expect("response");
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("http://localhost:3000"))
        );

        let req = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://evil.test")
            .body(Body::empty())
            .expect("request");
        let response = app().oneshot(req).await.expect("response");
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
