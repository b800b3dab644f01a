//! Axum route handlers for the notas RPC API.
//!
//! Each interaction route maps one request onto an `Interaction` for the
//! session named by the path token and returns the resulting `SessionView`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{delete, get, post};
use axum::Router;
use notas_types::*;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::db::Database;
use crate::session::{Interaction, InteractionHandler, SessionStore};

pub struct AppState {
    pub db: Arc<Database>,
    pub sessions: SessionStore,
    pub config: Config,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: Config) -> Self {
        Self {
            db,
            sessions: SessionStore::new(config.max_sessions),
            config,
            start_time: Instant::now(),
        }
    }
}

type RpcResult<T> = (StatusCode, Json<RpcResponse<T>>);

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/rpc/session", post(open_session))
        .route("/rpc/session/:token", delete(close_session))
        .route("/rpc/session/:token/identify", post(identify))
        .route("/rpc/session/:token/password", post(password))
        .route("/rpc/session/:token/register", post(register))
        .route("/rpc/session/:token/tickets", post(submit_ticket))
        .route("/rpc/session/:token/report", get(report))
        .route("/rpc/session/:token/query", post(query))
        .route("/rpc/session/:token/logout", post(logout))
        .route("/rpc/status", get(status))
        .with_state(state)
}

/// Apply one interaction to the token's session on the blocking pool, since
/// every interaction makes synchronous SQLite calls.
async fn interact(
    state: Arc<AppState>,
    token: String,
    interaction: Interaction,
) -> RpcResult<SessionView> {
    let view = tokio::task::spawn_blocking(move || {
        let handler = InteractionHandler::new(&state.db, state.config.query_row_limit);
        state.sessions.with_session(&token, |session| {
            let outcome = handler.handle(session, interaction);
            session.to_view(outcome.messages, outcome.payload)
        })
    })
    .await;

    match view {
        Ok(Some(view)) => (StatusCode::OK, Json(RpcResponse::ok(view))),
        Ok(None) => {
            log::debug!("[RPC] Unknown session token");
            (StatusCode::NOT_FOUND, Json(RpcResponse::err("unknown session")))
        }
        Err(e) => {
            log::error!("[RPC] Interaction task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RpcResponse::err("internal error")),
            )
        }
    }
}

// POST /rpc/session
pub async fn open_session(State(state): State<Arc<AppState>>) -> RpcResult<SessionToken> {
    let token = state.sessions.open();
    (StatusCode::OK, Json(RpcResponse::ok(SessionToken { token })))
}

// DELETE /rpc/session/:token
pub async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> RpcResult<bool> {
    if state.sessions.close(&token) {
        (StatusCode::OK, Json(RpcResponse::ok(true)))
    } else {
        (StatusCode::NOT_FOUND, Json(RpcResponse::err("unknown session")))
    }
}

// POST /rpc/session/:token/identify
pub async fn identify(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(req): Json<IdentifyRequest>,
) -> RpcResult<SessionView> {
    interact(state, token, Interaction::SubmitIdentifier(req.identifier)).await
}

// POST /rpc/session/:token/password
pub async fn password(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(req): Json<PasswordRequest>,
) -> RpcResult<SessionView> {
    interact(state, token, Interaction::SubmitPassword(req.password)).await
}

// POST /rpc/session/:token/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(req): Json<RegisterRequest>,
) -> RpcResult<SessionView> {
    interact(
        state,
        token,
        Interaction::Register {
            ra: req.ra,
            nome: req.nome,
            password: req.password,
        },
    )
    .await
}

// POST /rpc/session/:token/tickets
pub async fn submit_ticket(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(req): Json<SubmitTicketRequest>,
) -> RpcResult<SessionView> {
    interact(
        state,
        token,
        Interaction::SubmitTicket {
            ticket: req.ticket,
            score: req.score,
        },
    )
    .await
}

// GET /rpc/session/:token/report
pub async fn report(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> RpcResult<SessionView> {
    interact(state, token, Interaction::ShowDashboard).await
}

// POST /rpc/session/:token/query
pub async fn query(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(req): Json<QueryRequest>,
) -> RpcResult<SessionView> {
    interact(state, token, Interaction::RunQuery(req.sql)).await
}

// POST /rpc/session/:token/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> RpcResult<SessionView> {
    interact(state, token, Interaction::Logout).await
}

// GET /rpc/status
pub async fn status(State(state): State<Arc<AppState>>) -> RpcResult<ServiceStatus> {
    let status = ServiceStatus {
        running: true,
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_sessions: state.sessions.len(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    (StatusCode::OK, Json(RpcResponse::ok(status)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> Arc<AppState> {
        let db = Database::open_in_memory().expect("Failed to open db");
        Arc::new(AppState::new(Arc::new(db), Config::default()))
    }

    async fn open(state: &Arc<AppState>) -> String {
        let (status, Json(resp)) = open_session(State(state.clone())).await;
        assert_eq!(status, StatusCode::OK);
        resp.data.expect("token").token
    }

    #[tokio::test]
    async fn test_register_login_and_rate_over_rpc() {
        let state = test_state();
        let token = open(&state).await;

        let (_, Json(resp)) = identify(
            State(state.clone()),
            Path(token.clone()),
            Json(IdentifyRequest {
                identifier: "A1".to_string(),
            }),
        )
        .await;
        let view = resp.data.unwrap();
        assert!(view.show_registration);
        assert_eq!(view.stage, Stage::Anonymous);

        let (_, Json(resp)) = register(
            State(state.clone()),
            Path(token.clone()),
            Json(RegisterRequest {
                ra: "A1".to_string(),
                nome: "Alice".to_string(),
                password: "pw".to_string(),
            }),
        )
        .await;
        assert!(!resp.data.unwrap().show_registration);

        identify(
            State(state.clone()),
            Path(token.clone()),
            Json(IdentifyRequest {
                identifier: "A1".to_string(),
            }),
        )
        .await;
        let (_, Json(resp)) = password(
            State(state.clone()),
            Path(token.clone()),
            Json(PasswordRequest {
                password: "pw".to_string(),
            }),
        )
        .await;
        let view = resp.data.unwrap();
        assert_eq!(view.stage, Stage::Authenticated);
        assert_eq!(view.user.unwrap().nome, "Alice");

        let (_, Json(resp)) = submit_ticket(
            State(state.clone()),
            Path(token.clone()),
            Json(SubmitTicketRequest {
                ticket: "T1".to_string(),
                score: 8,
            }),
        )
        .await;
        assert_eq!(resp.data.unwrap().messages[0].level, MessageLevel::Success);

        let (_, Json(resp)) = report(State(state.clone()), Path(token.clone())).await;
        match resp.data.unwrap().payload {
            Some(Payload::Report(report)) => {
                assert_eq!(report.table.rows.len(), 1);
                assert_eq!(report.table.rows[0].ticket, "T1");
                assert_eq!(report.daily_average, 8.0);
            }
            other => panic!("expected report, got {:?}", other),
        }

        let (_, Json(resp)) = logout(State(state.clone()), Path(token.clone())).await;
        let view = resp.data.unwrap();
        assert_eq!(view.stage, Stage::Anonymous);
        assert!(view.user.is_none());
    }

    #[tokio::test]
    async fn test_unknown_token_is_not_found() {
        let state = test_state();
        let (status, Json(resp)) = report(State(state.clone()), Path("nope".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!resp.success);

        let (status, _) = close_session(State(state), Path("nope".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_status_counts_sessions() {
        let state = test_state();
        open(&state).await;
        let token = open(&state).await;
        close_session(State(state.clone()), Path(token)).await;

        let (_, Json(resp)) = status(State(state)).await;
        let status = resp.data.unwrap();
        assert!(status.running);
        assert_eq!(status.active_sessions, 1);
    }

    #[tokio::test]
    async fn test_session_cap_drops_oldest_token() {
        let db = Database::open_in_memory().expect("Failed to open db");
        let config = Config {
            max_sessions: 2,
            ..Config::default()
        };
        let state = Arc::new(AppState::new(Arc::new(db), config));

        let first = open(&state).await;
        std::thread::sleep(std::time::Duration::from_millis(2));
        open(&state).await;
        std::thread::sleep(std::time::Duration::from_millis(2));
        let last = open(&state).await;

        let (_, Json(resp)) = status(State(state.clone())).await;
        assert_eq!(resp.data.unwrap().active_sessions, 2);

        let (status, _) = report(State(state.clone()), Path(first)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, Json(resp)) = report(State(state), Path(last)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp.data.unwrap().stage, Stage::Anonymous);
    }
}
