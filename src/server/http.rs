//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Each connection is
//! served on its own tokio task; routing is a match over (method, path)
//! with per-resource prefix handlers.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::SessionManager;
use crate::config::Args;
use crate::db::Store;
use crate::routes;
use crate::routes::BoxBody;
use crate::types::AtriumError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub store: Store,
    pub sessions: SessionManager,
    pub started_at: Instant,
}

impl AppState {
    /// Create AppState from parsed configuration and an opened store
    pub fn new(args: Args, store: Store) -> Result<Self, AtriumError> {
        let sessions = if args.dev_mode && args.session_secret.is_none() {
            SessionManager::new_dev()
        } else {
            SessionManager::new(args.session_secret(), args.session_ttl_seconds)?
        };

        Ok(Self {
            args,
            store,
            sessions,
            started_at: Instant::now(),
        })
    }

    /// Seconds since the server started
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), AtriumError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Atrium listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - insecure session secret fallback in effect");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    // CORS preflight
    if method == Method::OPTIONS {
        return Ok(routes::cors_preflight());
    }

    // Operational probes
    let response = match (method.clone(), path.as_str()) {
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health::health_check(&state)
        }
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            routes::health::readiness_check(&state)
        }
        (Method::GET, "/version") => routes::health::version_info(),
        (Method::GET, "/status") => routes::health::status_check(&state),

        // Auth routes consume the request
        (_, p) if p.starts_with("/auth") => {
            return Ok(routes::auth_routes::handle_auth_request(req, state, p.to_string()).await);
        }

        // Tenant resources
        (_, p) if p.starts_with("/api/clients") => {
            return Ok(routes::clients::handle_clients_request(req, state, p.to_string()).await);
        }
        (_, p) if p.starts_with("/api/leads") => {
            return Ok(routes::leads::handle_leads_request(req, state, p.to_string()).await);
        }
        (_, p) if p.starts_with("/api/contracts") => {
            return Ok(
                routes::contracts::handle_contracts_request(req, state, p.to_string()).await,
            );
        }
        (_, p) if p.starts_with("/api/proposals") => {
            return Ok(
                routes::proposals::handle_proposals_request(req, state, p.to_string()).await,
            );
        }
        (_, p) if p.starts_with("/api/projects") => {
            return Ok(routes::projects::handle_projects_request(req, state, p.to_string()).await);
        }
        (_, p) if p.starts_with("/api/tasks") => {
            return Ok(routes::tasks::handle_tasks_request(req, state, p.to_string()).await);
        }
        (_, p) if p.starts_with("/api/invoices") => {
            return Ok(routes::invoices::handle_invoices_request(req, state, p.to_string()).await);
        }
        (_, p) if p.starts_with("/api/time-entries") => {
            return Ok(
                routes::time_entries::handle_time_entries_request(req, state, p.to_string()).await,
            );
        }
        (_, p) if p.starts_with("/api/resources") => {
            return Ok(
                routes::resources::handle_resources_request(req, state, p.to_string()).await,
            );
        }
        (_, p) if p.starts_with("/api/surveys") => {
            return Ok(routes::surveys::handle_surveys_request(req, state, p.to_string()).await);
        }
        (_, p) if p.starts_with("/api/goals") => {
            return Ok(routes::goals::handle_goals_request(req, state, p.to_string()).await);
        }
        (_, p) if p.starts_with("/api/payroll-runs") => {
            return Ok(routes::payroll::handle_payroll_request(req, state, p.to_string()).await);
        }
        (_, p) if p.starts_with("/api/events") => {
            return Ok(routes::events::handle_events_request(req, state, p.to_string()).await);
        }
        (_, p) if p.starts_with("/api/workflows") => {
            return Ok(
                routes::workflows::handle_workflows_request(req, state, p.to_string()).await,
            );
        }
        (_, p) if p.starts_with("/api/activity") => {
            return Ok(routes::activity::handle_activity_request(req, state).await);
        }
        (_, p) if p.starts_with("/api/portal") => {
            return Ok(routes::portal::handle_portal_request(req, state, p.to_string()).await);
        }
        (_, p) if p.starts_with("/api/team") => {
            return Ok(routes::team::handle_team_request(req, state, p.to_string()).await);
        }

        _ => routes::not_found(&path),
    };

    Ok(response)
}
