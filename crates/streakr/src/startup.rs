use crate::{
    api::routes::{
        create_game, create_panic_void, create_round, get_leaderboard, get_player_streak,
        get_round_games, grant_free_kicks, health, put_pick, register_player, set_game_lock,
        settle_question,
    },
    config::Settings,
    domain::{AutoLockWatcher, Commissioner},
    infra::{
        clock::{Clock, SystemClock},
        db::{DBConnection, DatabasePoolConfig},
        file_utils::create_folder,
    },
};
use anyhow::anyhow;
use axum::{
    body::Body,
    extract::{connect_info::IntoMakeServiceWithConnectInfo, ConnectInfo, Request},
    http::HeaderValue,
    middleware::{self, AddExtension, Next},
    response::IntoResponse,
    routing::{get, post, put},
    serve::Serve,
    Router,
};
use hyper::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use log::{error, info, warn};
use std::{collections::HashMap, net::SocketAddr, str::FromStr, sync::Arc, time::Duration};
use tokio::signal::unix::{signal, SignalKind};
use tokio::{net::TcpListener, select, task::JoinHandle};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub struct Application {
    server: Serve<
        TcpListener,
        IntoMakeServiceWithConnectInfo<Router, SocketAddr>,
        AddExtension<Router, ConnectInfo<SocketAddr>>,
    >,
    cancellation_token: CancellationToken,
    background_tasks: TaskTracker,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, anyhow::Error> {
        let address = format!(
            "{}:{}",
            config.api_settings.domain, config.api_settings.port
        );
        let listener = SocketAddr::from_str(&address)?;
        let (app_state, background_tasks, cancellation_token) = build_app(config.clone()).await?;
        let server = build_server(listener, app_state, config.api_settings.origins).await?;
        Ok(Self {
            server,
            cancellation_token,
            background_tasks,
        })
    }

    pub async fn run_until_stopped(self) -> Result<(), anyhow::Error> {
        info!("Starting server...");
        match self.server.with_graceful_shutdown(shutdown_signal()).await {
            Ok(_) => {
                info!("Server shutdown initiated");
                self.cancellation_token.cancel();

                let timeout = tokio::time::sleep(Duration::from_secs(10));
                select! {
                    _ = self.background_tasks.wait() => {
                        info!("Background tasks completed gracefully");
                    }
                    _ = timeout => {
                        warn!("Background tasks timed out during shutdown");
                    }
                }

                info!("Shutdown complete");
                Ok(())
            }
            Err(e) => {
                error!("Server shutdown error: {}", e);
                self.cancellation_token.cancel();

                let _ =
                    tokio::time::timeout(Duration::from_secs(5), self.background_tasks.wait())
                        .await;

                Err(anyhow!("Error during server shutdown: {}", e))
            }
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub commissioner: Arc<Commissioner>,
    pub background_threads: Arc<HashMap<String, JoinHandle<()>>>,
}

pub async fn build_app(
    config: Settings,
) -> Result<(AppState, TaskTracker, CancellationToken), anyhow::Error> {
    create_folder(&config.db_settings.data_folder)?;

    let pool_config: DatabasePoolConfig = config.db_settings.clone().into();
    let db_connection = DBConnection::new(&config.db_settings.data_folder, "streakr", pool_config)
        .await
        .map_err(|e| anyhow!("Error setting up streakr db: {}", e))?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let commissioner = Arc::new(Commissioner::new(
        db_connection,
        clock.clone(),
        config.game_settings.clone(),
    ));
    info!(
        "Commissioner configured for season {}",
        config.game_settings.season
    );

    let tracker = TaskTracker::new();
    let mut threads = HashMap::new();
    let cancel_token = CancellationToken::new();

    let auto_lock_watcher = AutoLockWatcher::new(
        commissioner.game_store(),
        clock,
        cancel_token.clone(),
        Duration::from_secs(config.game_settings.auto_lock_interval_secs),
    );
    let auto_lock_task = tracker.spawn(async move {
        match auto_lock_watcher.watch().await {
            Ok(_) => {
                info!("Successfully shutdown auto-lock watcher")
            }
            Err(e) => {
                error!("Error in auto-lock watcher: {}", e)
            }
        }
    });

    tracker.close();
    threads.insert(String::from("auto_lock_watcher"), auto_lock_task);

    let app_state = AppState {
        commissioner,
        background_threads: Arc::new(threads),
    };
    Ok((app_state, tracker, cancel_token))
}

pub async fn build_server(
    socket_addr: SocketAddr,
    app_state: AppState,
    origins: Vec<String>,
) -> Result<
    Serve<
        TcpListener,
        IntoMakeServiceWithConnectInfo<Router, SocketAddr>,
        AddExtension<Router, ConnectInfo<SocketAddr>>,
    >,
    anyhow::Error,
> {
    let listener = TcpListener::bind(socket_addr).await?;

    info!("Setting up service");
    let app = app(app_state, origins);
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );
    info!(
        "Service running @: http://{}:{}",
        socket_addr.ip(),
        socket_addr.port()
    );
    Ok(server)
}

pub fn app(app_state: AppState, origins: Vec<String>) -> Router {
    let origins: Vec<HeaderValue> = origins
        .into_iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION])
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true);

    // Private network only
    let admin_endpoints = Router::new()
        .route("/rounds", post(create_round))
        .route("/games", post(create_game))
        .route("/games/{game_id}/lock", put(set_game_lock))
        .route(
            "/questions/{question_id}/settlement",
            post(settle_question),
        )
        .route("/players/{player_id}/free_kicks", post(grant_free_kicks));

    let players_endpoints = Router::new()
        .route("/", post(register_player))
        .route("/{player_id}/picks/{question_id}", put(put_pick))
        .route("/{player_id}/panic_voids", post(create_panic_void))
        .route("/{player_id}/streak", get(get_player_streak));

    Router::new()
        .route("/api/v1/health_check", get(health))
        .route("/api/v1/rounds/{round_id}/games", get(get_round_games))
        .route("/api/v1/leaderboard", get(get_leaderboard))
        .nest("/api/v1/admin", admin_endpoints)
        .nest("/api/v1/players", players_endpoints)
        .layer(middleware::from_fn(log_request))
        .with_state(Arc::new(app_state))
        .layer(cors)
}

async fn log_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    let now = time::OffsetDateTime::now_utc();
    let path = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or_default()
        .to_string();
    info!(target: "http_request", "new request, {} {}", request.method().as_str(), path);

    let response = next.run(request).await;
    let response_time = time::OffsetDateTime::now_utc() - now;
    info!(target: "http_response", "response, code: {}, time: {}", response.status().as_str(), response_time);

    response
}

async fn shutdown_signal() {
    let (mut sigint, mut sigterm) = match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) {
        (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to install signal handlers, running until killed: {}", e);
            return std::future::pending().await;
        }
    };

    select! {
        _ = sigint.recv() => info!("Received SIGINT signal"),
        _ = sigterm.recv() => info!("Received SIGTERM signal"),
    }
}
