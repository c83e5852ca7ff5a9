//! HTTP server for the B-tree index.
//!
//! Provides REST API endpoints for:
//! - Creating a tree with a chosen minimum degree
//! - Insert / search / remove of integer keys
//! - Tree structure export for visualization
//!
//! The tree itself is single-owner; this server serializes access with a lock.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use btree_index::{BTree, BTreeConfig, NodeSnapshot, SearchStep, TreeStats, DEFAULT_MIN_DEGREE};
use clap::Parser;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "btree_server", about = "Serve an in-memory B-tree over HTTP")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "BTREE_ADDR", default_value = "0.0.0.0:3001")]
    addr: String,

    /// Minimum degree of the initial tree
    #[arg(short = 't', long, env = "BTREE_MIN_DEGREE", default_value_t = DEFAULT_MIN_DEGREE)]
    min_degree: usize,
}

/// Application state shared across handlers
struct AppState {
    tree: RwLock<BTree<i64>>,
}

type SharedState = Arc<AppState>;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<OperationResponse>)>;

/// Request to create a fresh tree
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTreeRequest {
    min_degree: Option<usize>,
}

/// Request to insert a key
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertRequest {
    key: i64,
}

/// Response for search operations
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    key: i64,
    found: bool,
    path: Vec<SearchStep>,
}

/// Response for operations that return success/failure
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    success: bool,
    message: String,
}

/// Tree visualization response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TreeResponse<'a> {
    tree: NodeSnapshot<'a, i64>,
    stats: TreeStats,
}

fn bad_request(message: String) -> (StatusCode, Json<OperationResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(OperationResponse {
            success: false,
            message,
        }),
    )
}

fn internal_error(message: String) -> (StatusCode, Json<OperationResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(OperationResponse {
            success: false,
            message,
        }),
    )
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let tree = match BTree::new(args.min_degree) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };
    let state = Arc::new(AppState {
        tree: RwLock::new(tree),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/tree", post(create_tree).get(get_tree))
        .route("/api/config", get(get_config))
        .route("/api/keys", post(insert_key).get(list_keys))
        .route("/api/keys/:key", get(search_key).delete(remove_key))
        .route("/api/stats", get(get_stats))
        .route("/api/clear", post(clear_tree))
        .layer(cors)
        .with_state(state);

    let listener = match tokio::net::TcpListener::bind(&args.addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("ERROR: Failed to bind {}: {}", args.addr, e);
            std::process::exit(1);
        }
    };
    info!(addr = %args.addr, min_degree = args.min_degree, "B-tree server listening");
    info!("POST /api/tree | GET /api/tree | GET /api/config | POST /api/keys | GET /api/keys");
    info!("GET /api/keys/:key | DELETE /api/keys/:key | GET /api/stats | POST /api/clear");

    if let Err(e) = axum::serve(listener, app).await {
        warn!(error = %e, "server stopped");
    }
}

async fn create_tree(
    State(state): State<SharedState>,
    Json(req): Json<CreateTreeRequest>,
) -> ApiResult<OperationResponse> {
    let config = BTreeConfig::new(req.min_degree.unwrap_or(DEFAULT_MIN_DEGREE));
    let tree = BTree::with_config(config).map_err(|e| bad_request(e.to_string()))?;

    *state.tree.write() = tree;
    info!(min_degree = config.min_degree, "created tree");
    Ok(Json(OperationResponse {
        success: true,
        message: format!("Created tree with minimum degree {}", config.min_degree),
    }))
}

async fn get_config(State(state): State<SharedState>) -> Json<BTreeConfig> {
    Json(state.tree.read().config())
}

async fn insert_key(
    State(state): State<SharedState>,
    Json(req): Json<InsertRequest>,
) -> Json<OperationResponse> {
    let inserted = state.tree.write().insert(req.key);
    Json(OperationResponse {
        success: inserted,
        message: if inserted {
            format!("Inserted key {}", req.key)
        } else {
            format!("Key {} already present", req.key)
        },
    })
}

async fn search_key(
    State(state): State<SharedState>,
    Path(key): Path<i64>,
) -> Json<SearchResponse> {
    let tree = state.tree.read();
    Json(SearchResponse {
        key,
        found: tree.contains(&key),
        path: tree.trace_search(&key),
    })
}

async fn remove_key(
    State(state): State<SharedState>,
    Path(key): Path<i64>,
) -> Json<OperationResponse> {
    let removed = state.tree.write().remove(&key);
    Json(OperationResponse {
        success: removed,
        message: if removed {
            format!("Removed key {}", key)
        } else {
            format!("Key {} not found", key)
        },
    })
}

async fn list_keys(State(state): State<SharedState>) -> Json<Vec<i64>> {
    Json(state.tree.read().iter().copied().collect())
}

async fn get_tree(State(state): State<SharedState>) -> ApiResult<serde_json::Value> {
    let tree = state.tree.read();
    let response = TreeResponse {
        tree: tree.export(),
        stats: tree.stats(),
    };
    // The snapshot borrows the tree, so serialize before the guard drops
    serde_json::to_value(&response)
        .map(Json)
        .map_err(|e| {
            warn!(error = %e, "failed to serialize tree");
            internal_error(e.to_string())
        })
}

async fn get_stats(State(state): State<SharedState>) -> Json<TreeStats> {
    Json(state.tree.read().stats())
}

async fn clear_tree(State(state): State<SharedState>) -> Json<OperationResponse> {
    state.tree.write().clear();
    Json(OperationResponse {
        success: true,
        message: "Tree cleared".to_string(),
    })
}
