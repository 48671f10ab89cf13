use std::fmt;
use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, patch},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc::Sender;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info, info_span, instrument, warn, Instrument};

use crate::config::Config;
use crate::datastore::Filter;
use crate::model::{CorrelationId, Todo, TodoId, TodoInput};

use super::error::ControllerError;
use super::storage::{self, RequestResponse, StorageServiceRequest};

pub struct ServerConfig {
    pub addr: SocketAddr,
    pub concurrent: Option<usize>,
    pub timeout: Option<Duration>,
    pub allowed_origin: String,
}

impl TryFrom<&Config> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(config: &Config) -> Result<Self, Self::Error> {
        let ip = config.listen.host.parse()?;
        Ok(Self {
            addr: SocketAddr::new(ip, config.listen.port),
            concurrent: config.listen.concurrent,
            timeout: config.listen.timeout()?,
            allowed_origin: config.cors.allowed_origin.clone(),
        })
    }
}

#[derive(Clone)]
struct ApiState {
    storage_sender: Sender<RequestResponse>,
}

impl fmt::Debug for ApiState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "todo_http_api")
    }
}

const SHOW_COMPLETED: &str = "showCompleted";

/// Builds the HTTP surface: `/todos` routes plus `/health`, wrapped in the
/// correlation-id, tracing, timeout, concurrency and CORS layers.
pub fn router(
    cfg: &ServerConfig,
    storage_sender: Sender<RequestResponse>,
) -> anyhow::Result<Router> {
    let mut app: Router = Router::new()
        .route("/health", get(health))
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/:id", patch(update_todo).delete(delete_todo))
        .route("/todos/:id/complete", patch(complete_todo))
        .with_state(ApiState { storage_sender })
        .layer(middleware::from_fn(propagate_correlation_id))
        .layer(TraceLayer::new_for_http());

    if let Some(timeout) = cfg.timeout {
        app = app.layer(TimeoutLayer::new(timeout));
    }
    if let Some(concurrent) = cfg.concurrent {
        app = app.layer(GlobalConcurrencyLimitLayer::new(concurrent));
    }

    Ok(app.layer(cors_layer(&cfg.allowed_origin)?))
}

/// Browsers only get CORS grants for the single configured origin.
pub fn cors_layer(allowed_origin: &str) -> anyhow::Result<CorsLayer> {
    let origin: HeaderValue = allowed_origin.parse()?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(vec![header::CONTENT_TYPE])
        .expose_headers(vec![header::HeaderName::from_static(
            CorrelationId::HEADER_NAME,
        )]))
}

async fn propagate_correlation_id<B>(request: Request<B>, next: Next<B>) -> Response {
    let correlation_id = CorrelationId::from_header_map_or_new(request.headers());
    let span = info_span!("request", correlation_id = %correlation_id);

    let mut response = next.run(request).instrument(span).await;
    if let Err(err) = correlation_id.insert_into_header_map(response.headers_mut()) {
        warn!(reason = %err, "unable to set correlation-id on response");
    }
    response
}

fn bad_request(rejection: JsonRejection) -> ControllerError {
    ControllerError::BadRequest(rejection.body_text())
}

/// Decodes a create/update body. Only JSON objects are accepted, serde would
/// otherwise fill the fields of `TodoInput` from an array by position.
fn todo_input(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<TodoInput, ControllerError> {
    let Json(body) = payload.map_err(bad_request)?;
    if !body.is_object() {
        return Err(ControllerError::BadRequest(
            "Request body must be a JSON object".into(),
        ));
    }
    serde_json::from_value(body).map_err(|err| ControllerError::BadRequest(err.to_string()))
}

/// Completed todos are listed only for a single `showCompleted=true`; a repeated
/// key or an unreadable query string lists pending todos.
fn list_filter(query: Result<Query<Vec<(String, String)>>, QueryRejection>) -> Filter {
    let pairs = match query {
        Ok(Query(pairs)) => pairs,
        Err(_) => return Filter::pending_todos(),
    };
    let mut values = pairs
        .iter()
        .filter(|(key, _)| key == SHOW_COMPLETED)
        .map(|(_, value)| value.as_str());
    match (values.next(), values.next()) {
        (Some("true"), None) => Filter::all_todos(),
        _ => Filter::pending_todos(),
    }
}

/// Ids that are not numbers can never match a todo.
fn parse_id(raw: &str) -> Option<TodoId> {
    raw.parse().ok()
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "SERVING",
        "version": env!("FULL_VERSION"),
    }))
}

#[instrument(skip(api, payload))]
async fn create_todo(
    State(api): State<ApiState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), ControllerError> {
    let todo = todo_input(payload)?.validate()?;

    let todo: Todo =
        storage::send(api.storage_sender, StorageServiceRequest::Create(todo)).await?;
    info!(id = todo.id, "todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}

#[instrument(skip(api, query))]
async fn list_todos(
    State(api): State<ApiState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Vec<Todo>>, ControllerError> {
    let filter = list_filter(query);

    let todos: Vec<Todo> =
        storage::send(api.storage_sender, StorageServiceRequest::List(filter)).await?;
    Ok(Json(todos))
}

#[instrument(skip(api, payload))]
async fn update_todo(
    State(api): State<ApiState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Todo>, ControllerError> {
    let changes = todo_input(payload)?.validate()?;
    let todo_id = parse_id(&id).ok_or(ControllerError::NotFound(id))?;

    let todo: Todo = storage::send(
        api.storage_sender,
        StorageServiceRequest::Update(todo_id, changes),
    )
    .await?;
    info!(id = todo.id, "todo updated");
    Ok(Json(todo))
}

#[instrument(skip(api))]
async fn complete_todo(
    State(api): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, ControllerError> {
    let todo_id = parse_id(&id).ok_or(ControllerError::NotFound(id))?;

    let todo: Todo =
        storage::send(api.storage_sender, StorageServiceRequest::Complete(todo_id)).await?;
    info!(id = todo.id, "todo completed");
    Ok(Json(todo))
}

#[instrument(skip(api))]
async fn delete_todo(
    State(api): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ControllerError> {
    if let Some(todo_id) = parse_id(&id) {
        let () =
            storage::send(api.storage_sender, StorageServiceRequest::Delete(todo_id)).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub struct Server {
    config: ServerConfig,
    storage_sender: Sender<RequestResponse>,
}

impl Server {
    pub fn new(config: ServerConfig, storage_sender: Sender<RequestResponse>) -> Server {
        Server {
            config,
            storage_sender,
        }
    }

    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        listener.set_nonblocking(true)?;
        info!(addr = %listener.local_addr()?, "Starting api...");
        let app = router(&self.config, self.storage_sender)?;

        if let Err(err) = hyper::Server::from_tcp(listener)?
            .serve(app.into_make_service())
            .await
        {
            error!(reason = %err, "Unable to start API.");
            anyhow::bail!("Unable to start API.")
        }
        Ok(())
    }
}

pub fn build_runtime(
    cfg: ServerConfig,
    listener: TcpListener,
    tx_storage: Sender<RequestResponse>,
) -> Result<Runtime, ControllerError> {
    let runtime = Builder::new_multi_thread()
        .thread_name("http-api")
        .enable_all()
        .build()?;

    let api = Server::new(cfg, tx_storage);
    runtime.handle().spawn(async move {
        if let Err(err) = api.serve(listener).await {
            error!(reason = %err, "api stopped");
        }
    });
    Ok(runtime)
}
