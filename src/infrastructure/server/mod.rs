mod dto;
mod error;
mod routes;
mod state;

pub use error::ServerError;

use crate::client::ChatClient;
use crate::model::GenerationProvider;
use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use dto::{ErrorResponse, RestChatRequest, RestChatResponse, ToolInventoryResponse};
use state::ServerState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(routes::chat::chat_handler, routes::tools::tools_handler),
    components(schemas(
        RestChatRequest,
        RestChatResponse,
        ErrorResponse,
        ToolInventoryResponse,
        crate::agent::AgentStep,
        crate::agent::ContinuationPolicy,
        crate::agent::TerminationReason,
        crate::tooling::ToolSchema
    )),
    tags(
        (name = "chat", description = "Run a tool-grounded conversation turn"),
        (name = "tools", description = "Registered tool inventory")
    )
)]
struct ApiDoc;

pub async fn serve<P>(client: Arc<ChatClient<P>>, addr: SocketAddr) -> Result<(), ServerError>
where
    P: GenerationProvider + 'static,
{
    let api = ApiDoc::openapi();
    info!(%addr, "Binding REST server");

    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:5173"),
            HeaderValue::from_static("http://127.0.0.1:5173"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let state = Arc::new(ServerState::new(client));
    let app = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", api))
        .route("/chat", post(routes::chat::chat_handler::<P>))
        .route("/tools", get(routes::tools::tools_handler::<P>))
        .layer(cors)
        .with_state(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, "REST server ready to accept connections");

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(ServerError::Serve)
}
