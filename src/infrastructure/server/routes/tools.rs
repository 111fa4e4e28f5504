use super::super::dto::ToolInventoryResponse;
use super::super::state::ServerState;
use crate::model::GenerationProvider;
use axum::Json;
use axum::extract::State;
use std::sync::Arc;
use tracing::debug;

#[utoipa::path(
    get,
    path = "/tools",
    tag = "tools",
    responses(
        (status = 200, description = "Registered tools", body = ToolInventoryResponse)
    )
)]
pub(crate) async fn tools_handler<P: GenerationProvider>(
    State(state): State<Arc<ServerState<P>>>,
) -> Json<ToolInventoryResponse> {
    let tools = state.client().tools();
    debug!(tool_count = tools.len(), "Serving /tools request");
    Json(ToolInventoryResponse { tools })
}
