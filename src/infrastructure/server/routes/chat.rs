use super::super::dto::{ErrorResponse, RestChatRequest, RestChatResponse};
use super::super::state::ServerState;
use crate::client::ChatRequest;
use crate::model::GenerationProvider;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use std::sync::Arc;
use tracing::{error, info};

#[utoipa::path(
    post,
    path = "/chat",
    tag = "chat",
    request_body = RestChatRequest,
    responses(
        (status = 200, description = "Turn completed", body = RestChatResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 502, description = "Generation engine unreachable", body = ErrorResponse)
    )
)]
pub(crate) async fn chat_handler<P: GenerationProvider>(
    State(state): State<Arc<ServerState<P>>>,
    Json(payload): Json<RestChatRequest>,
) -> Result<Json<RestChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!(
        session = payload.session_id.as_deref(),
        "Received /chat request"
    );

    if payload.prompt.trim().is_empty() {
        error!("Rejecting /chat request due to empty prompt");
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "prompt cannot be empty".to_string(),
            }),
        ));
    }

    let client = state.client();
    let mut request = ChatRequest::prompt(payload.prompt);
    request.model = payload.model;
    request.system_prompt = payload.system_prompt;
    request.session_id = payload.session_id;
    request.max_tool_steps = payload.max_tool_steps;
    request.continuation = payload.continuation;

    match client.chat(request).await {
        Ok(result) => {
            info!(
                session_id = result.session_id.as_str(),
                termination = ?result.termination,
                "Chat turn completed successfully"
            );
            Ok(Json(RestChatResponse {
                session_id: result.session_id,
                content: result.content,
                termination: result.termination,
                tool_steps: result.steps,
            }))
        }
        Err(err) => {
            error!(%err, "Chat turn failed");
            let message = err.user_message();
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse { error: message }),
            ))
        }
    }
}
