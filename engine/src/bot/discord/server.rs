//! Interactions endpoint and keep-alive server

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, post};
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use super::interaction::{
    deferred_response, pong_response, Interaction, INTERACTION_APPLICATION_COMMAND,
    INTERACTION_PING,
};
use super::rest::DiscordRest;
use super::surface::InteractionSurface;
use crate::bot::commands::{CommandRegistry, Invocation};
use crate::crypto::SignatureVerifier;

/// Discord allows 3s for the initial response
pub const INITIAL_RESPONSE_WINDOW: Duration = Duration::from_millis(2500);

const SIGNATURE_HEADER: &str = "x-signature-ed25519";
const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CommandRegistry>,
    pub verifier: Arc<SignatureVerifier>,
    pub rest: Arc<DiscordRest>,
    pub bot_name: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", any(keep_alive))
        .route("/interactions", post(interactions))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn serve(state: AppState, bind: &str, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind((bind, port)).await?;
    info!(addr = %listener.local_addr()?, "Keep-alive server running");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}

async fn keep_alive(State(state): State<AppState>) -> String {
    format!("🟢 {} bot is alive and connected to Discord!", state.bot_name)
}

async fn interactions(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let timestamp = headers.get(TIMESTAMP_HEADER).and_then(|v| v.to_str().ok());
    let (Some(signature), Some(timestamp)) = (signature, timestamp) else {
        return (StatusCode::UNAUTHORIZED, "invalid request signature").into_response();
    };
    if state.verifier.verify(timestamp, &body, signature).is_err() {
        return (StatusCode::UNAUTHORIZED, "invalid request signature").into_response();
    }

    let interaction: Interaction = match serde_json::from_slice(&body) {
        Ok(i) => i,
        Err(e) => {
            warn!("Malformed interaction: {}", e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match interaction.kind {
        INTERACTION_PING => Json(pong_response()).into_response(),
        INTERACTION_APPLICATION_COMMAND => Json(run_command(&state, interaction).await).into_response(),
        other => {
            debug!("Ignoring interaction type {}", other);
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}

/// Dispatch in the background and return whatever initial response the
/// handler produces within the window
async fn run_command(state: &AppState, interaction: Interaction) -> Value {
    let (Some(command), Some(user)) = (interaction.command_name(), interaction.invoking_user())
    else {
        warn!("Command interaction {} without data or user", interaction.id);
        return deferred_response();
    };

    let (tx, rx) = oneshot::channel();
    let surface = Arc::new(InteractionSurface::new(
        Arc::clone(&state.rest),
        interaction.token.as_str(),
        interaction.channel_id.clone(),
        tx,
    ));
    let invocation = Invocation {
        command: command.to_string(),
        user: user.to_ref(),
        guild_id: interaction.guild_id.clone(),
        channel_id: interaction.channel_id.clone(),
        member_permissions: interaction.member_permissions(),
        options: interaction.command_options(),
        surface,
    };

    let registry = Arc::clone(&state.registry);
    tokio::spawn(async move {
        registry.dispatch(&invocation).await;
    });

    match tokio::time::timeout(INITIAL_RESPONSE_WINDOW, rx).await {
        Ok(Ok(body)) => body,
        Ok(Err(_)) => {
            debug!("Handler finished without an initial response");
            deferred_response()
        }
        Err(_) => {
            debug!("No initial response within {:?}, deferring", INITIAL_RESPONSE_WINDOW);
            deferred_response()
        }
    }
}
