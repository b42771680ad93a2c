//! Farcaster frame endpoint
//!
//! `POST /api/flip` flips a fixed wager with the server's custodial signer and
//! answers with a frame document showing the result and a "Play Again" button.

use crate::chain::ChainReader;
use crate::client::FlipClient;
use crate::config::FrameConfig;
use crate::error::Result;
use crate::signer::TransactionSigner;
use crate::types::{Face, Outcome};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub const FLIP_ROUTE: &str = "/api/flip";

/// Frame action body; only the pressed button is used
///
/// `untrustedData` is required. A body without it is not a frame action and is
/// never flipped on.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrameAction {
    untrusted_data: UntrustedData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UntrustedData {
    #[serde(default)]
    button_index: Value,
}

/// Button 1 is heads; every other value, missing included, is tails
pub fn face_for_button(button_index: &Value) -> Face {
    if button_index.as_f64() == Some(1.0) {
        Face::Heads
    } else {
        Face::Tails
    }
}

/// Flips on behalf of frame users and renders the result
pub struct FrameResponder<R: ChainReader, S: TransactionSigner> {
    client: FlipClient<R, S>,
    config: FrameConfig,
}

impl<R: ChainReader, S: TransactionSigner> FrameResponder<R, S> {
    pub fn new(client: FlipClient<R, S>, config: FrameConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Flip the configured wager on the face chosen by `button_index`
    pub async fn handle(&self, button_index: &Value) -> Result<String> {
        let face = face_for_button(button_index);
        tracing::info!(%face, token = %self.config.token, amount = %self.config.amount, "Frame flip");

        let receipt = self
            .client
            .flip(&self.config.token, &self.config.amount, face)
            .await?;
        Ok(render_frame(receipt.outcome, &self.config))
    }
}

/// The frame document for `outcome`
pub fn render_frame(outcome: Outcome, config: &FrameConfig) -> String {
    let result = outcome.as_str();
    let image = escape_attr(&format!(
        "{}/{}.png",
        config.image_base_url,
        result.to_lowercase()
    ));
    let target = escape_attr(&config.endpoint_url);

    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta property="og:title" content="Result: {result}" />
    <meta property="og:image" content="{image}" />
    <meta property="fc:frame" content="vNext" />
    <meta property="fc:frame:image" content="{image}" />
    <meta property="fc:frame:button:1" content="Play Again" />
    <meta property="fc:frame:button:1:action" content="post" />
    <meta property="fc:frame:button:1:target" content="{target}" />
  </head>
</html>
"#
    )
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// Router serving the frame endpoint
pub fn router<R, S>(responder: Arc<FrameResponder<R, S>>) -> Router
where
    R: ChainReader + 'static,
    S: TransactionSigner + 'static,
{
    Router::new()
        .route(FLIP_ROUTE, any(flip_endpoint::<R, S>))
        .with_state(responder)
}

async fn flip_endpoint<R, S>(
    State(responder): State<Arc<FrameResponder<R, S>>>,
    method: Method,
    body: Bytes,
) -> Response
where
    R: ChainReader,
    S: TransactionSigner,
{
    if method != Method::POST {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "POST")],
            "Method Not Allowed",
        )
            .into_response();
    }

    let action: FrameAction = match serde_json::from_slice(&body) {
        Ok(action) => action,
        Err(err) => {
            tracing::warn!("Malformed frame action: {}", err);
            return (StatusCode::BAD_REQUEST, "Invalid frame action").into_response();
        }
    };

    match responder.handle(&action.untrusted_data.button_index).await {
        Ok(html) => (StatusCode::OK, [(header::CONTENT_TYPE, "text/html")], html).into_response(),
        Err(err) => {
            tracing::error!("Error flipping coin: {:#}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error flipping coin").into_response()
        }
    }
}
