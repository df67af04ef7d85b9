//! Discovery endpoints: landing page, topic listing, and health.

use axum::{Json, extract::State, response::Html};
use serde_json::json;

use crate::state::AppState;

/// Landing page listing one live-view link per configured topic.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let mut links = String::new();
    for topic in state.registry.topics() {
        links.push_str(&format!(
            "      <li><a href=\"/{topic}\">{topic}</a></li>\n"
        ));
    }
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>framewall</title>
  </head>
  <body>
    <h1>framewall live views</h1>
    <ul>
{links}    </ul>
  </body>
</html>
"#
    ))
}

/// Configured topics, in subscription order.
pub async fn topics(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.registry.topics().to_vec())
}

/// Liveness probe with per-topic buffer depths.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let buffers: serde_json::Map<String, serde_json::Value> = state
        .registry
        .topics()
        .iter()
        .map(|topic| {
            let depth = state
                .registry
                .get(topic)
                .map(|buffer| buffer.len())
                .unwrap_or(0);
            (topic.clone(), json!(depth))
        })
        .collect();

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "topics": state.registry.len(),
        "buffers": buffers,
    }))
}
