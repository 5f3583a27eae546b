//! Landing page.

use std::sync::Arc;

use axum::{extract::State, response::Html};

use linux_dvb::DeviceTree;

use crate::web::AppState;

/// Serve a small page pointing at the metrics endpoint.
pub async fn index<T>(State(state): State<Arc<AppState<T>>>) -> Html<String>
where
    T: DeviceTree + Send + Sync + 'static,
{
    Html(HTML_CONTENT.replace("{telemetry_path}", &state.telemetry_path))
}

const HTML_CONTENT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Linux DVB Exporter</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; margin: 2em; }
        code { background: #f4f4f4; padding: 0 4px; }
    </style>
</head>
<body>
    <h1>Linux DVB Exporter</h1>
    <p>Lock status and signal statistics of every frontend under the DVB device tree.</p>
    <p><a href="{telemetry_path}">Metrics</a></p>
</body>
</html>
"#;
