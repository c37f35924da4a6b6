//! Endpoint server for exposing metrics and health checks

use crate::metrics::metrics;
use anyhow::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start the endpoint server
pub async fn endpoint_server(port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Metrics endpoint listening on {}", addr);
    serve(listener).await
}

/// Accept loop; `/health` answers `ok`, every other path gets the metrics
pub async fn serve(listener: TcpListener) -> Result<()> {
    loop {
        match listener.accept().await {
            Ok((mut socket, _addr)) => {
                tokio::spawn(async move {
                    let mut buf = [0; 1024];
                    match socket.read(&mut buf).await {
                        Ok(n) => {
                            let request = String::from_utf8_lossy(&buf[..n]);
                            let response = respond(&request);
                            if let Err(e) = socket.write_all(response.as_bytes()).await {
                                tracing::debug!("Failed to write response: {}", e);
                            }
                        }
                        Err(e) => {
                            tracing::error!("Failed to read from socket: {}", e);
                        }
                    }
                });
            }
            Err(e) => {
                tracing::error!("Failed to accept connection: {}", e);
            }
        }
    }
}

fn respond(request: &str) -> String {
    if request.starts_with("GET /health") {
        return http_ok("text/plain", "ok");
    }
    match metrics().render() {
        Ok(body) => http_ok("text/plain; version=0.0.4", &body),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n".to_string()
        }
    }
}

fn http_ok(content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n{}",
        content_type,
        body.len(),
        body
    )
}
