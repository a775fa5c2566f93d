//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use edge_gateway::config::{EndpointConfig, GatewayConfig};
use edge_gateway::{HttpServer, Pipeline, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// A running gateway. Dropping it shuts the server down.
pub struct Gateway {
    pub addr: SocketAddr,
    _shutdown: Shutdown,
}

impl Gateway {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }
}

/// Start a gateway serving the given endpoints through their backends.
#[allow(dead_code)]
pub async fn start_gateway(endpoints: Vec<EndpointConfig>) -> Gateway {
    let mut config = GatewayConfig::default();
    config.endpoints = endpoints;
    serve(HttpServer::new(config).unwrap()).await
}

/// Start a gateway with a single endpoint answered by `pipeline`.
#[allow(dead_code)]
pub async fn start_gateway_with(endpoint: EndpointConfig, pipeline: Arc<dyn Pipeline>) -> Gateway {
    let mut config = GatewayConfig::default();
    config.endpoints.push(endpoint);
    serve(HttpServer::with_pipelines(config, move |_: &EndpointConfig| pipeline.clone()).unwrap()).await
}

async fn serve(server: HttpServer) -> Gateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    Gateway {
        addr,
        _shutdown: shutdown,
    }
}

/// Start a mock backend that answers every request with `status` and a JSON body,
/// and reports each raw request line on the returned channel.
#[allow(dead_code)]
pub async fn start_mock_backend(
    status: &'static str,
    body: &'static str,
) -> (SocketAddr, tokio::sync::mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (seen_tx, seen_rx) = tokio::sync::mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let seen_tx = seen_tx.clone();
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 4096];
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        let head = String::from_utf8_lossy(&buf[..n]).to_string();
                        let _ = seen_tx.send(head.lines().next().unwrap_or_default().to_string());

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, seen_rx)
}
