//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use edge_gateway::config::{parse_config, ConfigRouteDefinitionLocator};
use edge_gateway::lifecycle::Shutdown;
use edge_gateway::routing::{default_registry, RouteDefinitionRouteLocator};
use edge_gateway::HttpServer;

/// Start a mock backend that echoes the request line and headers it received.
///
/// The response body is `<METHOD> <path-and-query>` followed by one
/// `name: value` line per request header, lowercased.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }

                let head = String::from_utf8_lossy(&buf).to_string();
                let mut lines = head.split("\r\n");
                let request_line = lines.next().unwrap_or_default();
                let mut body = request_line
                    .rsplit_once(' ')
                    .map(|(start, _version)| start.to_string())
                    .unwrap_or_default();
                for line in lines.take_while(|l| !l.is_empty()) {
                    body.push('\n');
                    body.push_str(&line.to_ascii_lowercase());
                }

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// A gateway running on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Compile `config_toml` and serve it.
pub async fn start_gateway(config_toml: &str) -> TestGateway {
    let config = parse_config(config_toml).unwrap();

    let definitions = Arc::new(ConfigRouteDefinitionLocator::new(&config));
    let table = RouteDefinitionRouteLocator::from_config(definitions, Arc::new(default_registry()), &config)
        .route_table()
        .await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config, Arc::new(ArcSwap::from_pointee(table)));
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestGateway { addr, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
