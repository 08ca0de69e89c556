#![allow(dead_code)]

use axum::{Router, ServiceExt, extract::ConnectInfo, extract::Request};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::Layer;
use url_pulse::api::routes::{public_routes, shorten_routes};
use url_pulse::domain::entities::{Link, NewLink};
use url_pulse::domain::repositories::LinkRepository;
use url_pulse::infrastructure::persistence::InMemoryLinkRepository;
use url_pulse::routes::app_router;
use url_pulse::state::AppState;

pub const BASE_URL: &str = "http://s.example.com";

pub fn create_test_state() -> AppState {
    create_test_state_with(
        Arc::new(InMemoryLinkRepository::new()),
        Duration::from_millis(500),
    )
}

pub fn create_test_state_with(
    links: Arc<dyn LinkRepository>,
    ws_send_timeout: Duration,
) -> AppState {
    AppState::new(links, BASE_URL, ws_send_timeout)
}

pub async fn create_test_link(state: &AppState, code: &str, url: &str) -> Link {
    state
        .links
        .create(NewLink {
            code: code.to_string(),
            long_url: url.to_string(),
        })
        .await
        .unwrap()
}

/// All routes, without rate limiting or tracing.
pub fn test_router(state: AppState) -> Router {
    Router::new()
        .merge(shorten_routes())
        .merge(public_routes())
        .with_state(state)
}

/// Serves the full application router on an ephemeral local port.
pub async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = app_router(state, false).unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
        )
        .await
        .unwrap();
    });

    addr
}

#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}
