//! Loopback listener standing in for the OAuth redirect target.
//!
//! The browser lands here once the user approves access. Any request other than a
//! favicon request counts as "the redirect arrived" and fires the one-shot signal;
//! everything after that is answered but ignored.

use crate::error::AuthError;
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

const FAVICON_PATH: &str = "/favicon.ico";
/// How long `stop` lets in-flight responses drain before aborting the server.
const STOP_GRACE: Duration = Duration::from_secs(1);

type SignalSlot = Arc<Mutex<Option<oneshot::Sender<()>>>>;

pub struct CallbackServer {
    redirect_target: Url,
    signal: Option<oneshot::Receiver<()>>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl CallbackServer {
    /// Binds before returning, so the redirect target is reachable as soon as the
    /// caller can see it.
    pub async fn start(bind_addr: SocketAddr) -> Result<Self, AuthError> {
        let listener = TcpListener::bind(bind_addr).await.map_err(AuthError::Bind)?;
        let local_addr = listener.local_addr().map_err(AuthError::Bind)?;
        let redirect_target = Url::parse(&format!("http://{local_addr}/"))?;

        let (tx, rx) = oneshot::channel();
        let app = Router::new()
            .fallback(redirect)
            .with_state(Arc::new(Mutex::new(Some(tx))));

        let shutdown = CancellationToken::new();
        let graceful = shutdown.clone();
        let task = tokio::spawn(async move {
            let server =
                axum::serve(listener, app).with_graceful_shutdown(graceful.cancelled_owned());
            if let Err(e) = server.await {
                warn!("Callback listener failed: {e}");
            }
            debug!("Callback listener released");
        });

        debug!(%local_addr, "Callback listener bound");
        Ok(Self {
            redirect_target,
            signal: Some(rx),
            shutdown,
            task: Some(task),
        })
    }

    pub fn redirect_target(&self) -> &Url {
        &self.redirect_target
    }

    /// Suspends until the redirect is observed, the deadline passes, or `cancel` fires.
    /// `None` waits forever.
    pub async fn wait(
        &mut self,
        deadline: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<(), AuthError> {
        let signal = self.signal.take().ok_or(AuthError::SignalConsumed)?;
        let received = async move {
            let outcome = match deadline {
                Some(limit) => match tokio::time::timeout(limit, signal).await {
                    Ok(outcome) => outcome,
                    Err(_) => return Err(AuthError::Timeout(limit)),
                },
                None => signal.await,
            };
            outcome.map_err(|_| AuthError::ListenerClosed)
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(AuthError::Cancelled),
            result = received => result,
        }
    }

    /// Releases the listener, closes idle connections, and waits briefly for in-flight
    /// responses before aborting the server.
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            let abort = task.abort_handle();
            if tokio::time::timeout(STOP_GRACE, task).await.is_err() {
                debug!("Callback listener did not drain in time; aborting");
                abort.abort();
            }
        }
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn redirect(State(slot): State<SignalSlot>, uri: Uri) -> Response {
    if uri.path() == FAVICON_PATH {
        return (StatusCode::NOT_FOUND, "Not Found\n").into_response();
    }

    fire(&slot);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        "Authorized.\n",
    )
        .into_response()
}

fn fire(slot: &SignalSlot) {
    let sender = match slot.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    if let Some(tx) = sender {
        info!("Authorization redirect received");
        let _ = tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::{Client, StatusCode};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    fn client() -> Client {
        Client::builder().no_proxy().build().unwrap()
    }

    async fn get(url: Url) -> (StatusCode, String) {
        let response = client().get(url).send().await.unwrap();
        let status = response.status();
        (status, response.text().await.unwrap())
    }

    #[tokio::test]
    async fn binds_an_os_assigned_port() {
        let server = CallbackServer::start(loopback()).await.unwrap();
        let target = server.redirect_target();
        assert_eq!(target.host_str(), Some("127.0.0.1"));
        assert!(target.port().is_some_and(|p| p != 0));
        server.stop().await;
    }

    #[tokio::test]
    async fn redirect_fires_signal_and_confirms() {
        let mut server = CallbackServer::start(loopback()).await.unwrap();
        let url = server.redirect_target().join("/?state=ok").unwrap();

        let (status, body) = get(url).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.trim(), "Authorized.");

        server
            .wait(Some(Duration::from_secs(5)), &CancellationToken::new())
            .await
            .unwrap();
        server.stop().await;
    }

    #[tokio::test]
    async fn content_type_is_plain_text() {
        let server = CallbackServer::start(loopback()).await.unwrap();
        let response = client()
            .get(server.redirect_target().clone())
            .send()
            .await
            .unwrap();
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/plain"
        );
        server.stop().await;
    }

    #[tokio::test]
    async fn favicon_never_signals() {
        let mut server = CallbackServer::start(loopback()).await.unwrap();
        let favicon = server.redirect_target().join("/favicon.ico").unwrap();

        for _ in 0..3 {
            let (status, _) = get(favicon.clone()).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }

        let result = server
            .wait(Some(Duration::from_millis(200)), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(AuthError::Timeout(_))));
        server.stop().await;
    }

    #[tokio::test]
    async fn favicon_after_redirect_is_still_not_found() {
        let mut server = CallbackServer::start(loopback()).await.unwrap();
        let base = server.redirect_target().clone();

        let (status, _) = get(base.clone()).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = get(base.join("/favicon.ico").unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        server.wait(None, &CancellationToken::new()).await.unwrap();
        server.stop().await;
    }

    #[tokio::test]
    async fn many_concurrent_redirects_signal_once() {
        let mut server = CallbackServer::start(loopback()).await.unwrap();
        let base = server.redirect_target().clone();

        let requests: Vec<_> = (0..8)
            .map(|i| {
                let url = if i % 3 == 0 {
                    base.join("/favicon.ico").unwrap()
                } else {
                    base.join(&format!("/callback/{i}")).unwrap()
                };
                tokio::spawn(get(url))
            })
            .collect();
        for request in requests {
            request.await.unwrap();
        }

        server
            .wait(Some(Duration::from_secs(5)), &CancellationToken::new())
            .await
            .unwrap();
        let again = server
            .wait(Some(Duration::from_millis(50)), &CancellationToken::new())
            .await;
        assert!(matches!(again, Err(AuthError::SignalConsumed)));

        // Late arrivals are still answered.
        let (status, body) = get(base).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.trim(), "Authorized.");
        server.stop().await;
    }

    #[tokio::test]
    async fn empty_connection_is_not_a_redirect() {
        let mut server = CallbackServer::start(loopback()).await.unwrap();
        let addr = format!(
            "127.0.0.1:{}",
            server.redirect_target().port().unwrap()
        );

        let stream = TcpStream::connect(&addr).await.unwrap();
        drop(stream);

        let result = server
            .wait(Some(Duration::from_millis(200)), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(AuthError::Timeout(_))));
        server.stop().await;
    }

    #[tokio::test]
    async fn cancellation_interrupts_wait() {
        let mut server = CallbackServer::start(loopback()).await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = server.wait(None, &cancel).await;
        assert!(matches!(result, Err(AuthError::Cancelled)));
        server.stop().await;
    }

    #[tokio::test]
    async fn stop_releases_the_listener() {
        let server = CallbackServer::start(loopback()).await.unwrap();
        let addr = format!("127.0.0.1:{}", server.redirect_target().port().unwrap());

        server.stop().await;

        assert!(TcpStream::connect(&addr).await.is_err());
    }

    #[tokio::test]
    async fn drop_releases_the_listener() {
        let server = CallbackServer::start(loopback()).await.unwrap();
        let addr = format!("127.0.0.1:{}", server.redirect_target().port().unwrap());

        drop(server);
        // The aborted task drops the listener on its next poll.
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(TcpStream::connect(&addr).await.is_err());
    }

    #[tokio::test]
    async fn stop_closes_idle_connections() {
        let mut server = CallbackServer::start(loopback()).await.unwrap();
        let addr = format!("127.0.0.1:{}", server.redirect_target().port().unwrap());

        // A browser preconnect: accepted, but never sends a request.
        let mut idle = TcpStream::connect(&addr).await.unwrap();
        let (status, _) = get(server.redirect_target().clone()).await;
        assert_eq!(status, StatusCode::OK);
        server
            .wait(Some(Duration::from_secs(5)), &CancellationToken::new())
            .await
            .unwrap();

        server.stop().await;

        let mut buf = [0u8; 64];
        let read = tokio::time::timeout(Duration::from_secs(2), idle.read(&mut buf)).await;
        assert!(
            matches!(read, Ok(Ok(0)) | Ok(Err(_))),
            "idle connection still open after stop: {read:?}"
        );
    }
}
