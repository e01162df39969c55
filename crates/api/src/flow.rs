use crate::auth::Authorizer;
use crate::callback::CallbackServer;
use crate::error::AuthError;
use crate::types::AccessCredential;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    RequestTokenObtained,
    AwaitingUserAuthorization,
    RedirectObserved,
    AccessCredentialObtained,
    Failed,
}

#[derive(Debug, Clone)]
pub struct FlowOptions {
    /// Where the redirect listener binds. Port 0 lets the OS choose.
    pub bind_addr: SocketAddr,
    /// `None` waits for the browser indefinitely.
    pub deadline: Option<Duration>,
    pub cancel: CancellationToken,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }
}

/// One browser-based authorization attempt. Not resumable: a failed flow is discarded
/// and the next run starts over.
pub struct AuthorizationFlow<'a, A: Authorizer + ?Sized> {
    authorizer: &'a A,
    options: FlowOptions,
    state: FlowState,
}

impl<'a, A: Authorizer + ?Sized> AuthorizationFlow<'a, A> {
    pub fn new(authorizer: &'a A, options: FlowOptions) -> Self {
        Self {
            authorizer,
            options,
            state: FlowState::Idle,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Runs the flow to completion. `present` receives the authorization URL once the
    /// redirect listener is already accepting connections.
    pub async fn run<P>(&mut self, present: P) -> Result<AccessCredential, AuthError>
    where
        P: FnOnce(&Url),
    {
        match self.drive(present).await {
            Ok(credential) => Ok(credential),
            Err(e) => {
                warn!(state = ?self.state, "Authorization flow failed: {e}");
                self.state = FlowState::Failed;
                Err(e)
            }
        }
    }

    async fn drive<P>(&mut self, present: P) -> Result<AccessCredential, AuthError>
    where
        P: FnOnce(&Url),
    {
        let mut server = CallbackServer::start(self.options.bind_addr).await?;
        let redirect_target = server.redirect_target().clone();

        let token = self
            .authorizer
            .obtain_request_token(&redirect_target)
            .await?;
        self.state = FlowState::RequestTokenObtained;

        let url = self.authorizer.authorization_url(&token, &redirect_target);
        self.state = FlowState::AwaitingUserAuthorization;
        info!("Waiting for authorization in the browser");
        present(&url);

        server
            .wait(self.options.deadline, &self.options.cancel)
            .await?;
        self.state = FlowState::RedirectObserved;
        server.stop().await;

        let credential = self.authorizer.exchange_request_token(token).await?;
        self.state = FlowState::AccessCredentialObtained;
        info!(username = credential.username(), "Authorization complete");
        Ok(credential)
    }
}
