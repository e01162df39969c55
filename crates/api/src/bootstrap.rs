use crate::auth::Authorizer;
use crate::error::AuthError;
use crate::flow::{AuthorizationFlow, FlowOptions};
use crate::store::CredentialStore;
use crate::types::AccessCredential;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Reloaded from the credential store; no remote calls were made.
    Store,
    /// Obtained through the browser flow. `persisted` is false when the store write failed.
    Authorized { persisted: bool },
}

#[derive(Debug, Clone)]
pub struct Acquired {
    pub credential: AccessCredential,
    pub origin: Origin,
}

/// Returns the cached credential, or runs the browser flow and caches its result.
///
/// A failed store write is logged and reported through `Origin::Authorized`, but the
/// freshly obtained credential is still returned for the current run.
pub async fn acquire<A, P>(
    store: &CredentialStore,
    authorizer: &A,
    options: FlowOptions,
    present: P,
) -> Result<Acquired, AuthError>
where
    A: Authorizer + ?Sized,
    P: FnOnce(&Url),
{
    match store.load() {
        Ok(credential) => {
            return Ok(Acquired {
                credential,
                origin: Origin::Store,
            })
        }
        Err(e) => info!("{e}; starting authorization"),
    }

    let credential = AuthorizationFlow::new(authorizer, options)
        .run(present)
        .await?;

    let persisted = match store.save(&credential) {
        Ok(()) => true,
        Err(e) => {
            warn!("{e}; continuing with the in-memory credential");
            false
        }
    };

    Ok(Acquired {
        credential,
        origin: Origin::Authorized { persisted },
    })
}
