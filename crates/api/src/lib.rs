pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod callback;
pub mod error;
pub mod flow;
pub mod store;
pub mod types;

pub use api::{PocketApi, DEFAULT_BASE_URL};
pub use auth::{Authorizer, PocketAuth};
pub use bootstrap::{acquire, Acquired, Origin};
pub use error::{ApiError, ApiResult, AuthError, StoreError};
pub use flow::{AuthorizationFlow, FlowOptions, FlowState};
pub use store::CredentialStore;
pub use types::*;
