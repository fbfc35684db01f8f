//! Authentication Module
//! Mission: Bearer tokens on login, hashed credentials, revocation on logout

pub mod api;
pub mod clock;
pub mod credential_store;
pub mod errors;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod revocation;
pub mod service;

pub use api::AuthState;
pub use clock::{Clock, ManualClock, SystemClock};
pub use credential_store::CredentialStore;
pub use errors::{AuthError, CredentialError, Denial, RevocationError, TokenError};
pub use jwt::{TokenCodec, TokenSettings};
pub use middleware::auth_middleware;
pub use revocation::RevocationList;
pub use service::{AuthPipeline, RequestContext};
