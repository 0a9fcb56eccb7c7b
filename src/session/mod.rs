//! Admin session handling
//!
//! - [`AdminCredentials`]: the single configured login
//! - [`SessionGate`]: single-client login state with 24 hour expiry
//! - [`SessionRegistry`]: server-side table of bearer sessions

mod credentials;
mod gate;
mod registry;

pub use credentials::{
    AdminCredentials, ADMIN_PASSWORD_ENV, ADMIN_USERNAME_ENV, DEFAULT_ADMIN_PASSWORD,
    DEFAULT_ADMIN_USERNAME,
};
pub use gate::{SessionGate, SessionToken, SESSION_TTL_MS};
pub use registry::{SessionRegistry, SWEEP_INTERVAL};
