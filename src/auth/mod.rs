pub mod credentials;
pub mod gateway;
pub mod vault;

pub use credentials::{Credentials, LoginForm};
pub use gateway::{AuthGateway, HttpAuthGateway, LoginResponse, RefreshResponse};
pub use vault::{EphemeralVault, FileVault, StoredSession, TokenVault};
