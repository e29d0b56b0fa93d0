mod identity;
mod postgres;

pub use identity::{AuthUser, IdentityClient, SignupMetadata};
pub use postgres::PostgresClient;
