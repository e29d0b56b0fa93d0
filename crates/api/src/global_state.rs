use anyhow::Result;
use stripe::Client as StripeClient;

use avatar_clients::{IdentityClient, PostgresClient};
use avatar_common::ModuleClient;

#[derive(Clone)]
pub struct GlobalState {
    pub db: PostgresClient,
    pub identity: IdentityClient,
    pub stripe_client: StripeClient,
}

impl GlobalState {
    pub async fn new() -> Result<Self> {
        let db = PostgresClient::setup_connection().await;
        let identity = IdentityClient::setup_connection().await;
        let stripe_client = StripeClient::new(&std::env::var("STRIPE_SECRET_KEY").unwrap());

        Ok(Self {
            db,
            identity,
            stripe_client,
        })
    }
}
