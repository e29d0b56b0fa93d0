use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use avatar_common::define_module_client;
use avatar_common::ModuleClient;

/// Free-form metadata the frontend attaches at signup time. The identity
/// provider stores it verbatim, camelCase and all; the aliases accept both
/// spellings so backfilled accounts keep parsing.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SignupMetadata {
    #[serde(alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(alias = "lastName")]
    pub last_name: Option<String>,
    pub phone: Option<String>,
    #[serde(alias = "referralCode")]
    pub referral_code: Option<String>,
    #[serde(alias = "referredBy")]
    pub referred_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(default, alias = "user_metadata")]
    pub metadata: SignupMetadata,
}

#[derive(Debug, Deserialize)]
struct UserListPage {
    #[serde(default)]
    users: Vec<AuthUser>,
}

#[derive(Debug, Serialize)]
struct CreateUserPayload<'a> {
    email: &'a str,
    password: &'a str,
    email_confirm: bool,
    user_metadata: &'a SignupMetadata,
}

define_module_client! {
    (struct IdentityClient, "identity")
    client_type: Client,
    env: ["IDENTITY_BASE_URL", "IDENTITY_SERVICE_KEY"],
    setup: async {
        Client::new()
    }
}

const ADMIN_LIST_PAGE_SIZE: usize = 1000;
const ADMIN_LIST_MAX_PAGES: usize = 20;

impl IdentityClient {
    fn base_url() -> Result<String> {
        std::env::var("IDENTITY_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .map_err(|_| anyhow!("IDENTITY_BASE_URL environment variable not set"))
    }

    fn service_key() -> Result<String> {
        std::env::var("IDENTITY_SERVICE_KEY")
            .map_err(|_| anyhow!("IDENTITY_SERVICE_KEY environment variable not set"))
    }

    /// Resolves a bearer token to the account it belongs to.
    pub async fn get_user(&self, token: &str) -> Result<AuthUser> {
        let base_url = Self::base_url()?;
        let service_key = Self::service_key()?;

        let response = self.get_client()
            .get(format!("{}/auth/v1/user", base_url))
            .header("apikey", &service_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| anyhow!("[IdentityClient::get_user] request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("[IdentityClient::get_user] rejected with status {}: {}", status, text));
        }

        response.json::<AuthUser>()
            .await
            .map_err(|e| anyhow!("[IdentityClient::get_user] malformed user payload: {}", e))
    }

    /// Walks the admin user listing looking for an exact, case-insensitive
    /// email match. The provider offers no server-side email filter, so
    /// pages are scanned until a match or the bounded page budget runs out.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>> {
        let base_url = Self::base_url()?;
        let service_key = Self::service_key()?;
        let needle = email.trim();

        for page in 1..=ADMIN_LIST_MAX_PAGES {
            let response = self.get_client()
                .get(format!("{}/auth/v1/admin/users", base_url))
                .query(&[("page", page.to_string()), ("per_page", ADMIN_LIST_PAGE_SIZE.to_string())])
                .header("apikey", &service_key)
                .bearer_auth(&service_key)
                .send()
                .await
                .map_err(|e| anyhow!("[IdentityClient::find_user_by_email] request failed: {}", e))?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
                return Err(anyhow!("[IdentityClient::find_user_by_email] listing failed with status {}: {}", status, text));
            }

            let page_payload = response.json::<UserListPage>()
                .await
                .map_err(|e| anyhow!("[IdentityClient::find_user_by_email] malformed listing payload: {}", e))?;

            if page_payload.users.is_empty() {
                return Ok(None);
            }

            let found = page_payload.users.into_iter().find(|user| {
                user.email.as_deref().is_some_and(|candidate| candidate.eq_ignore_ascii_case(needle))
            });
            if found.is_some() {
                return Ok(found);
            }

            if page == ADMIN_LIST_MAX_PAGES {
                tracing::warn!("[IdentityClient::find_user_by_email] page budget exhausted before finding {}", needle);
            }
        }

        Ok(None)
    }

    /// Provisions an account with a pre-set password; used by the bulk
    /// import tooling. The email lands pre-confirmed so the patient can
    /// sign in with the handed-out credentials immediately.
    pub async fn create_user(&self, email: &str, password: &str, metadata: &SignupMetadata) -> Result<AuthUser> {
        let base_url = Self::base_url()?;
        let service_key = Self::service_key()?;

        let payload = CreateUserPayload {
            email,
            password,
            email_confirm: true,
            user_metadata: metadata,
        };

        let response = self.get_client()
            .post(format!("{}/auth/v1/admin/users", base_url))
            .header("apikey", &service_key)
            .bearer_auth(&service_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| anyhow!("[IdentityClient::create_user] request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("[IdentityClient::create_user] failed with status {}: {}", status, text));
        }

        response.json::<AuthUser>()
            .await
            .map_err(|e| anyhow!("[IdentityClient::create_user] malformed user payload: {}", e))
    }
}
