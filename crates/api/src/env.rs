use avatar_common::EnvVars;

pub struct ApiServerEnv {
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_price_basic: String,
    pub stripe_price_standard: String,
    pub stripe_price_premium: String,
}

impl EnvVars for ApiServerEnv {
    fn load() -> Self {
        Self {
            stripe_secret_key: std::env::var("STRIPE_SECRET_KEY").unwrap(),
            stripe_webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET").unwrap(),
            stripe_price_basic: std::env::var("STRIPE_PRICE_BASIC").unwrap(),
            stripe_price_standard: std::env::var("STRIPE_PRICE_STANDARD").unwrap(),
            stripe_price_premium: std::env::var("STRIPE_PRICE_PREMIUM").unwrap(),
        }
    }

    fn get_env_var(&self, key: &str) -> String {
        match key {
            "STRIPE_SECRET_KEY" => self.stripe_secret_key.clone(),
            "STRIPE_WEBHOOK_SECRET" => self.stripe_webhook_secret.clone(),
            "STRIPE_PRICE_BASIC" => self.stripe_price_basic.clone(),
            "STRIPE_PRICE_STANDARD" => self.stripe_price_standard.clone(),
            "STRIPE_PRICE_PREMIUM" => self.stripe_price_premium.clone(),
            _ => panic!("{} is not set", key),
        }
    }
}
