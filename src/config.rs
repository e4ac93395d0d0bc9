use std::env;

/// Stripe credentials and the price IDs for each subscription interval.
#[derive(Debug, Clone)]
pub struct StripeSettings {
    pub secret_key: String,
    pub webhook_secret: String,
    pub price_monthly: String,
    pub price_yearly: String,
}

/// OAuth settings for federated sign-in. Absent config disables the flow.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    /// Userinfo endpoint queried with the provider access token.
    pub userinfo_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    pub session_secret: String,
    pub session_ttl_mins: u64,
    pub bootstrap_super_admin_email: Option<String>,
    pub stripe: Option<StripeSettings>,
    pub oauth: Option<OAuthSettings>,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("TILLPOINT_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        let session_secret = env::var("SESSION_SECRET").unwrap_or_else(|_| {
            if dev_mode {
                tracing::warn!("SESSION_SECRET not set, using dev-only default");
                "tillpoint-dev-session-secret".to_string()
            } else {
                panic!("SESSION_SECRET must be set outside dev mode")
            }
        });

        let stripe = match (
            env::var("STRIPE_SECRET_KEY"),
            env::var("STRIPE_WEBHOOK_SECRET"),
            env::var("STRIPE_PRICE_MONTHLY"),
            env::var("STRIPE_PRICE_YEARLY"),
        ) {
            (Ok(secret_key), Ok(webhook_secret), Ok(price_monthly), Ok(price_yearly)) => {
                Some(StripeSettings {
                    secret_key,
                    webhook_secret,
                    price_monthly,
                    price_yearly,
                })
            }
            _ => {
                tracing::warn!("Stripe env vars incomplete, billing disabled");
                None
            }
        };

        let oauth = match (
            env::var("OAUTH_CLIENT_ID"),
            env::var("OAUTH_CLIENT_SECRET"),
            env::var("OAUTH_USERINFO_URL"),
        ) {
            (Ok(client_id), Ok(client_secret), Ok(userinfo_url)) => Some(OAuthSettings {
                client_id,
                client_secret,
                userinfo_url,
            }),
            _ => None,
        };

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "tillpoint.db".to_string()),
            base_url,
            session_secret,
            session_ttl_mins: env::var("SESSION_TTL_MINS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60 * 24),
            bootstrap_super_admin_email: env::var("BOOTSTRAP_SUPER_ADMIN_EMAIL").ok(),
            stripe,
            oauth,
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
