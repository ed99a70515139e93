//! Runtime configuration for the menu service

use clap::Parser;
use kafejo::{jws, jwt};

/// Coffee-shop menu API protected by bearer-token authorization
#[derive(Clone, Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Domain of the authorization server, e.g. `dev-tenant.us.auth0.com`
    #[arg(long, env = "KAFEJO_AUTH_DOMAIN")]
    pub auth_domain: String,

    /// Audience expected in presented access tokens
    #[arg(long, env = "KAFEJO_AUDIENCE")]
    pub audience: String,

    /// Socket address to serve on
    #[arg(long, env = "KAFEJO_BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Seconds between JWKS refreshes
    #[arg(long, env = "KAFEJO_JWKS_REFRESH_SECS", default_value = "600")]
    pub jwks_refresh_secs: u64,

    /// Grace period (in seconds) applied to token lifetime checks
    #[arg(long, env = "KAFEJO_LEEWAY_SECS", default_value = "0")]
    pub leeway_secs: u64,
}

impl Args {
    /// The issuer expected in presented access tokens
    pub fn issuer(&self) -> jwt::Issuer {
        jwt::Issuer::new(format!("https://{}/", self.auth_domain))
    }

    /// Where the authorization server publishes its signing keys
    pub fn jwks_url(&self) -> String {
        format!("https://{}/.well-known/jwks.json", self.auth_domain)
    }

    /// The validator applied to every presented access token
    ///
    /// Only RS256 signatures are approved, matching the algorithm the
    /// authorization server is configured to sign with.
    pub fn validator(&self) -> jwt::CoreValidator {
        jwt::CoreValidator::default()
            .add_approved_algorithm(jws::Algorithm::RS256)
            .add_allowed_audience(jwt::Audience::new(self.audience.clone()))
            .require_issuer(self.issuer())
            .with_leeway_secs(self.leeway_secs)
    }
}
