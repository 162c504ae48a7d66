use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Deserialize;
use std::{env, fs, path::Path};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// YAML file holding the `oidc` section. Required unless auth is disabled.
    pub oidc_config: Option<String>,
    pub disable_auth: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Organization name registry API")]
pub struct Args {
    /// Host to bind to (overrides ORG_REGISTRY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides ORG_REGISTRY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides ORG_REGISTRY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Path to the OIDC YAML config (overrides ORG_REGISTRY_OIDC_CONFIG)
    #[arg(long)]
    pub oidc_config: Option<String>,

    /// Skip bearer token verification
    #[arg(long, env = "ORG_REGISTRY_DISABLE_AUTH")]
    pub disable_auth: bool,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("ORG_REGISTRY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("ORG_REGISTRY_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing ORG_REGISTRY_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 8081,
            Err(err) => return Err(err).context("reading ORG_REGISTRY_PORT"),
        };
        let env_db = env::var("ORG_REGISTRY_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/org_registry.db".into());
        let env_oidc = env::var("ORG_REGISTRY_OIDC_CONFIG").ok();

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            oidc_config: args.oidc_config.or(env_oidc),
            disable_auth: args.disable_auth,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Identity provider settings used for token introspection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcConfig {
    pub issuer: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub introspect_url: String,
    pub admin: AdminCredentials,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
struct OidcFile {
    oidc: OidcConfig,
}

impl OidcConfig {
    /// Read the `oidc` section of a YAML file and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading OIDC config {}", path.display()))?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let file: OidcFile = serde_yaml::from_str(raw).context("parsing OIDC config")?;
        file.oidc.validate()?;
        Ok(file.oidc)
    }

    /// Every field the introspection flow depends on must be present.
    pub fn validate(&self) -> Result<()> {
        let required = [
            (&self.issuer, "Identity provider not found in OIDC config"),
            (&self.client_id, "Client id not found in OIDC config"),
            (&self.client_secret, "Client Secret not found in OIDC config"),
            (&self.redirect_url, "Redirect Url not found in OIDC config"),
            (&self.introspect_url, "Introspect Url not found in OIDC config"),
            (&self.admin.username, "Admin username cannot be empty"),
            (&self.admin.password, "Admin password cannot be empty"),
        ];
        for (value, message) in required {
            if value.is_empty() {
                bail!(message);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
oidc:
  issuer: https://idp.example.com
  clientId: registry
  clientSecret: secret
  redirectUrl: https://registry.example.com/callback
  introspectUrl: https://idp.example.com/oauth2/introspect
  admin:
    username: admin
    password: hunter2
"#;

    #[test]
    fn parses_oidc_section() {
        let cfg = OidcConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(cfg.client_id, "registry");
        assert_eq!(cfg.introspect_url, "https://idp.example.com/oauth2/introspect");
        assert_eq!(cfg.admin.username, "admin");
    }

    #[test]
    fn rejects_empty_required_field() {
        let raw = SAMPLE.replace("password: hunter2", "password: \"\"");
        let err = OidcConfig::from_yaml(&raw).unwrap_err();
        assert_eq!(err.to_string(), "Admin password cannot be empty");
    }
}
