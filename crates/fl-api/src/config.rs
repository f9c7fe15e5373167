//! Server configuration.
//!
//! Sections: `[server]`, `[neo4j]`, `[auth]`, `[policy]`, each overridable
//! with `FLC__<SECTION>__<KEY>` environment variables.

use serde::Deserialize;

use fl_core::config::{layered, section, PolicyConfig};
use fl_core::Result;
use fl_graph::GraphConfig;

#[derive(Debug, Clone, Default)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub neo4j: GraphConfig,
    pub auth: AuthConfig,
    pub policy: PolicyConfig,
}

impl ApiConfig {
    /// Load every section from `<file_prefix>.toml` and the environment.
    pub fn load(file_prefix: &str) -> Result<Self> {
        let cfg = layered(file_prefix)?;
        Ok(Self {
            server: section(&cfg, "server")?,
            neo4j: section(&cfg, "neo4j")?,
            auth: section(&cfg, "auth")?,
            policy: section(&cfg, "policy")?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Serve GraphiQL on `GET /graphql`.
    #[serde(default)]
    pub graphiql: bool,
    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_bind() -> String {
    "0.0.0.0:4001".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            graphiql: false,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider.
    #[serde(default)]
    pub jwt_secret: String,
    /// Expected `iss` claim, if any.
    #[serde(default)]
    pub issuer: Option<String>,
    /// Lifetime of tokens minted by `fl-admin token`, in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

fn default_token_ttl() -> u64 {
    3600
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: None,
            token_ttl_secs: default_token_ttl(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fl-test.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
[server]
bind = "127.0.0.1:9000"
graphiql = true

[neo4j]
uri = "bolt://graph:7687"

[auth]
jwt_secret = "a-very-long-secret-for-testing-purposes"

[policy]
min_bussing_attendance = 10
"#
        )
        .unwrap();

        let prefix = dir.path().join("fl-test");
        let config = ApiConfig::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert!(config.server.graphiql);
        assert_eq!(config.neo4j.uri, "bolt://graph:7687");
        assert_eq!(config.neo4j.user, "neo4j");
        assert_eq!(config.auth.token_ttl_secs, 3600);
        assert_eq!(config.policy.min_bussing_attendance, 10);
        assert_eq!(config.policy.min_treasurers, 2);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("absent");
        let config = ApiConfig::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:4001");
        assert!(!config.server.graphiql);
    }
}
