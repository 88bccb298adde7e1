use crate::identity::{AdminGroups, DEFAULT_TTL};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_METRICS_BIND: &str = "0.0.0.0:9090";
pub const DEFAULT_LDAP_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryBackend {
    Memory,
    Ldap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LdapConfig {
    pub server: String,
    pub bind_dn: String,
    pub password: String,
    pub starttls: bool,
    pub timeout: Duration,
}

// Identity service configuration sourced from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub backend: DirectoryBackend,
    pub seed_path: Option<PathBuf>,
    pub ldap: Option<LdapConfig>,
    pub people_tree: String,
    pub invite_tree: String,
    pub admin_groups: AdminGroups,
    pub invite_link: Option<String>,
    pub user_ttl: Duration,
    pub people_ttl: Duration,
    /// OTLP collector for span export; spans are only logged when unset.
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct IdentityConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    backend: Option<DirectoryBackend>,
    seed_path: Option<PathBuf>,
    ldap_server: Option<String>,
    ldap_bind_dn: Option<String>,
    ldap_password: Option<String>,
    ldap_starttls: Option<bool>,
    people_tree: Option<String>,
    invite_tree: Option<String>,
    admin_groups: Option<Vec<String>>,
    invite_link: Option<String>,
    user_ttl_secs: Option<u64>,
    people_ttl_secs: Option<u64>,
    otlp_endpoint: Option<String>,
}

fn parse_backend(raw: &str) -> Result<DirectoryBackend> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "memory" => Ok(DirectoryBackend::Memory),
        "ldap" => Ok(DirectoryBackend::Ldap),
        other => bail!("unknown directory backend: {other}"),
    }
}

fn parse_secs(key: &str, raw: Option<String>) -> Result<Option<Duration>> {
    raw.map(|value| {
        value
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .with_context(|| format!("parse {key}"))
    })
    .transpose()
}

impl IdentityConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build the configuration from a variable lookup (the environment in production).
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = var("ROSTER_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse()
            .with_context(|| "parse ROSTER_BIND")?;
        let metrics_bind = var("ROSTER_METRICS_BIND")
            .unwrap_or_else(|| DEFAULT_METRICS_BIND.to_string())
            .parse()
            .with_context(|| "parse ROSTER_METRICS_BIND")?;
        let backend = match var("ROSTER_DIRECTORY_BACKEND") {
            Some(raw) => parse_backend(&raw)?,
            None => DirectoryBackend::Memory,
        };
        let timeout = match var("LDAP_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(
                raw.trim()
                    .parse()
                    .with_context(|| "parse LDAP_TIMEOUT_MS")?,
            ),
            None => Duration::from_millis(DEFAULT_LDAP_TIMEOUT_MS),
        };
        let ldap = var("LDAP_SERVER").map(|server| LdapConfig {
            server,
            bind_dn: var("LDAP_USER").unwrap_or_default(),
            password: var("LDAP_PASS").unwrap_or_default(),
            starttls: var("LDAP_STARTTLS").is_none_or(|raw| raw.trim() != "false"),
            timeout,
        });
        let config = Self {
            bind_addr,
            metrics_bind,
            backend,
            seed_path: var("ROSTER_DIRECTORY_SEED").map(PathBuf::from),
            ldap,
            people_tree: var("LDAP_TREE_PEOPLE").unwrap_or_default(),
            invite_tree: var("LDAP_TREE_INVITES").unwrap_or_default(),
            admin_groups: var("LDAP_ADMIN_GROUPS")
                .map(|raw| AdminGroups::parse(&raw))
                .unwrap_or_default(),
            invite_link: var("INVITE_LINK").filter(|link| !link.is_empty()),
            user_ttl: parse_secs("ROSTER_USER_TTL_SECS", var("ROSTER_USER_TTL_SECS"))?
                .unwrap_or(DEFAULT_TTL),
            people_ttl: parse_secs("ROSTER_PEOPLE_TTL_SECS", var("ROSTER_PEOPLE_TTL_SECS"))?
                .unwrap_or(DEFAULT_TTL),
            otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|url| !url.is_empty()),
        };
        Ok(config)
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("ROSTER_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read ROSTER_CONFIG: {path}"))?;
            config.apply_yaml(&contents)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let overrides: IdentityConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse identity config yaml")?;
        if let Some(value) = overrides.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = overrides.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = overrides.backend {
            self.backend = value;
        }
        if let Some(value) = overrides.seed_path {
            self.seed_path = Some(value);
        }
        if let Some(server) = overrides.ldap_server {
            let ldap = self.ldap.get_or_insert_with(|| LdapConfig {
                server: String::new(),
                bind_dn: String::new(),
                password: String::new(),
                starttls: true,
                timeout: Duration::from_millis(DEFAULT_LDAP_TIMEOUT_MS),
            });
            ldap.server = server;
        }
        if let Some(ldap) = self.ldap.as_mut() {
            if let Some(value) = overrides.ldap_bind_dn {
                ldap.bind_dn = value;
            }
            if let Some(value) = overrides.ldap_password {
                ldap.password = value;
            }
            if let Some(value) = overrides.ldap_starttls {
                ldap.starttls = value;
            }
        }
        if let Some(value) = overrides.people_tree {
            self.people_tree = value;
        }
        if let Some(value) = overrides.invite_tree {
            self.invite_tree = value;
        }
        if let Some(value) = overrides.admin_groups {
            self.admin_groups = AdminGroups::new(value);
        }
        if let Some(value) = overrides.invite_link {
            self.invite_link = Some(value);
        }
        if let Some(value) = overrides.user_ttl_secs {
            self.user_ttl = Duration::from_secs(value);
        }
        if let Some(value) = overrides.people_ttl_secs {
            self.people_ttl = Duration::from_secs(value);
        }
        if let Some(value) = overrides.otlp_endpoint {
            self.otlp_endpoint = Some(value);
        }
        Ok(())
    }

    /// Reject configurations the service cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.people_tree.is_empty() {
            bail!("LDAP_TREE_PEOPLE is required");
        }
        if self.invite_tree.is_empty() {
            bail!("LDAP_TREE_INVITES is required");
        }
        if self.backend == DirectoryBackend::Ldap {
            let ldap = self
                .ldap
                .as_ref()
                .context("ldap backend selected but LDAP_SERVER is not set")?;
            if ldap.bind_dn.is_empty() {
                bail!("LDAP_USER is required for the ldap backend");
            }
        }
        Ok(())
    }
}
