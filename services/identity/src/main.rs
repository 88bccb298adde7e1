//! Identity service entry point.
//!
//! # Purpose
//! Wires configuration, the directory backend, the identity caches, and the
//! HTTP router, then serves the API and the metrics endpoint.
//!
//! # Notes
//! `build_state` keeps wiring testable and `main` small.
use anyhow::Context;
use roster_directory::{DirectoryConnector, LdapDirectory, LdapSettings, MemoryDirectory};
use roster_identity::app::{AppState, build_router};
use roster_identity::config::{self, IdentityConfig};
use roster_identity::identity::{DirectoryLayout, Invites, People, Resolver, Users};
use roster_identity::observability;
use std::future::Future;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = IdentityConfig::from_env_or_yaml().context("identity config")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: IdentityConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability(&config)?;
    let state = build_state(&config).await?;
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state.clone());
    let addr = config.bind_addr;
    tracing::info!(
        %addr,
        backend = state.directory.backend_name(),
        user_ttl_secs = config.user_ttl.as_secs(),
        people_ttl_secs = config.people_ttl.as_secs(),
        "identity service listening"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}

async fn build_directory(config: &IdentityConfig) -> anyhow::Result<Arc<dyn DirectoryConnector>> {
    let directory: Arc<dyn DirectoryConnector> = match config.backend {
        config::DirectoryBackend::Memory => {
            let directory = match &config.seed_path {
                Some(path) => MemoryDirectory::from_yaml_file(path)
                    .with_context(|| format!("load directory seed {}", path.display()))?,
                None => MemoryDirectory::new(),
            };
            tracing::info!(entries = directory.len().await, "using in-memory directory");
            Arc::new(directory)
        }
        config::DirectoryBackend::Ldap => {
            let ldap = config
                .ldap
                .as_ref()
                .context("ldap configuration missing")?;
            Arc::new(LdapDirectory::new(LdapSettings {
                server: ldap.server.clone(),
                bind_dn: ldap.bind_dn.clone(),
                password: ldap.password.clone(),
                starttls: ldap.starttls,
                timeout: ldap.timeout,
            }))
        }
    };
    Ok(directory)
}

async fn build_state(config: &IdentityConfig) -> anyhow::Result<AppState> {
    let directory = build_directory(config).await?;
    let admin_groups = Arc::new(config.admin_groups.clone());
    if admin_groups.is_empty() {
        tracing::warn!("no admin groups configured; nobody will be an admin");
    }
    let resolver = Resolver::new(
        DirectoryLayout {
            people_tree: config.people_tree.clone(),
            invite_tree: config.invite_tree.clone(),
        },
        admin_groups.clone(),
    );

    Ok(AppState {
        users: Arc::new(Users::new(directory.clone(), resolver, config.user_ttl)),
        people: Arc::new(People::new(
            directory.clone(),
            config.people_tree.clone(),
            admin_groups,
            config.people_ttl,
        )),
        invites: Arc::new(Invites::new(directory.clone(), config.invite_tree.clone())),
        invite_link: config.invite_link.clone(),
        directory,
    })
}
