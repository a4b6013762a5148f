use sk_domain::config::Config;
use sk_sessions::SessionManager;

/// One collection pass over the configured storage.  Prints and returns the
/// number of records removed.
pub async fn run(config: &Config) -> anyhow::Result<usize> {
    let manager = SessionManager::from_config(&config.sessions)
        .map_err(|e| anyhow::anyhow!("building session storage: {e}"))?;
    let removed = manager
        .collect_garbage()
        .await
        .map_err(|e| anyhow::anyhow!("collecting sessions: {e}"))?;
    println!("removed {removed} expired session(s) from {} storage", manager.storage().name());
    Ok(removed)
}
