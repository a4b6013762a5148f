use sk_domain::config::{Config, ConfigSeverity, Durability, ExchangeMode, StorageConfig};

/// Check the config and print the resolved session setup followed by any
/// issues, errors first.
///
/// Returns `false` when errors are found.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let (lines, ok) = report(config, config_path);
    for line in lines {
        println!("{line}");
    }
    ok
}

fn report(config: &Config, config_path: &str) -> (Vec<String>, bool) {
    let mut issues = config.validate();
    issues.sort_by_key(|i| i.severity != ConfigSeverity::Error);
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();

    let mut lines = vec![session_summary(config)];
    lines.extend(issues.iter().map(ToString::to_string));
    lines.push(if issues.is_empty() {
        format!("Session config OK ({config_path})")
    } else {
        format!(
            "{errors} error(s), {} warning(s) in {config_path}",
            issues.len() - errors
        )
    });
    (lines, errors == 0)
}

/// One line describing where sessions live and how the identifier travels.
fn session_summary(config: &Config) -> String {
    let sessions = &config.sessions;
    let storage = match &sessions.storage {
        StorageConfig::Memory => "memory storage".to_owned(),
        StorageConfig::File { path, ttl_secs } => {
            format!("file storage in {} (ttl {ttl_secs}s)", path.display())
        }
        StorageConfig::Cookie => "cookie storage".to_owned(),
        StorageConfig::Redis {
            key_prefix,
            ttl_secs,
            ..
        } => format!("redis storage, keys `{key_prefix}<id>` (ttl {ttl_secs}s)"),
    };
    let mode = match sessions.exchanger.mode {
        ExchangeMode::Cookie => "cookie",
        ExchangeMode::Header => "header",
        ExchangeMode::Query => "query parameter",
    };
    let durability = match sessions.durability {
        Durability::BestEffort => "best-effort",
        Durability::Awaited => "awaited",
    };
    format!(
        "sessions: {storage}; identifier in {mode} `{}`; {durability} writes",
        sessions.exchanger.data_name
    )
}

/// Dump the resolved config (with all defaults filled in) as TOML.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = toml::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("serializing config: {e}"))?;
    print!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_reports_memory_cookie_setup() {
        let (lines, ok) = report(&Config::default(), "config.toml");
        assert!(ok);
        assert_eq!(
            lines,
            vec![
                "sessions: memory storage; identifier in cookie `SKSESSID`; best-effort writes"
                    .to_owned(),
                "Session config OK (config.toml)".to_owned(),
            ]
        );
    }

    #[test]
    fn errors_are_listed_before_warnings() {
        let mut config = Config::default();
        config.sessions.storage = StorageConfig::Redis {
            url: String::new(),
            key_prefix: String::new(),
            ttl_secs: 60,
        };
        config.sessions.durability = Durability::Awaited;

        let (lines, ok) = report(&config, "sk.toml");

        assert!(!ok);
        assert!(lines[0].starts_with("sessions: redis storage, keys `<id>` (ttl 60s)"));
        assert!(lines[0].ends_with("awaited writes"));
        assert!(lines[1].starts_with("[ERROR]"));
        assert!(lines[2].starts_with("[WARN]"));
        assert_eq!(lines.last().unwrap(), "1 error(s), 1 warning(s) in sk.toml");
    }
}
