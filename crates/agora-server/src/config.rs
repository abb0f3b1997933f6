use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;

use agora_gateway::GatewayConfig;

/// Process configuration, read once from `AGORA_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub history_limit: u32,
    pub max_message_len: usize,
    pub max_voice_bytes: usize,
    /// Extra words for the moderation filter.
    pub banned_words: Vec<String>,
    /// SMS webhook. Notifications are only logged when unset.
    pub notify_url: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = GatewayConfig::default();
        Ok(Self {
            host: get("AGORA_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse(&get, "AGORA_PORT", 3000)?,
            db_path: PathBuf::from(get("AGORA_DB_PATH").unwrap_or_else(|| "agora.db".into())),
            history_limit: parse(&get, "AGORA_HISTORY_LIMIT", defaults.history_limit)?,
            max_message_len: parse(&get, "AGORA_MAX_MESSAGE_LEN", defaults.max_message_len)?,
            max_voice_bytes: parse(&get, "AGORA_MAX_VOICE_BYTES", defaults.max_voice_bytes)?,
            banned_words: get("AGORA_BANNED_WORDS")
                .map(|words| {
                    words
                        .split(',')
                        .map(str::trim)
                        .filter(|w| !w.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            notify_url: get("AGORA_NOTIFY_URL").filter(|url| !url.trim().is_empty()),
        })
    }

    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            history_limit: self.history_limit,
            max_message_len: self.max_message_len,
            max_voice_bytes: self.max_voice_bytes,
        }
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| anyhow::anyhow!("{e}"))
            .with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.db_path, PathBuf::from("agora.db"));
        assert_eq!(config.history_limit, 100);
        assert_eq!(config.max_message_len, 2000);
        assert_eq!(config.max_voice_bytes, 1024 * 1024);
        assert!(config.banned_words.is_empty());
        assert!(config.notify_url.is_none());
    }

    #[test]
    fn values_are_read_and_trimmed() {
        let config = config(&[
            ("AGORA_PORT", " 8080 "),
            ("AGORA_HISTORY_LIMIT", "25"),
            ("AGORA_BANNED_WORDS", "frack, , gorram"),
            ("AGORA_NOTIFY_URL", "http://sms.local/send"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.gateway().history_limit, 25);
        assert_eq!(config.banned_words, vec!["frack", "gorram"]);
        assert_eq!(config.notify_url.as_deref(), Some("http://sms.local/send"));
    }

    #[test]
    fn bad_numbers_name_the_variable() {
        let err = config(&[("AGORA_PORT", "eighty")]).unwrap_err();
        assert!(format!("{err:#}").contains("AGORA_PORT"));
    }
}
