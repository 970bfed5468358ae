use chrono_tz::Tz;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::time::Duration;

use crate::clients::gemini_client;
use crate::models::calendar_event::{EventFormat, HourConvention};

const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Optional KEY=VALUE overlay file named by `CONFIG_FILE`. Values here win
/// over the process environment.
#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(format!("Invalid config line {}: {}", idx + 1, line));
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if (value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\''))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    /// Config-file value if present, else the environment variable.
    pub fn get_prop(&self, key: &str) -> Option<String> {
        self.get(key).or_else(|| env::var(key).ok())
    }
}

/// Fully-typed runtime settings, assembled once at startup and passed down
/// explicitly. Nothing below `main` reads the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub notion_api_key: String,
    /// Source database holding the day descriptions.
    pub day_db_id: String,
    /// Target database the calendar pages are written into.
    pub tasks_db_id: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub timezone: Tz,
    pub event_format: EventFormat,
    pub hour_convention: HourConvention,
}

impl Settings {
    pub fn load(config: &AppConfig) -> Result<Self, String> {
        let require =
            |key: &str| config.get_prop(key).ok_or_else(|| format!("{} must be set", key));

        let poll_interval = parse_secs(config, "POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        let request_timeout =
            parse_secs(config, "REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;

        let timezone = match config.get_prop("TIMEZONE") {
            Some(raw) => raw
                .parse::<Tz>()
                .map_err(|_| format!("Invalid TIMEZONE: {}", raw))?,
            None => chrono_tz::America::New_York,
        };

        let event_format = match config.get_prop("EVENT_FORMAT").as_deref() {
            None | Some("dated") => EventFormat::Dated,
            Some("time-only") => EventFormat::TimeOnly,
            Some(other) => return Err(format!("Invalid EVENT_FORMAT: {}", other)),
        };

        let hour_convention = match config.get_prop("HOUR_CONVENTION").as_deref() {
            None | Some("one-based") => HourConvention::OneBased,
            Some("standard") => HourConvention::Standard,
            Some(other) => return Err(format!("Invalid HOUR_CONVENTION: {}", other)),
        };

        Ok(Settings {
            notion_api_key: require("NOTION_API_KEY")?,
            day_db_id: require("WRITE_DAY_DB")?,
            tasks_db_id: require("TASKS_DB_ID")?,
            gemini_api_key: require("GEMINI_API_KEY")?,
            gemini_model: config
                .get_prop("GEMINI_MODEL")
                .unwrap_or(gemini_client::DEFAULT_MODEL.to_string()),
            poll_interval,
            request_timeout,
            timezone,
            event_format,
            hour_convention,
        })
    }
}

fn parse_secs(config: &AppConfig, key: &str, default: u64) -> Result<Duration, String> {
    match config.get_prop(key) {
        Some(raw) => raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| format!("Invalid {}: {}", key, raw)),
        None => Ok(Duration::from_secs(default)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_key_value_lines_with_quotes_and_exports() {
        let path = env::temp_dir().join("plannerbot_config_test.conf");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "export NOTION_API_KEY=\"secret\"").unwrap();
        writeln!(file, "POLL_INTERVAL_SECS = 10").unwrap();
        drop(file);

        let config = AppConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.get("NOTION_API_KEY"), Some("secret".to_string()));
        assert_eq!(config.get("POLL_INTERVAL_SECS"), Some("10".to_string()));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn rejects_lines_without_separator() {
        let path = env::temp_dir().join("plannerbot_config_bad.conf");
        fs::write(&path, "NOT_A_PAIR\n").unwrap();
        assert!(AppConfig::from_file(path.to_str().unwrap()).is_err());
        fs::remove_file(path).unwrap();
    }
}
