use std::str::FromStr;
use std::time::Duration;

use envconfig::Envconfig;

pub use common_kafka::config::KafkaConfig;

#[derive(Envconfig, Clone)]
pub struct Config {
    pub google_api_key: String,

    pub youtube_playlist_id: String,

    #[envconfig(
        from = "YOUTUBE_API_URL",
        default = "https://www.googleapis.com/youtube/v3"
    )]
    pub youtube_api_url: String,

    // maxResults, the API caps it at 50
    #[envconfig(default = "50")]
    pub youtube_page_size: u32,

    #[envconfig(default = "http://localhost:8081")]
    pub schema_registry_url: String,

    // user:password, empty disables basic auth
    #[envconfig(default = "")]
    pub schema_registry_basic_auth: String,

    #[envconfig(default = "youtube_videos")]
    pub kafka_topic: String,

    #[envconfig(nested = true)]
    pub kafka: KafkaConfig,

    #[envconfig(default = "1")]
    pub enrich_concurrency: usize,

    #[envconfig(default = "30")]
    pub flush_timeout_secs: u64,

    #[envconfig(default = "true")]
    pub skip_invalid_records: bool,

    #[envconfig(default = "text")]
    pub log_format: LogFormat,
}

impl Config {
    pub fn flush_timeout(&self) -> Duration {
        Duration::from_secs(self.flush_timeout_secs)
    }

    pub fn schema_registry_credentials(&self) -> Option<(String, String)> {
        if self.schema_registry_basic_auth.is_empty() {
            return None;
        }
        match self.schema_registry_basic_auth.split_once(':') {
            Some((user, password)) => Some((user.to_string(), password.to_string())),
            None => Some((self.schema_registry_basic_auth.clone(), String::new())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}
