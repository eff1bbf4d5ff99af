use clap::Parser;
use std::time::Duration;

use crate::assistant::{AssistantConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Virtual chemistry lab served to the browser")]
pub struct Args {
    /// Address to bind (ip or host)
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind
    #[arg(long, default_value_t = 3000)]
    pub port: u16,

    /// Experiment clock interval in milliseconds
    #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u64).range(10..))]
    pub tick_ms: u64,

    /// Gemini API key; without one the assistant answers offline
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    #[arg(long, default_value = DEFAULT_MODEL)]
    pub gemini_model: String,

    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub gemini_endpoint: String,

    /// Seconds to wait for the model before answering offline
    #[arg(long, default_value_t = 15)]
    pub assistant_timeout_secs: u64,
}

impl Args {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn assistant_config(&self) -> AssistantConfig {
        AssistantConfig {
            api_key: self.gemini_api_key.clone(),
            model: self.gemini_model.clone(),
            endpoint: self.gemini_endpoint.clone(),
            timeout: Duration::from_secs(self.assistant_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["chemlab", "--gemini-api-key", ""]).unwrap();
        assert_eq!(args.bind_addr(), "127.0.0.1:3000");
        assert_eq!(args.tick(), Duration::from_millis(500));
        let assistant = args.assistant_config();
        assert_eq!(assistant.model, DEFAULT_MODEL);
        assert!(!assistant.is_configured());
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "chemlab",
            "--port",
            "8088",
            "--tick-ms",
            "250",
            "--gemini-api-key",
            "abc123",
            "--gemini-model",
            "gemini-pro",
        ])
        .unwrap();
        assert_eq!(args.port, 8088);
        assert_eq!(args.tick(), Duration::from_millis(250));
        let assistant = args.assistant_config();
        assert!(assistant.is_configured());
        assert_eq!(assistant.model, "gemini-pro");
    }

    #[test]
    fn test_tick_floor() {
        assert!(Args::try_parse_from(["chemlab", "--tick-ms", "0"]).is_err());
    }
}
