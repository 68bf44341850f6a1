use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub stream: StreamSettings,
    pub api: ApiSettings,
    #[serde(default)]
    pub dashboard: DashboardSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamSettings {
    pub url: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_topic_template")]
    pub topic_template: String,
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_outgoing_ms: u64,
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_incoming_ms: u64,
    /// Extra slack on top of the incoming heartbeat interval before the link is declared dead.
    #[serde(default)]
    pub heartbeat_grace_ms: u64,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardSettings {
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
    #[serde(default = "default_rpm_gauge_max")]
    pub rpm_gauge_max: f64,
    #[serde(default = "default_resample_interval_ms")]
    pub resample_interval_ms: i64,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            rpm_gauge_max: default_rpm_gauge_max(),
            resample_interval_ms: default_resample_interval_ms(),
        }
    }
}

impl StreamSettings {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Value of the STOMP `host` header, defaulting to the URL's authority.
    pub fn virtual_host(&self) -> String {
        if let Some(host) = &self.host {
            return host.clone();
        }
        let without_scheme = self
            .url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.url);
        let authority = without_scheme.split('/').next().unwrap_or(without_scheme);
        authority
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or(authority)
            .to_string()
    }

    pub fn topic_for(&self, device_id: &str) -> String {
        topic_for(&self.topic_template, device_id)
    }
}

fn default_topic_template() -> String {
    "/topic/device/${deviceId}".to_string()
}

fn default_heartbeat_ms() -> u64 {
    4_000
}

fn default_reconnect_delay_ms() -> u64 {
    5_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_window_capacity() -> usize {
    40
}

fn default_rpm_gauge_max() -> f64 {
    3_000.0
}

fn default_resample_interval_ms() -> i64 {
    60_000
}

/// Loads `config/telemetry.*`, overridden by `GENSET__SECTION__KEY` environment variables.
pub fn load_settings() -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/telemetry").required(false))
        .add_source(config::Environment::with_prefix("GENSET").separator("__"))
        .build()?;

    let mut settings: Settings = settings.try_deserialize()?;
    settings.api.base_url = settings.api.base_url.trim_end_matches('/').to_string();
    Ok(settings)
}

/// Replace template variables in a string
pub fn render_template(template: &str, vars: &HashMap<String, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}

pub fn topic_for(template: &str, device_id: &str) -> String {
    let mut vars = HashMap::new();
    vars.insert("deviceId".to_string(), device_id.to_string());
    render_template(template, &vars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_template() {
        let mut vars = HashMap::new();
        vars.insert("deviceId".to_string(), "GEN-001".to_string());
        vars.insert("site".to_string(), "north".to_string());

        let template = "/topic/${site}/device/${deviceId}";
        let result = render_template(template, &vars);

        assert_eq!(result, "/topic/north/device/GEN-001");
    }

    #[test]
    fn test_topic_for_default_template() {
        assert_eq!(
            topic_for(&default_topic_template(), "GEN-001"),
            "/topic/device/GEN-001"
        );
    }

    #[test]
    fn test_settings_defaults() {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [stream]
                url = "ws://gateway.local:8080/ws/websocket"

                [api]
                base_url = "http://gateway.local:8080"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.stream.heartbeat_outgoing_ms, 4_000);
        assert_eq!(settings.stream.heartbeat_incoming_ms, 4_000);
        assert_eq!(settings.stream.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(settings.stream.virtual_host(), "gateway.local");
        assert_eq!(settings.stream.topic_for("GEN-7"), "/topic/device/GEN-7");
        assert_eq!(settings.dashboard.window_capacity, 40);
        assert_eq!(settings.dashboard.rpm_gauge_max, 3_000.0);
        assert_eq!(settings.dashboard.resample_interval_ms, 60_000);
    }

    #[test]
    fn test_explicit_virtual_host() {
        let settings = StreamSettings {
            url: "wss://example.com/ws".to_string(),
            host: Some("broker".to_string()),
            topic_template: default_topic_template(),
            heartbeat_outgoing_ms: 0,
            heartbeat_incoming_ms: 0,
            heartbeat_grace_ms: 0,
            reconnect_delay_ms: 1,
            connect_timeout_ms: 1,
        };
        assert_eq!(settings.virtual_host(), "broker");
    }
}
