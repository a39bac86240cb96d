use super::*;

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://stromligning.dk".to_string(),
            product_id: "velkommen_gron_el".to_string(),
            supplier_id: "radius_c".to_string(),
            hours_ahead: 48,
            aggregation: "1h".to_string(),
            aggregation_method: "avg".to_string(),
            include_forecast: true,
            lean: true,
            timezone: "Europe/Copenhagen".to_string(),
            request_timeout_secs: 0,
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            refresh_on_startup: true,
            interval_secs: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/elpris".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8089,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            refresh: RefreshConfig::default(),
            logging: LoggingConfig::default(),
            web: WebConfig::default(),
        }
    }
}
