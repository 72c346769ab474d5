use serde::{Deserialize, Serialize};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub render: RenderConfig,
    pub company: CompanyProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 渲染相关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// 单次渲染的时间预算 (秒)
    pub timeout_secs: u64,
    /// 含日文字形的 TTF/OTF 字体; 为空时使用内置 Helvetica
    pub font_path: Option<String>,
    /// 明细表最少行数 (不足时补空行)
    pub min_rows: usize,
}

/// 本公司信息 (页眉与页脚的固定区块)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    pub postal_address: String,
    pub phone: String,
    pub fax: String,
    pub email: String,
}

impl Default for CompanyProfile {
    fn default() -> Self {
        Self {
            name: "平田トレーディング株式会社".to_string(),
            postal_address: "〒123-4567 東京都中央区日本橋1-1-1".to_string(),
            phone: "03-1234-5678".to_string(),
            fax: "03-1234-5679".to_string(),
            email: "info@hirata-trading.co.jp".to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            font_path: None,
            min_rows: 8,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            render: RenderConfig::default(),
            company: CompanyProfile::default(),
        }
    }
}

impl AppConfig {
    /// 加载配置: 默认值 -> 配置文件 (可选) -> 环境变量
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var("APP_CONFIG").unwrap_or_else(|_| "config/app".to_string());
        let mut cfg = Self::from_file(&path)?;
        cfg.apply_env();
        Ok(cfg)
    }

    /// 读取配置文件, 文件不存在时使用默认值
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::with_name(path).required(false))
            .build()?
            .try_deserialize()
    }

    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(secs) = std::env::var("RENDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.render.timeout_secs = secs;
        }
        if let Ok(path) = std::env::var("RENDER_FONT_PATH") {
            self.render.font_path = Some(path).filter(|p| !p.trim().is_empty());
        }
        if let Some(rows) = std::env::var("RENDER_MIN_ROWS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.render.min_rows = rows;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.render.timeout_secs, 30);
        assert_eq!(cfg.render.min_rows, 8);
        assert!(cfg.render.font_path.is_none());
        assert_eq!(cfg.company.name, "平田トレーディング株式会社");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let cfg = AppConfig::from_file("does/not/exist/app").unwrap();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.render.min_rows, 8);
        assert_eq!(cfg.company, CompanyProfile::default());
    }
}
