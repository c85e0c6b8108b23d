use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub stripe: StripeConfig,
    pub openai: OpenAiConfig,
    pub frontend: FrontendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64,  // seconds
    pub refresh_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    /// 三档套餐对应的 Stripe price ID，webhook 反查 plan 时使用
    pub price_individual: String,
    pub price_team: String,
    pub price_enterprise: String,
    #[serde(default = "default_trial_days")]
    pub trial_period_days: u32,
}

fn default_trial_days() -> u32 {
    14
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_openai_model() -> String {
    "gpt-4-turbo-preview".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Checkout/Portal 跳转与 CORS 使用的前端地址
    pub url: String,
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                // 有配置文件：先解析再用环境变量覆盖
                toml::from_str(&config_str)
                    .map_err(|e| format!("Failed to parse config file: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // 无配置文件：使用环境变量与默认值构建
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("Missing DATABASE_URL environment variable and no config.toml found")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                        refresh_token_expires_in: get_env_parse(
                            "JWT_REFRESH_EXPIRES_IN",
                            2_592_000i64,
                        ),
                    },
                    stripe: StripeConfig {
                        secret_key: get_env("STRIPE_SECRET_KEY").unwrap_or_default(),
                        webhook_secret: get_env("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
                        price_individual: get_env("STRIPE_PRICE_INDIVIDUAL").unwrap_or_default(),
                        price_team: get_env("STRIPE_PRICE_TEAM").unwrap_or_default(),
                        price_enterprise: get_env("STRIPE_PRICE_ENTERPRISE").unwrap_or_default(),
                        trial_period_days: get_env_parse("STRIPE_TRIAL_PERIOD_DAYS", 14u32),
                    },
                    openai: OpenAiConfig {
                        api_key: get_env("OPENAI_API_KEY").unwrap_or_default(),
                        base_url: get_env("OPENAI_BASE_URL").unwrap_or_else(default_openai_base_url),
                        model: get_env("OPENAI_MODEL").unwrap_or_else(default_openai_model),
                    },
                    frontend: FrontendConfig {
                        url: get_env("FRONTEND_URL")
                            .unwrap_or_else(|| "http://localhost:3000".to_string()),
                    },
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.access_token_expires_in = n;
        }
        if let Ok(v) = env::var("JWT_REFRESH_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.refresh_token_expires_in = n;
        }
        if let Ok(v) = env::var("STRIPE_SECRET_KEY") {
            config.stripe.secret_key = v;
        }
        if let Ok(v) = env::var("STRIPE_WEBHOOK_SECRET") {
            config.stripe.webhook_secret = v;
        }
        if let Ok(v) = env::var("STRIPE_PRICE_INDIVIDUAL") {
            config.stripe.price_individual = v;
        }
        if let Ok(v) = env::var("STRIPE_PRICE_TEAM") {
            config.stripe.price_team = v;
        }
        if let Ok(v) = env::var("STRIPE_PRICE_ENTERPRISE") {
            config.stripe.price_enterprise = v;
        }
        if let Ok(v) = env::var("STRIPE_TRIAL_PERIOD_DAYS")
            && let Ok(n) = v.parse()
        {
            config.stripe.trial_period_days = n;
        }
        if let Ok(v) = env::var("OPENAI_API_KEY") {
            config.openai.api_key = v;
        }
        if let Ok(v) = env::var("OPENAI_BASE_URL") {
            config.openai.base_url = v;
        }
        if let Ok(v) = env::var("OPENAI_MODEL") {
            config.openai.model = v;
        }
        if let Ok(v) = env::var("FRONTEND_URL") {
            config.frontend.url = v;
        }

        Ok(config)
    }
}
