use std::path::Path;

use serde::Deserialize;

use crate::error::{AppError, AppResult, FileError};

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "evaluador.toml";

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    // --- Gemini 配置 ---
    pub gemini_api_key: String,
    pub gemini_api_base_url: String,
    pub gemini_model_name: String,
    /// 连接超时（秒）
    pub connect_timeout_secs: u64,
    /// 语音合成命令，为空时禁用语音输出
    pub speech_command: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            gemini_api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            gemini_model_name: "gemini-1.5-flash".to_string(),
            connect_timeout_secs: 30,
            speech_command: "espeak-ng".to_string(),
            verbose_logging: false,
        }
    }
}

/// TOML 配置文件的结构，所有字段可选
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    gemini_api_key: Option<String>,
    gemini_api_base_url: Option<String>,
    gemini_model_name: Option<String>,
    connect_timeout_secs: Option<u64>,
    speech_command: Option<String>,
    verbose_logging: Option<bool>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// 读取 TOML 配置文件（不存在时使用默认值），再用环境变量覆盖
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::from_env());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        let config = Self::from_toml_str(&content).map_err(|e| {
            AppError::File(FileError::TomlParseFailed {
                path: path.display().to_string(),
                source: e,
            })
        })?;

        Ok(config.with_env())
    }

    fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let file: ConfigFile = toml::from_str(content)?;
        let default = Self::default();
        Ok(Self {
            gemini_api_key: file.gemini_api_key.unwrap_or(default.gemini_api_key),
            gemini_api_base_url: file.gemini_api_base_url.unwrap_or(default.gemini_api_base_url),
            gemini_model_name: file.gemini_model_name.unwrap_or(default.gemini_model_name),
            connect_timeout_secs: file.connect_timeout_secs.unwrap_or(default.connect_timeout_secs),
            speech_command: file.speech_command.unwrap_or(default.speech_command),
            verbose_logging: file.verbose_logging.unwrap_or(default.verbose_logging),
        })
    }

    fn with_env(self) -> Self {
        Self {
            gemini_api_key: std::env::var("GEMINI_API_KEY").unwrap_or(self.gemini_api_key),
            gemini_api_base_url: std::env::var("GEMINI_API_BASE_URL").unwrap_or(self.gemini_api_base_url),
            gemini_model_name: std::env::var("GEMINI_MODEL_NAME").unwrap_or(self.gemini_model_name),
            connect_timeout_secs: std::env::var("CONNECT_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.connect_timeout_secs),
            speech_command: std::env::var("SPEECH_COMMAND").unwrap_or(self.speech_command),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(self.verbose_logging),
        }
    }
}
