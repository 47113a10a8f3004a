use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 生成式 AI 调用错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 文档导入错误
    #[error("导入错误: {0}")]
    Ingest(#[from] IngestError),
    /// 会话状态错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 生成式 AI 调用错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 网络请求失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    RequestFailed {
        model: String,
        #[source]
        source: reqwest::Error,
    },
    /// API 返回非 2xx 状态
    #[error("LLM API返回错误状态 (模型: {model}): {status} {body}")]
    BadStatus {
        model: String,
        status: u16,
        body: String,
    },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 兼容 OpenAI 的流式对话接口出错
    #[error("流式对话失败 (模型: {model}): {source}")]
    StreamFailed {
        model: String,
        #[source]
        source: async_openai::error::OpenAIError,
    },
}

/// 文档导入错误
#[derive(Debug, Error)]
pub enum IngestError {
    /// JSON 文件无效
    #[error("文件 {file} 不是有效的 JSON: {reason}")]
    InvalidJson { file: String, reason: String },
    /// 不支持的文件类型
    #[error("不支持的文件格式 {file} ({mime_type})")]
    Unsupported { file: String, mime_type: String },
    /// AI 返回的内容无法解析为习题
    #[error("无法解析 AI 返回的习题 JSON: {source}")]
    ExtractionParse {
        #[source]
        source: serde_json::Error,
    },
    /// AI 提取流程失败
    #[error("AI 提取文件 {file} 失败: {source}")]
    ExtractionFailed {
        file: String,
        #[source]
        source: Box<AppError>,
    },
}

impl IngestError {
    /// 展示给用户的提示信息
    pub fn notice(&self) -> String {
        match self {
            IngestError::InvalidJson { file, .. } => {
                format!("El archivo {} no es un JSON válido.", file)
            }
            IngestError::Unsupported { .. } => {
                "Formato no soportado. Sube un JSON, PDF o Imagen.".to_string()
            }
            IngestError::ExtractionParse { .. } | IngestError::ExtractionFailed { .. } => {
                "Hubo un error al intentar leer el documento con la Inteligencia Artificial. \
                 Asegúrate de que los ejercicios sean legibles."
                    .to_string()
            }
        }
    }
}

/// 语音输出错误
#[derive(Debug, Error)]
pub enum SpeechError {
    /// 宿主环境没有可用的语音合成能力
    #[error("语音合成不可用: {reason}")]
    Unavailable { reason: String },
}

impl SpeechError {
    /// 展示给用户的提示信息
    pub fn notice(&self) -> String {
        "Tu equipo no soporta lectura por voz.".to_string()
    }
}

/// 会话状态错误
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("习题索引 {index} 超出范围 (共 {len} 道)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 缺少 API 密钥
    #[error("缺少 Gemini API 密钥，请设置环境变量 GEMINI_API_KEY")]
    MissingApiKey,
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建LLM请求失败错误
    pub fn llm_request_failed(model: impl Into<String>, source: reqwest::Error) -> Self {
        AppError::Llm(LlmError::RequestFailed {
            model: model.into(),
            source,
        })
    }

    /// 创建流式对话错误
    pub fn llm_stream_failed(
        model: impl Into<String>,
        source: async_openai::error::OpenAIError,
    ) -> Self {
        AppError::Llm(LlmError::StreamFailed {
            model: model.into(),
            source,
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
