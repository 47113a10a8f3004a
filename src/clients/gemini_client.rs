/// Gemini API 客户端
///
/// - 文档提取走原生 `generateContent`，可以直接携带 PDF
/// - 对话走 Gemini 的 OpenAI 兼容端点，用 `async-openai` 流式接收
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs, ImageDetail, ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use futures::future;
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError, LlmError};
use crate::models::Part;
use crate::utils::truncate_text;

/// 模型增量返回的文本流
pub type TextStream = BoxStream<'static, AppResult<String>>;

/// 生成式模型能力
///
/// 服务层只依赖这个 trait，测试时可替换为脚本化实现
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// 一次性生成，返回完整文本
    async fn generate_content(&self, parts: Vec<Part>) -> AppResult<String>;

    /// 流式生成，按到达顺序返回文本块
    async fn generate_content_stream(&self, parts: Vec<Part>) -> AppResult<TextStream>;
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// 拼接第一个候选的所有文本片段
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Gemini 的 OpenAI 兼容端点
fn openai_compat_base(api_base_url: &str) -> String {
    format!("{}/openai", api_base_url.trim_end_matches('/'))
}

/// 把内容片段转换成一条 OpenAI 格式的用户消息
///
/// 只有文字时发送纯文本，带附件时发送多段内容，附件以 `data:` URL 传递
fn build_chat_request(
    model_name: &str,
    parts: Vec<Part>,
) -> Result<CreateChatCompletionRequest, OpenAIError> {
    let has_inline = parts.iter().any(|p| matches!(p, Part::InlineData { .. }));

    let user_msg = if has_inline {
        let content_parts: Vec<ChatCompletionRequestUserMessageContentPart> = parts
            .into_iter()
            .map(|part| match part {
                Part::Text { text } => ChatCompletionRequestUserMessageContentPart::Text(
                    ChatCompletionRequestMessageContentPartText { text },
                ),
                Part::InlineData { inline_data } => {
                    ChatCompletionRequestUserMessageContentPart::ImageUrl(
                        ChatCompletionRequestMessageContentPartImage {
                            image_url: ImageUrl {
                                url: inline_data.data_url(),
                                detail: Some(ImageDetail::Auto),
                            },
                        },
                    )
                }
            })
            .collect();

        ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(
                content_parts,
            ))
            .build()?
    } else {
        let text: Vec<String> = parts
            .into_iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text),
                Part::InlineData { .. } => None,
            })
            .collect();

        ChatCompletionRequestUserMessageArgs::default()
            .content(text.join("\n"))
            .build()?
    };

    CreateChatCompletionRequestArgs::default()
        .model(model_name)
        .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
        .stream(true)
        .build()
}

/// Gemini 客户端
pub struct GeminiClient {
    http: reqwest::Client,
    chat: Client<OpenAIConfig>,
    api_key: String,
    api_base_url: String,
    model_name: String,
}

impl GeminiClient {
    /// 创建新的 Gemini 客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| AppError::llm_request_failed(&config.gemini_model_name, e))?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.gemini_api_key)
            .with_api_base(openai_compat_base(&config.gemini_api_base_url));

        Ok(Self {
            http,
            chat: Client::with_config(openai_config),
            api_key: config.gemini_api_key.clone(),
            api_base_url: config.gemini_api_base_url.trim_end_matches('/').to_string(),
            model_name: config.gemini_model_name.clone(),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.api_base_url, self.model_name, method)
    }

    fn ensure_api_key(&self) -> AppResult<()> {
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingApiKey.into());
        }
        Ok(())
    }

    fn build_request(&self, url: &str, parts: Vec<Part>) -> AppResult<reqwest::Request> {
        self.ensure_api_key()?;

        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts,
            }],
        };

        self.http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .build()
            .map_err(|e| AppError::llm_request_failed(&self.model_name, e))
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn generate_content(&self, parts: Vec<Part>) -> AppResult<String> {
        debug!("调用 Gemini generateContent，模型: {}", self.model_name);

        let request = self.build_request(&self.endpoint("generateContent"), parts)?;
        let response = self.http.execute(request).await.map_err(|e| {
            warn!("Gemini API 调用失败: {}", e);
            AppError::llm_request_failed(&self.model_name, e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini API 返回错误状态: {} {}", status, truncate_text(&body, 200));
            return Err(LlmError::BadStatus {
                model: self.model_name.clone(),
                status: status.as_u16(),
                body: truncate_text(&body, 500),
            }
            .into());
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::llm_request_failed(&self.model_name, e))?;

        let text = body.text();
        if text.trim().is_empty() {
            return Err(LlmError::EmptyContent {
                model: self.model_name.clone(),
            }
            .into());
        }

        debug!("Gemini API 调用成功，返回 {} 字符", text.len());
        Ok(text)
    }

    async fn generate_content_stream(&self, parts: Vec<Part>) -> AppResult<TextStream> {
        debug!("调用 Gemini 流式对话，模型: {}", self.model_name);
        self.ensure_api_key()?;

        let request = build_chat_request(&self.model_name, parts)
            .map_err(|e| AppError::llm_stream_failed(&self.model_name, e))?;

        let stream = self.chat.chat().create_stream(request).await.map_err(|e| {
            warn!("Gemini 流式对话调用失败: {}", e);
            AppError::llm_stream_failed(&self.model_name, e)
        })?;

        let model = self.model_name.clone();
        let texts = stream.filter_map(move |item| {
            future::ready(match item {
                Ok(response) => {
                    let text: String = response
                        .choices
                        .iter()
                        .filter_map(|choice| choice.delta.content.as_deref())
                        .collect();
                    (!text.is_empty()).then_some(Ok(text))
                }
                Err(e) => Some(Err(AppError::llm_stream_failed(&model, e))),
            })
        });

        Ok(texts.boxed())
    }
}
