//! 对话流程 - 流程层
//!
//! 一轮对话的完整流程：
//! 1. 记录用户消息，取走待发送图片
//! 2. 进入"思考中"状态
//! 3. 流式接收模型回复，按到达顺序拼接
//! 4. 回复写入历史，按需朗读
//!
//! 任何失败都只在历史中追加一条固定的错误回复；
//! "思考中"标志和流式缓冲区在每条退出路径上都会被清除

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::clients::GenerativeModel;
use crate::error::AppResult;
use crate::models::{ChatMessage, InlineData, Part, UploadedFile};
use crate::services::{SpeechSynthesizer, SPANISH_LOCALE};
use crate::utils::truncate_text;

/// 视觉模式下替代用户文字的指令
pub const VISION_PROMPT: &str =
    "Actúa como un modelo de clasificación de imágenes. Dime la etiqueta principal de esta imagen de forma breve.";

/// 调用失败时写入历史的回复
pub const CONNECTION_ERROR_REPLY: &str = "Error de conexión con la IA.";

/// 一轮对话的结果
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// 没有文字也没有图片，什么都没发生
    Ignored,
    /// 模型正常回复
    Replied {
        text: String,
        /// 朗读失败时给用户的提示
        speech_notice: Option<String>,
    },
    /// 调用失败，历史中已追加错误回复
    Failed,
}

/// 一轮对话进行中的可观察状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnStatus {
    /// 正在等待或接收模型回复
    pub reasoning: bool,
    /// 已收到的回复片段
    pub current_stream: String,
}

/// 持有"思考中"状态，drop 时复位
struct ReasoningGuard<'a> {
    turn: &'a watch::Sender<TurnStatus>,
}

impl<'a> ReasoningGuard<'a> {
    fn begin(turn: &'a watch::Sender<TurnStatus>) -> Self {
        turn.send_modify(|status| {
            status.reasoning = true;
            status.current_stream.clear();
        });
        Self { turn }
    }

    fn reply(&self) -> String {
        self.turn.borrow().current_stream.clone()
    }
}

impl Drop for ReasoningGuard<'_> {
    fn drop(&mut self) {
        self.turn.send_replace(TurnStatus::default());
    }
}

/// 构建发送给模型的内容
///
/// 视觉模式且附带图片时发送固定指令 + 图片，否则只发送用户文字
pub(crate) fn build_payload(
    text: &str,
    image: Option<InlineData>,
    vision_enabled: bool,
) -> Vec<Part> {
    match image {
        Some(image) if vision_enabled => vec![Part::text(VISION_PROMPT), Part::inline(image)],
        _ => vec![Part::text(text)],
    }
}

/// 对话流程
pub struct ChatFlow {
    model: Arc<dyn GenerativeModel>,
    speech: Arc<dyn SpeechSynthesizer>,
    history: Vec<ChatMessage>,
    pending_image: Option<InlineData>,
    vision_enabled: bool,
    voice_enabled: bool,
    turn: watch::Sender<TurnStatus>,
}

impl ChatFlow {
    pub fn new(model: Arc<dyn GenerativeModel>, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            model,
            speech,
            history: Vec::new(),
            pending_image: None,
            vision_enabled: false,
            voice_enabled: false,
            turn: watch::Sender::new(TurnStatus::default()),
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn has_pending_image(&self) -> bool {
        self.pending_image.is_some()
    }

    pub fn is_reasoning(&self) -> bool {
        self.turn.borrow().reasoning
    }

    pub fn current_stream(&self) -> String {
        self.turn.borrow().current_stream.clone()
    }

    /// 订阅本轮对话的状态
    ///
    /// `send_message` 执行期间流程被独占借用，界面通过接收端读取"思考中"标志和流式缓冲区
    pub fn turn_status(&self) -> watch::Receiver<TurnStatus> {
        self.turn.subscribe()
    }

    pub fn vision_enabled(&self) -> bool {
        self.vision_enabled
    }

    pub fn voice_enabled(&self) -> bool {
        self.voice_enabled
    }

    pub fn set_vision(&mut self, enabled: bool) {
        self.vision_enabled = enabled;
    }

    pub fn set_voice(&mut self, enabled: bool) {
        self.voice_enabled = enabled;
    }

    /// 附加一张图片，替换之前未发送的图片
    pub fn attach_image(&mut self, file: &UploadedFile) {
        debug!("附加图片: {} ({})", file.name, file.mime_type);
        self.pending_image = Some(InlineData::from_bytes(&file.mime_type, &file.bytes));
    }

    /// 发送一条消息并流式接收回复
    ///
    /// `on_chunk` 在每个数据块到达时被调用，用于实时显示
    pub async fn send_message<F>(&mut self, text: &str, mut on_chunk: F) -> TurnOutcome
    where
        F: FnMut(&str),
    {
        if text.is_empty() && self.pending_image.is_none() {
            return TurnOutcome::Ignored;
        }

        // 仅附图时也会记录一条空的用户消息
        self.history.push(ChatMessage::user(text));
        let image = self.pending_image.take();
        let parts = build_payload(text, image, self.vision_enabled);

        let guard = ReasoningGuard::begin(&self.turn);
        info!("💬 发送消息: {}", truncate_text(text, 60));

        match stream_reply(self.model.as_ref(), parts, guard.turn, &mut on_chunk).await {
            Ok(()) => {
                let reply = guard.reply();
                self.history.push(ChatMessage::model(reply.clone()));
                debug!("模型回复 {} 字符", reply.chars().count());

                let speech_notice = if self.voice_enabled {
                    self.speech.speak(&reply, SPANISH_LOCALE).err().map(|e| {
                        warn!("⚠️ 朗读失败: {}", e);
                        e.notice()
                    })
                } else {
                    None
                };

                TurnOutcome::Replied {
                    text: reply,
                    speech_notice,
                }
            }
            Err(e) => {
                error!("❌ 与模型通信失败: {}", e);
                self.history.push(ChatMessage::model(CONNECTION_ERROR_REPLY));
                TurnOutcome::Failed
            }
        }
    }
}

async fn stream_reply<F>(
    model: &dyn GenerativeModel,
    parts: Vec<Part>,
    turn: &watch::Sender<TurnStatus>,
    on_chunk: &mut F,
) -> AppResult<()>
where
    F: FnMut(&str),
{
    let mut stream = model.generate_content_stream(parts).await?;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        turn.send_modify(|status| status.current_stream.push_str(&chunk));
        on_chunk(&chunk);
    }
    Ok(())
}
