use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::clients::{GenerativeModel, TextStream};
use crate::error::{AppResult, LlmError, SpeechError};
use crate::models::Part;
use crate::services::SpeechSynthesizer;

/// 脚本化模型的一次应答
pub(crate) enum Script {
    /// 完整文本（流式时作为单个数据块）
    Reply(String),
    /// 按顺序返回的数据块
    Chunks(Vec<&'static str>),
    /// 请求直接失败
    Fail,
    /// 先返回若干数据块，然后流中途出错
    FailMidStream(Vec<&'static str>),
}

fn scripted_error() -> crate::error::AppError {
    LlmError::BadStatus {
        model: "scripted".to_string(),
        status: 503,
        body: "unavailable".to_string(),
    }
    .into()
}

type Watcher = Box<dyn Fn() -> bool + Send>;

/// 按脚本应答并记录所有请求的模型
pub(crate) struct ScriptedModel {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<Vec<Part>>>,
    watcher: Mutex<Option<Watcher>>,
    observed: Mutex<Vec<bool>>,
}

impl ScriptedModel {
    pub(crate) fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
            watcher: Mutex::new(None),
            observed: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<Vec<Part>> {
        self.requests.lock().unwrap().clone()
    }

    /// 每次被调用时读取一次外部状态
    pub(crate) fn watch(&self, watcher: impl Fn() -> bool + Send + 'static) {
        *self.watcher.lock().unwrap() = Some(Box::new(watcher));
    }

    /// 调用时读取到的状态，按调用顺序
    pub(crate) fn observed(&self) -> Vec<bool> {
        self.observed.lock().unwrap().clone()
    }

    fn next(&self, parts: Vec<Part>) -> Script {
        if let Some(watcher) = self.watcher.lock().unwrap().as_ref() {
            self.observed.lock().unwrap().push(watcher());
        }
        self.requests.lock().unwrap().push(parts);
        self.scripts.lock().unwrap().pop_front().unwrap_or(Script::Fail)
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate_content(&self, parts: Vec<Part>) -> AppResult<String> {
        match self.next(parts) {
            Script::Reply(text) => Ok(text),
            Script::Chunks(chunks) => Ok(chunks.concat()),
            Script::Fail | Script::FailMidStream(_) => Err(scripted_error()),
        }
    }

    async fn generate_content_stream(&self, parts: Vec<Part>) -> AppResult<TextStream> {
        let items: Vec<AppResult<String>> = match self.next(parts) {
            Script::Reply(text) => vec![Ok(text)],
            Script::Chunks(chunks) => chunks.into_iter().map(|c| Ok(c.to_string())).collect(),
            Script::Fail => return Err(scripted_error()),
            Script::FailMidStream(chunks) => chunks
                .into_iter()
                .map(|c| Ok(c.to_string()))
                .chain(std::iter::once(Err(scripted_error())))
                .collect(),
        };
        Ok(stream::iter(items).boxed())
    }
}

/// 记录朗读内容的语音实现
pub(crate) struct RecordingSpeech {
    available: bool,
    spoken: Mutex<Vec<(String, String)>>,
}

impl RecordingSpeech {
    pub(crate) fn available() -> Self {
        Self {
            available: true,
            spoken: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn unavailable() -> Self {
        Self {
            available: false,
            spoken: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn spoken(&self) -> Vec<(String, String)> {
        self.spoken.lock().unwrap().clone()
    }
}

impl SpeechSynthesizer for RecordingSpeech {
    fn speak(&self, text: &str, lang: &str) -> Result<(), SpeechError> {
        if !self.available {
            return Err(SpeechError::Unavailable {
                reason: "test".to_string(),
            });
        }
        self.spoken
            .lock()
            .unwrap()
            .push((text.to_string(), lang.to_string()));
        Ok(())
    }
}
