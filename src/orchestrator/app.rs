//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：创建模型客户端和语音能力，并注入到各流程
//! 2. **交互循环**：逐行读取终端输入，分派给评测会话或对话流程
//! 3. **结果展示**：把流程返回的结果和提示打印给用户
//!
//! 本层不做业务判断，只负责调度和展示

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::clients::{GeminiClient, GenerativeModel};
use crate::config::Config;
use crate::models::{ChatRole, UploadedFile};
use crate::orchestrator::command::{Command, HELP};
use crate::services::{CommandSpeech, NoSpeech, SpeechSynthesizer};
use crate::utils::logging::log_startup;
use crate::workflow::{ChatFlow, EvaluatorSession, TurnOutcome};

/// 应用主结构
pub struct App {
    session: EvaluatorSession,
    chat: ChatFlow,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let model: Arc<dyn GenerativeModel> = Arc::new(GeminiClient::new(&config)?);
        let speech: Arc<dyn SpeechSynthesizer> =
            match CommandSpeech::from_command_line(&config.speech_command) {
                Some(speech) => Arc::new(speech),
                None => Arc::new(NoSpeech),
            };

        Ok(Self::with_services(model, speech))
    }

    /// 使用指定的模型和语音能力创建应用
    pub fn with_services(
        model: Arc<dyn GenerativeModel>,
        speech: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            session: EvaluatorSession::new(model.clone()),
            chat: ChatFlow::new(model, speech),
        }
    }

    /// 运行交互循环，直到 `/quit` 或输入结束
    pub async fn run(&mut self) -> Result<()> {
        info!("输入 /help 查看可用命令");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            match Command::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => self.execute(command).await,
                Err(message) => println!("{}", message),
            }
        }

        info!("👋 会话结束");
        Ok(())
    }

    /// 执行一条命令
    pub async fn execute(&mut self, command: Command) {
        match command {
            Command::Load(paths) => self.load_paths(paths).await,
            Command::Add {
                problem,
                correct_answer,
            } => {
                if self
                    .session
                    .add_manual_exercise(None, &problem, Some(correct_answer))
                {
                    println!("已添加第 {} 题", self.session.exercises().len());
                } else {
                    println!("用法: /add <题目> = <答案>");
                }
            }
            Command::Answer { index, answer } => {
                if let Err(e) = self.session.set_answer(index, answer) {
                    println!("{}", e);
                }
            }
            Command::List => self.print_exercises(),
            Command::Grade => match self.session.grade() {
                Some(report) => {
                    self.print_exercises();
                    println!(
                        "Nota final: {:.2} / 10 ({} de {} correctas)",
                        report.final_score, report.correct_count, report.total
                    );
                }
                None => println!("没有可评分的习题"),
            },
            Command::Restart => {
                self.session.restart();
                println!("习题已清空");
            }
            Command::Image(path) => match UploadedFile::from_path(&path).await {
                Ok(file) => {
                    self.chat.attach_image(&file);
                    println!("📎 已附加图片: {}", file.name);
                }
                Err(e) => println!("{}", e),
            },
            Command::Vision(enabled) => {
                self.chat.set_vision(enabled);
                println!("视觉模式: {}", if enabled { "开" } else { "关" });
            }
            Command::Voice(enabled) => {
                self.chat.set_voice(enabled);
                println!("朗读回复: {}", if enabled { "开" } else { "关" });
            }
            Command::History => {
                for message in self.chat.history() {
                    let who = match message.role {
                        ChatRole::User => "Tú",
                        ChatRole::Model => "IA",
                    };
                    println!("{}: {}", who, message.text);
                }
            }
            Command::Help => println!("{}", HELP),
            Command::Chat(text) => self.send_chat(&text).await,
            Command::Quit => {}
        }
    }

    /// 从磁盘读取文件并导入
    async fn load_paths(&mut self, paths: Vec<PathBuf>) {
        let mut files = Vec::with_capacity(paths.len());
        for path in &paths {
            match UploadedFile::from_path(path).await {
                Ok(file) => files.push(file),
                Err(e) => {
                    warn!("⚠️ {}", e);
                    println!("{}", e);
                }
            }
        }

        let indicator = show_while(
            self.session.processing_status(),
            |busy| *busy,
            "⏳ Procesando documento con la IA...",
        );
        let report = self.session.on_files_selected(files).await;
        indicator.abort();
        for notice in &report.notices {
            println!("{}", notice);
        }
        println!(
            "新增 {} 道习题，共 {} 道",
            report.appended,
            self.session.exercises().len()
        );
    }

    async fn send_chat(&mut self, text: &str) {
        let indicator = show_while(
            self.chat.turn_status(),
            |status| status.reasoning && status.current_stream.is_empty(),
            "🤔 Pensando...",
        );
        let mut stdout = std::io::stdout();
        let outcome = self
            .chat
            .send_message(text, |chunk| {
                print!("{}", chunk);
                let _ = stdout.flush();
            })
            .await;
        indicator.abort();

        match outcome {
            TurnOutcome::Ignored => {}
            TurnOutcome::Replied { speech_notice, .. } => {
                println!();
                if let Some(notice) = speech_notice {
                    println!("{}", notice);
                }
            }
            TurnOutcome::Failed => {
                println!();
                if let Some(last) = self.chat.history().last() {
                    println!("{}", last.text);
                }
            }
        }
    }

    fn print_exercises(&self) {
        if self.session.exercises().is_empty() {
            println!("还没有习题");
            return;
        }
        for (i, exercise) in self.session.exercises().iter().enumerate() {
            println!("{:>3}. {}", i + 1, exercise);
        }
    }

    pub fn session(&self) -> &EvaluatorSession {
        &self.session
    }

    pub fn chat_flow(&self) -> &ChatFlow {
        &self.chat
    }
}

/// 状态进入 `active` 时打印一次加载提示
fn show_while<T, F>(mut status: watch::Receiver<T>, active: F, message: &'static str) -> JoinHandle<()>
where
    T: Send + Sync + 'static,
    F: Fn(&T) -> bool + Send + 'static,
{
    tokio::spawn(async move {
        let mut shown = false;
        while status.changed().await.is_ok() {
            let now = {
                let value = status.borrow_and_update();
                active(&*value)
            };
            if now && !shown {
                println!("{}", message);
            }
            shown = now;
        }
    })
}
