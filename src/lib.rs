//! # Evaluador
//!
//! 算术习题评测 + 生成式 AI 助手
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 持有对外部 AI 服务的连接，只暴露能力
//! - `GenerativeModel` - 一次性生成 / 流式生成
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `ExtractionService` - 从 PDF / 图片提取习题
//! - `grading_service` - 评分
//! - `SpeechSynthesizer` - 朗读
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义会话状态和完整流程
//! - `EvaluatorSession` - 上传 → 作答 → 评分
//! - `ChatFlow` - 一轮对话（发送 → 流式接收 → 朗读）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 终端交互循环
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_support;

// 重新导出常用类型
pub use clients::{GeminiClient, GenerativeModel};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{ChatMessage, Exercise, UploadedFile};
pub use orchestrator::App;
pub use services::{GradeReport, SpeechSynthesizer};
pub use workflow::{ChatFlow, EvaluatorSession, IngestReport, TurnOutcome, TurnStatus};
