//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 创建模型客户端、语音能力，注入到流程层
//! - 运行终端交互循环
//!
//! ### `command` - 命令解析
//! - 把一行输入解析为 `Command`
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::App (终端交互)
//!     ↓
//! workflow (EvaluatorSession / ChatFlow)
//!     ↓
//! services (提取 / 评分 / 语音)
//!     ↓
//! clients (GenerativeModel)
//! ```

pub mod app;
pub mod command;

pub use app::App;
pub use command::Command;
