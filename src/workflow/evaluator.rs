//! 习题评测会话 - 流程层
//!
//! 持有整个会话的习题列表，定义上传、手动添加、作答、评分、重置的流程
//!
//! 文件按声明的媒体类型分派：
//! - JSON → 直接解析
//! - PDF / 图片 → `ExtractionService`
//! - 其他 → 提示不支持
//!
//! 单个文件失败只产生一条提示，不影响同批次的其他文件

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::clients::GenerativeModel;
use crate::error::{AppError, AppResult, IngestError, SessionError};
use crate::models::{
    parse_batch, Exercise, MediaKind, UploadedFile, DEFAULT_PREFIX, DEFAULT_STATEMENT,
};
use crate::services::{grading_service, ExtractionService, GradeReport};

/// 一批文件的导入结果
#[derive(Debug, Default)]
pub struct IngestReport {
    /// 新增的习题数量
    pub appended: usize,
    /// 需要展示给用户的提示
    pub notices: Vec<String>,
}

/// 作用域内保持"正在处理文档"标志，离开作用域时一定清除
struct BusyFlag<'a>(&'a watch::Sender<bool>);

impl<'a> BusyFlag<'a> {
    fn raise(flag: &'a watch::Sender<bool>) -> Self {
        flag.send_replace(true);
        Self(flag)
    }
}

impl Drop for BusyFlag<'_> {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

/// 习题评测会话
pub struct EvaluatorSession {
    extraction: ExtractionService,
    exercises: Vec<Exercise>,
    loaded_files: Vec<String>,
    processing_document: watch::Sender<bool>,
    graded: bool,
    final_score: f64,
    correct_count: usize,
}

impl EvaluatorSession {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            extraction: ExtractionService::new(model),
            exercises: Vec::new(),
            loaded_files: Vec::new(),
            processing_document: watch::Sender::new(false),
            graded: false,
            final_score: 0.0,
            correct_count: 0,
        }
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn loaded_files(&self) -> &[String] {
        &self.loaded_files
    }

    pub fn is_processing_document(&self) -> bool {
        *self.processing_document.borrow()
    }

    /// 订阅"正在处理文档"状态，界面据此显示加载提示
    ///
    /// 导入期间会话被独占借用，只能通过这个接收端观察
    pub fn processing_status(&self) -> watch::Receiver<bool> {
        self.processing_document.subscribe()
    }

    pub fn is_graded(&self) -> bool {
        self.graded
    }

    pub fn final_score(&self) -> f64 {
        self.final_score
    }

    pub fn correct_count(&self) -> usize {
        self.correct_count
    }

    /// 导入一批用户选择的文件
    pub async fn on_files_selected(&mut self, files: Vec<UploadedFile>) -> IngestReport {
        let mut report = IngestReport::default();

        for file in files {
            self.loaded_files.push(file.name.clone());

            let result = match file.kind() {
                MediaKind::Json => self.read_json_file(&file),
                MediaKind::Pdf | MediaKind::Image => self.extract_with_ai(&file).await,
                MediaKind::Unsupported => Err(IngestError::Unsupported {
                    file: file.name.clone(),
                    mime_type: file.mime_type.clone(),
                }),
            };

            match result {
                Ok(count) => {
                    info!("✓ {} 导入 {} 道习题", file.name, count);
                    report.appended += count;
                }
                Err(e) => {
                    warn!("⚠️ {}", e);
                    report.notices.push(e.notice());
                }
            }
        }

        report
    }

    fn read_json_file(&mut self, file: &UploadedFile) -> Result<usize, IngestError> {
        let invalid = |reason: String| IngestError::InvalidJson {
            file: file.name.clone(),
            reason,
        };

        let text = std::str::from_utf8(&file.bytes).map_err(|e| invalid(e.to_string()))?;
        let batch = parse_batch(text).map_err(|e| invalid(e.to_string()))?;

        Ok(self.append(batch))
    }

    async fn extract_with_ai(&mut self, file: &UploadedFile) -> Result<usize, IngestError> {
        let extracted = {
            let _busy = BusyFlag::raise(&self.processing_document);
            info!("⏳ 正在处理文档: {}", file.name);
            self.extraction.extract(file).await
        };

        match extracted {
            Ok(batch) => Ok(self.append(batch)),
            Err(AppError::Ingest(e)) => Err(e),
            Err(e) => Err(IngestError::ExtractionFailed {
                file: file.name.clone(),
                source: Box::new(e),
            }),
        }
    }

    fn append(&mut self, batch: Option<Vec<Exercise>>) -> usize {
        match batch {
            Some(exercises) => {
                let count = exercises.len();
                self.exercises.extend(exercises);
                count
            }
            None => 0,
        }
    }

    /// 手动添加一道习题
    ///
    /// 题目为空或没有正确答案时不添加，返回 `false`
    pub fn add_manual_exercise(
        &mut self,
        statement: Option<&str>,
        problem: &str,
        correct_answer: Option<f64>,
    ) -> bool {
        let Some(correct_answer) = correct_answer else {
            return false;
        };
        if problem.is_empty() {
            return false;
        }

        self.exercises.push(Exercise::new(
            statement.unwrap_or(DEFAULT_STATEMENT),
            problem,
            DEFAULT_PREFIX,
            correct_answer,
        ));
        true
    }

    /// 填写或清除某道题的答案
    pub fn set_answer(&mut self, index: usize, answer: Option<f64>) -> AppResult<()> {
        let len = self.exercises.len();
        let exercise = self
            .exercises
            .get_mut(index)
            .ok_or(SessionError::IndexOutOfRange { index, len })?;
        exercise.user_answer = answer;
        Ok(())
    }

    /// 对全部习题评分，列表为空时不做任何事
    pub fn grade(&mut self) -> Option<GradeReport> {
        let report = grading_service::grade(&mut self.exercises)?;

        self.graded = true;
        self.correct_count = report.correct_count;
        self.final_score = report.final_score;

        info!(
            "📊 评分完成: {}/{} 正确，得分 {:.2}",
            report.correct_count, report.total, report.final_score
        );
        Some(report)
    }

    /// 清空会话
    pub fn restart(&mut self) {
        self.exercises.clear();
        self.loaded_files.clear();
        self.graded = false;
        self.final_score = 0.0;
        self.correct_count = 0;
    }
}
