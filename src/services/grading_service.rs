//! 评分服务 - 业务能力层
//!
//! 只负责"一次完整评分"，不关心习题从哪里来

use tracing::debug;

use crate::models::Exercise;

/// 评分结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeReport {
    pub correct_count: usize,
    pub total: usize,
    /// 0-10 分，保留两位小数
    pub final_score: f64,
}

/// 对全部习题重新评分
///
/// 列表为空时返回 `None` 且不做任何修改。
/// 每次都从头重新计算，不做增量更新
pub fn grade(exercises: &mut [Exercise]) -> Option<GradeReport> {
    if exercises.is_empty() {
        return None;
    }

    let mut correct_count = 0;
    for exercise in exercises.iter_mut() {
        exercise.graded = true;
        let correct = match exercise.user_answer {
            Some(answer) => answer == exercise.correct_answer,
            None => false,
        };
        exercise.is_correct = Some(correct);
        if correct {
            correct_count += 1;
        }
    }

    let total = exercises.len();
    let final_score = score(correct_count, total);
    debug!("评分完成: {}/{} 正确，得分 {}", correct_count, total, final_score);

    Some(GradeReport {
        correct_count,
        total,
        final_score,
    })
}

/// `round(correct / total * 10, 2)`
fn score(correct_count: usize, total: usize) -> f64 {
    let raw = correct_count as f64 / total as f64 * 10.0;
    (raw * 100.0).round() / 100.0
}
