use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 手动添加习题时的默认说明
pub const DEFAULT_STATEMENT: &str = "Resuelve el siguiente ejercicio:";
/// 答案输入框前的默认标签
pub const DEFAULT_PREFIX: &str = "R =";

/// 单道可评分的算术习题
///
/// 字段名与上传的 JSON 批量文件保持一致（`enunciado`、`problema` 等）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    #[serde(rename = "enunciado", default)]
    pub statement: String,

    #[serde(rename = "problema")]
    pub problem: String,

    #[serde(rename = "prefijo", default)]
    pub prefix: String,

    #[serde(rename = "respuestaCorrecta")]
    pub correct_answer: f64,

    #[serde(
        rename = "respuestaUsuario",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub user_answer: Option<f64>,

    #[serde(rename = "evaluado", default, skip_serializing_if = "is_false")]
    pub graded: bool,

    #[serde(rename = "correcto", default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Exercise {
    pub fn new(
        statement: impl Into<String>,
        problem: impl Into<String>,
        prefix: impl Into<String>,
        correct_answer: f64,
    ) -> Self {
        Self {
            statement: statement.into(),
            problem: problem.into(),
            prefix: prefix.into(),
            correct_answer,
            user_answer: None,
            graded: false,
            is_correct: None,
        }
    }

    /// 设置用户答案（链式调用）
    pub fn with_answer(mut self, answer: f64) -> Self {
        self.user_answer = Some(answer);
        self
    }
}

impl std::fmt::Display for Exercise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}  {}", self.statement, self.problem, self.prefix)?;
        if let Some(answer) = self.user_answer {
            write!(f, " {}", answer)?;
        } else {
            write!(f, " _")?;
        }
        match self.is_correct {
            Some(true) => write!(f, "  ✓"),
            Some(false) => write!(f, "  ✗ ({})", self.correct_answer),
            None => Ok(()),
        }
    }
}

/// 解析习题批量 JSON
///
/// 顶层不是数组时返回 `Ok(None)`（静默忽略）；
/// 语法错误或任一元素不符合习题结构时返回错误，整个批次都不会被采用
pub fn parse_batch(text: &str) -> Result<Option<Vec<Exercise>>, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    if !value.is_array() {
        return Ok(None);
    }
    let exercises: Vec<Exercise> = serde_json::from_value(value)?;
    Ok(Some(exercises))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_keeps_order() {
        let text = r#"[
            {"enunciado": "Resuelve:", "problema": "5 + 5 * 2", "prefijo": "R =", "respuestaCorrecta": 15},
            {"enunciado": "Resuelve:", "problema": "2 + 2", "prefijo": "R =", "respuestaCorrecta": 4}
        ]"#;

        let batch = parse_batch(text).unwrap().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].problem, "5 + 5 * 2");
        assert_eq!(batch[0].correct_answer, 15.0);
        assert_eq!(batch[1].problem, "2 + 2");
        assert!(!batch[1].graded);
        assert_eq!(batch[1].is_correct, None);
    }

    #[test]
    fn test_parse_batch_ignores_non_array() {
        let text = r#"{"problema": "2 + 2", "respuestaCorrecta": 4}"#;
        assert!(parse_batch(text).unwrap().is_none());
    }

    #[test]
    fn test_parse_batch_rejects_syntax_error() {
        assert!(parse_batch("[{\"problema\": ").is_err());
    }

    #[test]
    fn test_parse_batch_rejects_element_without_answer() {
        let text = r#"[{"problema": "2 + 2"}]"#;
        assert!(parse_batch(text).is_err());
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let exercise = Exercise::new(DEFAULT_STATEMENT, "3 * 3", DEFAULT_PREFIX, 9.0);
        let json = serde_json::to_value(&exercise).unwrap();

        assert_eq!(json["problema"], "3 * 3");
        assert_eq!(json["respuestaCorrecta"], 9.0);
        assert!(json.get("respuestaUsuario").is_none());
        assert!(json.get("evaluado").is_none());
    }
}
