//! 习题提取服务 - 业务能力层
//!
//! 只负责"把一份 PDF / 图片交给模型，拿回习题列表"能力
//!
//! ## 处理步骤
//! 1. 文件字节 base64 编码为内联附件
//! 2. 固定的提取指令 + 附件发送给 `generate_content`
//! 3. 去掉模型可能包裹的 ``` 代码块标记
//! 4. 解析为 JSON，只有顶层是数组时才返回习题

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, info};

use crate::clients::GenerativeModel;
use crate::error::{AppResult, IngestError};
use crate::models::{parse_batch, Exercise, InlineData, Part, UploadedFile};
use crate::utils::truncate_text;

/// 提取指令
pub const EXTRACTION_PROMPT: &str = r#"Actúa como un extractor de datos matemáticos. El documento adjunto es un examen o una lista de ejercicios de matemáticas.
Extrae cada ejercicio que encuentres, resuélvelo para obtener la respuesta correcta y devuelve el resultado ÚNICAMENTE como un arreglo JSON válido.

Cada objeto del arreglo debe tener exactamente esta estructura:
{
  "enunciado": "La instrucción del ejercicio (ej: Resuelve la ecuación)",
  "problema": "La operación matemática (ej: 5 + 5 * 2)",
  "prefijo": "R =",
  "respuestaCorrecta": el número con el resultado correcto
}

No incluyas texto adicional, saludos ni formato markdown (```json). Devuelve SOLO el arreglo JSON puro."#;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?").expect("代码块正则表达式无效"));

/// 去掉代码块标记并裁剪空白
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text.trim(), "").trim().to_string()
}

/// 习题提取服务
pub struct ExtractionService {
    model: Arc<dyn GenerativeModel>,
}

impl ExtractionService {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// 从文档中提取习题
    ///
    /// # 返回
    /// - `Ok(Some(..))`: 模型返回了习题数组
    /// - `Ok(None)`: 模型返回的是合法 JSON 但不是数组
    pub async fn extract(&self, file: &UploadedFile) -> AppResult<Option<Vec<Exercise>>> {
        info!(
            "🤖 正在使用 {} 提取文档中的习题: {}",
            self.model.model_name(),
            file.name
        );

        let document = InlineData::from_bytes(&file.mime_type, &file.bytes);
        let reply = self
            .model
            .generate_content(vec![Part::text(EXTRACTION_PROMPT), Part::inline(document)])
            .await?;

        debug!("模型原始返回: {}", truncate_text(&reply, 200));

        let cleaned = strip_code_fences(&reply);
        let exercises =
            parse_batch(&cleaned).map_err(|source| IngestError::ExtractionParse { source })?;

        if let Some(list) = &exercises {
            info!("✓ 从 {} 提取到 {} 道习题", file.name, list.len());
        }
        Ok(exercises)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::test_support::{Script, ScriptedModel};

    fn pdf() -> UploadedFile {
        UploadedFile::new("examen.pdf", "application/pdf", b"%PDF-1.4".to_vec())
    }

    #[test]
    fn test_strip_code_fences() {
        let reply = "```json\n[{\"problema\": \"1+1\", \"respuestaCorrecta\": 2}]\n```";
        assert_eq!(
            strip_code_fences(reply),
            "[{\"problema\": \"1+1\", \"respuestaCorrecta\": 2}]"
        );
        assert_eq!(strip_code_fences("  [1]  "), "[1]");
        assert_eq!(strip_code_fences("```\n[]\n```"), "[]");
    }

    #[tokio::test]
    async fn test_extract_sends_prompt_and_document() {
        let model = Arc::new(ScriptedModel::new(vec![Script::Reply(
            "```json\n[{\"enunciado\": \"Resuelve:\", \"problema\": \"5 + 5 * 2\", \"prefijo\": \"R =\", \"respuestaCorrecta\": 15}]\n```"
                .to_string(),
        )]));
        let service = ExtractionService::new(model.clone());

        let exercises = service.extract(&pdf()).await.unwrap().unwrap();
        assert_eq!(exercises.len(), 1);
        assert_eq!(exercises[0].correct_answer, 15.0);

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0][0], Part::text(EXTRACTION_PROMPT));
        assert_eq!(
            requests[0][1],
            Part::inline(InlineData::from_bytes("application/pdf", b"%PDF-1.4"))
        );
    }

    #[tokio::test]
    async fn test_extract_non_array_is_none() {
        let model = Arc::new(ScriptedModel::new(vec![Script::Reply(
            "{\"problema\": \"1+1\"}".to_string(),
        )]));
        let service = ExtractionService::new(model);

        assert!(service.extract(&pdf()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_extract_prose_reply_is_parse_error() {
        let model = Arc::new(ScriptedModel::new(vec![Script::Reply(
            "Claro, aquí tienes los ejercicios".to_string(),
        )]));
        let service = ExtractionService::new(model);

        let err = service.extract(&pdf()).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Ingest(IngestError::ExtractionParse { .. })
        ));
    }

    #[tokio::test]
    async fn test_extract_propagates_model_failure() {
        let model = Arc::new(ScriptedModel::new(vec![Script::Fail]));
        let service = ExtractionService::new(model);

        assert!(matches!(
            service.extract(&pdf()).await,
            Err(AppError::Llm(_))
        ));
    }
}
