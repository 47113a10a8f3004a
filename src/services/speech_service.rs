//! 语音输出服务 - 业务能力层
//!
//! 只负责"把一段文字读出来"，发出后不等待结束

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::SpeechError;

/// 朗读使用的固定语言
pub const SPANISH_LOCALE: &str = "es-ES";

/// 语音合成能力
pub trait SpeechSynthesizer: Send + Sync {
    fn speak(&self, text: &str, lang: &str) -> Result<(), SpeechError>;
}

/// 调用宿主机 TTS 命令（默认 `espeak-ng`）
///
/// 实际执行 `<program> [args..] -v <voice> --stdin`，voice 取 locale 的语言部分
///
/// 文字经标准输入传入，不受参数长度限制，也不会被当成命令行选项
pub struct CommandSpeech {
    program: String,
    args: Vec<String>,
}

impl CommandSpeech {
    /// 解析命令行，空字符串返回 `None`
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }

    fn voice(lang: &str) -> String {
        lang.split(['-', '_'])
            .next()
            .unwrap_or(lang)
            .to_ascii_lowercase()
    }
}

impl SpeechSynthesizer for CommandSpeech {
    fn speak(&self, text: &str, lang: &str) -> Result<(), SpeechError> {
        debug!("🔊 朗读 {} 字符，语言 {}", text.chars().count(), lang);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("-v")
            .arg(Self::voice(lang))
            .arg("--stdin")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SpeechError::Unavailable {
                reason: format!("{}: {}", self.program, e),
            })?;

        let stdin = child.stdin.take();
        let text = text.to_string();
        tokio::spawn(async move {
            if let Some(mut stdin) = stdin {
                if let Err(e) = stdin.write_all(text.as_bytes()).await {
                    debug!("写入朗读文本失败: {}", e);
                }
            }
            let _ = child.wait().await;
        });

        Ok(())
    }
}

/// 没有语音能力的环境
pub struct NoSpeech;

impl SpeechSynthesizer for NoSpeech {
    fn speak(&self, _text: &str, _lang: &str) -> Result<(), SpeechError> {
        Err(SpeechError::Unavailable {
            reason: "未配置语音合成命令".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_command_line() {
        let speech = CommandSpeech::from_command_line("espeak-ng -s 150").unwrap();
        assert_eq!(speech.program, "espeak-ng");
        assert_eq!(speech.args, vec!["-s".to_string(), "150".to_string()]);
        assert!(CommandSpeech::from_command_line("   ").is_none());
    }

    #[test]
    fn test_voice_from_locale() {
        assert_eq!(CommandSpeech::voice(SPANISH_LOCALE), "es");
        assert_eq!(CommandSpeech::voice("pt_BR"), "pt");
    }

    #[test]
    fn test_no_speech_is_unavailable() {
        assert!(NoSpeech.speak("hola", SPANISH_LOCALE).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_text_is_piped_not_passed_as_argument() {
        let dir = std::env::temp_dir().join(format!("evaluador-tts-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let out = dir.join("dicho.txt");
        let script = dir.join("tts.sh");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho \"$@\" > {0}.args\ncat > {0}\n", out.display()),
        )
        .unwrap();

        let speech = CommandSpeech::from_command_line(&format!("sh {}", script.display())).unwrap();
        let long = format!("-5 {}", "x".repeat(200_000));
        speech.speak(&long, SPANISH_LOCALE).unwrap();

        let mut spoken = String::new();
        for _ in 0..100 {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            spoken = std::fs::read_to_string(&out).unwrap_or_default();
            if spoken == long {
                break;
            }
        }
        assert_eq!(spoken, long);
        let args = std::fs::read_to_string(format!("{}.args", out.display())).unwrap();
        assert_eq!(args.trim(), "-v es --stdin");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let speech = CommandSpeech::from_command_line("definitivamente-no-existe-tts").unwrap();
        let err = speech.speak("hola", SPANISH_LOCALE).unwrap_err();
        assert!(matches!(err, SpeechError::Unavailable { .. }));
    }
}
