//! 终端命令解析
//!
//! 以 `/` 开头的行是命令，其余内容都作为聊天消息发送

use std::path::PathBuf;

/// 用户在终端输入的一条指令
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `/load <路径>...` 上传文件
    Load(Vec<PathBuf>),
    /// `/add <题目> = <答案>` 手动添加
    Add { problem: String, correct_answer: f64 },
    /// `/answer <序号> <答案|->` 作答（序号从 1 开始，`-` 清除答案）
    Answer { index: usize, answer: Option<f64> },
    /// `/list` 显示习题
    List,
    /// `/grade` 评分
    Grade,
    /// `/restart` 清空习题
    Restart,
    /// `/image <路径>` 为下一条消息附加图片
    Image(PathBuf),
    /// `/vision on|off`
    Vision(bool),
    /// `/voice on|off`
    Voice(bool),
    /// `/history` 显示对话历史
    History,
    Help,
    Quit,
    /// 普通文字，发送给模型
    Chat(String),
}

impl Command {
    /// 解析一行输入，无法识别的命令返回错误说明
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Chat(line.to_string()));
        };

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };

        match name {
            "load" => {
                let paths: Vec<PathBuf> = args.split_whitespace().map(PathBuf::from).collect();
                if paths.is_empty() {
                    return Err("用法: /load <文件>...".to_string());
                }
                Ok(Command::Load(paths))
            }
            "add" => {
                let usage = || "用法: /add <题目> = <答案>".to_string();
                let (problem, answer) = args.rsplit_once('=').ok_or_else(usage)?;
                if problem.trim().is_empty() {
                    return Err(usage());
                }
                Ok(Command::Add {
                    problem: problem.trim().to_string(),
                    correct_answer: parse_number(answer)?,
                })
            }
            "answer" => {
                let mut words = args.split_whitespace();
                let index = words
                    .next()
                    .and_then(|w| w.parse::<usize>().ok())
                    .filter(|&i| i > 0)
                    .ok_or_else(|| "用法: /answer <序号> <答案|->".to_string())?;
                let answer = match words.next() {
                    Some("-") | None => None,
                    Some(value) => Some(parse_number(value)?),
                };
                Ok(Command::Answer {
                    index: index - 1,
                    answer,
                })
            }
            "list" => Ok(Command::List),
            "grade" => Ok(Command::Grade),
            "restart" => Ok(Command::Restart),
            "image" if args.is_empty() => Err("用法: /image <文件>".to_string()),
            "image" => Ok(Command::Image(PathBuf::from(args))),
            "vision" => parse_switch(args).map(Command::Vision),
            "voice" => parse_switch(args).map(Command::Voice),
            "history" => Ok(Command::History),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            _ => Err(format!("未知命令: /{}，输入 /help 查看帮助", name)),
        }
    }
}

fn parse_number(value: &str) -> Result<f64, String> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("不是有效的数字: {}", value.trim()))
}

fn parse_switch(value: &str) -> Result<bool, String> {
    match value {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err("请使用 on 或 off".to_string()),
    }
}

/// 帮助文本
pub const HELP: &str = "\
/load <文件>...        上传 JSON / PDF / 图片
/add <题目> = <答案>   手动添加习题
/answer <序号> <答案>  作答（- 清除答案）
/list                  显示习题
/grade                 评分
/restart               清空习题
/image <文件>          为下一条消息附加图片
/vision on|off         视觉模式
/voice on|off          朗读回复
/history               对话历史
/quit                  退出
其他输入将作为消息发送给 AI";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_chat() {
        assert_eq!(
            Command::parse("  ¿Cuánto es 2+2?  ").unwrap(),
            Command::Chat("¿Cuánto es 2+2?".to_string())
        );
        assert_eq!(Command::parse("").unwrap(), Command::Chat(String::new()));
    }

    #[test]
    fn test_add_splits_on_last_equals() {
        assert_eq!(
            Command::parse("/add x = 2 + 3 = 5").unwrap(),
            Command::Add {
                problem: "x = 2 + 3".to_string(),
                correct_answer: 5.0
            }
        );
        assert!(Command::parse("/add 2 + 3").is_err());
        assert!(Command::parse("/add 2 + 3 = cinco").is_err());
        assert_eq!(
            Command::parse("/add  = 4"),
            Err("用法: /add <题目> = <答案>".to_string())
        );
    }

    #[test]
    fn test_answer_is_one_based() {
        assert_eq!(
            Command::parse("/answer 2 4.5").unwrap(),
            Command::Answer {
                index: 1,
                answer: Some(4.5)
            }
        );
        assert_eq!(
            Command::parse("/answer 1 -").unwrap(),
            Command::Answer {
                index: 0,
                answer: None
            }
        );
        assert!(Command::parse("/answer 0 3").is_err());
    }

    #[test]
    fn test_switches_and_paths() {
        assert_eq!(Command::parse("/vision on").unwrap(), Command::Vision(true));
        assert_eq!(Command::parse("/voice off").unwrap(), Command::Voice(false));
        assert!(Command::parse("/voice maybe").is_err());
        assert_eq!(
            Command::parse("/load a.json b.pdf").unwrap(),
            Command::Load(vec![PathBuf::from("a.json"), PathBuf::from("b.pdf")])
        );
        assert_eq!(Command::parse("/image"), Err("用法: /image <文件>".to_string()));
        assert!(Command::parse("/nope").is_err());
    }
}
