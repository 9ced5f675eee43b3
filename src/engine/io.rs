//! ユーザー入出力チャネル
//!
//! # 責務
//!
//! - Output ステップの表示先と Input ステップの入力元を抽象化する [`ScenarioIo`]
//! - 端末（標準入出力）を使う [`TerminalIo`]
//! - 事前に用意した回答を返し、表示内容を記録する [`ScriptedIo`]（テスト・非対話実行用）
//!
//! ランナーは端末に直接依存せず、このトレイトを介してのみ入出力を行います。

use async_trait::async_trait;
use crate::engine::step::InputKind;
use std::collections::VecDeque;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};

/// ユーザー入出力チャネル
#[async_trait]
pub trait ScenarioIo: Send {
    /// メッセージを表示する
    ///
    /// `header` が真の場合は見出しとして装飾します。
    async fn write_output(&mut self, text: &str, header: bool) -> io::Result<()>;

    /// プロンプトを表示して1行読み取る
    ///
    /// # 戻り値
    ///
    /// - `Ok(Some(line))`: 読み取った行（改行を除く）
    /// - `Ok(None)`: 入力元が閉じられた
    async fn read_line(&mut self, prompt: &str, kind: InputKind) -> io::Result<Option<String>>;
}

/// 見出しを `=` の罫線で囲んだ文字列に整形する
///
/// 罫線の幅は最も長い行の文字数に合わせます。
pub fn format_header(text: &str) -> String {
    let width = text.lines().map(|line| line.chars().count()).max().unwrap_or(0);
    let rule = "=".repeat(width);
    format!("{rule}\n{text}\n{rule}")
}

/// 入力種別に応じたプロンプトの末尾表記
fn prompt_suffix(kind: InputKind) -> &'static str {
    match kind {
        InputKind::Confirm => " (y/N) ",
        InputKind::Text | InputKind::Number => " ",
    }
}

/// 標準入出力を使う入出力チャネル
pub struct TerminalIo {
    reader: BufReader<Stdin>,
    assume_yes: bool,
}

impl TerminalIo {
    /// 新しい端末チャネルを生成
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
            assume_yes: false,
        }
    }

    /// すべての確認プロンプトに自動で「はい」と答える
    pub fn with_assume_yes(mut self, assume_yes: bool) -> Self {
        self.assume_yes = assume_yes;
        self
    }

    async fn write_stdout(text: &str) -> io::Result<()> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(text.as_bytes()).await?;
        stdout.flush().await
    }
}

impl Default for TerminalIo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScenarioIo for TerminalIo {
    async fn write_output(&mut self, text: &str, header: bool) -> io::Result<()> {
        let rendered = if header { format_header(text) } else { text.to_string() };
        Self::write_stdout(&format!("{rendered}\n")).await
    }

    async fn read_line(&mut self, prompt: &str, kind: InputKind) -> io::Result<Option<String>> {
        let question = format!("{prompt}{}", prompt_suffix(kind));

        if self.assume_yes && kind == InputKind::Confirm {
            Self::write_stdout(&format!("{question}y\n")).await?;
            return Ok(Some("y".to_string()));
        }

        Self::write_stdout(&question).await?;

        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// 表示された1件のメッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedOutput {
    /// 表示テキスト
    pub text: String,
    /// 見出しとして表示されたか
    pub header: bool,
}

/// 事前に用意した回答を順に返す入出力チャネル
///
/// 表示されたメッセージとプロンプトを記録するため、テストで
/// 「何が表示され、何が尋ねられたか」を検証できます。
/// 回答が尽きると入力元が閉じられたものとして `None` を返します。
///
/// # 例
///
/// ```rust
/// use melted_scenario::engine::io::ScriptedIo;
///
/// let io = ScriptedIo::new(["y", "n"]);
/// assert_eq!(io.remaining_answers(), 2);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedIo {
    answers: VecDeque<String>,
    outputs: Vec<RecordedOutput>,
    prompts: Vec<String>,
}

impl ScriptedIo {
    /// 回答を指定して生成
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            outputs: Vec::new(),
            prompts: Vec::new(),
        }
    }

    /// 表示されたメッセージ
    pub fn outputs(&self) -> &[RecordedOutput] {
        &self.outputs
    }

    /// 表示されたテキストのみ
    pub fn output_texts(&self) -> Vec<&str> {
        self.outputs.iter().map(|o| o.text.as_str()).collect()
    }

    /// 表示されたプロンプト
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// 未使用の回答数
    pub fn remaining_answers(&self) -> usize {
        self.answers.len()
    }
}

#[async_trait]
impl ScenarioIo for ScriptedIo {
    async fn write_output(&mut self, text: &str, header: bool) -> io::Result<()> {
        self.outputs.push(RecordedOutput {
            text: text.to_string(),
            header,
        });
        Ok(())
    }

    async fn read_line(&mut self, prompt: &str, _kind: InputKind) -> io::Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.answers.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_header_uses_longest_line() {
        let framed = format_header("Welcome\nto the demo!");
        assert_eq!(framed, "============\nWelcome\nto the demo!\n============");
    }

    #[test]
    fn test_format_header_counts_chars_not_bytes() {
        assert_eq!(format_header("ようこそ"), "====\nようこそ\n====");
    }

    #[test]
    fn test_prompt_suffix() {
        assert_eq!(prompt_suffix(InputKind::Confirm), " (y/N) ");
        assert_eq!(prompt_suffix(InputKind::Text), " ");
    }

    #[tokio::test]
    async fn test_scripted_io_records_and_answers() {
        let mut io = ScriptedIo::new(["yes"]);

        io.write_output("hello", true).await.unwrap();
        let first = io.read_line("Continue?", InputKind::Confirm).await.unwrap();
        let second = io.read_line("Again?", InputKind::Confirm).await.unwrap();

        assert_eq!(first.as_deref(), Some("yes"));
        assert_eq!(second, None);
        assert_eq!(
            io.outputs(),
            &[RecordedOutput {
                text: "hello".to_string(),
                header: true
            }]
        );
        assert_eq!(io.prompts(), &["Continue?".to_string(), "Again?".to_string()]);
        assert_eq!(io.remaining_answers(), 0);
    }
}
