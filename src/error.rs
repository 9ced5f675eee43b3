//! エラー型の定義
//!
//! このモジュールは、Melted Scenario 全体で使用されるエラー型を定義します。
//! シナリオ実行全体のエラー [`ScenarioError`](crate::engine::ScenarioError) は
//! 実行結果と同じく [`crate::engine::result`] に置いています。

use thiserror::Error;

/// 設定関連のエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    /// ファイルの読み込みに失敗
    #[error("設定ファイルの読み込みに失敗しました: {0}")]
    FileRead(#[from] std::io::Error),

    /// TOML のデシリアライズに失敗
    #[error("TOML のデシリアライズに失敗しました: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    /// TOML のシリアライズに失敗
    #[error("TOML のシリアライズに失敗しました: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// バリデーションエラー
    #[error("設定のバリデーションに失敗しました: {0}")]
    Validation(String),
}

/// 実行コンテキストの読み書きエラー
///
/// コンテキストはスキーマを持たないため、キーの有無と型の整合性は
/// 各ステップの読み出し時に検査されます。
#[derive(Debug, Error)]
pub enum ContextError {
    /// キーが存在しない（前段のステップが未実行、またはキー名の誤り）
    #[error("コンテキストにキー '{key}' がありません")]
    Missing {
        /// 参照したキー
        key: String,
    },

    /// 値を要求された型として解釈できない
    #[error("コンテキストのキー '{key}' を {expected} として解釈できません: {source}")]
    TypeMismatch {
        /// 参照したキー
        key: String,
        /// 期待した型の名前
        expected: &'static str,
        /// デコード時のエラー
        #[source]
        source: serde_json::Error,
    },

    /// 値を JSON に変換できない
    #[error("コンテキストのキー '{key}' に値を格納できません: {source}")]
    Serialize {
        /// 書き込もうとしたキー
        key: String,
        /// シリアライズ時のエラー
        #[source]
        source: serde_json::Error,
    },
}

/// 外部コラボレーター（クラウド操作・ネットワーク疎通確認）のエラー
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// 対象リソースが存在しない
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 同名のリソースが既に存在する
    #[error("リソースが既に存在します: {0}")]
    Conflict(String),

    /// リクエストが拒否された（入力不備など、再試行しても成功しない）
    #[error("リクエストが拒否されました: {0}")]
    Rejected(String),

    /// 一時的な失敗（再試行で回復しうる）
    #[error("一時的なエラーが発生しました: {0}")]
    Transient(String),

    /// HTTP 通信エラー
    #[error("HTTP 通信に失敗しました: {0}")]
    Http(#[from] reqwest::Error),

    /// 入出力エラー
    #[error("入出力エラー: {0}")]
    Io(#[from] std::io::Error),
}

/// 個々のステップの実行エラー
///
/// ランナーはこのエラーを捕捉せず、そのままシナリオを終了させます。
#[derive(Debug, Error)]
pub enum StepError {
    /// コンテキストの読み書きに失敗
    #[error(transparent)]
    Context(#[from] ContextError),

    /// コラボレーターの呼び出しに失敗
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// ユーザー入出力チャネルのエラー
    #[error("ユーザー入出力に失敗しました: {0}")]
    Io(#[from] std::io::Error),

    /// 入力待ちの途中で入力元が閉じられた
    #[error("ステップ '{step}' の入力待ちで入力が終了しました")]
    InputClosed {
        /// 入力を要求していたステップ名
        step: String,
    },

    /// ハンドラーが明示的に失敗を返した
    #[error("{0}")]
    Failed(String),
}

/// ロギング初期化のエラー
#[derive(Debug, Error)]
pub enum LoggingError {
    /// フィルター指定の解析に失敗
    #[error("ログレベル指定 '{directive}' を解析できません: {source}")]
    Filter {
        /// 解析しようとした指定
        directive: String,
        /// 解析エラー
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    /// グローバルなサブスクライバーが既に設定されている
    #[error("ロギングは既に初期化されています: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_missing_message() {
        let err = ContextError::Missing {
            key: "defaultVpc".to_string(),
        };
        assert_eq!(err.to_string(), "コンテキストにキー 'defaultVpc' がありません");
    }

    #[test]
    fn test_step_error_is_transparent_for_collaborator() {
        let err = StepError::from(CollaboratorError::Conflict("table".to_string()));
        assert_eq!(err.to_string(), "リソースが既に存在します: table");
    }

    #[test]
    fn test_input_closed_message() {
        let err = StepError::InputClosed {
            step: "confirmDeployment".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "ステップ 'confirmDeployment' の入力待ちで入力が終了しました"
        );
    }
}
