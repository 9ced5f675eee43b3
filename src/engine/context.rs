//! シナリオ実行コンテキスト
//!
//! # 責務
//!
//! - ステップ間で受け渡すデータを、キー（文字列）と値（JSON）の対応として保持
//! - 型付きアクセサーによる「キーごとの約束事」の検査
//!
//! # 不変条件
//!
//! - 一度書き込まれたキーは、以降のすべてのステップから読み出せる
//! - 実行中にキーが削除されることはない（削除操作を提供しない）
//! - キーの存在は、それを必要とするステップの実行時まで要求されない
//!
//! キー空間はフラットです。Input ステップはステップ名をキーとして書き込むため、
//! 同名のキーは黙って上書きされます。
//!
//! # 使用例
//!
//! ```rust
//! use melted_scenario::engine::context::ExecutionContext;
//!
//! let mut ctx = ExecutionContext::new();
//! ctx.set("subnets", vec!["subnet-1", "subnet-2"]).unwrap();
//!
//! let subnets: Vec<String> = ctx.get_as("subnets").unwrap();
//! assert_eq!(subnets.len(), 2);
//! assert!(ctx.is_truthy("subnets"));
//! assert!(!ctx.is_truthy("defaultVpc"));
//! ```

use crate::error::ContextError;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;

/// シナリオ実行コンテキスト
///
/// ランナーが実行ごとに空の状態で生成し、各ステップに `&mut` で貸し出します。
/// 同時に書き込めるステップは常に1つだけです。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionContext {
    values: HashMap<String, Value>,
}

impl ExecutionContext {
    /// 空のコンテキストを生成
    pub fn new() -> Self {
        Self::default()
    }

    /// 任意のシリアライズ可能な値を書き込む
    ///
    /// # エラー
    ///
    /// - [`ContextError::Serialize`] - 値を JSON に変換できない場合
    pub fn set<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> Result<(), ContextError> {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(|source| ContextError::Serialize {
            key: key.clone(),
            source,
        })?;
        self.values.insert(key, value);
        Ok(())
    }

    /// JSON 値をそのまま書き込む
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// 値を参照する
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// 値を必須として参照する
    ///
    /// # エラー
    ///
    /// - [`ContextError::Missing`] - キーが存在しない場合
    pub fn require(&self, key: &str) -> Result<&Value, ContextError> {
        self.values.get(key).ok_or_else(|| ContextError::Missing {
            key: key.to_string(),
        })
    }

    /// 値を型 `T` として取り出す
    ///
    /// # エラー
    ///
    /// - [`ContextError::Missing`] - キーが存在しない場合
    /// - [`ContextError::TypeMismatch`] - 値を `T` に変換できない場合
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, ContextError> {
        let value = self.require(key)?;
        T::deserialize(value).map_err(|source| ContextError::TypeMismatch {
            key: key.to_string(),
            expected: std::any::type_name::<T>(),
            source,
        })
    }

    /// 文字列値を必須として参照する
    pub fn require_str(&self, key: &str) -> Result<&str, ContextError> {
        let value = self.require(key)?;
        value.as_str().ok_or_else(|| ContextError::TypeMismatch {
            key: key.to_string(),
            expected: "string",
            source: <serde_json::Error as serde::de::Error>::custom(format!(
                "文字列ではない値です: {value}"
            )),
        })
    }

    /// 真偽値を参照する（存在しない、または真偽値でない場合は `None`）
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    /// 値が「真」として扱われるかどうか
    ///
    /// 存在しないキー、`null`、`false`、`0`、空文字列、空配列は偽です。
    pub fn is_truthy(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(is_truthy)
    }

    /// キーが存在するかどうか
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// 保持しているキーの数
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 何も保持していないかどうか
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// キーの一覧（順序に意味はない）
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// コンテキスト全体を JSON オブジェクトとして取得
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl Serialize for ExecutionContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

/// JSON 値の真偽判定
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}
