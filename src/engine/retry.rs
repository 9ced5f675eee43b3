//! 固定間隔・回数上限付きのリトライ
//!
//! # 責務
//!
//! - 失敗しうる非同期操作を、上限回数まで一定間隔で再実行する
//! - 最後の失敗はラップせずにそのまま呼び出し元へ返す
//!
//! 試行回数は `1 + max_retries` 回で、試行間の待機は常に `interval` です
//! （指数バックオフではありません）。成功した時点で即座に返り、成功後の待機はありません。
//!
//! # 使用例
//!
//! ```rust
//! use melted_scenario::engine::retry::{retry, RetryPolicy};
//!
//! # async fn example() -> Result<(), String> {
//! let policy = RetryPolicy::from_millis(1000, 30);
//! let value = retry(&policy, || async { Ok::<_, String>(42) }).await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// リトライ設定
///
/// TOML では `interval_in_ms` と `max_retries` で指定します。
///
/// ```toml
/// [retry.endpoint]
/// interval_in_ms = 2000
/// max_retries = 30
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// 試行間の待機時間
    #[serde(rename = "interval_in_ms", with = "millis")]
    pub interval: Duration,

    /// 初回に加えて再試行する最大回数
    pub max_retries: u32,
}

impl RetryPolicy {
    /// 待機時間と最大リトライ回数を指定して生成
    pub fn new(interval: Duration, max_retries: u32) -> Self {
        Self {
            interval,
            max_retries,
        }
    }

    /// ミリ秒単位の待機時間で生成
    pub fn from_millis(interval_in_ms: u64, max_retries: u32) -> Self {
        Self::new(Duration::from_millis(interval_in_ms), max_retries)
    }

    /// 一度だけ試行し、再試行しないポリシー
    pub fn no_retry() -> Self {
        Self::new(Duration::ZERO, 0)
    }

    /// 最大試行回数（初回を含む）
    pub fn max_attempts(&self) -> u64 {
        u64::from(self.max_retries) + 1
    }

    /// 全試行が失敗した場合に待機する合計時間
    pub fn worst_case_wait(&self) -> Duration {
        self.interval.saturating_mul(self.max_retries)
    }

    /// このポリシーで `operation` を実行する
    ///
    /// [`retry`] のメソッド形式です。
    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        retry(self, operation).await
    }
}

/// `operation` を `policy` に従って実行する
///
/// # 戻り値
///
/// - `Ok(T)`: いずれかの試行が成功した場合、その値
/// - `Err(E)`: `1 + max_retries` 回すべて失敗した場合、最後の試行のエラー
///
/// 失敗した試行は `debug` レベルで記録されます。
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut retries: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if retries < policy.max_retries => {
                retries += 1;
                debug!(
                    attempt = u64::from(retries),
                    max_attempts = policy.max_attempts(),
                    interval_ms = policy.interval.as_millis() as u64,
                    error = %err,
                    "操作が失敗したため再試行します"
                );
                tokio::time::sleep(policy.interval).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// `Duration` をミリ秒の整数として読み書きする
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// 常に失敗する操作と呼び出し回数
    fn always_failing() -> (Arc<AtomicU32>, impl FnMut() -> std::future::Ready<Result<(), String>>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let op = move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Err::<(), _>("Fail".to_string()))
        };
        (calls, op)
    }

    #[tokio::test]
    async fn test_success_calls_once() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::from_millis(1000, 3);

        let result = retry(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, String>("done") }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_always_failing_called_max_retries_plus_one() {
        let (calls, op) = always_failing();
        let policy = RetryPolicy::from_millis(1, 3);

        let result = retry(&policy, op).await;

        assert_eq!(result.unwrap_err(), "Fail");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_succeeds_on_second_try() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::from_millis(1, 3);

        let result = retry(&policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n == 1 {
                    Err("Fail".to_string())
                } else {
                    Ok(true)
                }
            }
        })
        .await;

        assert!(result.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_retries_is_single_attempt() {
        let (calls, op) = always_failing();

        let result = retry(&RetryPolicy::no_retry(), op).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_succeeds_on_attempt_k_for_several_bounds() {
        for max_retries in 0..5u32 {
            for k in 1..=max_retries + 1 {
                let calls = AtomicU32::new(0);
                let policy = RetryPolicy::from_millis(0, max_retries);

                let result = retry(&policy, || {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { if n < k { Err(format!("attempt {n}")) } else { Ok(n) } }
                })
                .await;

                assert_eq!(result.unwrap(), k);
                assert_eq!(calls.load(Ordering::SeqCst), k);
            }
        }
    }

    /// 待機時間は一定で、最後の失敗の後には待たない
    #[tokio::test(start_paused = true)]
    async fn test_fixed_interval_between_attempts() {
        let (calls, op) = always_failing();
        let policy = RetryPolicy::from_millis(2000, 3);
        let started = tokio::time::Instant::now();

        let result = policy.run(op).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(started.elapsed(), Duration::from_millis(6000));
        assert_eq!(policy.worst_case_wait(), Duration::from_millis(6000));
    }

    #[test]
    fn test_policy_deserializes_from_toml() {
        let policy: RetryPolicy = toml::from_str("interval_in_ms = 1000\nmax_retries = 30\n").unwrap();
        assert_eq!(policy, RetryPolicy::from_millis(1000, 30));
        assert_eq!(policy.max_attempts(), 31);
    }

    #[test]
    fn test_max_attempts_does_not_saturate() {
        assert_eq!(RetryPolicy::no_retry().max_attempts(), 1);
        assert_eq!(
            RetryPolicy::from_millis(0, u32::MAX).max_attempts(),
            u64::from(u32::MAX) + 1
        );
    }

    /// 上限が最大値でも、成功するまで再試行を続ける
    #[tokio::test]
    async fn test_max_retries_at_upper_bound_keeps_retrying() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::from_millis(0, u32::MAX);

        let result = retry(&policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { if n < 3 { Err("Fail".to_string()) } else { Ok(n) } }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
