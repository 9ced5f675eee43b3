//! HTTP によるエンドポイント疎通確認
//!
//! # 責務
//!
//! - [`EndpointProbe`] を `reqwest` で実装
//! - 自身のグローバルIPアドレスをIP確認サービスから取得
//! - 2xx 以外の応答をエラーとして扱う

use async_trait::async_trait;
use crate::error::CollaboratorError;
use reqwest::Client;
use std::time::Duration;
use super::traits::{EndpointProbe, ProbeResponse};
use tracing::debug;

/// デフォルトのIP確認サービス
pub const DEFAULT_CHECK_IP_URL: &str = "http://checkip.amazonaws.com";

/// 1リクエストあたりのタイムアウト
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// `reqwest` による疎通確認クライアント
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    check_ip_url: String,
}

impl HttpProbe {
    /// IP確認サービスのURLを指定してクライアントを生成
    ///
    /// # エラー
    ///
    /// - [`CollaboratorError::Http`] - HTTP クライアントを構築できない場合
    pub fn new(check_ip_url: impl Into<String>) -> Result<Self, CollaboratorError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            check_ip_url: check_ip_url.into(),
        })
    }

    /// IP確認サービスのURL
    pub fn check_ip_url(&self) -> &str {
        &self.check_ip_url
    }
}

#[async_trait]
impl EndpointProbe for HttpProbe {
    async fn public_ip(&self) -> Result<String, CollaboratorError> {
        let body = self
            .client
            .get(&self.check_ip_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let ip = body.trim();
        if ip.is_empty() {
            return Err(CollaboratorError::Rejected(format!(
                "{} が空の応答を返しました",
                self.check_ip_url
            )));
        }
        Ok(ip.to_string())
    }

    async fn get(&self, url: &str) -> Result<ProbeResponse, CollaboratorError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(url, status, "エンドポイントが応答しました");

        Ok(ProbeResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_keeps_check_ip_url() {
        let probe = HttpProbe::new(DEFAULT_CHECK_IP_URL).unwrap();
        assert_eq!(probe.check_ip_url(), "http://checkip.amazonaws.com");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_http_error() {
        // 予約済みの TLD なので名前解決に失敗する
        let probe = HttpProbe::new("http://checkip.invalid").unwrap();
        let err = probe.public_ip().await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Http(_)));
    }
}
