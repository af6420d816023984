//! NetSuite SuiteQL 连接器
//!
//! 每次读取先用 client credentials 换取访问令牌，再分页执行查询。
//! 每页返回 `items`、`hasMore` 和 `links`，下一页地址取 `rel = "next"` 的链接。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use syncer_core::config::models::NetsuiteConfig;
use syncer_domain::{Connector, DataType, Dataset, DestinationDescriptor, SourceDescriptor};
use syncer_errors::{ConnectorError, ConnectorResult, SyncerError, SyncerResult};
use tracing::{debug, info, instrument};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(default)]
    rel: Option<String>,
    href: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryPage {
    #[serde(default)]
    items: Vec<Map<String, Value>>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    links: Vec<Link>,
}

impl QueryPage {
    fn next_href(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.rel.as_deref() == Some("next"))
            .or_else(|| self.links.first())
            .map(|link| link.href.as_str())
    }
}

pub struct NetsuiteConnector {
    client: Client,
    token_url: String,
    query_url: String,
    client_id: String,
    client_secret: String,
}

impl NetsuiteConnector {
    pub fn new(config: &NetsuiteConfig) -> SyncerResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| SyncerError::config_error(format!("创建HTTP客户端失败: {e}")))?;

        Ok(Self {
            client,
            token_url: config.token_url.clone(),
            query_url: config.query_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }

    async fn access_token(&self) -> ConnectorResult<String> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let token: TokenResponse = check_status(response, "token endpoint")
            .await?
            .json()
            .await
            .map_err(|e| ConnectorError::Decode(format!("令牌响应解析失败: {e}")))?;
        Ok(token.access_token)
    }

    async fn fetch_page(&self, url: &str, token: &str, query: &str) -> ConnectorResult<QueryPage> {
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .header("Prefer", "transient")
            .json(&serde_json::json!({ "q": query }))
            .send()
            .await
            .map_err(transport_error)?;

        check_status(response, url)
            .await?
            .json()
            .await
            .map_err(|e| ConnectorError::Decode(format!("查询响应解析失败: {e}")))
    }
}

#[async_trait]
impl Connector for NetsuiteConnector {
    fn kind(&self) -> DataType {
        DataType::Netsuite
    }

    #[instrument(skip_all)]
    async fn read(&self, source: &SourceDescriptor) -> ConnectorResult<Dataset> {
        let query = match source {
            SourceDescriptor::Netsuite { query } => query,
            other => {
                return Err(ConnectorError::InvalidDescriptor(format!(
                    "NetSuite连接器不能读取 {} 源",
                    other.kind()
                )))
            }
        };

        let token = self.access_token().await?;
        let mut url = self.query_url.clone();
        let mut records = Vec::new();
        let mut pages = 0usize;

        loop {
            let page = self.fetch_page(&url, &token, query).await?;
            pages += 1;
            debug!(page = pages, items = page.items.len(), "NetSuite查询页已获取");

            let next = if page.has_more {
                page.next_href().map(str::to_string)
            } else {
                None
            };
            records.extend(page.items);

            match next {
                Some(href) => url = href,
                None if page.has_more => {
                    return Err(ConnectorError::Decode(
                        "hasMore为true但响应中没有下一页链接".to_string(),
                    ))
                }
                None => break,
            }
        }

        let dataset = Dataset::from_records(records, &["links"]);
        info!(
            pages,
            rows = dataset.len(),
            columns = dataset.columns.len(),
            "NetSuite查询完成"
        );
        Ok(dataset)
    }

    async fn write(
        &self,
        _destination: &DestinationDescriptor,
        _dataset: &Dataset,
    ) -> ConnectorResult<()> {
        Err(ConnectorError::Unsupported(
            "NetSuite不支持作为同步目标".to_string(),
        ))
    }
}

fn transport_error(error: reqwest::Error) -> ConnectorError {
    ConnectorError::Transport(error.to_string())
}

async fn check_status(response: Response, target: &str) -> ConnectorResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = format!("{target} 返回 {status}: {body}");
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ConnectorError::Authentication(message),
        StatusCode::NOT_FOUND => ConnectorError::NotFound(message),
        _ => ConnectorError::Transport(message),
    })
}
