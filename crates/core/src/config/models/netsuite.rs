use serde::{Deserialize, Serialize};

/// NetSuite SuiteQL 连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetsuiteConfig {
    pub enabled: bool,
    /// OAuth2 token endpoint (client credentials)
    pub token_url: String,
    /// SuiteQL endpoint, e.g. https://<account>.suitetalk.api.netsuite.com/services/rest/query/v1/suiteql
    pub query_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub request_timeout_seconds: u64,
}

impl Default for NetsuiteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token_url: String::new(),
            query_url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            request_timeout_seconds: 60,
        }
    }
}

impl NetsuiteConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.token_url.is_empty() || self.query_url.is_empty() {
            return Err(anyhow::anyhow!("启用NetSuite时必须配置token_url和query_url"));
        }

        if self.client_id.is_empty() {
            return Err(anyhow::anyhow!("NetSuite client_id不能为空"));
        }

        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("NetSuite请求超时时间必须大于0"));
        }

        Ok(())
    }
}
