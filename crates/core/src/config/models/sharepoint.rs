use serde::{Deserialize, Serialize};

/// SharePoint Excel 连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SharepointConfig {
    pub enabled: bool,
    /// Azure AD token endpoint, e.g. https://login.microsoftonline.com/<tenant-id>/oauth2/v2.0/token
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// 为空时按文件所在租户使用 `https://<tenant>.sharepoint.com/.default`
    pub scope: String,
    /// 覆盖从文件地址解析出的 `https://<tenant>.sharepoint.com`，用于代理或测试
    pub api_base_url: String,
    pub request_timeout_seconds: u64,
}

impl Default for SharepointConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token_url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            scope: String::new(),
            api_base_url: String::new(),
            request_timeout_seconds: 120,
        }
    }
}

impl SharepointConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.token_url.is_empty() {
            return Err(anyhow::anyhow!("启用SharePoint时必须配置token_url"));
        }

        if self.client_id.is_empty() {
            return Err(anyhow::anyhow!("SharePoint client_id不能为空"));
        }

        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("SharePoint请求超时时间必须大于0"));
        }

        Ok(())
    }
}
