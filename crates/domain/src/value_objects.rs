//! 连接器描述符
//!
//! 源与目标配置都是封闭的带标签变体：`datatype` 字段决定连接器类型，
//! 其余字段由该类型定义。描述符在API边界校验一次，之后以不可变值传入核心。

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use syncer_errors::{SyncerError, SyncerResult};

/// 连接器类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    #[serde(rename = "SHAREPOINTEXCEL")]
    SharepointExcel,
    #[serde(rename = "NETSUITE")]
    Netsuite,
}

impl DataType {
    pub const ALL: [DataType; 2] = [DataType::SharepointExcel, DataType::Netsuite];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::SharepointExcel => "SHAREPOINTEXCEL",
            DataType::Netsuite => "NETSUITE",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DataType::SharepointExcel => "SharePoint Excel",
            DataType::Netsuite => "NetSuite",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = SyncerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "SHAREPOINTEXCEL" => Ok(DataType::SharepointExcel),
            "NETSUITE" => Ok(DataType::Netsuite),
            other => Err(SyncerError::validation_error(format!(
                "未知的数据类型: {other}"
            ))),
        }
    }
}

/// 同步源配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "datatype")]
pub enum SourceDescriptor {
    #[serde(rename = "SHAREPOINTEXCEL")]
    SharepointExcel {
        file_url: String,
        sheet_name: String,
        headers_row: u32,
        headers: Vec<String>,
    },
    #[serde(rename = "NETSUITE")]
    Netsuite { query: String },
}

impl SourceDescriptor {
    pub fn kind(&self) -> DataType {
        match self {
            SourceDescriptor::SharepointExcel { .. } => DataType::SharepointExcel,
            SourceDescriptor::Netsuite { .. } => DataType::Netsuite,
        }
    }

    /// 去除首尾空白并校验字段
    pub fn normalized(self) -> SyncerResult<Self> {
        match self {
            SourceDescriptor::SharepointExcel {
                file_url,
                sheet_name,
                headers_row,
                headers,
            } => {
                let file_url = file_url.trim().to_string();
                SharepointLocation::parse(&file_url)
                    .map_err(|_| SyncerError::validation_error("Invalid source file URL"))?;
                let headers: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();
                if headers.is_empty() || headers.iter().any(|h| h.is_empty()) {
                    return Err(SyncerError::validation_error("源表头不能为空"));
                }
                Ok(SourceDescriptor::SharepointExcel {
                    file_url,
                    sheet_name: non_empty(sheet_name, "工作表名称不能为空")?,
                    headers_row,
                    headers,
                })
            }
            SourceDescriptor::Netsuite { query } => Ok(SourceDescriptor::Netsuite {
                query: non_empty(query, "查询语句不能为空")?,
            }),
        }
    }
}

/// 同步目标配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "datatype")]
pub enum DestinationDescriptor {
    #[serde(rename = "SHAREPOINTEXCEL")]
    SharepointExcel { file_url: String, sheet_name: String },
}

impl DestinationDescriptor {
    pub fn kind(&self) -> DataType {
        match self {
            DestinationDescriptor::SharepointExcel { .. } => DataType::SharepointExcel,
        }
    }

    pub fn normalized(self) -> SyncerResult<Self> {
        match self {
            DestinationDescriptor::SharepointExcel {
                file_url,
                sheet_name,
            } => {
                let file_url = file_url.trim().to_string();
                SharepointLocation::parse(&file_url)
                    .map_err(|_| SyncerError::validation_error("Invalid destination file URL"))?;
                Ok(DestinationDescriptor::SharepointExcel {
                    file_url,
                    sheet_name: non_empty(sheet_name, "工作表名称不能为空")?,
                })
            }
        }
    }
}

/// SharePoint文档地址的组成部分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharepointLocation {
    pub base_url: String,
    pub tenant: String,
    pub site: String,
    pub path: String,
}

impl SharepointLocation {
    pub fn parse(url: &str) -> SyncerResult<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^(https://(.+?)\.sharepoint\.com)(/sites/.+?/)(Shared Documents/.+?\.xlsx)")
                .expect("SharePoint URL pattern is valid")
        });

        let captures = pattern.captures(url).ok_or_else(|| {
            SyncerError::validation_error(
                "URL should be in form \"https://[subdomain].sharepoint.com/sites/[site-name]/Shared Documents/[path-to-file.xlsx]\"",
            )
        })?;

        Ok(Self {
            base_url: captures[1].to_string(),
            tenant: captures[2].to_string(),
            site: captures[3].to_string(),
            path: captures[4].to_string(),
        })
    }

    /// 站点根地址，同一站点的连接上下文可复用
    pub fn site_url(&self) -> String {
        format!("{}{}", self.base_url, self.site)
    }
}

fn non_empty(value: String, message: &str) -> SyncerResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SyncerError::validation_error(message));
    }
    Ok(trimmed.to_string())
}
