//! SharePoint Excel 连接器
//!
//! 通过 SharePoint REST 接口按服务器相对路径下载和上传工作簿。
//! 读取时以 `headers_row` 行作为表头，只保留描述符中列出的列，单元格一律转为字符串；
//! 写入时生成只含目标工作表的新工作簿，数据区域套用表格样式后覆盖原文件。

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use calamine::{Data, DataType as _, Reader, Xlsx};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use rust_xlsxwriter::{Table, TableColumn, TableStyle, Workbook, Worksheet};
use serde::Deserialize;
use serde_json::Value;
use syncer_core::config::models::SharepointConfig;
use syncer_domain::{
    Connector, DataType, Dataset, DestinationDescriptor, SharepointLocation, SourceDescriptor,
};
use syncer_errors::{ConnectorError, ConnectorResult, SyncerError, SyncerResult};
use tracing::{debug, info, instrument};

const ODATA_JSON: &str = "application/json;odata=nometadata";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct SharepointExcelConnector {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    api_base_url: String,
}

impl SharepointExcelConnector {
    pub fn new(config: &SharepointConfig) -> SyncerResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| SyncerError::config_error(format!("创建HTTP客户端失败: {e}")))?;

        Ok(Self {
            client,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scope.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 站点REST根地址，配置了 `api_base_url` 时替换文件地址中的主机部分
    fn site_url(&self, location: &SharepointLocation) -> String {
        if self.api_base_url.is_empty() {
            location.site_url()
        } else {
            format!("{}{}", self.api_base_url, location.site)
        }
    }

    async fn access_token(&self, location: &SharepointLocation) -> ConnectorResult<String> {
        let scope = if self.scope.is_empty() {
            format!("{}/.default", location.base_url)
        } else {
            self.scope.clone()
        };

        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", scope.as_str()),
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

    async fn download(&self, location: &SharepointLocation) -> ConnectorResult<Vec<u8>> {
        let token = self.access_token(location).await?;
        let url = format!(
            "{}_api/web/GetFileByServerRelativeUrl('{}')/$value",
            self.site_url(location),
            odata_literal(&server_relative_path(location))
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(transport_error)?;

        let bytes = check_status(response, &url)
            .await?
            .bytes()
            .await
            .map_err(transport_error)?;
        debug!(bytes = bytes.len(), "SharePoint文件已下载");
        Ok(bytes.to_vec())
    }

    async fn upload(&self, location: &SharepointLocation, content: Vec<u8>) -> ConnectorResult<()> {
        let token = self.access_token(location).await?;
        let path = server_relative_path(location);
        let (folder, file_name) = path.rsplit_once('/').unwrap_or(("", path.as_str()));
        let url = format!(
            "{}_api/web/GetFolderByServerRelativeUrl('{}')/Files/add(url='{}',overwrite=true)",
            self.site_url(location),
            odata_literal(folder),
            odata_literal(file_name)
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .header(ACCEPT, ODATA_JSON)
            .header(CONTENT_TYPE, XLSX_MIME)
            .body(content)
            .send()
            .await
            .map_err(transport_error)?;

        check_status(response, &url).await?;
        Ok(())
    }
}

#[async_trait]
impl Connector for SharepointExcelConnector {
    fn kind(&self) -> DataType {
        DataType::SharepointExcel
    }

    #[instrument(skip_all)]
    async fn read(&self, source: &SourceDescriptor) -> ConnectorResult<Dataset> {
        let (file_url, sheet_name, headers_row, headers) = match source {
            SourceDescriptor::SharepointExcel {
                file_url,
                sheet_name,
                headers_row,
                headers,
            } => (file_url, sheet_name, *headers_row, headers),
            other => {
                return Err(ConnectorError::InvalidDescriptor(format!(
                    "SharePoint连接器不能读取 {} 源",
                    other.kind()
                )))
            }
        };

        let location = parse_location(file_url)?;
        let content = self.download(&location).await?;
        let dataset = read_sheet(&content, sheet_name, headers_row, headers)?;
        info!(
            sheet = %sheet_name,
            rows = dataset.len(),
            columns = dataset.columns.len(),
            "SharePoint工作表读取完成"
        );
        Ok(dataset)
    }

    #[instrument(skip_all)]
    async fn write(
        &self,
        destination: &DestinationDescriptor,
        dataset: &Dataset,
    ) -> ConnectorResult<()> {
        let DestinationDescriptor::SharepointExcel {
            file_url,
            sheet_name,
        } = destination;

        let location = parse_location(file_url)?;
        let content = build_workbook(sheet_name, dataset)?;
        self.upload(&location, content).await?;
        info!(sheet = %sheet_name, rows = dataset.len(), "SharePoint文件已覆盖上传");
        Ok(())
    }
}

fn parse_location(file_url: &str) -> ConnectorResult<SharepointLocation> {
    SharepointLocation::parse(file_url).map_err(|e| ConnectorError::InvalidDescriptor(e.to_string()))
}

/// 例如 `/sites/finance/Shared Documents/reports/ledger.xlsx`
fn server_relative_path(location: &SharepointLocation) -> String {
    format!("{}{}", location.site, location.path)
}

/// OData字符串字面量中的单引号需要成对转义
fn odata_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// 解析工作簿中的指定工作表，`headers_row` 从0开始计数
fn read_sheet(
    content: &[u8],
    sheet_name: &str,
    headers_row: u32,
    headers: &[String],
) -> ConnectorResult<Dataset> {
    let mut workbook = Xlsx::new(Cursor::new(content))
        .map_err(|e| ConnectorError::Decode(format!("无法解析Excel文件: {e}")))?;
    if !workbook.sheet_names().iter().any(|name| name == sheet_name) {
        return Err(ConnectorError::NotFound(format!("工作表不存在: {sheet_name}")));
    }
    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e| ConnectorError::Decode(format!("读取工作表 {sheet_name} 失败: {e}")))?;

    let Some((last_row, last_col)) = range.end() else {
        return Err(missing_columns(sheet_name, headers));
    };
    let cell = |row: u32, col: u32| {
        range
            .get_value((row, col))
            .filter(|value| !matches!(value, Data::Empty))
    };

    // 保持工作表中的列顺序
    let mut columns = Vec::new();
    let mut indexes = Vec::new();
    for col in 0..=last_col {
        if let Some(name) = cell(headers_row, col).map(cell_text) {
            let name = name.trim().to_string();
            if headers.contains(&name) && !columns.contains(&name) {
                columns.push(name);
                indexes.push(col);
            }
        }
    }
    if columns.len() != headers.len() {
        let missing: Vec<String> = headers
            .iter()
            .filter(|header| !columns.contains(header))
            .cloned()
            .collect();
        return Err(missing_columns(sheet_name, &missing));
    }

    let mut dataset = Dataset::new(columns);
    for row in headers_row.saturating_add(1)..=last_row {
        let values: Vec<Value> = indexes
            .iter()
            .map(|&col| {
                cell(row, col)
                    .map(|value| Value::String(cell_text(value)))
                    .unwrap_or(Value::Null)
            })
            .collect();
        if values.iter().all(Value::is_null) {
            continue;
        }
        dataset.rows.push(values);
    }
    Ok(dataset)
}

fn missing_columns(sheet_name: &str, headers: &[String]) -> ConnectorError {
    ConnectorError::InvalidDescriptor(format!(
        "工作表 {sheet_name} 缺少列: {}",
        headers.join(", ")
    ))
}

fn cell_text(value: &Data) -> String {
    match value {
        Data::String(text) => text.clone(),
        Data::DateTime(_) | Data::DateTimeIso(_) => value
            .as_datetime()
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}

/// 生成只含一个工作表的工作簿，表头在第一行，数据区域带表格样式
fn build_workbook(sheet_name: &str, dataset: &Dataset) -> ConnectorResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(sheet_name)
        .map_err(|e| ConnectorError::InvalidDescriptor(format!("无效的工作表名称: {e}")))?;

    for (col, name) in dataset.columns.iter().enumerate() {
        worksheet
            .write_string(0, column_number(col)?, name)
            .map_err(encode_error)?;
    }
    for (index, row) in dataset.rows.iter().enumerate() {
        let row_number = row_number(index + 1)?;
        for (col, value) in row.iter().enumerate() {
            write_cell(worksheet, row_number, column_number(col)?, value)?;
        }
    }

    if !dataset.columns.is_empty() {
        let columns: Vec<TableColumn> = dataset
            .columns
            .iter()
            .map(|name| TableColumn::new().set_header(name))
            .collect();
        let table = Table::new()
            .set_style(TableStyle::Medium2)
            .set_columns(&columns);
        // 表格至少包含一行数据区域
        let last_row = row_number(dataset.len().max(1))?;
        let last_col = column_number(dataset.columns.len() - 1)?;
        worksheet
            .add_table(0, 0, last_row, last_col, &table)
            .map_err(encode_error)?;
    }
    worksheet.autofit();

    workbook.save_to_buffer().map_err(encode_error)
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, value: &Value) -> ConnectorResult<()> {
    let written = match value {
        Value::Null => return Ok(()),
        Value::Bool(flag) => worksheet.write_boolean(row, col, *flag),
        Value::Number(number) => match number.as_f64() {
            Some(number) => worksheet.write_number(row, col, number),
            None => worksheet.write_string(row, col, number.to_string()),
        },
        Value::String(text) => worksheet.write_string(row, col, text),
        other => worksheet.write_string(row, col, other.to_string()),
    };
    written.map(|_| ()).map_err(encode_error)
}

fn row_number(index: usize) -> ConnectorResult<u32> {
    u32::try_from(index)
        .map_err(|_| ConnectorError::Unsupported(format!("行号超出Excel范围: {index}")))
}

fn column_number(index: usize) -> ConnectorResult<u16> {
    u16::try_from(index)
        .map_err(|_| ConnectorError::Unsupported(format!("列号超出Excel范围: {index}")))
}

fn encode_error(error: rust_xlsxwriter::XlsxError) -> ConnectorError {
    ConnectorError::Unsupported(format!("生成Excel文件失败: {error}"))
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
