use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use syncer_errors::{SyncerError, SyncerResult};

/// 连接器之间传递的表格数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// 由记录列表构建，列按首次出现的顺序排列，缺失的单元格为 `null`
    pub fn from_records<I>(records: I, exclude: &[&str]) -> Self
    where
        I: IntoIterator<Item = Map<String, Value>>,
    {
        let records: Vec<Map<String, Value>> = records.into_iter().collect();
        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for key in record.keys() {
                if exclude.contains(&key.as_str()) || columns.contains(key) {
                    continue;
                }
                columns.push(key.clone());
            }
        }

        let rows = records
            .into_iter()
            .map(|mut record| {
                columns
                    .iter()
                    .map(|column| record.remove(column).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> SyncerResult<()> {
        if row.len() != self.columns.len() {
            return Err(SyncerError::validation_error(format!(
                "行宽度 {} 与列数 {} 不一致",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_from_records_excludes_and_fills_missing() {
        let dataset = Dataset::from_records(
            vec![
                record(json!({"id": 1, "links": [], "name": "a"})),
                record(json!({"id": 2, "total": 9.5})),
            ],
            &["links"],
        );

        assert_eq!(dataset.columns, vec!["id", "name", "total"]);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.rows[0], vec![json!(1), json!("a"), Value::Null]);
        assert_eq!(dataset.rows[1], vec![json!(2), Value::Null, json!(9.5)]);
        assert_eq!(dataset.column_index("total"), Some(2));
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut dataset = Dataset::new(vec!["a".to_string(), "b".to_string()]);
        assert!(dataset.push_row(vec![json!(1)]).is_err());
        dataset.push_row(vec![json!(1), json!(2)]).unwrap();
        assert!(!dataset.is_empty());
    }
}
