use crate::*;

#[test]
fn test_syncer_error_display() {
    let task_error = SyncerError::TaskNotFound { id: 123 };
    assert_eq!(task_error.to_string(), "任务未找到: 123");

    let conflict = SyncerError::TaskNameConflict {
        name: "payroll".to_string(),
    };
    assert_eq!(conflict.to_string(), "任务名称已存在: payroll");

    let unknown = SyncerError::unknown_connector("SHAREPOINTEXCEL");
    assert_eq!(unknown.to_string(), "未注册的连接器类型: SHAREPOINTEXCEL");

    let unavailable = SyncerError::ControllerUnavailable;
    assert_eq!(unavailable.to_string(), "控制器不可用");
}

#[test]
fn test_connector_error_wraps_into_syncer_error() {
    let err: SyncerError = ConnectorError::Authentication("token expired".to_string()).into();
    assert_eq!(err.to_string(), "连接器错误: 认证失败: token expired");
    assert!(!err.is_retryable());
}

#[test]
fn test_error_classification() {
    assert!(SyncerError::Connector(ConnectorError::Transport("reset".into())).is_retryable());
    assert!(SyncerError::unknown_connector("X").is_configuration());
    assert!(SyncerError::Connector(ConnectorError::Unsupported("write".into())).is_configuration());
    assert!(!SyncerError::task_not_found(1).is_configuration());
    assert!(SyncerError::task_not_found(1).is_not_found());
}

#[test]
fn test_from_serde_json_error() {
    let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: SyncerError = parse_err.into();
    assert!(matches!(err, SyncerError::Serialization(_)));
}
