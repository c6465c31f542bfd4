mod error_tests {
    use crate::*;

    #[test]
    fn test_dispatch_error_display() {
        let db_op_error = DispatchError::DatabaseOperation("Connection failed".to_string());
        assert_eq!(db_op_error.to_string(), "数据库操作失败: Connection failed");

        let request_error = DispatchError::RequestNotFound { id: 123 };
        assert_eq!(request_error.to_string(), "服务请求不存在: id=123");

        let provider_error = DispatchError::ProviderNotFound { id: 456 };
        assert_eq!(provider_error.to_string(), "服务商不存在: id=456");

        let assigned_error = DispatchError::AlreadyAssigned { request_id: 7 };
        assert_eq!(
            assigned_error.to_string(),
            "请求已被其他服务商接单: request_id=7"
        );

        let transition_error = DispatchError::invalid_transition("DONE", "ONGOING");
        assert_eq!(transition_error.to_string(), "非法的状态转换: DONE -> ONGOING");

        let forbidden_error = DispatchError::Forbidden("not your request".to_string());
        assert_eq!(forbidden_error.to_string(), "权限不足: not your request");
    }

    #[test]
    fn test_helper_constructors() {
        assert!(matches!(
            DispatchError::request_not_found(1),
            DispatchError::RequestNotFound { id: 1 }
        ));
        assert!(matches!(
            DispatchError::provider_not_found(2),
            DispatchError::ProviderNotFound { id: 2 }
        ));
        assert!(matches!(
            DispatchError::already_assigned(3),
            DispatchError::AlreadyAssigned { request_id: 3 }
        ));
        assert!(matches!(
            DispatchError::database_error("boom"),
            DispatchError::DatabaseOperation(_)
        ));
    }

    #[test]
    fn test_conflict_classification() {
        assert!(DispatchError::already_assigned(1).is_conflict());
        assert!(DispatchError::invalid_transition("PUBLISHED", "DONE").is_conflict());
        assert!(!DispatchError::request_not_found(1).is_conflict());
        assert!(!DispatchError::forbidden("nope").is_conflict());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(DispatchError::database_error("timeout").is_retryable());
        assert!(!DispatchError::already_assigned(1).is_retryable());
        assert!(!DispatchError::forbidden("nope").is_retryable());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(DispatchError::Internal("broken".to_string()).is_fatal());
        assert!(DispatchError::config_error("bad toml").is_fatal());
        assert!(!DispatchError::database_error("timeout").is_fatal());
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            DispatchError::request_not_found(1).user_message(),
            "请求的服务单不存在"
        );
        assert_eq!(
            DispatchError::already_assigned(1).user_message(),
            "该服务单已被其他服务商接单"
        );
        assert_eq!(
            DispatchError::Internal("x".to_string()).user_message(),
            "系统繁忙，请稍后重试"
        );
    }

    #[test]
    fn test_from_sqlx_error() {
        let sqlx_error = sqlx::Error::RowNotFound;
        let dispatch_error: DispatchError = sqlx_error.into();
        assert!(matches!(
            dispatch_error,
            DispatchError::DatabaseOperation(_)
        ));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
        let dispatch_error: DispatchError = json_error.into();
        assert!(matches!(dispatch_error, DispatchError::Serialization(_)));
    }
}
