//! User-facing messages.
//!
//! Every string a hook or context publishes as `error` comes from here so the
//! storefront copy stays consistent.

use reqwest::StatusCode;

/// Shown when the backend answers 401.
pub const ACCESS_DENIED: &str = "Bạn không có quyền truy cập. Vui lòng đăng nhập lại.";

/// Prefix for transport-level failures.
pub const CONNECTION_FAILED: &str = "Không thể kết nối đến máy chủ";

/// Connectivity failure with the underlying cause appended.
#[must_use]
pub fn network_failure(cause: &str) -> String {
    if cause.is_empty() {
        CONNECTION_FAILED.to_string()
    } else {
        format!("{CONNECTION_FAILED}: {cause}")
    }
}

/// Generic failure for a non-2xx response without a usable error envelope.
#[must_use]
pub fn request_failed(status: StatusCode) -> String {
    let code = status.as_u16();
    status.canonical_reason().map_or_else(
        || format!("Đã có lỗi xảy ra (mã {code})"),
        |reason| format!("Đã có lỗi xảy ra (mã {code}: {reason})"),
    )
}

/// A 2xx response whose body is not JSON.
#[must_use]
pub fn invalid_response(cause: &str) -> String {
    format!("Phản hồi từ máy chủ không hợp lệ: {cause}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_failed_includes_status() {
        assert_eq!(
            request_failed(StatusCode::NOT_FOUND),
            "Đã có lỗi xảy ra (mã 404: Not Found)"
        );
        let unknown = StatusCode::from_u16(599).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(request_failed(unknown).contains("599"));
    }

    #[test]
    fn test_network_failure_without_cause() {
        assert_eq!(network_failure(""), CONNECTION_FAILED);
        assert!(network_failure("connection refused").ends_with("connection refused"));
    }
}
