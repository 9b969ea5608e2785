use serde::Serialize;

/// Universal response envelope for both success and error.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    /// Stable, machine-readable error code (e.g. "VALIDATION_ERROR").
    pub code: &'static str,
    /// Human-friendly error message.
    pub message: String,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    /// Build a success envelope.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Build an error envelope.
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

impl<T, E> From<Result<T, E>> for ApiResponse<T>
where
    T: Serialize,
    E: Into<crate::error_handler::AppError>,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => ApiResponse::success(data),
            Err(e) => e.into().into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handler::AppError;

    #[test]
    fn error_envelope_omits_data() {
        let envelope: ApiResponse<u8> = Err::<u8, _>(AppError::validation("Message is required")).into();
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "error": {"code": "VALIDATION_ERROR", "message": "Message is required"}
            })
        );
    }

    #[test]
    fn success_envelope_omits_error() {
        let json = serde_json::to_value(ApiResponse::success("ok")).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": "ok"}));
    }
}
