use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    UnsupportedFormat,
    Validation,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    pub message: String,
}

/// Error body of a failed engine command: either the plain message a command returns or a
/// structured [`ApiError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EngineFailureBody {
    Structured(ApiError),
    Message(String),
}

impl EngineFailureBody {
    pub fn into_message(self) -> String {
        match self {
            EngineFailureBody::Structured(err) => err.message,
            EngineFailureBody::Message(message) => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_body_accepts_plain_and_structured_messages() {
        let plain: EngineFailureBody =
            serde_json::from_str("\"failed to read image\"").expect("plain");
        assert_eq!(plain.into_message(), "failed to read image");

        let structured: EngineFailureBody =
            serde_json::from_str(r#"{"code":"unsupported_format","message":"not a jpeg"}"#)
                .expect("structured");
        assert_eq!(
            structured,
            EngineFailureBody::Structured(ApiError {
                code: Some(ErrorCode::UnsupportedFormat),
                message: "not a jpeg".into(),
            })
        );
    }
}
