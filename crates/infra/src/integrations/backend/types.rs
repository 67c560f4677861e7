//! Wire shapes of the scheduling backend

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct ProcessTextRequest<'a> {
    pub text_input: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ProcessTextResponse {
    #[serde(default)]
    pub meeting: Value,
}

#[derive(Debug, Deserialize)]
pub struct MeetingDetailsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, rename = "formData")]
    pub form_data: Value,
    #[serde(default)]
    pub error: Option<String>,
}

impl MeetingDetailsResponse {
    /// `{}` is what the backend answers before extraction ran.
    pub fn has_form_data(&self) -> bool {
        match &self.form_data {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            _ => true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlResponse {
    pub signed_url: Option<String>,
}
