use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
}

/// OpenID Connect userinfo; `sub` is the member id used in `urn:li:person:{sub}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterUploadResponse {
    pub value: RegisterUploadValue,
}

#[derive(Debug, Deserialize)]
pub struct RegisterUploadValue {
    #[serde(rename = "uploadMechanism")]
    pub upload_mechanism: UploadMechanism,
    pub asset: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadMechanism {
    #[serde(rename = "com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest")]
    pub http_request: MediaUploadHttpRequest,
}

#[derive(Debug, Deserialize)]
pub struct MediaUploadHttpRequest {
    #[serde(rename = "uploadUrl")]
    pub upload_url: String,
}

/// Where a registered image lives: the PUT target and the asset URN to reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSlot {
    pub upload_url: String,
    pub asset: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedPost {
    pub id: String,
    pub author: String,
    pub with_image: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    Public,
    Connections,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::Connections => "CONNECTIONS",
        }
    }
}
