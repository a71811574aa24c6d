use crate::{
    error::{PostGenError, Result},
    linkedin::{AccessToken, LinkedInClient},
    models::{GeneratedImage, PublishedPost, RegisterUploadResponse, UploadSlot, Visibility},
};
use serde_json::{json, Value};

const FEEDSHARE_IMAGE_RECIPE: &str = "urn:li:digitalmediaRecipe:feedshare-image";

impl LinkedInClient {
    /// Step one of an image post: ask LinkedIn where to upload.
    pub async fn register_upload(&self, token: &AccessToken, owner: &str) -> Result<UploadSlot> {
        let payload = json!({
            "registerUploadRequest": {
                "recipes": [FEEDSHARE_IMAGE_RECIPE],
                "owner": owner,
                "serviceRelationships": [
                    {
                        "relationshipType": "OWNER",
                        "identifier": "urn:li:userGeneratedContent"
                    }
                ]
            }
        });

        let response = self
            .http
            .post(self.api_url("/v2/assets?action=registerUpload"))
            .bearer_auth(token.secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| PostGenError::RequestError(format!("Register upload failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PostGenError::from_response("LinkedIn register upload", response).await);
        }

        let registered: RegisterUploadResponse = response
            .json()
            .await
            .map_err(|e| PostGenError::ResponseError(e.to_string()))?;

        Ok(UploadSlot {
            upload_url: registered.value.upload_mechanism.http_request.upload_url,
            asset: registered.value.asset,
        })
    }

    /// Step two: PUT the encoded image to the registered URL.
    pub async fn upload_image(
        &self,
        token: &AccessToken,
        slot: &UploadSlot,
        image: &GeneratedImage,
    ) -> Result<()> {
        let response = self
            .http
            .put(&slot.upload_url)
            .bearer_auth(token.secret())
            .header(reqwest::header::CONTENT_TYPE, image.format.mime_type())
            .body(image.bytes.clone())
            .send()
            .await
            .map_err(|e| PostGenError::RequestError(format!("Image upload failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PostGenError::from_response("LinkedIn image upload", response).await);
        }
        Ok(())
    }

    /// Step three: create the post, referencing the uploaded asset if any.
    pub async fn create_post(
        &self,
        token: &AccessToken,
        author: &str,
        text: &str,
        asset: Option<&str>,
        visibility: Visibility,
    ) -> Result<PublishedPost> {
        let payload = ugc_post_payload(author, text, asset, visibility);

        let response = self
            .http
            .post(self.api_url("/v2/ugcPosts"))
            .bearer_auth(token.secret())
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&payload)
            .send()
            .await
            .map_err(|e| PostGenError::RequestError(format!("Create post failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PostGenError::from_response("LinkedIn create post", response).await);
        }

        let header_id = response
            .headers()
            .get("x-restli-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let id = match header_id {
            Some(id) => id,
            None => {
                let body: Value = response
                    .json()
                    .await
                    .map_err(|e| PostGenError::ResponseError(e.to_string()))?;
                body["id"].as_str().map(String::from).ok_or_else(|| {
                    PostGenError::ResponseError("LinkedIn returned no post id".into())
                })?
            }
        };

        Ok(PublishedPost {
            id,
            author: author.to_string(),
            with_image: asset.is_some(),
        })
    }

    /// Register, upload, then post. Any failing step aborts the rest.
    /// Without an image only the final post call is made.
    pub async fn publish(
        &self,
        token: &AccessToken,
        author: &str,
        text: &str,
        image: Option<&GeneratedImage>,
    ) -> Result<PublishedPost> {
        let asset = match image {
            Some(image) => {
                let slot = self.register_upload(token, author).await?;
                log::debug!("Registered upload for asset {}", slot.asset);
                self.upload_image(token, &slot, image).await?;
                Some(slot.asset)
            }
            None => None,
        };

        let post = self
            .create_post(token, author, text, asset.as_deref(), Visibility::Public)
            .await?;
        log::info!("Published LinkedIn post {}", post.id);
        Ok(post)
    }
}

fn ugc_post_payload(author: &str, text: &str, asset: Option<&str>, visibility: Visibility) -> Value {
    let share_content = match asset {
        Some(asset) => json!({
            "shareCommentary": { "text": text },
            "shareMediaCategory": "IMAGE",
            "media": [
                {
                    "status": "READY",
                    "media": asset
                }
            ]
        }),
        None => json!({
            "shareCommentary": { "text": text },
            "shareMediaCategory": "NONE"
        }),
    };

    json!({
        "author": author,
        "lifecycleState": "PUBLISHED",
        "specificContent": {
            "com.linkedin.ugc.ShareContent": share_content
        },
        "visibility": {
            "com.linkedin.ugc.MemberNetworkVisibility": visibility.as_str()
        }
    })
}
