use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use chrono::Utc;

const DEFAULT_FILENAME: &str = "uploaded_image.jpg";

#[derive(Clone)]
pub struct S3Service {
    client: Client,
    bucket_name: String,
    region: String,
}

#[derive(Debug, thiserror::Error)]
pub enum S3ServiceError {
    #[error("S3 error: {0}")]
    S3(String),
    #[error("File too large")]
    FileTooLarge,
}

impl S3Service {
    pub fn new(client: Client, bucket_name: String, region: String) -> Self {
        Self {
            client,
            bucket_name,
            region,
        }
    }

    // Uploaded names become storage keys and fallback URLs; reduce them to a
    // single safe path component.
    pub fn safe_filename(filename: Option<&str>) -> String {
        let name = filename.unwrap_or(DEFAULT_FILENAME);
        let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
        let cleaned: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if cleaned.trim_matches(['.', '_']).is_empty() {
            DEFAULT_FILENAME.to_string()
        } else {
            cleaned
        }
    }

    pub fn object_key(filename: &str) -> String {
        format!("uploads/{}", filename)
    }

    pub fn content_type_for(filename: &str) -> &'static str {
        let extension = filename
            .rsplit('.')
            .next()
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            Some("gif") => "image/gif",
            _ => "image/jpeg",
        }
    }

    pub fn public_url(&self, key: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket_name, self.region, key
        )
    }

    pub fn validate_image_size(image_data: &[u8]) -> Result<(), S3ServiceError> {
        const MAX_SIZE: usize = 50 * 1024 * 1024;
        if image_data.len() > MAX_SIZE {
            return Err(S3ServiceError::FileTooLarge);
        }
        Ok(())
    }

    pub async fn upload_public(
        &self,
        image_data: &[u8],
        key: &str,
        content_type: &str,
    ) -> Result<String, S3ServiceError> {
        S3Service::validate_image_size(image_data)?;

        let body = ByteStream::from(image_data.to_vec());

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(body)
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .metadata("uploaded-at", Utc::now().to_rfc3339())
            .send()
            .await
            .map_err(|e| S3ServiceError::S3(e.to_string()))?;

        Ok(self.public_url(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::{BehaviorVersion, Region};

    fn service() -> S3Service {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        S3Service::new(
            Client::from_conf(config),
            "scan-uploads".to_string(),
            "us-east-1".to_string(),
        )
    }

    #[test]
    fn keys_live_under_the_uploads_prefix() {
        assert_eq!(S3Service::object_key("scan.jpg"), "uploads/scan.jpg");
    }

    #[test]
    fn public_url_points_at_the_bucket_object() {
        let url = service().public_url("uploads/scan.jpg");
        assert_eq!(
            url,
            "https://scan-uploads.s3.us-east-1.amazonaws.com/uploads/scan.jpg"
        );
    }

    #[test]
    fn filenames_are_reduced_to_one_safe_component() {
        assert_eq!(S3Service::safe_filename(Some("scan.jpg")), "scan.jpg");
        assert_eq!(
            S3Service::safe_filename(Some("../../etc/passwd")),
            "passwd"
        );
        assert_eq!(
            S3Service::safe_filename(Some("my scan (1).png")),
            "my_scan__1_.png"
        );
        assert_eq!(S3Service::safe_filename(None), "uploaded_image.jpg");
        assert_eq!(S3Service::safe_filename(Some("..")), "uploaded_image.jpg");
        assert_eq!(S3Service::safe_filename(Some("")), "uploaded_image.jpg");
    }

    #[test]
    fn content_type_follows_the_extension() {
        assert_eq!(S3Service::content_type_for("scan.png"), "image/png");
        assert_eq!(S3Service::content_type_for("scan.WEBP"), "image/webp");
        assert_eq!(S3Service::content_type_for("scan.jpeg"), "image/jpeg");
        assert_eq!(S3Service::content_type_for("noextension"), "image/jpeg");
    }

    #[test]
    fn oversized_payloads_are_rejected_before_upload() {
        assert!(S3Service::validate_image_size(&[0u8; 16]).is_ok());
        let oversized = vec![0u8; 50 * 1024 * 1024 + 1];
        assert!(matches!(
            S3Service::validate_image_size(&oversized),
            Err(S3ServiceError::FileTooLarge)
        ));
    }
}
