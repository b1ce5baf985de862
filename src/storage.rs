// src/storage.rs
//
// Image uploads to S3-compatible object storage.

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use uuid::Uuid;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

pub const UPLOAD_FOLDERS: [&str; 4] = ["products", "courses", "custom-songs", "certificates"];

/// Public URL for `key`. `base` may be a template using `{bucket}` and
/// `{key}`, a URL that already names the bucket, or a bare host.
pub fn build_public_url(base: &str, bucket: &str, key: &str) -> String {
    let trimmed = base.trim_end_matches('/');

    if trimmed.contains("{bucket}") || trimmed.contains("{key}") {
        return trimmed.replace("{bucket}", bucket).replace("{key}", key);
    }

    if trimmed.contains(bucket) {
        format!("{}/{}", trimmed, key)
    } else {
        format!("{}/{}/{}", trimmed, bucket, key)
    }
}

pub fn sanitize(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '.' || *c == '_' || *c == '-')
        .collect()
}

/// File extension for the accepted image content types.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type.split(';').next().map(str::trim) {
        Some("image/jpeg") | Some("image/jpg") => Some("jpg"),
        Some("image/png") => Some("png"),
        Some("image/webp") => Some("webp"),
        Some("image/gif") => Some("gif"),
        _ => None,
    }
}

/// `<folder>/<uuid>-<sanitized stem>.<ext>`; the stem is dropped when
/// nothing printable survives sanitizing.
pub fn object_key(folder: &str, original_filename: &str, extension: &str) -> String {
    let clean = sanitize(original_filename);
    let stem = clean
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(clean.as_str())
        .trim_matches('.');
    let stem: String = stem.chars().take(64).collect();

    if stem.is_empty() {
        format!("{}/{}.{}", folder, Uuid::new_v4(), extension)
    } else {
        format!("{}/{}-{}.{}", folder, Uuid::new_v4(), stem, extension)
    }
}

#[derive(Clone)]
pub struct Storage {
    pub client: S3Client,
    pub bucket: String,
    pub public_base_url: String,
}

impl Storage {
    pub fn new(client: S3Client, bucket: impl Into<String>, public_base_url: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn public_url(&self, key: &str) -> String {
        build_public_url(&self.public_base_url, &self.bucket, key)
    }

    pub async fn put_object(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<String, String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        Ok(self.public_url(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_variants() {
        assert_eq!(
            build_public_url("https://cdn.example.com/", "media", "products/a.png"),
            "https://cdn.example.com/media/products/a.png"
        );
        assert_eq!(
            build_public_url("https://media.s3.amazonaws.com", "media", "products/a.png"),
            "https://media.s3.amazonaws.com/products/a.png"
        );
        assert_eq!(
            build_public_url("https://{bucket}.host.io/{key}", "media", "products/a.png"),
            "https://media.host.io/products/a.png"
        );
    }

    #[test]
    fn sanitize_strips_path_tricks() {
        assert_eq!(sanitize("../../etc/passwd"), "....etcpasswd");
        assert_eq!(sanitize("my photo (1).PNG"), "myphoto1.PNG");
    }

    #[test]
    fn image_types() {
        assert_eq!(image_extension("image/png"), Some("png"));
        assert_eq!(image_extension("image/jpeg; charset=binary"), Some("jpg"));
        assert_eq!(image_extension("application/pdf"), None);
    }

    #[test]
    fn object_keys_live_under_folder() {
        let key = object_key("products", "Tanpura Keychain.png", "png");
        assert!(key.starts_with("products/"));
        assert!(key.ends_with("-TanpuraKeychain.png"));

        let anonymous = object_key("courses", "???", "jpg");
        assert!(anonymous.starts_with("courses/"));
        assert!(anonymous.ends_with(".jpg"));
        assert!(!anonymous.contains("-."));
    }
}
