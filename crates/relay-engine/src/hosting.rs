use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::multipart::{Form as MultipartForm, Part as MultipartPart};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;

use crate::http::{http_client, response_json_or_error};
use crate::{HostedImage, ImageHost};

pub struct ImgurHost {
    api_base: String,
    client_id: String,
    http: HttpClient,
}

impl ImgurHost {
    pub fn new(api_base: impl Into<String>, client_id: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            http: http_client()?,
        })
    }
}

impl ImageHost for ImgurHost {
    fn name(&self) -> &str {
        "imgur"
    }

    fn upload(&self, png: &[u8], file_name: &str) -> Result<HostedImage> {
        let endpoint = format!("{}/image", self.api_base);
        let part = MultipartPart::bytes(png.to_vec())
            .file_name(file_name.to_string())
            .mime_str("image/png")
            .context("invalid upload mime type")?;
        let form = MultipartForm::new()
            .text("type", "file")
            .text("name", file_name.to_string())
            .part("image", part);
        let response = self
            .http
            .post(&endpoint)
            .header(AUTHORIZATION, format!("Client-ID {}", self.client_id))
            .multipart(form)
            .send()
            .context("Imgur upload failed")?;
        let body = response_json_or_error("Imgur", response)?;
        let url = body
            .pointer("/data/link")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Imgur response has no image link"))?;
        let preview_url = imgur_thumbnail(&url);
        Ok(HostedImage { url, preview_url })
    }
}

/// Imgur serves a medium thumbnail when `m` is appended to the image id.
fn imgur_thumbnail(url: &str) -> String {
    let name_start = url.rfind('/').map(|idx| idx + 1).unwrap_or(0);
    match url[name_start..].rfind('.') {
        Some(dot) => {
            let dot = name_start + dot;
            format!("{}m{}", &url[..dot], &url[dot..])
        }
        None => url.to_string(),
    }
}

pub struct LocalImageHost {
    dir: PathBuf,
    public_base: String,
}

impl LocalImageHost {
    pub fn new(dir: impl Into<PathBuf>, public_base: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        Ok(Self {
            dir,
            public_base: public_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ImageHost for LocalImageHost {
    fn name(&self) -> &str {
        "local"
    }

    fn upload(&self, png: &[u8], file_name: &str) -> Result<HostedImage> {
        if file_name.contains(['/', '\\']) || file_name.starts_with('.') {
            return Err(anyhow!("refusing to write image named {file_name:?}"));
        }
        let path = self.dir.join(file_name);
        fs::write(&path, png).with_context(|| format!("failed to write {}", path.display()))?;
        let url = format!("{}/images/{}", self.public_base, file_name);
        Ok(HostedImage {
            preview_url: url.clone(),
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{imgur_thumbnail, LocalImageHost};
    use crate::ImageHost;

    #[test]
    fn thumbnail_suffix_goes_before_extension() {
        assert_eq!(
            imgur_thumbnail("https://i.imgur.com/AbC123.png"),
            "https://i.imgur.com/AbC123m.png"
        );
        assert_eq!(
            imgur_thumbnail("https://i.imgur.com/noext"),
            "https://i.imgur.com/noext"
        );
        assert_eq!(
            imgur_thumbnail("https://cdn.v1.example/img/a.b.png"),
            "https://cdn.v1.example/img/a.bm.png"
        );
    }

    #[test]
    fn local_host_writes_file_and_builds_url() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let host = LocalImageHost::new(temp.path().join("images"), "https://bot.example.com/")?;
        let hosted = host.upload(b"\x89PNG", "bracket-8.png")?;
        assert_eq!(hosted.url, "https://bot.example.com/images/bracket-8.png");
        assert_eq!(hosted.preview_url, hosted.url);
        assert_eq!(fs::read(host.dir().join("bracket-8.png"))?, b"\x89PNG");
        Ok(())
    }

    #[test]
    fn local_host_rejects_path_traversal() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let host = LocalImageHost::new(temp.path(), "https://bot.example.com")?;
        assert!(host.upload(b"x", "../escape.png").is_err());
        assert!(host.upload(b"x", ".hidden").is_err());
        Ok(())
    }
}
