//! Student profile pictures from the campus information system.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;

use crate::config::SiakadConfig;
use crate::error::CentralError;
use crate::ports::{GatewayError, PictureFetch, ProfilePictureSource};

pub struct SiakadPictureSource {
    client: reqwest::Client,
    base_url: String,
}

impl SiakadPictureSource {
    pub fn new(config: &SiakadConfig) -> Result<Self, CentralError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| CentralError::Config(format!("failed to build siakad client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    fn picture_url(&self, student_id: &str) -> String {
        if self.base_url.ends_with('/') {
            format!("{}{student_id}", self.base_url)
        } else {
            format!("{}/{student_id}", self.base_url)
        }
    }
}

#[async_trait]
impl ProfilePictureSource for SiakadPictureSource {
    async fn fetch(&self, student_id: &str) -> Result<PictureFetch, GatewayError> {
        let url = self.picture_url(student_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("GET {url}: {e}")))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(PictureFetch::Missing),
            StatusCode::OK => {}
            status => {
                return Err(GatewayError::Api(format!("GET {url} returned {status}")));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Transport(format!("read body of {url}: {e}")))?;

        Ok(PictureFetch::Found {
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}
