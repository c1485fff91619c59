use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL, Engine};
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};

use crate::{
    client::{subscriber::SubscriptionApi, ClientError},
    types::SubscriptionRequest,
};

const SUBSCRIPTION_PATH: &str = "/api/push-subscription";
const VAPID_KEY_PATH: &str = "/api/vapid-public-key";

/// Length of an uncompressed P-256 public key.
const SERVER_KEY_LEN: usize = 65;

#[derive(Debug, Clone)]
pub struct HttpSubscriptionApi {
    http: Client,
    base_url: Url,
}

impl HttpSubscriptionApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Runtime(format!("invalid base url: {}", e)))?;
        let http = Client::builder().timeout(timeout).build()?;

        Ok(HttpSubscriptionApi { http, base_url })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Runtime(e.to_string()))
    }
}

impl SubscriptionApi for HttpSubscriptionApi {
    async fn vapid_public_key(&self) -> Result<String, ClientError> {
        let response = self.http.get(self.url(VAPID_KEY_PATH)?).send().await?;
        let data: VapidKeyResponse = check_status(response)?.json().await?;

        Ok(data.public_key)
    }

    async fn save(
        &self,
        request: &SubscriptionRequest,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url(SUBSCRIPTION_PATH)?)
            .json(request)
            .send()
            .await?;
        check_status(response)?;

        Ok(())
    }

    async fn delete(&self, endpoint: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(SUBSCRIPTION_PATH)?)
            .json(&DeleteBody { endpoint })
            .send()
            .await?;
        check_status(response)?;

        Ok(())
    }
}

fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    Err(ClientError::ServerSync(format!(
        "{} answered {}",
        response.url().path(),
        status
    )))
}

/// Decodes the server's base64url VAPID key into the bytes the push
/// manager expects as `applicationServerKey`.
pub fn decode_application_server_key(key: &str) -> Result<Vec<u8>, ClientError> {
    let bytes = BASE64_URL
        .decode(key.trim().trim_end_matches('='))
        .map_err(|e| {
            ClientError::Runtime(format!("invalid VAPID public key: {}", e))
        })?;

    if bytes.len() != SERVER_KEY_LEN || bytes[0] != 0x04 {
        return Err(ClientError::Runtime(String::from(
            "VAPID public key is not an uncompressed P-256 point",
        )));
    }

    Ok(bytes)
}

#[derive(Debug, Deserialize)]
struct VapidKeyResponse {
    #[serde(rename = "publicKey")]
    public_key: String,
}

#[derive(Debug, Serialize)]
struct DeleteBody<'a> {
    endpoint: &'a str,
}
