use base64::{
    engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL, Engine,
};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, Url,
};
use std::{fmt, str::FromStr, time::Duration};

use crate::{
    configuration::Config,
    error::Error,
    handler::send_push::PushTransport,
    model::Subscription,
    types::{Claims, PushHeader, Urgency},
};

/// Push services reject VAPID tokens valid for more than 24h.
const VAPID_TOKEN_LIFETIME_SECS: i64 = 12 * 60 * 60;

pub struct HTTP {
    pub config: Config,
    pub http: Client,
    pub push_header: PushHeader,
    key: EncodingKey,
}

impl fmt::Debug for HTTP {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HTTP")
            .field("http", &self.http)
            .field("push_header", &self.push_header)
            .finish_non_exhaustive()
    }
}

impl HTTP {
    pub fn new(config: Config) -> Result<HTTP, Error> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        let key = EncodingKey::from_ec_pem(&config.vapid_private_key)?;
        let push_header = PushHeader {
            ttl: config.push_ttl,
            urgency: Urgency::High,
        };

        Ok(HTTP {
            config,
            http,
            push_header,
            key,
        })
    }

    /// Signs the VAPID JWT for the push service that owns `endpoint`.
    pub fn vapid_token(&self, endpoint: &str) -> Result<String, Error> {
        let url = Url::parse(endpoint)?;
        let aud = audience(&url)?;
        let sub = format!("mailto:{}", &self.config.mail_to);
        let exp = Utc::now().timestamp() + VAPID_TOKEN_LIFETIME_SECS;

        let claims = Claims { aud, sub, exp };
        let token = encode(&Header::new(Algorithm::ES256), &claims, &self.key)?;

        Ok(token)
    }

    pub async fn post_push(
        &self,
        url: &str,
        token: String,
        data: Vec<u8>,
    ) -> Result<u16, Error> {
        let mut header_map = HeaderMap::new();
        let authorization = format!(
            "vapid t={}, k={}",
            token,
            self.config.vapid_public_key.trim()
        );

        header_map.insert(
            HeaderName::from_str("authorization")?,
            HeaderValue::from_str(&authorization)?,
        );
        header_map.insert(
            HeaderName::from_str("content-encoding")?,
            HeaderValue::from_static("aes128gcm"),
        );
        header_map.insert(
            HeaderName::from_str("content-type")?,
            HeaderValue::from_static("application/octet-stream"),
        );
        header_map.insert(
            HeaderName::from_str("ttl")?,
            HeaderValue::from_str(&self.push_header.ttl.to_string())?,
        );
        header_map.insert(
            HeaderName::from_str("urgency")?,
            HeaderValue::from_str(&self.push_header.urgency.to_string())?,
        );

        let response = self
            .http
            .post(url)
            .headers(header_map)
            .body(data)
            .send()
            .await?;
        let status = response.status().as_u16();

        Ok(status)
    }
}

impl PushTransport for HTTP {
    async fn deliver(
        &self,
        subscription: &Subscription,
        payload: &[u8],
    ) -> Result<u16, Error> {
        let token = self.vapid_token(&subscription.endpoint)?;

        let p256dh = decode_key(&subscription.p256dh)?;
        let auth = decode_key(&subscription.auth)?;
        let data = ece::encrypt(&p256dh, &auth, payload)?;

        self.post_push(&subscription.endpoint, token, data).await
    }
}

fn audience(url: &Url) -> Result<String, Error> {
    let host = match url.host_str() {
        Some(h) => h,
        None => {
            return Err(Error::InvalidOption {
                option: String::from("host"),
            });
        },
    };

    let aud = match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    };

    Ok(aud)
}

/// Browsers hand out unpadded base64url keys, some libraries pad them.
fn decode_key(value: &str) -> Result<Vec<u8>, Error> {
    Ok(BASE64_URL.decode(value.trim().trim_end_matches('='))?)
}
