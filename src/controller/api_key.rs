use actix_web::{web, HttpRequest};
use serde::Deserialize;

use crate::{configuration::Config, error::Error};

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Deserialize)]
struct ApiKeyQuery {
    #[serde(rename = "apiKey")]
    api_key: Option<String>,
}

/// Accepts the shared reminder secret from the `x-api-key` header or the
/// `apiKey` query parameter.
pub fn check_api_key(req: &HttpRequest, config: &Config) -> Result<(), Error> {
    let provided = match req.headers().get(API_KEY_HEADER) {
        Some(value) => value.to_str().ok().map(str::to_owned),
        None => web::Query::<ApiKeyQuery>::from_query(req.query_string())
            .ok()
            .and_then(|query| query.into_inner().api_key),
    };

    match provided {
        Some(key) if key == config.api_key => Ok(()),
        _ => {
            tracing::warn!(
                "Rejected request to {} with missing or invalid API key",
                req.path()
            );
            Err(Error::Unauthorized)
        },
    }
}
