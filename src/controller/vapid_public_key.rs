use actix_web::{get, web, Responder};
use serde::Serialize;

use crate::{
    configuration::{AppState, State},
    error::Error,
};

#[get("/vapid-public-key")]
async fn index(
    state: web::Data<AppState<State>>,
) -> Result<impl Responder, Error> {
    Ok(web::Json(Response {
        public_key: state.config.vapid_public_key.to_owned(),
    }))
}

#[derive(Debug, Serialize)]
pub struct Response {
    #[serde(rename = "publicKey")]
    pub public_key: String,
}
