use actix_web::{get, web, HttpRequest, HttpResponse, Result};
use serde::{Deserialize, Serialize};

use crate::{
    configuration::{AppState, State},
    controller::{api_key::check_api_key, notify_other::DEFAULT_ICON},
    error::Error,
    types::{DispatchResult, NotificationPayload, SubscriptionFilter},
};

#[get("/test-push")]
pub async fn index(
    state: web::Data<AppState<State>>,
    data: web::Query<Query>,
    req: HttpRequest,
) -> Result<HttpResponse, Error> {
    check_api_key(&req, &state.config)?;

    let data = data.into_inner();
    let payload = NotificationPayload::new(
        data.title.unwrap_or_else(|| String::from("Test notification")),
        data.message.unwrap_or_else(|| {
            String::from("This is a test notification from the cat spray app!")
        }),
    )
    .with_icon(data.icon.unwrap_or_else(|| String::from(DEFAULT_ICON)))
    .with_link("/");
    payload.validate()?;

    let filter = match &data.user_id {
        Some(user_id) => SubscriptionFilter::only(user_id.to_owned()),
        None => SubscriptionFilter::all(),
    };

    let result = state.dispatcher().dispatch(&payload, &filter).await?;

    Ok(HttpResponse::Ok().json(Response {
        success: result.total > 0,
        result,
        user_id: data.user_id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct Query {
    title: Option<String>,
    message: Option<String>,
    icon: Option<String>,
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub success: bool,
    #[serde(flatten)]
    pub result: DispatchResult,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}
