use actix_web::{post, web, HttpRequest, HttpResponse, Result};
use serde::{Deserialize, Serialize};

use crate::{
    configuration::{AppState, State},
    controller::api_key::check_api_key,
    error::Error,
    handler::send_push::{Dispatcher, PushTransport, SubscriptionStore},
    types::{DispatchResult, NotificationPayload, SubscriptionFilter},
};

#[post("/send-notification")]
pub async fn index(
    state: web::Data<AppState<State>>,
    data: web::Json<Body>,
    req: HttpRequest,
) -> Result<HttpResponse, Error> {
    check_api_key(&req, &state.config)?;
    send(&state.dispatcher(), data.into_inner()).await
}

pub async fn send<S, T>(
    dispatcher: &Dispatcher<'_, S, T>,
    data: Body,
) -> Result<HttpResponse, Error>
where
    S: SubscriptionStore,
    T: PushTransport,
{
    let mut payload = NotificationPayload::new(data.title, data.body);
    payload.icon = data.icon;
    payload.link = data.link;
    payload.validate()?;

    let filter = match data.user_id {
        Some(user_id) if !user_id.is_empty() => SubscriptionFilter::only(user_id),
        _ => SubscriptionFilter::all(),
    };

    let result = dispatcher.dispatch(&payload, &filter).await?;
    if result.total == 0 {
        return Err(Error::NoSubscribers);
    }

    Ok(HttpResponse::Ok().json(Response {
        success: true,
        result,
    }))
}

#[derive(Debug, Deserialize)]
pub struct Body {
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
    icon: Option<String>,
    link: Option<String>,
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub success: bool,
    #[serde(flatten)]
    pub result: DispatchResult,
}
