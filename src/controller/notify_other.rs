use actix_web::{post, web, HttpRequest, HttpResponse, Result};
use serde::{Deserialize, Serialize};

use crate::{
    configuration::{AppState, State},
    controller::api_key::check_api_key,
    error::Error,
    types::{DispatchResult, NotificationPayload, SubscriptionFilter},
};

pub const DEFAULT_CAT_NAME: &str = "Pebbles";
pub const DEFAULT_ICON: &str = "/android-chrome-192x192.png";

/// Tells every other household member that a dose was just given.
#[post("/notify-other")]
pub async fn index(
    state: web::Data<AppState<State>>,
    data: web::Json<Body>,
    req: HttpRequest,
) -> Result<HttpResponse, Error> {
    check_api_key(&req, &state.config)?;

    let data = data.into_inner();
    let payload = build_payload(&data)?;

    let filter = match data.user_id {
        Some(user_id) if !user_id.is_empty() => {
            SubscriptionFilter::except(user_id)
        },
        _ => SubscriptionFilter::all(),
    };

    let result = state.dispatcher().dispatch(&payload, &filter).await?;

    Ok(HttpResponse::Ok().json(Response {
        success: true,
        message: format!("{} notifications sent", result.sent),
        result,
    }))
}

fn build_payload(data: &Body) -> Result<NotificationPayload, Error> {
    let user_name = match data.user_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => return Err(Error::MissingField("userName")),
    };
    let cat_name = data
        .cat_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_CAT_NAME);

    let body = match &data.time {
        Some(time) => format!(
            "{} just gave {} the spray ({}).",
            user_name, cat_name, time
        ),
        None => format!("{} just gave {} the spray.", user_name, cat_name),
    };

    Ok(NotificationPayload::new("Spray reminder updated", body)
        .with_icon(DEFAULT_ICON)
        .with_link("/"))
}

#[derive(Debug, Deserialize)]
pub struct Body {
    #[serde(rename = "userName")]
    user_name: Option<String>,
    #[serde(rename = "catName")]
    cat_name: Option<String>,
    time: Option<String>,
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub success: bool,
    #[serde(flatten)]
    pub result: DispatchResult,
    pub message: String,
}
