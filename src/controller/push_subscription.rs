use actix_web::{delete, post, web, HttpRequest, HttpResponse, Result};
use serde::{Deserialize, Serialize};

use crate::{
    configuration::{AppState, State},
    error::Error,
    handler::send_push::SubscriptionStore,
    types::{RemoveSubscriptionRequest, SubscriptionRequest},
};

#[post("/push-subscription")]
pub async fn post_index(
    state: web::Data<AppState<State>>,
    subscription: web::Json<SubscriptionRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, Error> {
    save(
        &state.database.subscription,
        subscription.into_inner(),
        user_agent(&req)?,
    )
    .await
}

#[delete("/push-subscription")]
pub async fn delete_index(
    state: web::Data<AppState<State>>,
    data: web::Json<RemoveSubscriptionRequest>,
) -> Result<HttpResponse, Error> {
    remove(&state.database.subscription, data.into_inner()).await
}

pub fn user_agent(req: &HttpRequest) -> Result<Option<String>, Error> {
    let user_agent = if let Some(item) = req.headers().get("user-agent") {
        Some(item.to_str()?.to_string())
    } else {
        None
    };

    Ok(user_agent)
}

pub async fn save<S: SubscriptionStore>(
    store: &S,
    subscription: SubscriptionRequest,
    user_agent: Option<String>,
) -> Result<HttpResponse, Error> {
    subscription.validate()?;

    let data = subscription.into_model(user_agent)?;
    tracing::info!(
        "Storing subscription for user {:?} on {:?}",
        data.user_id,
        data.platform
    );
    store.upsert(data).await?;

    Ok(HttpResponse::Created().json(Response { success: true }))
}

pub async fn remove<S: SubscriptionStore>(
    store: &S,
    data: RemoveSubscriptionRequest,
) -> Result<HttpResponse, Error> {
    let endpoint = match data.endpoint {
        Some(endpoint) if !endpoint.trim().is_empty() => endpoint,
        _ => return Err(Error::MissingField("endpoint")),
    };

    let removed = store.remove(&endpoint).await?;
    if removed == 0 {
        tracing::info!("Unsubscribe for unknown endpoint {}", endpoint);
    }

    Ok(HttpResponse::Ok().json(Response { success: true }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
}
