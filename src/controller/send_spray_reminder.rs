use actix_web::{get, post, web, HttpRequest, HttpResponse, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    configuration::{AppState, State},
    controller::api_key::check_api_key,
    error::Error,
    handler::reminder::{ReminderReport, ReminderTrigger},
};

#[post("/send-spray-reminder")]
pub async fn post_index(
    state: web::Data<AppState<State>>,
    data: web::Query<Query>,
    req: HttpRequest,
) -> Result<HttpResponse, Error> {
    run(state, data, req).await
}

#[get("/send-spray-reminder")]
pub async fn get_index(
    state: web::Data<AppState<State>>,
    data: web::Query<Query>,
    req: HttpRequest,
) -> Result<HttpResponse, Error> {
    run(state, data, req).await
}

async fn run(
    state: web::Data<AppState<State>>,
    data: web::Query<Query>,
    req: HttpRequest,
) -> Result<HttpResponse, Error> {
    check_api_key(&req, &state.config)?;

    let trigger = ReminderTrigger::new(
        &state.database,
        state.dispatcher(),
        state.config.reminder_window_minutes,
    );
    let now = Local::now().naive_local();

    let report = match &data.time {
        Some(time) => {
            let date = data.date.unwrap_or(now.date());
            trigger.run_for(date, time).await?
        },
        None => trigger.run(now).await?,
    };

    Ok(HttpResponse::Ok().json(Response {
        success: true,
        report,
    }))
}

#[derive(Debug, Deserialize)]
pub struct Query {
    time: Option<String>,
    date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct Response {
    pub success: bool,
    #[serde(flatten)]
    pub report: ReminderReport,
}
