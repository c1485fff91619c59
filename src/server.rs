use actix_cors::Cors;
use actix_files::Files;
use actix_web::{
    dev::Server, error::JsonPayloadError, http::header, middleware, web, App,
    HttpRequest, HttpServer,
};

use crate::{
    configuration::{AppState, State},
    controller::{
        api_key::API_KEY_HEADER, notify_other, push_subscription,
        send_notification, send_spray_reminder, test_push, vapid_public_key,
        version,
    },
    error::Error,
};

pub async fn server_task(app_state: &AppState<State>) -> Result<(), Error> {
    let app = app_state.clone();
    tokio::spawn(async move {
        let server = init_server(app)?;
        server.await?;
        Ok(())
    })
    .await?
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    Error::InvalidBody(err.to_string()).into()
}

/// Small bodies only, parse failures answer 400 with the JSON error shape.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().limit(4096).error_handler(json_error)
}

fn init_server(app_state: AppState<State>) -> Result<Server, Error> {
    let host = app_state.config.server_host.to_owned();
    let port = app_state.config.port;

    let server = HttpServer::new(move || {
        let app = app_state.clone();
        let static_dir = app_state.config.static_dir.to_owned();
        let allowed_cors = String::from("*");
        let cors_access_all =
            app.config.allowed_origins.contains(&allowed_cors);
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                if cors_access_all {
                    return true;
                }
                let allowed = &app.config.allowed_origins;
                if let Ok(origin) = origin.to_str() {
                    return allowed.contains(&origin.to_owned());
                }
                false
            })
            .allowed_methods(vec!["GET", "POST", "DELETE"])
            .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT])
            .allowed_header(header::CONTENT_TYPE)
            .allowed_header(API_KEY_HEADER);

        App::new()
            .wrap(cors)
            .wrap(middleware::Compress::default())
            .app_data(web::Data::new(app_state.clone()))
            .app_data(json_config())
            .service(
                web::scope("/api")
                    .service(push_subscription::post_index)
                    .service(push_subscription::delete_index)
                    .service(send_notification::index)
                    .service(notify_other::index)
                    .service(send_spray_reminder::post_index)
                    .service(send_spray_reminder::get_index)
                    .service(test_push::index)
                    .service(vapid_public_key::index)
                    .service(version::index),
            )
            .service(Files::new("/", static_dir).index_file("index.html"))
    })
    .bind((host, port))?
    .disable_signals()
    .run();
    Ok(server)
}
