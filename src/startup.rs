use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::SessionManager;
use crate::configuration::{JwtSettings, PasswordSettings};
use crate::error::{AppError, ValidationError};
use crate::middleware::{JwtMiddleware, RequestLogger};
use crate::routes::{
    change_password, current_user, health_check, login, logout, refresh_access_token, register,
    update_account, update_avatar, update_cover_image,
};
use crate::store::UserStore;

/// Malformed or missing JSON bodies go through the same error envelope as
/// every other failure.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        tracing::debug!("Rejected request body: {}", err);
        AppError::Validation(ValidationError::InvalidFormat("request body".to_string())).into()
    })
}

pub fn run(
    listener: TcpListener,
    store: Arc<dyn UserStore>,
    jwt_config: JwtSettings,
    password_settings: PasswordSettings,
) -> Result<Server, std::io::Error> {
    let sessions = web::Data::new(SessionManager::new(store.clone(), jwt_config.clone()));
    let store = web::Data::from(store);
    let password_settings = web::Data::new(password_settings);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(RequestLogger)

            // Shared state
            .app_data(json_config())
            .app_data(sessions.clone())
            .app_data(store.clone())
            .app_data(password_settings.clone())

            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/v1/users")
                    // Public routes
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/refresh-token", web::post().to(refresh_access_token))

                    // Protected routes (require a valid access token)
                    .service(
                        web::resource("/logout")
                            .wrap(JwtMiddleware::new(jwt_config.clone()))
                            .route(web::post().to(logout)),
                    )
                    .service(
                        web::resource("/change-password")
                            .wrap(JwtMiddleware::new(jwt_config.clone()))
                            .route(web::post().to(change_password)),
                    )
                    .service(
                        web::resource("/current-user")
                            .wrap(JwtMiddleware::new(jwt_config.clone()))
                            .route(web::get().to(current_user)),
                    )
                    .service(
                        web::resource("/update-account")
                            .wrap(JwtMiddleware::new(jwt_config.clone()))
                            .route(web::patch().to(update_account)),
                    )
                    .service(
                        web::resource("/avatar")
                            .wrap(JwtMiddleware::new(jwt_config.clone()))
                            .route(web::patch().to(update_avatar)),
                    )
                    .service(
                        web::resource("/cover-image")
                            .wrap(JwtMiddleware::new(jwt_config.clone()))
                            .route(web::patch().to(update_cover_image)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
