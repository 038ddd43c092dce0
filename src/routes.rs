use crate::{
    api::{attendance, leave, users},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    docs::ApiDoc,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{HttpResponse, Responder, middleware::from_fn, web};
use std::sync::Arc;
use utoipa::OpenApi;

async fn openapi_json() -> impl Responder {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes; /auth/me performs its own session check so an
    // unauthenticated probe gets a clean 401 rather than a rejected request.
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(web::resource("/me").route(web::get().to(handlers::me)))
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/leave")
                    .service(web::resource("").route(web::post().to(leave::submit_leave)))
                    .service(web::resource("/my").route(web::get().to(leave::my_leaves)))
                    .service(web::resource("/to-approve").route(web::get().to(leave::to_approve)))
                    .service(web::resource("/pending").route(web::get().to(leave::all_pending)))
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::post().to(leave::approve_leave)),
                    )
                    .service(
                        web::resource("/{id}/reject").route(web::post().to(leave::reject_leave)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    .service(web::resource("/check-in").route(web::post().to(attendance::check_in)))
                    .service(
                        web::resource("/check-out").route(web::post().to(attendance::check_out)),
                    )
                    .service(web::resource("/my").route(web::get().to(attendance::my_attendance))),
            )
            .service(
                web::scope("/users")
                    .service(
                        web::resource("")
                            .route(web::get().to(users::list_users))
                            .route(web::post().to(users::create_user)),
                    )
                    .service(web::resource("/{id}").route(web::delete().to(users::delete_user))),
            )
            .service(
                web::scope("/meta").service(
                    web::resource("/managers").route(web::get().to(users::manager_candidates)),
                ),
            ),
    );

    cfg.service(web::resource("/api-doc/openapi.json").route(web::get().to(openapi_json)));
}
