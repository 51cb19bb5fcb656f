use paperclip::actix::web;

use crate::handlers;

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::scope("/api")
                .service(web::resource("/quote").route(web::get().to(handlers::get_quote)))
                .service(
                    web::scope("/booking")
                        .service(
                            web::resource("").route(web::post().to(handlers::create_booking)),
                        )
                        .service(
                            web::resource("/scan/{code_or_id}")
                                .route(web::get().to(handlers::scan_booking)),
                        )
                        .service(
                            web::scope("/{booking_id}")
                                .service(
                                    web::resource("").route(web::get().to(handlers::get_booking)),
                                )
                                .service(
                                    web::resource("/status")
                                        .route(web::post().to(handlers::update_booking_status)),
                                )
                                .service(
                                    web::resource("/payment")
                                        .route(web::get().to(handlers::get_booking_payment)),
                                ),
                        ),
                )
                .service(
                    web::resource("/user/{user_id}/bookings")
                        .route(web::get().to(handlers::list_user_bookings)),
                )
                .service(
                    web::scope("/provider/{provider_id}")
                        .service(
                            web::resource("/bookings")
                                .route(web::get().to(handlers::list_provider_bookings)),
                        )
                        .service(
                            web::resource("/dashboard")
                                .route(web::get().to(handlers::provider_dashboard)),
                        ),
                ),
        );
}
