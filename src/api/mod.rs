pub mod catalog;
pub mod certificates;
pub mod courses;
pub mod custom_songs;
pub mod dashboard;
pub mod email_templates;
pub mod gateway_client;
pub mod orders;
pub mod payments;
pub mod uploads;
pub mod videos;
pub mod webhooks;

use actix_web::web;

/// Registers every route. Admin routes nest under `/api/admin`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(webhooks::gateway_webhook).service(
        web::scope("/api")
            .service(
                web::scope("/admin")
                    .service(courses::admin_list_courses)
                    .service(courses::admin_get_course)
                    .service(courses::create_course)
                    .service(courses::update_course)
                    .service(courses::delete_course)
                    .service(certificates::put_layout)
                    .service(certificates::get_layout)
                    .service(catalog::admin_list_products)
                    .service(catalog::create_product)
                    .service(catalog::update_product)
                    .service(catalog::delete_product)
                    .service(catalog::create_category)
                    .service(catalog::delete_category)
                    .service(catalog::create_tag)
                    .service(catalog::delete_tag)
                    .service(orders::admin_list_orders)
                    .service(orders::admin_get_order)
                    .service(orders::update_order)
                    .service(custom_songs::admin_list_songs)
                    .service(custom_songs::admin_get_song)
                    .service(custom_songs::update_song)
                    .service(custom_songs::approve_song)
                    .service(custom_songs::reset_payment)
                    .service(email_templates::list_templates)
                    .service(email_templates::seed_templates)
                    .service(email_templates::preview_adhoc)
                    .service(email_templates::get_template)
                    .service(email_templates::create_template)
                    .service(email_templates::update_template)
                    .service(email_templates::delete_template)
                    .service(email_templates::preview_template)
                    .service(email_templates::test_send)
                    .service(dashboard::list_transactions)
                    .service(dashboard::revenue_report)
                    .service(videos::video_duration)
                    .service(uploads::upload_image),
            )
            .service(courses::list_courses)
            .service(courses::get_course)
            .service(courses::purchase_course)
            .service(courses::mark_progress)
            .service(courses::get_progress)
            .service(courses::submit_review)
            .service(certificates::issue_certificate)
            .service(certificates::get_certificate)
            .service(catalog::list_products)
            .service(catalog::get_product)
            .service(catalog::list_categories)
            .service(catalog::list_tags)
            .service(orders::create_order)
            .service(custom_songs::create_song)
            .service(custom_songs::repay_song)
            .service(payments::verify_payment),
    );
}
