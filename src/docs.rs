use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::courses::list_courses,
        crate::api::courses::purchase_course,
        crate::api::courses::create_course,
        crate::api::certificates::issue_certificate,
        crate::api::catalog::delete_product,
        crate::api::orders::create_order,
        crate::api::orders::update_order,
        crate::api::custom_songs::create_song,
        crate::api::custom_songs::approve_song,
        crate::api::email_templates::preview_adhoc,
        crate::api::dashboard::revenue_report,
        crate::api::videos::video_duration,
        crate::api::uploads::upload_image,
        crate::api::payments::verify_payment,
        crate::api::webhooks::gateway_webhook
    ),
    components(
        schemas(
            crate::api::courses::UserRequest,
            crate::api::courses::ProgressRequest,
            crate::api::courses::ReviewRequest,
            crate::api::courses::ProgressSummary,
            crate::db::courses::CourseInput,
            crate::db::courses::SectionInput,
            crate::db::courses::VideoInput,
            crate::api::certificates::LayoutRequest,
            crate::models::LayoutField,
            crate::db::catalog::ProductInput,
            crate::db::catalog::VariantInput,
            crate::api::catalog::NameRequest,
            crate::api::orders::PlaceOrderRequest,
            crate::api::orders::OrderLine,
            crate::api::orders::UpdateOrderRequest,
            crate::models::ShippingAddress,
            crate::status::PaymentMethod,
            crate::status::PaymentState,
            crate::status::TransactionKind,
            crate::api::custom_songs::CustomSongRequest,
            crate::api::custom_songs::UpdateSongRequest,
            crate::db::email_templates::TemplateInput,
            crate::db::email_templates::SeedReport,
            crate::models::TemplateVariable,
            crate::api::email_templates::PreviewRequest,
            crate::api::email_templates::TestSendRequest,
            crate::templating::Preview,
            crate::api::videos::DurationResponse,
            crate::api::uploads::UploadResponse,
            crate::api::payments::VerifyPaymentRequest,
            crate::api::webhooks::GatewayWebhook
        )
    ),
    tags(
        (name = "courses", description = "Catalogue, purchase, progress and certificates"),
        (name = "shop", description = "Shop orders"),
        (name = "custom-songs", description = "Custom song orders"),
        (name = "payments", description = "Payment verification"),
        (name = "admin", description = "Administration"),
        (name = "webhooks", description = "Payment gateway callbacks")
    )
)]
pub struct ApiDoc;
