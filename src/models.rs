// src/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::status::ApprovalBadge;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Course {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub instructor: Option<String>,
    pub level: Option<String>,
    /// Minor currency units.
    pub price: i64,
    pub original_price: Option<i64>,
    pub currency: String,
    pub is_published: bool,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CourseSection {
    pub id: i32,
    pub course_id: i32,
    pub title: String,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CourseVideo {
    pub id: i32,
    pub section_id: i32,
    pub title: String,
    pub video_url: String,
    pub duration_seconds: i32,
    pub is_preview: bool,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionDetail {
    #[serde(flatten)]
    pub section: CourseSection,
    pub videos: Vec<CourseVideo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub sections: Vec<SectionDetail>,
    pub total_videos: usize,
    pub total_duration_seconds: i64,
}

impl CourseDetail {
    pub fn new(course: Course, sections: Vec<SectionDetail>) -> Self {
        let total_videos = sections.iter().map(|s| s.videos.len()).sum();
        let total_duration_seconds = sections
            .iter()
            .flat_map(|s| s.videos.iter())
            .map(|v| i64::from(v.duration_seconds))
            .sum();
        Self {
            course,
            sections,
            total_videos,
            total_duration_seconds,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Purchase {
    pub id: i32,
    pub user_id: i32,
    pub course_id: i32,
    pub amount: i64,
    pub currency: String,
    pub status: String, // pending | completed | failed
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    /// Earlier gateway orders replaced by a new checkout attempt.
    pub order_id_history: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// First time a learner finished a video.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VideoProgress {
    pub user_id: i32,
    pub video_id: i32,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CourseReview {
    pub id: i32,
    pub user_id: i32,
    pub course_id: i32,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Certificate {
    pub id: i32,
    pub certificate_id: String,
    pub user_id: i32,
    pub course_id: i32,
    pub user_name: String,
    pub course_title: String,
    pub issued_at: DateTime<Utc>,
}

/// Pixel-positioned text slot on a certificate background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LayoutField {
    /// One of `name`, `course`, `date`, `certificate_id`.
    pub key: String,
    pub x: f32,
    pub y: f32,
    pub max_width: f32,
    pub font_size: f32,
    pub min_font_size: f32,
    #[serde(default = "default_text_color")]
    pub color: String,
    #[serde(default = "default_align")]
    pub align: String,
}

fn default_text_color() -> String {
    "#000000".to_string()
}

fn default_align() -> String {
    "center".to_string()
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CertificateLayout {
    pub course_id: i32,
    pub background_url: String,
    pub width: i32,
    pub height: i32,
    pub fields: Json<Vec<LayoutField>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Tag {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub base_price: i64,
    pub currency: String,
    pub category_id: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductVariant {
    pub id: i32,
    pub product_id: i32,
    pub name: String,
    /// Overrides the product's base price when set.
    pub price: Option<i64>,
    pub images: Vec<String>,
    pub position: i32,
}

impl ProductVariant {
    pub fn effective_price(&self, product: &Product) -> i64 {
        self.price.unwrap_or(product.base_price)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<Category>,
    pub variants: Vec<ProductVariant>,
    pub tags: Vec<Tag>,
}

/// Line item as it was priced when the order was placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: i32,
    pub product_name: String,
    pub variant_id: Option<i32>,
    pub variant_name: Option<String>,
    pub image: Option<String>,
    pub unit_price: i64,
    pub quantity: i32,
    pub line_total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShippingAddress {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
    pub id: i32,
    pub user_id: Option<i32>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub items: Json<Vec<OrderItem>>,
    pub shipping_address: Json<ShippingAddress>,
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub total: i64,
    pub currency: String,
    pub payment_method: String,
    pub payment_status: String, // pending | paid | cod | failed | cancelled
    pub status: String,         // processing | shipped | delivered | cancelled
    pub tracking_id: Option<String>,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    /// First time the order reached `delivered`; settles cash on delivery.
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CustomSongOrder {
    pub id: i32,
    pub user_id: Option<i32>,
    pub customer_name: String,
    pub customer_email: String,
    pub occasion: String,
    pub recipient_name: String,
    pub details: Option<String>,
    pub price: i64,
    pub currency: String,
    pub status: String, // pending | in_progress | ready | completed
    pub needs_approval: bool,
    pub is_approved: bool,
    pub preview_url: Option<String>,
    pub full_audio_url: Option<String>,
    pub payment_status: String,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub order_id_history: Vec<String>,
    pub payment_reset_count: i32,
    pub paid_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomSongView {
    #[serde(flatten)]
    pub song: CustomSongOrder,
    pub approval_badge: Option<&'static str>,
}

impl From<CustomSongOrder> for CustomSongView {
    fn from(song: CustomSongOrder) -> Self {
        let approval_badge =
            ApprovalBadge::for_song(song.needs_approval, song.is_approved).map(ApprovalBadge::label);
        Self { song, approval_badge }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TemplateVariable {
    pub name: String,
    #[serde(default)]
    pub example: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EmailTemplate {
    pub id: i32,
    pub name: String,
    pub subject: String,
    pub html_body: String,
    pub variables: Json<Vec<TemplateVariable>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
