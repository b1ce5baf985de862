pub mod api;
pub mod certificate;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod mail;
pub mod models;
pub mod revenue;
pub mod status;
pub mod storage;
pub mod templating;
pub mod transactions;
pub mod video;

use std::sync::Arc;

use sqlx::PgPool;

use crate::api::gateway_client::GatewayClient;
use crate::certificate::TextMeasure;
use crate::mail::DynMailClient;
use crate::storage::Storage;
use crate::video::VideoLookup;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub storage: Storage,
    pub mailer: DynMailClient,
    pub gateway: GatewayClient,
    pub videos: VideoLookup,
    pub measure: Arc<dyn TextMeasure>,
    /// Storefront origin for links in emails, without trailing slash.
    pub site_url: String,
    pub chart_max_points: usize,
}
