//! Status vocabulary shared by the shop, course and custom-song flows.
//!
//! Every dashboard decides "is this paid?" through [`normalize`], so course
//! purchases, shop orders and custom songs are counted by one rule set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Course,
    Shop,
    CustomSong,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 3] = [Self::Course, Self::Shop, Self::CustomSong];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Course => "course",
            Self::Shop => "shop",
            Self::CustomSong => "custom_song",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "course" => Ok(Self::Course),
            "shop" => Ok(Self::Shop),
            "custom_song" => Ok(Self::CustomSong),
            other => Err(UnknownStatus::new("transaction kind", other)),
        }
    }
}

/// Settlement state of any money-bearing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Paid,
    Pending,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub label: &'static str,
    pub color: &'static str,
}

impl PaymentState {
    pub const ALL: [PaymentState; 4] = [Self::Paid, Self::Pending, Self::Failed, Self::Cancelled];

    pub fn badge(self) -> Badge {
        match self {
            Self::Paid => Badge { label: "Paid", color: "green" },
            Self::Pending => Badge { label: "Pending", color: "yellow" },
            Self::Failed => Badge { label: "Failed", color: "red" },
            Self::Cancelled => Badge { label: "Cancelled", color: "gray" },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Pending => "pending",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for PaymentState {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(Self::Paid),
            "pending" => Ok(Self::Pending),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownStatus::new("payment state", other)),
        }
    }
}

/// Maps a raw stored status onto [`PaymentState`].
///
/// `fulfilment` is the shop order's delivery status; it only matters for
/// cash-on-delivery orders, which count as paid once delivered.
pub fn normalize(kind: TransactionKind, payment_status: &str, fulfilment: Option<&str>) -> PaymentState {
    let payment_status = payment_status.trim().to_ascii_lowercase();
    match kind {
        TransactionKind::Course => match payment_status.as_str() {
            "completed" | "paid" | "success" | "captured" => PaymentState::Paid,
            "failed" => PaymentState::Failed,
            "cancelled" | "canceled" => PaymentState::Cancelled,
            _ => PaymentState::Pending,
        },
        TransactionKind::Shop => {
            let fulfilment = fulfilment.map(|f| f.trim().to_ascii_lowercase());
            if fulfilment.as_deref() == Some("cancelled") {
                return PaymentState::Cancelled;
            }
            match payment_status.as_str() {
                "paid" => PaymentState::Paid,
                "cod" if fulfilment.as_deref() == Some("delivered") => PaymentState::Paid,
                "failed" => PaymentState::Failed,
                "cancelled" | "canceled" => PaymentState::Cancelled,
                _ => PaymentState::Pending,
            }
        }
        TransactionKind::CustomSong => match payment_status.as_str() {
            "paid" => PaymentState::Paid,
            "failed" => PaymentState::Failed,
            "cancelled" | "canceled" => PaymentState::Cancelled,
            _ => PaymentState::Pending,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {field}: {value:?}")]
pub struct UnknownStatus {
    pub field: &'static str,
    pub value: String,
}

impl UnknownStatus {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

impl From<UnknownStatus> for crate::error::AppError {
    fn from(err: UnknownStatus) -> Self {
        crate::error::AppError::BadRequest(err.to_string())
    }
}

macro_rules! wire_enum {
    ($name:ident, $field:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownStatus;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(UnknownStatus::new($field, other)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum!(OrderPaymentStatus, "order payment status", {
    Pending => "pending",
    Paid => "paid",
    Cod => "cod",
    Failed => "failed",
    Cancelled => "cancelled",
});

wire_enum!(FulfilmentStatus, "order status", {
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

wire_enum!(CustomSongStatus, "custom song status", {
    Pending => "pending",
    InProgress => "in_progress",
    Ready => "ready",
    Completed => "completed",
});

wire_enum!(PaymentMethod, "payment method", {
    Online => "online",
    Cod => "cod",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalBadge {
    NeedsApproval,
    Approved,
}

impl ApprovalBadge {
    pub fn for_song(needs_approval: bool, is_approved: bool) -> Option<Self> {
        match (needs_approval, is_approved) {
            (_, true) => Some(Self::Approved),
            (true, false) => Some(Self::NeedsApproval),
            (false, false) => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NeedsApproval => "Needs Approval",
            Self::Approved => "Approved",
        }
    }
}
