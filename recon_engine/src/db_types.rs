use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use hpg_common::{Currency, Money};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------      TxRef       -----------------------------------------------------------
/// The caller-supplied idempotency key for a payment attempt.
///
/// It is unique across all transactions forever and is the join key between local state and
/// processor confirmations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct TxRef(pub String);

impl FromStr for TxRef {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for TxRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for TxRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TxRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   PaymentStatus    ---------------------------------------------------------
/// Stored transaction state. Transitions are monotonic: `Success` is sticky, `Refunded` is final,
/// and `Failed`/`Cancelled` are terminal unless upgraded by a genuine late success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// The attempt has been created and no confirmation has been accepted yet.
    Pending,
    /// The processor confirmed the payment. Downstream effects fire on entry into this state.
    Success,
    /// The attempt failed, or the expiry sweep gave up on it.
    Failed,
    /// The user or the processor cancelled the attempt.
    Cancelled,
    /// A settled payment was refunded.
    Refunded,
}

impl PaymentStatus {
    /// True once `settled_at` should be set: every state except `Pending`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Success => write!(f, "Success"),
            PaymentStatus::Failed => write!(f, "Failed"),
            PaymentStatus::Cancelled => write!(f, "Cancelled"),
            PaymentStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid payment status: {0}")]
pub struct ConversionError(String);

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Success" => Ok(Self::Success),
            "Failed" => Ok(Self::Failed),
            "Cancelled" => Ok(Self::Cancelled),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------    PaymentType     ---------------------------------------------------------
/// What the payment is for. Carried on the transaction so reporting and effect dispatch can tell
/// listing fees from subscriptions without consulting the related entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentType {
    Subscription,
    ListingFee,
    PremiumFeature,
}

impl Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentType::Subscription => write!(f, "Subscription"),
            PaymentType::ListingFee => write!(f, "ListingFee"),
            PaymentType::PremiumFeature => write!(f, "PremiumFeature"),
        }
    }
}

impl FromStr for PaymentType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Subscription" | "subscription" => Ok(Self::Subscription),
            "ListingFee" | "listing-fee" => Ok(Self::ListingFee),
            "PremiumFeature" | "premium-feature" => Ok(Self::PremiumFeature),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------  ReportedStatus    ---------------------------------------------------------
/// The outcome a confirmation signal claims for a transaction.
///
/// Processor payloads are loosely typed, so anything outside the known set is carried as
/// `Unrecognized` and retained for audit, but never applied as a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportedStatus {
    Success,
    Failed,
    Cancelled,
    Unrecognized(String),
}

impl ReportedStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" | "successful" => Self::Success,
            "failed" | "failure" | "error" => Self::Failed,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Unrecognized(s.to_string()),
        }
    }
}

impl Display for ReportedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportedStatus::Success => write!(f, "success"),
            ReportedStatus::Failed => write!(f, "failed"),
            ReportedStatus::Cancelled => write!(f, "cancelled"),
            ReportedStatus::Unrecognized(s) => write!(f, "unrecognized ({s})"),
        }
    }
}

//------------------------------------ ConfirmationSource   ---------------------------------------------------------
/// Where a confirmation signal came from. Only used for logging and audit; the precedence rule is
/// the same for every source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationSource {
    /// A user-triggered synchronous verification poll.
    Poll,
    /// An asynchronous webhook pushed by the processor.
    Webhook,
    /// The expiry sweep giving up on a stale pending transaction.
    Sweep,
    /// A failed outbound initialize call terminal-failing the attempt.
    Initialize,
}

impl Display for ConfirmationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfirmationSource::Poll => write!(f, "poll"),
            ConfirmationSource::Webhook => write!(f, "webhook"),
            ConfirmationSource::Sweep => write!(f, "sweep"),
            ConfirmationSource::Initialize => write!(f, "initialize"),
        }
    }
}

//--------------------------------------   Confirmation     ---------------------------------------------------------
/// One confirmation signal, ready to be applied by the engine.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub reported: ReportedStatus,
    /// The processor-assigned reference, if the signal carried one. Only the first accepted
    /// confirmation writes it; later values are ignored.
    pub gateway_ref: Option<String>,
    /// The raw signal payload, retained verbatim for audit.
    pub raw_payload: Option<String>,
}

impl Confirmation {
    pub fn new(reported: ReportedStatus) -> Self {
        Self { reported, gateway_ref: None, raw_payload: None }
    }

    pub fn with_gateway_ref(mut self, gateway_ref: String) -> Self {
        self.gateway_ref = Some(gateway_ref);
        self
    }

    pub fn with_payload(mut self, payload: String) -> Self {
        self.raw_payload = Some(payload);
        self
    }
}

//--------------------------------------    Transaction     ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub tx_ref: TxRef,
    pub gateway_ref: Option<String>,
    pub amount: Money,
    pub currency: Currency,
    pub payment_type: PaymentType,
    /// Opaque reference to the plan / property / feature being paid for.
    pub related_entity_id: String,
    pub status: PaymentStatus,
    /// Flips false -> true exactly once, atomically with the transition into `Success`.
    pub effects_fired: bool,
    /// The last confirmation payload, kept for audit and never interpreted.
    pub raw_gateway_payload: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set once, on first entry into a terminal state. Never cleared.
    pub settled_at: Option<DateTime<Utc>>,
}

//--------------------------------------  NewTransaction    ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub tx_ref: TxRef,
    pub amount: Money,
    pub currency: Currency,
    pub payment_type: PaymentType,
    pub related_entity_id: String,
}

impl NewTransaction {
    pub fn new(tx_ref: TxRef, amount: Money, currency: Currency, payment_type: PaymentType) -> Self {
        Self { tx_ref, amount, currency, payment_type, related_entity_id: String::new() }
    }

    pub fn for_entity(mut self, related_entity_id: impl Into<String>) -> Self {
        self.related_entity_id = related_entity_id.into();
        self
    }
}
