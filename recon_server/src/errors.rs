use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use chapa_tools::ChapaApiError;
use recon_engine::{ReconciliationError, RefundError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("A transaction already exists for this reference. {0}")]
    DuplicateRequest(String),
    #[error("The payment processor could not be reached. {0}")]
    GatewayUnavailable(String),
    #[error("The refund was not accepted by the payment processor. {0}")]
    RefundFailed(String),
    #[error("The transaction cannot be refunded. {0}")]
    NotRefundable(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::NotRefundable(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateRequest(_) => StatusCode::CONFLICT,
            Self::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::RefundFailed(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<ReconciliationError> for ServerError {
    fn from(e: ReconciliationError) -> Self {
        match e {
            ReconciliationError::UnknownTransaction(tx_ref) => Self::NoRecordFound(format!("tx_ref [{tx_ref}]")),
            ReconciliationError::StoreError(e) => e.into(),
        }
    }
}

impl From<RefundError> for ServerError {
    fn from(e: RefundError) -> Self {
        match e {
            RefundError::TransactionNotFound(id) => Self::NoRecordFound(format!("transaction #{id}")),
            RefundError::NotRefundable { .. } => Self::NotRefundable(e.to_string()),
            RefundError::StoreError(e) => e.into(),
        }
    }
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateRequest(tx_ref) => Self::DuplicateRequest(format!("tx_ref [{tx_ref}]")),
            StoreError::TransactionNotFound(tx_ref) => Self::NoRecordFound(format!("tx_ref [{tx_ref}]")),
            e => Self::BackendError(e.to_string()),
        }
    }
}

impl From<ChapaApiError> for ServerError {
    fn from(e: ChapaApiError) -> Self {
        Self::GatewayUnavailable(e.to_string())
    }
}
