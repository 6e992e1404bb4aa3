//! Transaction request payload.
//!
//! Assembled by the terminal when it enters a transaction-request state and
//! handed to the transport for delivery to the host. Conditional fields are
//! simply absent when the state's send flags leave them out.

use serde::{Deserialize, Serialize};

/// A transaction request, serialized as
/// `{"messageId": "TransactionRequest", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    #[serde(rename = "messageId")]
    pub message_id: String,

    pub data: TransactionRequestData,
}

/// The `data` object of a transaction request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransactionRequestData {
    pub luno: String,

    pub top_of_receipt: String,

    /// One ASCII character in `'1'..='~'` pairing this request with its reply.
    pub message_coordination_number: String,

    /// First eight numeric characters of the wall-clock ISO timestamp.
    pub time_variant_number: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track2: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,

    /// Encrypted PIN block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin_buffer: Option<String>,

    #[serde(rename = "buffer_B", default, skip_serializing_if = "Option::is_none")]
    pub buffer_b: Option<String>,

    #[serde(rename = "buffer_C", default, skip_serializing_if = "Option::is_none")]
    pub buffer_c: Option<String>,
}

impl TransactionRequest {
    /// Wrap an assembled data object in the wire envelope.
    #[must_use]
    pub fn new(data: TransactionRequestData) -> Self {
        TransactionRequest {
            message_id: "TransactionRequest".to_string(),
            data,
        }
    }
}
