//! Error types for batch compilation, decoding, and transport seams.

use std::error::Error;

use thiserror::Error;

/// Primary error type for compiling and decoding remote calls.
#[derive(Debug, Error)]
pub enum RpcError {
    /// A ratio group index fell outside the supported range.
    #[error("ratio group index out of range")]
    RatioGroupOutOfRange {
        /// One-based index supplied by the caller.
        index: i64,
    },
    /// A ratio group selector could not be interpreted.
    #[error("invalid ratio group")]
    InvalidRatioGroup {
        /// Raw selector payload.
        value: String,
    },
    /// A field group declared the same field twice.
    #[error("duplicate field in group")]
    DuplicateField {
        /// Group that contained the duplicate.
        group: &'static str,
        /// Field name declared more than once.
        field: &'static str,
    },
    /// A response element carried a fault indicator.
    #[error("remote call reported a fault")]
    Fault {
        /// Position of the faulting element within the batch.
        index: usize,
        /// Logical field name of the faulting descriptor.
        key: String,
        /// Remote fault code.
        code: i64,
        /// Remote fault message.
        message: String,
    },
    /// The response did not carry one element per descriptor.
    #[error("response length does not match request")]
    ResponseLength {
        /// Number of descriptors issued.
        expected: usize,
        /// Number of response elements received.
        actual: usize,
    },
    /// The descriptors could not be split evenly across the requested entities.
    #[error("batch shape does not match entity count")]
    BatchShape {
        /// Number of per-entity descriptors in the batch.
        descriptors: usize,
        /// Number of entities the caller asked for.
        entities: usize,
    },
    /// A batched row was not an array of field values.
    #[error("malformed batched row")]
    MalformedRow {
        /// Descriptor key that produced the row.
        key: String,
        /// Row position within the nested response.
        row: usize,
    },
    /// A payload ceiling above the hard maximum was requested.
    #[error("payload size limit exceeded")]
    ResourceLimit {
        /// Requested ceiling in bytes.
        requested: u64,
        /// Hard maximum in bytes.
        maximum: u64,
    },
    /// The transport failed to deliver the batch.
    #[error("transport failure")]
    Transport(#[from] TransportError),
}

/// Errors raised by transport implementations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be delivered or the reply could not be read.
    #[error("transport request failed")]
    Request {
        /// Remote method being invoked.
        method: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The endpoint answered with a non-success status.
    #[error("unexpected HTTP status")]
    Status {
        /// Remote method being invoked.
        method: String,
        /// HTTP status code.
        status: u16,
    },
    /// The remote side answered with a top-level fault.
    #[error("remote fault")]
    Fault {
        /// Remote fault code.
        code: i64,
        /// Remote fault message.
        message: String,
    },
    /// The encoded request exceeded the configured payload ceiling.
    #[error("request payload exceeds size ceiling")]
    PayloadTooLarge {
        /// Encoded request size in bytes.
        size: usize,
        /// Configured ceiling in bytes.
        limit: usize,
    },
    /// The endpoint URL cannot be used as given.
    #[error("invalid transport endpoint")]
    InvalidEndpoint {
        /// Static description of the problem.
        reason: &'static str,
    },
    /// The reply did not have the shape the caller expected.
    #[error("unexpected response shape")]
    UnexpectedResponse {
        /// Remote method being invoked.
        method: String,
        /// Static description of the mismatch.
        reason: &'static str,
    },
}

/// Convenience alias for compile/decode results.
pub type RpcResult<T> = Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn messages_stay_constant_and_sources_chain() {
        let transport = TransportError::Request {
            method: "system.multicall".to_string(),
            source: Box::new(io::Error::other("connection reset")),
        };
        assert_eq!(transport.to_string(), "transport request failed");
        assert_eq!(
            transport.source().map(ToString::to_string).as_deref(),
            Some("connection reset")
        );

        let wrapped = RpcError::from(transport);
        assert_eq!(wrapped.to_string(), "transport failure");
        assert!(wrapped.source().is_some());

        let range = RpcError::RatioGroupOutOfRange { index: 9 };
        assert_eq!(range.to_string(), "ratio group index out of range");
        assert!(range.source().is_none());

        let endpoint = TransportError::InvalidEndpoint {
            reason: "credentials cannot be removed from the endpoint",
        };
        assert_eq!(endpoint.to_string(), "invalid transport endpoint");
    }
}
