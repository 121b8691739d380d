use crate::{RequestError, TransportError};

/// Decision for one failed attempt.
#[derive(Debug)]
pub enum Verdict {
    /// Transient failure; eligible for another attempt.
    Retry(TransportError),
    /// Structurally bad request; stop and surface this error.
    Abort(RequestError),
}

/// Classifies a failed attempt as retryable or terminal.
///
/// No response at all and any status `>= 500` are retryable. Every other
/// status (409 Conflict, 400 Bad Request, ...) will never succeed on replay,
/// and neither will a request the transport could not build.
pub fn classify(error: TransportError) -> Verdict {
    match error {
        TransportError::NoResponse(_) => Verdict::Retry(error),
        TransportError::Status { status, .. } if status >= 500 => Verdict::Retry(error),
        TransportError::Status { status, body } => {
            Verdict::Abort(RequestError::Rejected { status, body })
        }
        TransportError::Invalid(reason) => Verdict::Abort(RequestError::InvalidRequest(reason)),
    }
}

/// Label used in retry log lines.
#[cfg_attr(not(feature = "tracing"), allow(dead_code))]
pub(crate) fn retry_label(error: &TransportError) -> String {
    match error.status() {
        Some(status) => status.to_string(),
        None => "no response".to_owned(),
    }
}
