use async_trait::async_trait;
use hickory_resolver::{
    config::{ResolverConfig, ResolverOpts},
    error::ResolveErrorKind,
    proto::op::ResponseCode,
    TokioAsyncResolver,
};

use crate::LookupError;

/// DNS TXT lookup boundary.
///
/// Each record is returned as its list of character-string segments.
/// A name that exists but publishes no TXT records resolves to an empty
/// list; a name that does not exist is an error.
#[async_trait]
pub trait TxtResolver: Send + Sync {
    async fn resolve_txt(&self, name: &str) -> Result<Vec<Vec<String>>, LookupError>;
}

/// [`TxtResolver`] backed by `hickory-resolver` on the tokio runtime.
#[derive(Clone)]
pub struct HickoryTxtResolver {
    inner: TokioAsyncResolver,
}

impl HickoryTxtResolver {
    pub fn new(inner: TokioAsyncResolver) -> Self {
        Self { inner }
    }

    /// Uses the host's resolver configuration (`/etc/resolv.conf` on unix).
    pub fn from_system_conf() -> Result<Self, LookupError> {
        TokioAsyncResolver::tokio_from_system_conf()
            .map(Self::new)
            .map_err(|err| LookupError(err.to_string()))
    }

    /// Uses hickory's built-in upstream configuration.
    pub fn with_defaults() -> Self {
        Self::new(TokioAsyncResolver::tokio(
            ResolverConfig::default(),
            ResolverOpts::default(),
        ))
    }

    /// Uses the host's resolver configuration, falling back to hickory's
    /// built-in upstreams only when that configuration cannot be read.
    pub fn system_or_defaults() -> Self {
        match Self::from_system_conf() {
            Ok(resolver) => resolver,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    error = %_err,
                    "could not read system resolver configuration; using built-in upstreams"
                );
                Self::with_defaults()
            }
        }
    }
}

#[async_trait]
impl TxtResolver for HickoryTxtResolver {
    async fn resolve_txt(&self, name: &str) -> Result<Vec<Vec<String>>, LookupError> {
        let lookup = match self.inner.txt_lookup(name).await {
            Ok(lookup) => lookup,
            Err(err) if is_empty_answer(err.kind()) => return Ok(Vec::new()),
            Err(err) => return Err(LookupError(err.to_string())),
        };

        Ok(lookup
            .iter()
            .map(|txt| {
                txt.txt_data()
                    .iter()
                    .map(|segment| String::from_utf8_lossy(segment).into_owned())
                    .collect()
            })
            .collect())
    }
}

/// NOERROR with no TXT data is a successful empty answer. NXDOMAIN and
/// every other failure stay errors.
fn is_empty_answer(kind: &ResolveErrorKind) -> bool {
    match kind {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => {
            is_no_error(*response_code)
        }
        _ => false,
    }
}

fn is_no_error(code: ResponseCode) -> bool {
    code == ResponseCode::NoError
}

#[cfg(test)]
mod tests {
    use hickory_resolver::{error::ResolveErrorKind, proto::op::ResponseCode};

    use super::{is_empty_answer, is_no_error, HickoryTxtResolver};

    #[test]
    fn only_noerror_counts_as_empty_answer() {
        assert!(is_no_error(ResponseCode::NoError));
        assert!(!is_no_error(ResponseCode::NXDomain));
        assert!(!is_no_error(ResponseCode::ServFail));
        assert!(!is_no_error(ResponseCode::Refused));
    }

    #[test]
    fn other_resolver_failures_are_not_empty_answers() {
        assert!(!is_empty_answer(&ResolveErrorKind::Message("timed out")));
        assert!(!is_empty_answer(&ResolveErrorKind::Msg(
            "connection refused".to_owned()
        )));
    }

    #[tokio::test]
    async fn system_or_defaults_always_builds_a_resolver() {
        let _resolver = HickoryTxtResolver::system_or_defaults();
    }
}
