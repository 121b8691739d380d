use std::{fmt, sync::Arc};

use rand::seq::SliceRandom;

use crate::{DiscoveryError, Endpoint, EndpointMode, EndpointState, TxtResolver};

/// Well-known name whose TXT records list the published Core instances.
pub const DISCOVERY_NAME: &str = "_core.addr.chainpoint.org";

/// Selects the Core endpoint once at process start.
#[derive(Clone)]
pub struct EndpointResolver {
    state: EndpointState,
    dns: Arc<dyn TxtResolver>,
}

impl fmt::Debug for EndpointResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointResolver")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl EndpointResolver {
    pub fn new(state: EndpointState, dns: Arc<dyn TxtResolver>) -> Self {
        Self { state, dns }
    }

    /// Persists the endpoint to use and returns it.
    ///
    /// A static configuration commits its host directly. Otherwise one TXT
    /// lookup of [`DISCOVERY_NAME`] is made, the candidate set is persisted
    /// and one member is picked uniformly at random as current. The selection
    /// is never revisited for the lifetime of the process.
    pub async fn initialize(&self) -> Result<Endpoint, DiscoveryError> {
        let endpoint = match self.state.mode() {
            EndpointMode::Static { uri } => {
                let endpoint = Endpoint::from_uri(uri)
                    .ok_or_else(|| DiscoveryError::InvalidStaticUri(uri.clone()))?;
                self.state.set_current(&endpoint).await?;

                #[cfg(feature = "tracing")]
                tracing::info!(core_uri = %uri, "core endpoint in effect");

                endpoint
            }
            EndpointMode::DiscoverViaDns => {
                let records = self
                    .dns
                    .resolve_txt(DISCOVERY_NAME)
                    .await
                    .map_err(DiscoveryError::DnsQuery)?;
                let candidates = first_segments(records);
                if candidates.is_empty() {
                    return Err(DiscoveryError::NoEndpoints);
                }

                self.state
                    .set_candidates(&candidates)
                    .await
                    .map_err(DiscoveryError::PersistCandidates)?;

                let endpoint = candidates
                    .choose(&mut rand::thread_rng())
                    .cloned()
                    .ok_or(DiscoveryError::NoEndpoints)?;
                self.state.set_current(&endpoint).await?;

                #[cfg(feature = "tracing")]
                tracing::info!(
                    core_host = %endpoint,
                    candidates = candidates.len(),
                    "core endpoint in effect"
                );

                endpoint
            }
        };
        Ok(endpoint)
    }
}

/// Flattens TXT records to their first segment, unchanged. Records with no
/// segments, or an empty first one, are skipped.
fn first_segments(records: Vec<Vec<String>>) -> Vec<Endpoint> {
    records
        .into_iter()
        .filter_map(|segments| segments.into_iter().next())
        .filter(|host| !host.is_empty())
        .map(Endpoint::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::first_segments;
    use crate::Endpoint;

    #[test]
    fn keeps_only_first_segment_of_each_record() {
        let records = vec![
            vec!["a.core.test".to_owned(), "ignored".to_owned()],
            vec!["b.core.test:8443".to_owned()],
        ];
        assert_eq!(
            first_segments(records),
            vec![Endpoint::new("a.core.test"), Endpoint::new("b.core.test:8443")]
        );
    }

    #[test]
    fn skips_records_without_segments() {
        let records = vec![vec![], vec![String::new()], vec!["c.core.test".to_owned()]];
        assert_eq!(first_segments(records), vec![Endpoint::new("c.core.test")]);
    }

    #[test]
    fn first_segment_is_kept_verbatim() {
        let records = vec![vec![" a.core.test ".to_owned()], vec!["B.Core.Test".to_owned()]];
        assert_eq!(
            first_segments(records),
            vec![Endpoint::new(" a.core.test "), Endpoint::new("B.Core.Test")]
        );
    }
}
