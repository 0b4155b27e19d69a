use hickory_proto::rr::{Name, Record};

use crate::error::ResolveError;
use crate::rr::RecordKind;

use super::{Resolver, key_for};

impl Resolver {
    /// Find the SOA record of the zone closest enclosing `name`, whose
    /// case-folded `labels` build the keys.
    ///
    /// Candidates are `name` itself and then each shorter suffix, stopping
    /// before the root. The record is named after the apex it was found at.
    /// When the closest SOA holds only malformed values the walk stops there
    /// and no authority is returned.
    #[tracing::instrument("authority", skip(self, labels), fields(%name), level = "debug")]
    pub(super) async fn find_authority(
        &self,
        name: &Name,
        labels: &[String],
    ) -> Result<Option<Record>, ResolveError> {
        let suffix = RecordKind::SOA.key_suffix();
        let mut apex = name.to_lowercase();

        for start in 0..labels.len() {
            let key = key_for(&labels[start..], &suffix);
            if let Some(values) = self.fetch(&key).await? {
                for value in values.values() {
                    match RecordKind::SOA.synthesize(&apex, value, self.config.ttl) {
                        Ok(record) => {
                            tracing::debug!("found authority at {apex}");
                            return Ok(Some(record));
                        }
                        Err(error) => tracing::warn!("skipping authority record: {error}"),
                    }
                }
                return Ok(None);
            }
            apex = apex.base_name();
        }

        tracing::debug!("no authority");
        Ok(None)
    }
}
