use crate::{
    claims::ResolvedBinding,
    config::SyncConfig,
    records::{
        Batch,
        ExistingRecord,
        PendingChange,
    },
};
use std::{
    collections::HashMap,
    num::NonZeroUsize,
};

/// Works out which ownership records are missing from the zone and splits them into batches.
#[derive(Clone, Debug)]
pub struct RecordPlanner {
    prefix: String,
    owner: String,
    batch_size: NonZeroUsize,
}

impl RecordPlanner {
    pub fn new(prefix: impl Into<String>, owner: impl Into<String>, batch_size: NonZeroUsize) -> Self {
        Self {
            prefix: prefix.into(),
            owner: owner.into(),
            batch_size,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.record_prefix.clone(), config.owner.clone(), config.batch_size)
    }

    pub fn record_name(&self, binding: &ResolvedBinding) -> String {
        format!("{}{}.", self.prefix, binding.hostname)
    }

    pub fn ownership_value(&self, binding: &ResolvedBinding) -> String {
        format!(
            "\"heritage=external-dns,external-dns/owner={},external-dns/resource=ingress/{}/{}\"",
            self.owner, binding.namespace, binding.owner_id
        )
    }

    /// Returns the batches to apply, empty if the zone already has a record for every binding.
    ///
    /// A record is considered present as soon as its name exists, whatever its type or content.
    pub fn plan(&self, bindings: &[ResolvedBinding], existing: &HashMap<String, ExistingRecord>) -> Vec<Batch> {
        let changes: Vec<PendingChange> = bindings
            .iter()
            .filter_map(|binding| {
                let name = self.record_name(binding);
                if let Some(record) = existing.get(&name) {
                    debug!(
                        "record {name:?} already exists as {} with values: {:?}",
                        record.record_type, record.values
                    );
                    return None;
                }
                Some(PendingChange::create_txt(name, self.ownership_value(binding)))
            })
            .collect();

        changes
            .chunks(self.batch_size.get())
            .map(|chunk| Batch::from(chunk.to_vec()))
            .collect()
    }
}
