//! Key lookup

use std::io::Write;

use super::{PksHandler, LABEL_INVALID_KEYID, LABEL_MISSING_SEARCH};
use crate::error::{PksError, Result};
use crate::metrics::{LOOKUP_ERRORS, LOOKUP_KEYS_FOUND};
use crate::rowkey::decode_lookup_range;
use crate::store::{ConsistencyLevel, KEYDATA_COLUMN, KEYS_COLUMN_FAMILY};

impl PksHandler {
    /// Write every stored block matching `key_id` to `sink`
    ///
    /// `key_id` is a full or partial hex fingerprint, optionally prefixed
    /// with `0x`. Blocks are written raw and back to back in row-key order.
    /// Returns the number of blocks written.
    pub fn get<W: Write>(&self, sink: &mut W, key_id: &str) -> Result<usize> {
        let range = match decode_lookup_range(key_id) {
            Ok(range) => range,
            Err(e) => {
                let label = match e {
                    PksError::EmptyKeyId => LABEL_MISSING_SEARCH,
                    _ => LABEL_INVALID_KEYID,
                };
                self.metrics.increment_labeled(LOOKUP_ERRORS, label, 1);
                return Err(e);
            }
        };

        let slices = match self.store.range_scan(
            KEYS_COLUMN_FAMILY,
            &[KEYDATA_COLUMN.to_vec()],
            &range,
            ConsistencyLevel::One,
        ) {
            Ok(slices) => slices,
            Err(fault) => {
                tracing::error!("Lookup of {} failed: {}", key_id, fault);
                self.metrics.increment_labeled(LOOKUP_ERRORS, fault.label(), 1);
                return Err(fault.into());
            }
        };

        self.metrics
            .increment_by(LOOKUP_KEYS_FOUND, slices.len() as u64);

        let mut written = 0;
        for slice in &slices {
            for column in &slice.columns {
                if column.name != KEYDATA_COLUMN {
                    tracing::warn!(
                        "Skipping unexpected column {:?} in row {}",
                        String::from_utf8_lossy(&column.name),
                        hex::encode_upper(&slice.row_key)
                    );
                    continue;
                }
                sink.write_all(&column.value)?;
                written += 1;
            }
        }

        tracing::debug!("Lookup of {} matched {} row(s)", key_id, slices.len());
        Ok(written)
    }
}
