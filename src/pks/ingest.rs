//! Key ingestion

use hyper::StatusCode;

use super::{now_micros, PksHandler, LABEL_INVALID_ARMOR, LABEL_MISSING_KEYTEXT};
use crate::error::{PksError, Result};
use crate::metrics::{ADD_ERRORS, ADD_REQUEST_ERRORS};
use crate::rowkey::encode_row_key;
use crate::store::{
    Column, ConsistencyLevel, RowMutation, KEYDATA_COLUMN, KEYS_COLUMN_FAMILY,
};

impl PksHandler {
    /// Store every key in an armored block
    ///
    /// Each key becomes its own row holding the full uploaded text, written
    /// in input order with one shared timestamp. The first store fault
    /// aborts the call: rows already written stay written and the rest are
    /// not attempted.
    pub fn add(&self, keytext: &str) -> Result<StatusCode> {
        if keytext.is_empty() {
            self.metrics
                .increment_labeled(ADD_REQUEST_ERRORS, LABEL_MISSING_KEYTEXT, 1);
            return Err(PksError::EmptyKeyText);
        }

        let entities = match self.parser.parse(keytext) {
            Ok(entities) if !entities.is_empty() => entities,
            Ok(_) => {
                self.metrics
                    .increment_labeled(ADD_REQUEST_ERRORS, LABEL_INVALID_ARMOR, 1);
                return Err(PksError::InvalidArmor("no keys found".to_string()));
            }
            Err(e) => {
                tracing::debug!("Rejecting upload: {}", e);
                self.metrics
                    .increment_labeled(ADD_REQUEST_ERRORS, LABEL_INVALID_ARMOR, 1);
                return Err(e);
            }
        };

        let timestamp = now_micros();
        for entity in &entities {
            let mutation = RowMutation {
                row_key: encode_row_key(&entity.fingerprint),
                column_family: KEYS_COLUMN_FAMILY.to_string(),
                columns: vec![Column {
                    name: KEYDATA_COLUMN.to_vec(),
                    value: keytext.as_bytes().to_vec(),
                    timestamp,
                }],
            };

            if let Err(fault) = self
                .store
                .batch_mutate(std::slice::from_ref(&mutation), ConsistencyLevel::One)
            {
                tracing::error!("Storing key {} failed: {}", entity.fingerprint, fault);
                self.metrics.increment_labeled(ADD_ERRORS, fault.label(), 1);
                return Err(fault.into());
            }

            tracing::debug!("Stored key {}", entity.fingerprint);
        }

        tracing::info!("Added {} key(s)", entities.len());
        Ok(StatusCode::CREATED)
    }
}
