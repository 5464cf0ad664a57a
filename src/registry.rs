//! Closed lookup table from instrument type to raw shape, canonical shape and
//! transform.

use std::collections::HashMap;

use crate::error::PipelineError;
use crate::models::{CanonicalShape, InstrumentType, RawShape};
use crate::transform::{banking, brokerage, TransformFn};

#[derive(Clone, Copy)]
pub struct InstrumentSchema {
    pub instrument: InstrumentType,
    pub raw_shape: RawShape,
    pub canonical: CanonicalShape,
    pub transform: TransformFn,
}

impl std::fmt::Debug for InstrumentSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentSchema")
            .field("instrument", &self.instrument)
            .field("raw_shape", &self.raw_shape)
            .field("canonical", &self.canonical)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<InstrumentType, InstrumentSchema>,
}

impl SchemaRegistry {
    /// Registry of every supported instrument. Built once at startup.
    pub fn builtin() -> Self {
        let schemas = InstrumentType::ALL
            .into_iter()
            .map(|instrument| {
                let schema = InstrumentSchema {
                    instrument,
                    raw_shape: RawShape::for_instrument(instrument),
                    canonical: CanonicalShape::for_account_type(instrument.account_type()),
                    transform: transform_for(instrument),
                };
                (instrument, schema)
            })
            .collect();
        Self { schemas }
    }

    pub fn get(&self, instrument: InstrumentType) -> Option<&InstrumentSchema> {
        self.schemas.get(&instrument)
    }

    /// Resolve an instrument name as it appears in upload metadata.
    pub fn resolve(&self, name: &str) -> Result<&InstrumentSchema, PipelineError> {
        let instrument: InstrumentType = name
            .parse()
            .map_err(|_| PipelineError::UnknownInstrumentType(name.to_string()))?;
        self.get(instrument)
            .ok_or_else(|| PipelineError::UnknownInstrumentType(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn transform_for(instrument: InstrumentType) -> TransformFn {
    match RawShape::for_instrument(instrument) {
        RawShape::ChaseCredit => banking::chase_credit,
        RawShape::Discover => banking::discover,
        RawShape::Uccu => banking::uccu,
        RawShape::Usaa => banking::usaa,
        RawShape::RobinhoodCrypto => brokerage::robinhood_crypto,
        RawShape::RobinhoodBrokerage => brokerage::robinhood_brokerage,
    }
}
