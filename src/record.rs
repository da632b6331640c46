//! The minimal persisted form of one insertion.

use crate::errors::ProbeError;
use crate::float_types::Real;
use crate::insertion::ProbeInsertion;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertionRecord {
    pub ap: Real,
    pub ml: Real,
    pub dv: Real,
    pub phi: Real,
    pub theta: Real,
    pub spin: Real,
    /// Stable [`ProbeKind`](crate::probe_kind::ProbeKind) id.
    pub probe: i32,
    /// Name of the transform `ap/ml/dv` are expressed in.
    pub transform: String,
}

impl InsertionRecord {
    pub fn apmldv(&self) -> Vector3<Real> {
        Vector3::new(self.ap, self.ml, self.dv)
    }

    pub fn angles(&self) -> Vector3<Real> {
        Vector3::new(self.phi, self.theta, self.spin)
    }

    pub fn to_json(&self) -> Result<String, ProbeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ProbeError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<&ProbeInsertion> for InsertionRecord {
    fn from(insertion: &ProbeInsertion) -> Self {
        Self {
            ap: insertion.ap,
            ml: insertion.ml,
            dv: insertion.dv,
            phi: insertion.phi,
            theta: insertion.theta(),
            spin: insertion.spin,
            probe: insertion.kind().id(),
            transform: insertion.transform().name().to_string(),
        }
    }
}
