//! Serializable description of a built job.
//!
//! The spec captures everything an embedding host needs to audit a job:
//! its name, backend, declared inputs, and the printed graph. The digest
//! is computed over the raw fields, not the JSON encoding, so formatting
//! changes in serde output never shift it.

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct InputSpec {
    pub name: String,
    pub dtype: String,
    pub shape: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub name: String,
    pub backend: String,
    pub inputs: Vec<InputSpec>,
    pub graph: String,
}

impl JobSpec {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Hex-encoded SHA-256 over the spec fields.
    ///
    /// Field boundaries are marked with NUL bytes and shape dims are
    /// fixed-width, so distinct specs cannot collide by concatenation.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.backend.as_bytes());
        hasher.update([0u8]);
        for input in &self.inputs {
            hasher.update(input.name.as_bytes());
            hasher.update([0u8]);
            hasher.update(input.dtype.as_bytes());
            hasher.update([0u8]);
            for dim in &input.shape {
                hasher.update((*dim as u64).to_le_bytes());
            }
            hasher.update([0u8]);
        }
        hasher.update(self.graph.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> JobSpec {
        JobSpec {
            name: "add_job".to_string(),
            backend: "compiled".to_string(),
            inputs: vec![
                InputSpec {
                    name: "x".to_string(),
                    dtype: "f32".to_string(),
                    shape: vec![2, 10, 2],
                },
                InputSpec {
                    name: "y".to_string(),
                    dtype: "f32".to_string(),
                    shape: vec![2, 10, 2],
                },
            ],
            graph: "graph {\n  %0 = input 0\n}\n".to_string(),
        }
    }

    #[test]
    fn json_round_trip() {
        let spec = sample();
        let text = spec.to_json().unwrap();
        let parsed = JobSpec::from_json(&text).unwrap();
        assert_eq!(parsed, spec);
    }

    #[test]
    fn digest_is_stable_and_field_sensitive() {
        let spec = sample();
        assert_eq!(spec.digest(), spec.digest());
        assert_eq!(spec.digest().len(), 64);

        let mut other = sample();
        other.backend = "reference".to_string();
        assert_ne!(spec.digest(), other.digest());

        let mut other = sample();
        other.inputs[0].shape = vec![2, 10, 3];
        assert_ne!(spec.digest(), other.digest());
    }
}
