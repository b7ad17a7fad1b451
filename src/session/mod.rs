// Copyright 2025 STARGA Inc.
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at:
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Part of the MIND project (Machine Intelligence Native Design).

//! Session-scoped job registry.
//!
//! A session tracks jobs by name so repeated builds of the same name are
//! rejected instead of silently shadowed. Resetting a session clears the
//! registry and bumps its generation counter; tensors and already-built
//! [`Job`](crate::job::Job) handles stay valid because they own their
//! graph and plan.
//!
//! Most callers go through the process-wide default session, mirroring
//! how embedding hosts drive the runtime. Library users that need
//! isolation can hold a [`Session`] of their own.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;
use thiserror::Error;
use tracing::debug;

use crate::exec::BackendKind;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("job '{name}' already exists in this session; reset the session before rebuilding it")]
    DuplicateJob { name: String },
}

/// Registry entry for a built job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub id: u64,
    pub name: String,
    pub digest: String,
    pub backend: BackendKind,
}

/// An isolated job registry.
#[derive(Debug, Default)]
pub struct Session {
    jobs: BTreeMap<String, JobRecord>,
    next_job_id: u64,
    generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a built job under `name`. Fails if the name is taken.
    pub fn register_job(
        &mut self,
        name: &str,
        digest: &str,
        backend: BackendKind,
    ) -> Result<u64, SessionError> {
        if self.jobs.contains_key(name) {
            return Err(SessionError::DuplicateJob {
                name: name.to_string(),
            });
        }
        let id = self.next_job_id;
        self.next_job_id += 1;
        self.jobs.insert(
            name.to_string(),
            JobRecord {
                id,
                name: name.to_string(),
                digest: digest.to_string(),
                backend,
            },
        );
        Ok(id)
    }

    pub fn job(&self, name: &str) -> Option<&JobRecord> {
        self.jobs.get(name)
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// How many times this session has been reset.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Clear the registry. Job ids stay monotonic across resets so stale
    /// ids can never collide with fresh ones.
    pub fn reset(&mut self) {
        self.jobs.clear();
        self.generation += 1;
    }
}

static DEFAULT_SESSION: Lazy<Mutex<Session>> = Lazy::new(|| Mutex::new(Session::new()));

/// Run `f` against the process-wide default session.
///
/// A panic while the lock is held poisons the mutex; the registry is
/// plain data, so the poisoned state is still usable and we recover it.
pub fn with_default_session<T>(f: impl FnOnce(&mut Session) -> T) -> T {
    let mut session = DEFAULT_SESSION
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    f(&mut session)
}

/// Reset the process-wide default session.
pub fn reset_default_session() {
    with_default_session(|session| {
        session.reset();
        debug!(generation = session.generation(), "default session reset");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let mut session = Session::new();
        let id = session
            .register_job("job_a", "deadbeef", BackendKind::Reference)
            .unwrap();
        assert_eq!(id, 0);
        assert_eq!(session.job_count(), 1);
        let record = session.job("job_a").unwrap();
        assert_eq!(record.digest, "deadbeef");
        assert_eq!(record.backend, BackendKind::Reference);
        assert!(session.job("job_b").is_none());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut session = Session::new();
        session
            .register_job("job_a", "d1", BackendKind::Reference)
            .unwrap();
        let err = session
            .register_job("job_a", "d2", BackendKind::Compiled)
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::DuplicateJob {
                name: "job_a".to_string()
            }
        );
    }

    #[test]
    fn reset_clears_jobs_and_bumps_generation() {
        let mut session = Session::new();
        session
            .register_job("job_a", "d1", BackendKind::Compiled)
            .unwrap();
        assert_eq!(session.generation(), 0);
        session.reset();
        assert_eq!(session.job_count(), 0);
        assert_eq!(session.generation(), 1);
        // Ids keep counting up after a reset.
        let id = session
            .register_job("job_a", "d1", BackendKind::Compiled)
            .unwrap();
        assert_eq!(id, 1);
    }
}
