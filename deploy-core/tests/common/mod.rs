//! Shared test doubles for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use deploy_core::executor::{CapabilityError, DeployCapability};
use deploy_core::state::MemoryStateStore;
use deploy_core::{ConstructorArg, DeployError, DeploymentRecord, StateStore};
use std::collections::HashMap;
use std::sync::Mutex;

/// Hands out sequential addresses and remembers every call it receives.
///
/// Failures can be scripted per artifact; each scripted error is returned
/// once, in order, before the artifact starts succeeding.
#[derive(Default)]
pub struct RecordingCapability {
    calls: Mutex<Vec<(String, Vec<ConstructorArg>)>>,
    failures: Mutex<HashMap<String, Vec<CapabilityError>>>,
    always_fail: Mutex<HashMap<String, CapabilityError>>,
    address_override: Option<String>,
}

impl RecordingCapability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next call for `artifact` with `error`.
    pub fn fail_once(self, artifact: &str, error: CapabilityError) -> Self {
        self.failures
            .lock()
            .unwrap()
            .entry(artifact.to_string())
            .or_default()
            .push(error);
        self
    }

    /// Fail every call for `artifact`.
    pub fn fail_always(self, artifact: &str, error: CapabilityError) -> Self {
        self.always_fail
            .lock()
            .unwrap()
            .insert(artifact.to_string(), error);
        self
    }

    /// Return this address for every deployment instead of a sequential one.
    pub fn returning(mut self, address: &str) -> Self {
        self.address_override = Some(address.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(String, Vec<ConstructorArg>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn deployed_names(&self) -> Vec<String> {
        self.calls().into_iter().map(|(name, _)| name).collect()
    }
}

#[async_trait]
impl DeployCapability for RecordingCapability {
    async fn deploy(
        &self,
        artifact: &str,
        args: &[ConstructorArg],
    ) -> Result<String, CapabilityError> {
        let sequence = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((artifact.to_string(), args.to_vec()));
            calls.len()
        };

        if let Some(error) = self.always_fail.lock().unwrap().get(artifact) {
            return Err(error.clone());
        }

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(queue) = failures.get_mut(artifact) {
                if !queue.is_empty() {
                    return Err(queue.remove(0));
                }
            }
        }

        Ok(self
            .address_override
            .clone()
            .unwrap_or_else(|| address(sequence)))
    }
}

/// A well-formed address derived from `n`.
pub fn address(n: usize) -> String {
    format!("0x{:040x}", n)
}

/// In-memory store whose writes for one artifact fail, as a full disk would.
pub struct FailingPutStore {
    inner: MemoryStateStore,
    fail_on: String,
}

impl FailingPutStore {
    pub fn new(fail_on: &str) -> Self {
        Self {
            inner: MemoryStateStore::new(),
            fail_on: fail_on.to_string(),
        }
    }
}

#[async_trait]
impl StateStore for FailingPutStore {
    async fn get(&self, name: &str) -> deploy_core::Result<Option<DeploymentRecord>> {
        self.inner.get(name).await
    }

    async fn put(&self, record: &DeploymentRecord) -> deploy_core::Result<()> {
        if record.name == self.fail_on {
            return Err(DeployError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.inner.put(record).await
    }

    async fn all(&self) -> deploy_core::Result<Vec<DeploymentRecord>> {
        self.inner.all().await
    }

    async fn history(&self, name: &str) -> deploy_core::Result<Vec<DeploymentRecord>> {
        self.inner.history(name).await
    }

    async fn acquire_lock(&self, run_id: &str) -> deploy_core::Result<()> {
        self.inner.acquire_lock(run_id).await
    }

    async fn release_lock(&self, run_id: &str) -> deploy_core::Result<()> {
        self.inner.release_lock(run_id).await
    }

    async fn break_lock(&self) -> deploy_core::Result<Option<String>> {
        self.inner.break_lock().await
    }
}
