//! Host promises described in TOML.
//!
//! `collector run` has no embedding application to create promises, so it
//! reads them from a fixture:
//!
//! ```toml
//! [[promise]]
//! id = 7
//! resolve = "ok"
//!
//! [[promise]]
//! id = 9
//! reject = { code = 500, message = "boom" }
//! delay_ms = 25
//! ```

use anyhow::{Context, Result};
use collector_bridge::{HostPromise, PromiseBridge};
use collector_core::PromiseId;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

/// A set of host promises.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromiseFixture {
    /// Promises in file order
    #[serde(default, rename = "promise")]
    pub promises: Vec<PromiseSpec>,
}

/// One promise: its id and how it settles.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromiseSpec {
    /// Id the guest passes to `startAwaiting`
    pub id: u32,
    /// Fulfillment value
    pub resolve: Option<Value>,
    /// Rejection reason
    pub reject: Option<Value>,
    /// Delay before settling, in milliseconds
    #[serde(default)]
    pub delay_ms: u64,
}

impl PromiseSpec {
    fn outcome(&self) -> Result<Result<Value, Value>> {
        match (&self.resolve, &self.reject) {
            (Some(value), None) => Ok(Ok(value.clone())),
            (None, Some(reason)) => Ok(Err(reason.clone())),
            (Some(_), Some(_)) => {
                anyhow::bail!("promise {} sets both resolve and reject", self.id)
            }
            (None, None) => anyhow::bail!("promise {} sets neither resolve nor reject", self.id),
        }
    }
}

impl PromiseFixture {
    /// Parses fixture text.
    pub fn parse(text: &str) -> Result<Self> {
        let fixture: Self = toml::from_str(text).context("failed to parse promise fixture")?;
        for spec in &fixture.promises {
            spec.outcome()?;
        }
        Ok(fixture)
    }

    /// Reads and parses a fixture file.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read promise fixture {}", path.display()))?;
        Self::parse(&text)
    }

    /// Registers every promise in a fresh bridge.
    ///
    /// Each promise settles `delay_ms` after the guest starts awaiting it.
    pub fn into_bridge<G>(self) -> Result<PromiseBridge<G>> {
        let mut bridge = PromiseBridge::new();
        for spec in self.promises {
            let outcome = spec.outcome()?;
            let delay = Duration::from_millis(spec.delay_ms);
            let promise = HostPromise::new(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                outcome
            });
            bridge
                .insert_promise(PromiseId::new(spec.id), promise)
                .with_context(|| format!("invalid promise {} in fixture", spec.id))?;
        }
        Ok(bridge)
    }
}
