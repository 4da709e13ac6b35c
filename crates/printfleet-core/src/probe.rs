// ── Probe seam ──
//
// The orchestrator only needs "run this adapter against this address".
// `Prober` is the real implementation; tests substitute scripted ones.

use std::future::Future;

use printfleet_probe::{AdapterKind, Findings, ProbeFailure, Prober};

/// Anything that can run an adapter against an address.
pub trait Probe: Send + Sync {
    fn probe(
        &self,
        adapter: AdapterKind,
        address: &str,
    ) -> impl Future<Output = Result<Findings, ProbeFailure>> + Send;
}

impl Probe for Prober {
    fn probe(
        &self,
        adapter: AdapterKind,
        address: &str,
    ) -> impl Future<Output = Result<Findings, ProbeFailure>> + Send {
        Prober::probe(self, adapter, address)
    }
}
