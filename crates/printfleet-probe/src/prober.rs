// ── Adapter dispatch ──
//
// One entry point for every adapter. Each call opens its own socket or
// HTTP session, so probes share nothing and can run concurrently. Hard
// deadlines are the caller's business; the per-request timeouts here only
// bound individual round trips.

use tracing::debug;

use crate::adapter::AdapterKind;
use crate::error::Error;
use crate::findings::{Findings, ProbeFailure};
use crate::http::HttpSession;
use crate::snmp::{SnmpClient, SnmpConfig};
use crate::transport::TransportConfig;
use crate::{brother, ews, ledm, printer_mib};

/// Transport settings shared by every probe in a run.
#[derive(Debug, Clone, Default)]
pub struct ProbeOptions {
    pub http: TransportConfig,
    pub snmp: SnmpConfig,
}

/// Runs adapters against device addresses.
#[derive(Debug, Clone, Default)]
pub struct Prober {
    options: ProbeOptions,
}

impl Prober {
    pub fn new(options: ProbeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ProbeOptions {
        &self.options
    }

    /// Run one adapter against one address.
    pub async fn probe(&self, kind: AdapterKind, address: &str) -> Result<Findings, ProbeFailure> {
        let result = self.dispatch(kind, address).await;
        if let Err(e) = &result {
            debug!(adapter = %kind, address, error = %e, "probe failed");
        }
        result.map_err(ProbeFailure::from)
    }

    async fn dispatch(&self, kind: AdapterKind, address: &str) -> Result<Findings, Error> {
        match kind {
            AdapterKind::SnmpAlerts => {
                let mut client = SnmpClient::connect(address, &self.options.snmp).await?;
                Ok(Findings::Alerts(printer_mib::read_alerts(&mut client).await?))
            }
            AdapterKind::SnmpSupplies => {
                let mut client = SnmpClient::connect(address, &self.options.snmp).await?;
                Ok(Findings::Supplies(printer_mib::read_supplies(&mut client).await?))
            }
            AdapterKind::SnmpSupplyTypes => {
                let mut client = SnmpClient::connect(address, &self.options.snmp).await?;
                Ok(Findings::SupplyTypes(
                    printer_mib::read_supply_types(&mut client).await?,
                ))
            }
            AdapterKind::LedmAlerts => {
                let mut session = HttpSession::new(&self.options.http)?.with_accept(ledm::ACCEPT_XML);
                Ok(Findings::Alerts(ledm::read_alerts(&mut session, address).await?))
            }
            AdapterKind::EwsAlerts => {
                let mut session = HttpSession::new(&self.options.http)?;
                Ok(Findings::Alerts(ews::read_alerts(&mut session, address).await?))
            }
            AdapterKind::EwsSupplyTypes => {
                let mut session = HttpSession::new(&self.options.http)?;
                Ok(Findings::SupplyTypes(
                    ews::read_supply_types(&mut session, address).await?,
                ))
            }
            AdapterKind::BrotherSupplies => {
                let session = HttpSession::new(&self.options.http)?;
                Ok(Findings::Supplies(brother::read_supplies(session, address).await?))
            }
        }
    }
}
