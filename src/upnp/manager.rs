//! UPnP port mapping lifecycle for async callers
//!
//! `Gateway` is blocking. `UpnpMappingManager` runs its calls on tokio's
//! blocking pool, remembers the active mapping and removes it again on
//! `stop` or, best effort, on drop.

use super::gateway::Gateway;
use super::transport::{HttpTransport, ReqwestTransport};
use super::types::{IpProtocol, PortMappingRequest};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Mapping created by [`UpnpMappingManager::start`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedPort {
    /// External port on the gateway
    pub external_port: u16,
    /// Transport protocol
    pub protocol: IpProtocol,
    /// External IP reported right after mapping, if the gateway told us
    pub external_ip: Option<String>,
    /// When the mapping was created
    pub created_at: DateTime<Utc>,
}

/// UPnP port mapping manager with automatic cleanup
pub struct UpnpMappingManager<T: HttpTransport + 'static = ReqwestTransport> {
    gateway: Arc<Gateway<T>>,
    port: u16,
    protocol: IpProtocol,
    description: String,
    current_mapping: Arc<Mutex<Option<MappedPort>>>,
}

impl<T: HttpTransport + 'static> UpnpMappingManager<T> {
    /// Create a manager for `port` on `gateway`
    pub fn new(
        gateway: Arc<Gateway<T>>,
        port: u16,
        protocol: IpProtocol,
        description: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            port,
            protocol,
            description: description.into(),
            current_mapping: Arc::new(Mutex::new(None)),
        }
    }

    /// Create the mapping with the given lease (0 = permanent)
    pub async fn start(&self, lease_secs: u32) -> Result<MappedPort> {
        info!(
            "Starting UPnP mapping manager for {} port {} (lease: {}s)",
            self.protocol, self.port, lease_secs
        );

        let gateway = self.gateway.clone();
        let request = PortMappingRequest::new(
            self.port,
            self.protocol,
            gateway.local_address(),
            self.description.clone(),
        )
        .with_lease_duration(lease_secs);

        let external_ip = tokio::task::spawn_blocking(move || {
            gateway.add_port_mapping(&request)?;
            Ok::<_, Error>(gateway.external_ip())
        })
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;

        let mapping = MappedPort {
            external_port: self.port,
            protocol: self.protocol,
            external_ip,
            created_at: Utc::now(),
        };

        info!(
            "UPnP mapping active: {:?}:{} ({})",
            mapping.external_ip, mapping.external_port, mapping.protocol
        );

        *self.current_mapping.lock().await = Some(mapping.clone());

        Ok(mapping)
    }

    /// Delete the mapping
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping UPnP mapping manager for {} port {}", self.protocol, self.port);

        let gateway = self.gateway.clone();
        let (port, protocol) = (self.port, self.protocol);

        tokio::task::spawn_blocking(move || gateway.delete_port_mapping(port, protocol))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;

        *self.current_mapping.lock().await = None;

        Ok(())
    }

    /// Get the current mapping (if any)
    pub async fn current_mapping(&self) -> Option<MappedPort> {
        self.current_mapping.lock().await.clone()
    }

    #[cfg(test)]
    pub(crate) fn mapping_slot(&self) -> Arc<Mutex<Option<MappedPort>>> {
        self.current_mapping.clone()
    }
}

impl<T: HttpTransport + 'static> Drop for UpnpMappingManager<T> {
    fn drop(&mut self) {
        let active = match self.current_mapping.try_lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => {
                debug!(
                    "UPnP mapping state locked during drop, skipping cleanup of {} port {}",
                    self.protocol, self.port
                );
                None
            }
        };

        let Some(mapping) = active else {
            return;
        };

        // Gateway calls block, so stay off the async runtime's threads
        let gateway = self.gateway.clone();
        std::thread::spawn(move || {
            match gateway.delete_port_mapping(mapping.external_port, mapping.protocol) {
                Ok(_) => debug!("UPnP mapping cleaned up on drop"),
                Err(e) => warn!("UPnP cleanup on drop failed: {}", e),
            }
        });
    }
}
