//! Runtime services
//!
//! A service is a named register function. The host calls [`load_services`]
//! once at startup with the services enabled in its configuration.

use eyre::{Context, Result};

use crate::config::Config;
use crate::runtime::EventSource;

pub mod debug;

/// Attaches a service to the runtime's event source
pub type RegisterFn = fn(&dyn EventSource, &Config) -> Result<()>;

/// A named service
#[derive(Debug, Clone, Copy)]
pub struct Service {
    pub name: &'static str,
    pub register: RegisterFn,
}

/// Every service this crate provides
pub static SERVICES: &[Service] = &[debug::DEBUG_SERVICE];

/// Look up a service by name
pub fn find(name: &str) -> Option<&'static Service> {
    SERVICES.iter().find(|service| service.name == name)
}

/// Register every service enabled in `config`.
///
/// Unknown names are skipped with a warning. The first failing registration
/// aborts loading. Returns the names of the services that were registered.
pub fn load_services(config: &Config, events: &dyn EventSource) -> Result<Vec<&'static str>> {
    let mut registered = Vec::new();

    for name in &config.services.enabled {
        let Some(service) = find(name) else {
            log::warn!("Service {} not found", name);
            continue;
        };

        if registered.contains(&service.name) {
            log::debug!("Service {} already registered, skipping", service.name);
            continue;
        }

        (service.register)(events, config).with_context(|| format!("Failed to register service {}", service.name))?;
        registered.push(service.name);
    }

    Ok(registered)
}
