//! Route definitions sourced from the configuration file.

use futures_util::stream::BoxStream;

use crate::config::schema::GatewayConfig;
use crate::routing::definition::RouteDefinition;
use crate::routing::locator::{InMemoryRouteDefinitionLocator, RouteDefinitionLocator};

/// Supplies the `[[routes]]` of the active configuration.
#[derive(Debug)]
pub struct ConfigRouteDefinitionLocator {
    current: InMemoryRouteDefinitionLocator,
}

impl ConfigRouteDefinitionLocator {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            current: InMemoryRouteDefinitionLocator::new(config.routes.clone()),
        }
    }

    /// Swap in the routes of a reloaded configuration.
    pub fn reload(&self, config: &GatewayConfig) {
        self.current.replace(config.routes.clone());
    }
}

impl RouteDefinitionLocator for ConfigRouteDefinitionLocator {
    fn route_definitions(&self) -> BoxStream<'static, RouteDefinition> {
        self.current.route_definitions()
    }
}
