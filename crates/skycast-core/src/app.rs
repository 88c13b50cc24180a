use crate::{Config, Service};

/// Main application state and lifecycle manager
pub struct App {
    config: Config,
    services: Vec<Box<dyn Service>>,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            services: Vec::new(),
        }
    }

    /// Register a service; it is shut down when the app shuts down
    pub fn register(&mut self, service: Box<dyn Service>) {
        tracing::info!("Registering service: {}", service.name());
        self.services.push(service);
    }

    /// Shut down all services, most recently registered first.
    ///
    /// A failing service does not stop the others from shutting down.
    pub fn shutdown(&mut self) {
        tracing::info!("Shutting down application");

        while let Some(mut service) = self.services.pop() {
            tracing::debug!("Shutting down service: {}", service.name());
            if let Err(e) = service.shutdown() {
                tracing::error!("Error shutting down service {}: {}", service.name(), e);
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name()).collect()
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if !self.services.is_empty() {
            self.shutdown();
        }
    }
}
