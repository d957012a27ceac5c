use media_sync_models::{Domain, MediaType};
use std::collections::BTreeMap;
use tracing::debug;

use super::{FastPullHandler, Handler, HandlerConfig, HandlerMode, StateHandler};

/// Explicit `(domain, mode, media type) -> handler` map
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<HandlerConfig, Box<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One handler per supported (domain, media type) pair in every mode
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for domain in Domain::ALL {
            for &media_type in domain.media_types() {
                for mode in HandlerMode::ALL {
                    let config = HandlerConfig::new(domain, mode, media_type);
                    let handler: Box<dyn Handler> = match mode {
                        HandlerMode::FastPull => Box::new(FastPullHandler::new(config)),
                        HandlerMode::Pull | HandlerMode::Push => Box::new(StateHandler::new(config)),
                    };
                    registry.register(handler);
                }
            }
        }
        debug!("Handler registry built with {} handlers", registry.len());
        registry
    }

    /// Register a handler under its own config, returning the one it replaced
    pub fn register(&mut self, handler: Box<dyn Handler>) -> Option<Box<dyn Handler>> {
        let config = *handler.config();
        self.handlers.insert(config, handler)
    }

    pub fn get(&self, domain: Domain, mode: HandlerMode, media_type: MediaType) -> Option<&dyn Handler> {
        self.handlers
            .get(&HandlerConfig::new(domain, mode, media_type))
            .map(|h| h.as_ref())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn configs(&self) -> impl Iterator<Item = &HandlerConfig> {
        self.handlers.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::Scope;

    #[test]
    fn test_standard_registry_covers_supported_pairs() {
        let registry = HandlerRegistry::standard();

        let fast = registry
            .get(Domain::Ratings, HandlerMode::FastPull, MediaType::Season)
            .unwrap();
        assert_eq!(fast.scope(), Scope::Touched);
        assert!(registry.get(Domain::Watched, HandlerMode::Push, MediaType::Episode).is_some());
        assert!(registry.get(Domain::Watchlist, HandlerMode::Pull, MediaType::Episode).is_none());
    }

    #[test]
    fn test_register_replaces_same_config() {
        let mut registry = HandlerRegistry::new();
        let config = HandlerConfig::new(Domain::Ratings, HandlerMode::Pull, MediaType::Movie);
        assert!(registry.register(Box::new(StateHandler::new(config))).is_none());
        assert!(registry.register(Box::new(StateHandler::new(config))).is_some());
        assert_eq!(registry.len(), 1);
    }
}
