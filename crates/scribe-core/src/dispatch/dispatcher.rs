//! Registry-backed failover across providers.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use super::{CommandProvider, RecognitionProvider, Recognize};
use crate::config::ScribeConfig;
use crate::control::InterruptFlag;
use crate::error::{ConfigError, TransportError};
use crate::registry::{SelectionStrategy, ServiceRegistry};

/// Binds a `ServiceRegistry` to the providers it names.
///
/// Each `recognize` call selects a service, invokes it, and reports the
/// outcome back to the registry. A non-empty text is a success; an error or
/// an empty result is a failure and the next attempt selects again. A service
/// already tried for this segment is skipped while further attempts remain.
pub struct ServiceDispatcher {
    registry: Arc<ServiceRegistry>,
    providers: HashMap<String, Arc<dyn RecognitionProvider>>,
    strategy: SelectionStrategy,
    max_attempts: u32,
    interrupt: InterruptFlag,
}

impl ServiceDispatcher {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        strategy: SelectionStrategy,
        max_attempts: u32,
        interrupt: InterruptFlag,
    ) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::NonPositive {
                field: "dispatch.max_attempts",
            });
        }
        Ok(Self {
            registry,
            providers: HashMap::new(),
            strategy,
            max_attempts,
            interrupt,
        })
    }

    /// Register `provider` under its own name with `weight`.
    pub fn add_provider(
        &mut self,
        provider: Arc<dyn RecognitionProvider>,
        weight: f64,
    ) -> Result<(), ConfigError> {
        let name = provider.name().to_string();
        self.registry.register(name.clone(), weight)?;
        self.providers.insert(name, provider);
        Ok(())
    }

    /// Build a dispatcher with one `CommandProvider` per `[[services]]` entry.
    pub fn from_config(
        cfg: &ScribeConfig,
        registry: Arc<ServiceRegistry>,
        interrupt: InterruptFlag,
    ) -> Result<Self, ConfigError> {
        let mut dispatcher = Self::new(
            registry,
            cfg.dispatch.strategy,
            cfg.dispatch.max_attempts,
            interrupt,
        )?;
        for service in &cfg.services {
            let provider = CommandProvider::from_config(service)?;
            dispatcher.add_provider(Arc::new(provider), service.weight)?;
        }
        Ok(dispatcher)
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }
}

#[async_trait]
impl Recognize for ServiceDispatcher {
    async fn recognize(&self, segment: &Path) -> Result<Option<String>, TransportError> {
        let mut tried: HashSet<String> = HashSet::new();
        let mut last_error = None;
        let mut attempt = 0u32;

        while attempt < self.max_attempts {
            if self.interrupt.is_raised() {
                break;
            }
            let Some(name) = self.registry.select(self.strategy) else {
                tracing::warn!(segment = %segment.display(), "no recognition service available");
                if last_error.is_none() {
                    last_error = Some(TransportError::Provider(
                        "no recognition service available".to_string(),
                    ));
                }
                break;
            };
            if tried.contains(&name) && attempt + 1 < self.max_attempts {
                attempt += 1;
                continue;
            }
            tried.insert(name.clone());

            let Some(provider) = self.providers.get(&name) else {
                // Registered directly on the registry without a provider.
                self.registry.report_result(&name, false);
                attempt += 1;
                continue;
            };

            tracing::debug!(service = %name, segment = %segment.display(), attempt, "recognizing");
            self.registry.record_invocation(&name);
            match provider.recognize(segment).await {
                Ok(Some(text)) if !text.trim().is_empty() => {
                    self.registry.report_result(&name, true);
                    return Ok(Some(text));
                }
                Ok(_) => {
                    tracing::debug!(service = %name, segment = %segment.display(), "no text returned");
                    self.registry.report_result(&name, false);
                }
                Err(e) => {
                    tracing::warn!(service = %name, segment = %segment.display(), "recognition failed: {}", e);
                    self.registry.report_result(&name, false);
                    last_error = Some(e);
                }
            }
            attempt += 1;
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}
