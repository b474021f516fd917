//! Module activation against the host commerce extension.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use crate::application::repos::StoreSettingsRepo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Active,
    /// The commerce extension is absent; filtering passes through and events are ignored.
    Inactive,
}

impl ModuleState {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Decides whether the module may run and reports a missing extension once.
pub struct ExtensionGuard {
    settings: Arc<dyn StoreSettingsRepo>,
    notified: AtomicBool,
}

impl ExtensionGuard {
    pub fn new(settings: Arc<dyn StoreSettingsRepo>) -> Self {
        Self {
            settings,
            notified: AtomicBool::new(false),
        }
    }

    /// Check the host extension.
    ///
    /// A failed lookup counts as active so that filtering keeps working.
    pub async fn check(&self) -> ModuleState {
        match self.settings.is_commerce_active().await {
            Ok(true) => ModuleState::Active,
            Ok(false) => {
                self.notify_missing();
                ModuleState::Inactive
            }
            Err(err) => {
                warn!(error = %err, "Commerce extension check failed; assuming active");
                ModuleState::Active
            }
        }
    }

    fn notify_missing(&self) {
        if !self.notified.swap(true, Ordering::AcqRel) {
            warn!("In-stock layered nav requires the commerce extension to be installed and active");
        }
    }

    pub fn notified(&self) -> bool {
        self.notified.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::repos::RepoError;
    use async_trait::async_trait;

    struct FixedSettings(Result<bool, ()>);

    #[async_trait]
    impl StoreSettingsRepo for FixedSettings {
        async fn stock_threshold(&self) -> Result<i64, RepoError> {
            Ok(0)
        }

        async fn is_commerce_active(&self) -> Result<bool, RepoError> {
            self.0.map_err(|_| RepoError::Timeout)
        }
    }

    #[tokio::test]
    async fn active_extension_reports_active() {
        let guard = ExtensionGuard::new(Arc::new(FixedSettings(Ok(true))));
        assert_eq!(guard.check().await, ModuleState::Active);
        assert!(!guard.notified());
    }

    #[tokio::test]
    async fn missing_extension_notifies_once() {
        let guard = ExtensionGuard::new(Arc::new(FixedSettings(Ok(false))));
        assert_eq!(guard.check().await, ModuleState::Inactive);
        assert!(guard.notified());
        assert_eq!(guard.check().await, ModuleState::Inactive);
    }

    #[tokio::test]
    async fn failed_check_fails_open() {
        let guard = ExtensionGuard::new(Arc::new(FixedSettings(Err(()))));
        assert_eq!(guard.check().await, ModuleState::Active);
        assert!(!guard.notified());
    }
}
