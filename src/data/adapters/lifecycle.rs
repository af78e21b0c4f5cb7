use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::errors::BillingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifecycleState {
    Uninitialized,
    SettingUp,
    Ready,
    Disposed,
}

#[derive(Debug)]
struct LifecycleInner {
    state: LifecycleState,
    /// Name of the async operation currently in flight, if any.
    busy: Option<&'static str>,
}

/// Shared adapter state machine: setup happens once, operations run one at a
/// time, and disposal is terminal. All adapters share this so concurrency
/// rules cannot drift between stores.
#[derive(Debug)]
pub(crate) struct AdapterLifecycle {
    inner: Mutex<LifecycleInner>,
}

impl AdapterLifecycle {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(LifecycleInner {
                state: LifecycleState::Uninitialized,
                busy: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LifecycleInner> {
        // The guarded state stays consistent even if a holder panicked.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn begin_setup(&self) -> Result<(), BillingError> {
        let mut inner = self.lock();
        match inner.state {
            LifecycleState::Uninitialized => {
                inner.state = LifecycleState::SettingUp;
                Ok(())
            }
            LifecycleState::Disposed => Err(BillingError::Disposed),
            _ => Err(BillingError::AlreadyInitialized),
        }
    }

    pub(crate) fn finish_setup(&self, ok: bool) {
        let mut inner = self.lock();
        if inner.state == LifecycleState::SettingUp {
            inner.state = if ok {
                LifecycleState::Ready
            } else {
                LifecycleState::Uninitialized
            };
        }
    }

    pub(crate) fn ensure_ready(&self) -> Result<(), BillingError> {
        match self.lock().state {
            LifecycleState::Ready => Ok(()),
            LifecycleState::Disposed => Err(BillingError::Disposed),
            _ => Err(BillingError::NotInitialized),
        }
    }

    /// Claims the single operation slot. The returned guard frees the slot
    /// when dropped, including on early return.
    pub(crate) fn begin_operation(
        &self,
        name: &'static str,
    ) -> Result<OperationGuard<'_>, BillingError> {
        let mut inner = self.lock();
        match inner.state {
            LifecycleState::Ready => {}
            LifecycleState::Disposed => return Err(BillingError::Disposed),
            _ => return Err(BillingError::NotInitialized),
        }
        if let Some(running) = inner.busy {
            return Err(BillingError::ConcurrentOperation {
                requested: name,
                running,
            });
        }
        inner.busy = Some(name);
        Ok(OperationGuard { lifecycle: self })
    }

    pub(crate) fn dispose(&self) {
        self.lock().state = LifecycleState::Disposed;
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.lock().state == LifecycleState::Disposed
    }
}

#[derive(Debug)]
pub(crate) struct OperationGuard<'a> {
    lifecycle: &'a AdapterLifecycle,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.lifecycle.lock().busy = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_happens_once() {
        let lifecycle = AdapterLifecycle::new();
        assert!(matches!(
            lifecycle.ensure_ready(),
            Err(BillingError::NotInitialized)
        ));
        lifecycle.begin_setup().unwrap();
        assert!(matches!(
            lifecycle.begin_setup(),
            Err(BillingError::AlreadyInitialized)
        ));
        lifecycle.finish_setup(true);
        assert!(lifecycle.ensure_ready().is_ok());
        assert!(matches!(
            lifecycle.begin_setup(),
            Err(BillingError::AlreadyInitialized)
        ));
    }

    #[test]
    fn failed_setup_can_be_retried() {
        let lifecycle = AdapterLifecycle::new();
        lifecycle.begin_setup().unwrap();
        lifecycle.finish_setup(false);
        assert!(lifecycle.begin_setup().is_ok());
    }

    #[test]
    fn single_operation_at_a_time() {
        let lifecycle = AdapterLifecycle::new();
        lifecycle.begin_setup().unwrap();
        lifecycle.finish_setup(true);

        let guard = lifecycle.begin_operation("launchPurchaseFlow").unwrap();
        let err = lifecycle.begin_operation("consume").unwrap_err();
        match err {
            BillingError::ConcurrentOperation { requested, running } => {
                assert_eq!(requested, "consume");
                assert_eq!(running, "launchPurchaseFlow");
            }
            other => panic!("unexpected error: {other}"),
        }

        drop(guard);
        assert!(lifecycle.begin_operation("consume").is_ok());
    }

    #[test]
    fn disposal_is_terminal() {
        let lifecycle = AdapterLifecycle::new();
        lifecycle.begin_setup().unwrap();
        lifecycle.finish_setup(true);
        lifecycle.dispose();
        assert!(lifecycle.is_disposed());
        assert!(matches!(lifecycle.ensure_ready(), Err(BillingError::Disposed)));
        assert!(matches!(
            lifecycle.begin_operation("consume"),
            Err(BillingError::Disposed)
        ));
        assert!(matches!(lifecycle.begin_setup(), Err(BillingError::Disposed)));
    }
}
