//! Interactive probe session.
//!
//! Front ends with a long-lived input loop submit one probe per user
//! action. The probe runs on a background task and its outcome arrives on
//! the channel returned by [`ProbeSession::new`], so the loop never blocks
//! on the network. Only one probe may be in flight; further submissions
//! are refused until it completes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::error::SessionError;
use crate::probe::ProbeOutcome;
use crate::validator::Validator;

/// Clears the busy flag when dropped, including on unwind.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ProbeSession {
    validator: Validator,
    busy: Arc<AtomicBool>,
    outcomes: mpsc::UnboundedSender<ProbeOutcome>,
}

impl ProbeSession {
    pub fn new(validator: Validator) -> (Self, mpsc::UnboundedReceiver<ProbeOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            validator,
            busy: Arc::new(AtomicBool::new(false)),
            outcomes: tx,
        };
        (session, rx)
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Start probing `service_id` with `api_key` in the background.
    ///
    /// Surrounding whitespace is stripped from the key. Must be called from
    /// within a tokio runtime. The busy flag is cleared before the outcome
    /// is sent; a prober that panics yields a failed outcome.
    pub fn submit(&self, api_key: &str, service_id: &str) -> Result<(), SessionError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(SessionError::MissingKey);
        }
        let definition = self
            .validator
            .registry()
            .resolve(service_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownService(service_id.to_string()))?;
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SessionError::Busy);
        }

        let validator = self.validator.clone();
        let guard = BusyGuard(Arc::clone(&self.busy));
        let tx = self.outcomes.clone();
        let key = api_key.to_string();
        let service = service_id.to_string();

        debug!(service = %service, "Submitting interactive probe");
        tokio::spawn(async move {
            let run = {
                let service = service.clone();
                tokio::spawn(async move { validator.run_validation(&key, &[service.as_str()]).await })
            };
            let outcome = match run.await {
                Ok(Ok(mut outcomes)) => outcomes.pop(),
                Ok(Err(e)) => {
                    warn!(service = %service, "Interactive probe rejected: {}", e);
                    None
                }
                Err(e) => {
                    error!(service = %service, "Interactive probe task aborted: {}", e);
                    Some(ProbeOutcome::transport_failure(&definition, e, 0))
                }
            };
            drop(guard);
            if let Some(outcome) = outcome {
                if tx.send(outcome).is_err() {
                    debug!(service = %service, "Session receiver dropped — outcome discarded");
                }
            }
        });
        Ok(())
    }
}
