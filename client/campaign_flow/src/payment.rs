//! # Payment
//!
//! The payment step is an external collaborator: the checkout only needs to
//! know that payment for the selected method was confirmed.
//! [`SimulatedPayment`] stands in for a real capture with a fixed wait.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::PaymentError;
use crate::types::PaymentMethod;

/// Default wait of [`SimulatedPayment`].
pub const SIMULATED_PAYMENT_DELAY: Duration = Duration::from_secs(2);

/// Confirms payment with an external provider.
#[async_trait]
pub trait PaymentCollaborator: Send + Sync {
    async fn confirm(&self, method: PaymentMethod) -> Result<(), PaymentError>;
}

/// Waits a fixed delay, then reports success.
#[derive(Debug, Clone)]
pub struct SimulatedPayment {
    delay: Duration,
}

impl SimulatedPayment {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedPayment {
    fn default() -> Self {
        Self::new(SIMULATED_PAYMENT_DELAY)
    }
}

#[async_trait]
impl PaymentCollaborator for SimulatedPayment {
    async fn confirm(&self, method: PaymentMethod) -> Result<(), PaymentError> {
        debug!("Simulating {} payment ({:?})", method.label(), self.delay);
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}
