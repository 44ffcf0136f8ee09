use mediaform_core::AppError;
use std::time::{Duration, Instant};

/// Wall-clock budget for one transform, checked at safe points
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now() + budget,
            budget,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    pub fn check(&self) -> Result<(), AppError> {
        if self.is_expired() {
            return Err(AppError::Timeout {
                budget_ms: self.budget.as_millis() as u64,
            });
        }
        Ok(())
    }
}
