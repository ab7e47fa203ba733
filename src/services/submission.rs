use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, instrument};

use crate::errors::{AppError, Result};
use crate::models::{Notice, QuoteForm, SubmitQuoteResponse};
use crate::providers::QuoteStore;
use crate::services::cooldown::SubmissionCooldown;
use crate::services::session::SessionStore;
use crate::services::validation::validate_quote;

/// Runs one submission attempt at a time for a session: identity, cooldown,
/// validation, then persistence. Owns the session's cooldown clock.
pub struct SubmissionService {
    session: SessionStore,
    quotes: Arc<dyn QuoteStore>,
    cooldown: Mutex<SubmissionCooldown>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however the attempt ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SubmissionService {
    pub fn new(session: SessionStore, quotes: Arc<dyn QuoteStore>, cooldown: Duration) -> Self {
        Self {
            session,
            quotes,
            cooldown: Mutex::new(SubmissionCooldown::new(cooldown)),
            in_flight: AtomicBool::new(false),
        }
    }

    fn cooldown(&self) -> MutexGuard<'_, SubmissionCooldown> {
        self.cooldown.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Seconds until another submission is allowed, zero if it is allowed now.
    pub fn cooldown_remaining_secs(&self) -> u64 {
        self.cooldown().try_acquire(Instant::now()).remaining_secs()
    }

    /// Submits the form. On success the form is cleared and the cooldown
    /// starts; on any failure both are left untouched.
    #[instrument(skip(self, form))]
    pub async fn submit(&self, form: &mut QuoteForm) -> Result<SubmitQuoteResponse> {
        let _in_flight = InFlight::acquire(&self.in_flight).ok_or(AppError::SubmissionInFlight)?;

        let identity = self.session.current_identity().ok_or(AppError::AuthRequired)?;
        let epoch = self.session.epoch();

        let check = self.cooldown().try_acquire(Instant::now());
        if !check.is_allowed() {
            return Err(AppError::RateLimited {
                remaining_secs: check.remaining_secs(),
            });
        }

        let details = validate_quote(form)?;

        let quote = self
            .quotes
            .insert_quote(identity.id, &details)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %identity.id, "Quote insert failed");
                AppError::PersistenceFailed(e.to_string())
            })?;

        if !self.session.is_current(epoch) {
            return Err(AppError::SessionEnded);
        }

        self.cooldown().record_success(Instant::now());
        *form = QuoteForm::default();
        info!(quote_id = %quote.id, user_id = %identity.id, "Quote request submitted");

        Ok(SubmitQuoteResponse {
            quote,
            notice: Notice::success(
                "Message Sent!",
                "Thanks for reaching out! I'll get back to you within 24 hours.",
            ),
        })
    }
}
