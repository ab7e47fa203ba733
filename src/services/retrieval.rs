use std::sync::Arc;
use tracing::{error, instrument};

use crate::errors::{AppError, Result};
use crate::models::{QuoteRequest, QuoteScope, RoleAssignment};
use crate::providers::QuoteStore;
use crate::services::roles::{AdminStatus, RoleResolver};
use crate::services::session::SessionStore;

/// What a viewer gets back: the status the listing was chosen by and the rows.
#[derive(Debug, Clone)]
pub struct QuoteView {
    pub admin_status: AdminStatus,
    pub scope: QuoteScope,
    pub quotes: Vec<QuoteRequest>,
}

pub struct RetrievalService {
    session: SessionStore,
    resolver: RoleResolver,
    quotes: Arc<dyn QuoteStore>,
}

impl RetrievalService {
    pub fn new(session: SessionStore, resolver: RoleResolver, quotes: Arc<dyn QuoteStore>) -> Self {
        Self {
            session,
            resolver,
            quotes,
        }
    }

    /// Role first, then the listing that role allows. Unknown status gets the
    /// owner-only listing.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<QuoteView> {
        let identity = self.session.current_identity().ok_or(AppError::AuthRequired)?;
        let epoch = self.session.epoch();

        let admin_status = self.resolver.resolve(identity.id).await;
        self.ensure_current(epoch)?;

        let scope = if admin_status.is_admin() {
            QuoteScope::All
        } else {
            QuoteScope::Owned
        };
        let quotes = self.fetch(identity.id, scope).await?;
        self.ensure_current(epoch)?;

        Ok(QuoteView {
            admin_status,
            scope,
            quotes,
        })
    }

    pub async fn load_mine(&self) -> Result<Vec<QuoteRequest>> {
        let identity = self.session.current_identity().ok_or(AppError::AuthRequired)?;
        let epoch = self.session.epoch();

        let quotes = self.fetch(identity.id, QuoteScope::Owned).await?;
        self.ensure_current(epoch)?;
        Ok(quotes)
    }

    /// Every quote. Refused unless the viewer is a confirmed admin.
    pub async fn load_all_as_admin(&self) -> Result<Vec<QuoteRequest>> {
        let identity = self.session.current_identity().ok_or(AppError::AuthRequired)?;
        let epoch = self.session.epoch();

        self.require_admin(identity.id).await?;
        self.ensure_current(epoch)?;

        let quotes = self.fetch(identity.id, QuoteScope::All).await?;
        self.ensure_current(epoch)?;
        Ok(quotes)
    }

    pub async fn list_admins(&self) -> Result<Vec<RoleAssignment>> {
        let identity = self.session.current_identity().ok_or(AppError::AuthRequired)?;
        let epoch = self.session.epoch();

        self.require_admin(identity.id).await?;
        let admins = self
            .resolver
            .list_admins()
            .await
            .map_err(|e| AppError::Retrieval(e.to_string()))?;
        self.ensure_current(epoch)?;
        Ok(admins)
    }

    pub async fn admin_status(&self) -> Result<AdminStatus> {
        let identity = self.session.current_identity().ok_or(AppError::AuthRequired)?;
        let epoch = self.session.epoch();

        let status = self.resolver.resolve(identity.id).await;
        self.ensure_current(epoch)?;
        Ok(status)
    }

    async fn require_admin(&self, user_id: uuid::Uuid) -> Result<()> {
        match self.resolver.resolve(user_id).await {
            AdminStatus::Admin => Ok(()),
            AdminStatus::NonAdmin => Err(AppError::Forbidden),
            AdminStatus::Unknown(reason) => Err(AppError::RoleResolution(reason)),
        }
    }

    async fn fetch(&self, viewer: uuid::Uuid, scope: QuoteScope) -> Result<Vec<QuoteRequest>> {
        self.quotes.list_quotes(viewer, scope).await.map_err(|e| {
            error!(error = %e, ?scope, "Quote listing failed");
            AppError::Retrieval(e.to_string())
        })
    }

    fn ensure_current(&self, epoch: u64) -> Result<()> {
        if self.session.is_current(epoch) {
            Ok(())
        } else {
            Err(AppError::SessionEnded)
        }
    }
}
