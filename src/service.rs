use std::sync::Arc;

use crate::auth::auth::Principal;
use crate::directory;
use crate::error::AppError;
use crate::ledger::{ClockCommand, Correction, ListLimits, PunchLedger, PunchQuery, Review};
use crate::model::{profile::Profile, punch::Punch};
use crate::store::AttendanceStore;

/// Per-request orchestration: principal -> profile -> policy -> ledger.
///
/// Holds no per-user state; the profile is re-read for every call so role and
/// scope always reflect the current directory.
#[derive(Clone)]
pub struct AttendanceService {
    store: Arc<dyn AttendanceStore>,
    ledger: PunchLedger,
}

impl AttendanceService {
    pub fn new(store: Arc<dyn AttendanceStore>, limits: ListLimits) -> Self {
        let ledger = PunchLedger::new(store.clone(), limits);
        Self { store, ledger }
    }

    async fn profile(&self, principal: &Principal) -> Result<Profile, AppError> {
        directory::resolve(self.store.as_ref(), principal).await
    }

    pub async fn me(&self, principal: &Principal) -> Result<Profile, AppError> {
        self.profile(principal).await
    }

    pub async fn team(&self, principal: &Principal) -> Result<Vec<Profile>, AppError> {
        let me = self.profile(principal).await?;
        directory::team(self.store.as_ref(), &me).await
    }

    pub async fn my_punches(
        &self,
        principal: &Principal,
        query: &PunchQuery,
    ) -> Result<Vec<Punch>, AppError> {
        let me = self.profile(principal).await?;
        self.ledger.list_own(&me, query).await
    }

    pub async fn team_punches(
        &self,
        principal: &Principal,
        query: &PunchQuery,
    ) -> Result<Vec<Punch>, AppError> {
        let me = self.profile(principal).await?;
        self.ledger.list_team(&me, query).await
    }

    pub async fn clock(&self, principal: &Principal, cmd: ClockCommand) -> Result<Punch, AppError> {
        let me = self.profile(principal).await?;
        self.ledger.create(&me, cmd).await
    }

    pub async fn correct(&self, principal: &Principal, cmd: Correction) -> Result<Punch, AppError> {
        let me = self.profile(principal).await?;
        self.ledger.update(&me, cmd).await
    }

    pub async fn review(&self, principal: &Principal, cmd: Review) -> Result<Punch, AppError> {
        let me = self.profile(principal).await?;
        self.ledger.decide(&me, cmd).await
    }
}
