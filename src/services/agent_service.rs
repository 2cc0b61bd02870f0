use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::database::models::{Agent, AgentPatch, AgentSearch, Deleted, NewAgent};
use crate::database::{
    FieldSet, Listing, Page, PendingMutation, ResourceError, ResourceStore, Transition, UpdateOutcome,
};
use crate::identity::{IdentityError, IdentityProvider, NewIdentityUser, UserAttribute};
use crate::state::AppState;

/// Agent lifecycle with the identity provider kept in step.
///
/// Every mutation that has a remote counterpart runs the remote call while the
/// local transaction is still open. A failed remote call rolls the local change
/// back, so the two sides never diverge after a reported failure.
pub struct AgentService {
    store: ResourceStore<Agent>,
    identity: Arc<dyn IdentityProvider>,
    agent_group: String,
}

impl AgentService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store(),
            identity: state.identity.clone(),
            agent_group: state.config.identity.agent_group.clone(),
        }
    }

    pub fn from_parts(store: ResourceStore<Agent>, identity: Arc<dyn IdentityProvider>, agent_group: impl Into<String>) -> Self {
        Self {
            store,
            identity,
            agent_group: agent_group.into(),
        }
    }

    pub async fn create(&self, admin: Uuid, input: &NewAgent) -> Result<Agent, ResourceError> {
        let pending = self.store.begin_create(admin, input.field_set()).await?;

        let user = NewIdentityUser {
            email: pending.value().email.clone(),
            first_name: pending.value().first_name.clone(),
            last_name: pending.value().last_name.clone(),
            group: self.agent_group.clone(),
        };
        let subject = match self.identity.create_user(&user).await {
            Ok(subject) => subject,
            Err(err) => return Err(abandon(pending, "create_user", err).await),
        };

        match self.store_subject(pending, &subject).await {
            Ok(agent) => {
                info!(agent = %agent.id, "agent created");
                Ok(agent)
            }
            Err(err) => {
                // The local insert is gone, so the provider user must go too
                if let Err(delete_err) = self.identity.delete_user(&subject).await {
                    error!(subject = %subject, error = %delete_err, "orphaned identity user could not be deleted");
                }
                Err(err)
            }
        }
    }

    async fn store_subject(&self, mut pending: PendingMutation<Agent>, subject: &str) -> Result<Agent, ResourceError> {
        let mut fields = FieldSet::new();
        fields.set("identity_sub", subject.to_string());
        self.store.update_within(&mut pending, fields).await?;
        pending.commit().await
    }

    pub async fn get(&self, admin: Uuid, id: Uuid) -> Result<Agent, ResourceError> {
        self.store.get(id, admin).await
    }

    pub async fn list(&self, admin: Uuid, page: Page) -> Result<Listing<Agent>, ResourceError> {
        let items = self.store.list(admin, &[], page).await?;
        Ok(Listing::new(items, page))
    }

    pub async fn search(&self, admin: Uuid, query: &str, page: Page) -> Result<Listing<Agent>, ResourceError> {
        let items = self.store.search(admin, query, page).await?;
        Ok(Listing::new(items, page))
    }

    pub async fn search_fields(&self, admin: Uuid, search: &AgentSearch, page: Page) -> Result<Listing<Agent>, ResourceError> {
        let items = self.store.search_fields(admin, &search.criteria(), search.mode, page).await?;
        Ok(Listing::new(items, page))
    }

    /// Name and email changes are mirrored as provider attributes
    pub async fn update(&self, admin: Uuid, id: Uuid, patch: &AgentPatch) -> Result<UpdateOutcome<Agent>, ResourceError> {
        let pending = match self.store.begin_update(id, admin, patch.field_set()).await? {
            UpdateOutcome::Updated(pending) => pending,
            UpdateOutcome::NoOp => return Ok(UpdateOutcome::NoOp),
        };

        let agent = pending.value();
        let mut attributes = Vec::new();
        if patch.first_name.is_some() {
            attributes.push(UserAttribute::new("custom:firstName", &agent.first_name));
        }
        if patch.last_name.is_some() {
            attributes.push(UserAttribute::new("custom:lastName", &agent.last_name));
        }
        if patch.email.is_some() {
            attributes.push(UserAttribute::new("email", &agent.email));
        }

        let username = agent.identity_username().to_string();
        if let Err(err) = self.identity.update_user_attributes(&username, &attributes).await {
            return Err(abandon(pending, "update_user_attributes", err).await);
        }

        Ok(UpdateOutcome::Updated(pending.commit().await?))
    }

    /// Inactive or Active -> Disabled, and the provider user is disabled
    pub async fn disable(&self, admin: Uuid, id: Uuid) -> Result<Agent, ResourceError> {
        let pending = self.store.begin_transition(id, admin, &Transition::disable()).await?;
        let username = pending.value().identity_username().to_string();

        if let Err(err) = self.identity.disable_user(&username).await {
            return Err(abandon(pending, "disable_user", err).await);
        }

        let agent = pending.commit().await?;
        info!(agent = %agent.id, "agent disabled");
        Ok(agent)
    }

    /// Disabled -> Active, and the provider user is enabled again
    pub async fn enable(&self, admin: Uuid, id: Uuid) -> Result<Agent, ResourceError> {
        let pending = self.store.begin_transition(id, admin, &Transition::enable()).await?;
        let username = pending.value().identity_username().to_string();

        if let Err(err) = self.identity.enable_user(&username).await {
            return Err(abandon(pending, "enable_user", err).await);
        }

        let agent = pending.commit().await?;
        info!(agent = %agent.id, "agent enabled");
        Ok(agent)
    }

    /// Soft delete locally and disable the provider user before committing
    pub async fn soft_delete(&self, admin: Uuid, id: Uuid, reason: Option<&str>) -> Result<Deleted, ResourceError> {
        let agent = self.store.get(id, admin).await.map_err(|err| match err {
            ResourceError::NotFound { resource } => ResourceError::NotEligible { resource },
            other => other,
        })?;
        let pending = self.store.begin_soft_delete(id, admin, reason).await?;

        if let Err(err) = self.identity.disable_user(agent.identity_username()).await {
            return Err(abandon(pending, "disable_user", err).await);
        }

        let deleted = pending.commit().await?;
        info!(agent = %deleted.id, "agent soft-deleted");
        Ok(deleted)
    }

    /// Removes the local row only; the provider user is left as it is
    pub async fn hard_delete(&self, admin: Uuid, id: Uuid) -> Result<Uuid, ResourceError> {
        self.store.hard_delete(id, admin).await
    }
}

/// Rolls back after a failed provider call and returns the error to report
async fn abandon<T>(pending: PendingMutation<T>, operation: &'static str, err: IdentityError) -> ResourceError {
    warn!(operation, error = %err, "identity provider call failed, rolling back");
    if let Err(rollback_err) = pending.rollback().await {
        // The transaction is discarded when the connection is returned either way
        warn!(error = %rollback_err, "explicit rollback failed");
    }
    ResourceError::IdentitySync(err)
}
