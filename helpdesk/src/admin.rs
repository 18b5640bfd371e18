//! Reference-data administration.
//!
//! Users, teams, categories, tags and SLA policies. Each operation checks the
//! caller's role, validates, then persists. None of these are audited.

use crate::audit::AuditEntry;
use crate::error::{HelpdeskError, Result};
use crate::permissions::{self, Action, Relationship};
use crate::query::{self, AuditFilter, Page, PageRequest};
use crate::store::RecordStore;
use crate::tags::resolve_or_create_tags;
use crate::types::{
    nullable, require_text, Category, CategoryId, CategoryKind, Role, SlaPolicy, SlaPolicyId, Tag,
    Team, TeamId, TicketPriority, User, UserId,
};
use helpdesk_auth::{password, Principal};
use helpdesk_core::environment::{Clock, IdGenerator};
use serde::Deserialize;
use std::sync::Arc;

/// Timezone given to SLA policies created without one.
pub const DEFAULT_SLA_TIMEZONE: &str = "Asia/Tokyo";

/// New account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateUser {
    /// Login email
    pub email: String,
    /// Display name
    pub name: String,
    /// Role
    pub role: Role,
    /// Optional team
    #[serde(default)]
    pub team_id: Option<TeamId>,
    /// Plain-text password, hashed before storage
    pub password: String,
}

/// Account edit. Absent fields stay as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateUser {
    /// New email
    #[serde(default)]
    pub email: Option<String>,
    /// New name
    #[serde(default)]
    pub name: Option<String>,
    /// New role
    #[serde(default)]
    pub role: Option<Role>,
    /// New team; `null` removes the user from their team
    #[serde(default, deserialize_with = "nullable")]
    pub team_id: Option<Option<TeamId>>,
    /// New password
    #[serde(default)]
    pub password: Option<String>,
}

/// New team.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateTeam {
    /// Name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
}

/// Team edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateTeam {
    /// New name
    #[serde(default)]
    pub name: Option<String>,
    /// New description; `null` clears it
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
}

/// New category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateCategory {
    /// Name
    pub name: String,
    /// What it classifies
    #[serde(rename = "type")]
    pub kind: CategoryKind,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
}

/// New SLA policy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateSlaPolicy {
    /// Priority it governs
    pub priority: TicketPriority,
    /// First-response target
    pub first_response_target_minutes: i64,
    /// Resolution target
    pub resolution_target_minutes: i64,
    /// Stop the resolution clock while waiting on the customer
    #[serde(default = "default_pause")]
    pub pause_on_waiting_customer: bool,
    /// Business timezone label
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

const fn default_pause() -> bool {
    true
}

fn default_timezone() -> String {
    DEFAULT_SLA_TIMEZONE.to_string()
}

/// SLA policy edit. The priority cannot change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateSlaPolicy {
    /// New first-response target
    #[serde(default)]
    pub first_response_target_minutes: Option<i64>,
    /// New resolution target
    #[serde(default)]
    pub resolution_target_minutes: Option<i64>,
    /// New pause flag
    #[serde(default)]
    pub pause_on_waiting_customer: Option<bool>,
    /// New timezone
    #[serde(default)]
    pub timezone: Option<String>,
}

fn require_email(email: &str) -> Result<()> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(())
    } else {
        Err(HelpdeskError::validation(format!("invalid email: {email}")))
    }
}

fn require_minutes(field: &str, minutes: i64) -> Result<()> {
    if minutes > 0 {
        Ok(())
    } else {
        Err(HelpdeskError::validation(format!("{field} must be positive")))
    }
}

/// Reference-data service.
#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl AdminService {
    /// Create a service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { store, clock, ids }
    }

    fn authorize(principal: &Principal, action: Action) -> Result<()> {
        permissions::authorize(principal, Relationship::NotApplicable, action)?;
        Ok(())
    }

    async fn require_team(&self, id: Option<TeamId>) -> Result<()> {
        if let Some(id) = id {
            if self.store.find_team(id).await?.is_none() {
                return Err(HelpdeskError::not_found("Team", id));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// The caller's own account.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::NotFound`] if the account was removed after login.
    pub async fn me(&self, principal: &Principal) -> Result<User> {
        self.store
            .find_user(principal.id)
            .await?
            .ok_or_else(|| HelpdeskError::not_found("User", principal.id))
    }

    /// One page of users, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::PermissionDenied`] unless the caller is an admin.
    pub async fn list_users(&self, principal: &Principal, page: PageRequest) -> Result<Vec<User>> {
        Self::authorize(principal, Action::ManageUsers)?;
        Ok(page.slice(self.store.list_users().await?))
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::Validation`]: bad email, empty name or password
    /// - [`HelpdeskError::NotFound`]: unknown team
    /// - [`HelpdeskError::Conflict`]: email already registered
    #[tracing::instrument(skip_all, fields(admin_id = %principal.id))]
    pub async fn create_user(&self, principal: &Principal, request: CreateUser) -> Result<User> {
        Self::authorize(principal, Action::ManageUsers)?;
        self.insert_user(request).await
    }

    async fn insert_user(&self, request: CreateUser) -> Result<User> {
        require_email(&request.email)?;
        require_text("name", &request.name)?;
        require_text("password", &request.password)?;
        self.require_team(request.team_id).await?;
        let password_hash = password::hash_password_async(request.password).await?;

        let now = self.clock.now();
        let user = User {
            id: UserId(self.ids.next_id()),
            email: request.email,
            name: request.name,
            role: request.role,
            team_id: request.team_id,
            password_hash,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_user(&user).await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Edit an account.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::NotFound`]: unknown user or team
    /// - [`HelpdeskError::Validation`]: bad email, empty name or password
    /// - [`HelpdeskError::Conflict`]: email already registered
    #[tracing::instrument(skip_all, fields(admin_id = %principal.id, user_id = %id))]
    pub async fn update_user(&self, principal: &Principal, id: UserId, request: UpdateUser) -> Result<User> {
        Self::authorize(principal, Action::ManageUsers)?;
        let mut user = self
            .store
            .find_user(id)
            .await?
            .ok_or_else(|| HelpdeskError::not_found("User", id))?;

        if let Some(email) = request.email {
            require_email(&email)?;
            user.email = email;
        }
        if let Some(name) = request.name {
            require_text("name", &name)?;
            user.name = name;
        }
        if let Some(role) = request.role {
            user.role = role;
        }
        if let Some(team_id) = request.team_id {
            self.require_team(team_id).await?;
            user.team_id = team_id;
        }
        if let Some(password) = request.password {
            require_text("password", &password)?;
            user.password_hash = password::hash_password_async(password).await?;
        }
        user.updated_at = self.clock.now();

        self.store.update_user(&user).await?;
        Ok(user)
    }

    /// Seed an admin account unless one with `email` already exists.
    ///
    /// Returns the new account, or `None` when nothing was created.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::Validation`] for a bad email or empty password.
    pub async fn bootstrap_admin(&self, email: &str, password: &str) -> Result<Option<User>> {
        if self.store.find_user_by_email(email).await?.is_some() {
            tracing::debug!(email, "Bootstrap admin already present");
            return Ok(None);
        }

        let user = self
            .insert_user(CreateUser {
                email: email.to_string(),
                name: "Administrator".to_string(),
                role: Role::Admin,
                team_id: None,
                password: password.to_string(),
            })
            .await?;
        Ok(Some(user))
    }

    // ------------------------------------------------------------------
    // Teams
    // ------------------------------------------------------------------

    /// All teams.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::Storage`] if the store fails.
    pub async fn list_teams(&self, principal: &Principal) -> Result<Vec<Team>> {
        Self::authorize(principal, Action::ListReferenceData)?;
        Ok(self.store.list_teams().await?)
    }

    /// Create a team.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::PermissionDenied`]: caller is not an admin
    /// - [`HelpdeskError::Validation`]: empty name
    pub async fn create_team(&self, principal: &Principal, request: CreateTeam) -> Result<Team> {
        Self::authorize(principal, Action::ManageTeams)?;
        require_text("name", &request.name)?;

        let now = self.clock.now();
        let team = Team {
            id: TeamId::from_uuid(self.ids.next_id()),
            name: request.name,
            description: request.description,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_team(&team).await?;
        Ok(team)
    }

    /// Edit a team.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::NotFound`]: unknown team
    /// - [`HelpdeskError::Validation`]: empty name
    pub async fn update_team(&self, principal: &Principal, id: TeamId, request: UpdateTeam) -> Result<Team> {
        Self::authorize(principal, Action::ManageTeams)?;
        let mut team = self
            .store
            .find_team(id)
            .await?
            .ok_or_else(|| HelpdeskError::not_found("Team", id))?;

        if let Some(name) = request.name {
            require_text("name", &name)?;
            team.name = name;
        }
        if let Some(description) = request.description {
            team.description = description;
        }
        team.updated_at = self.clock.now();

        self.store.update_team(&team).await?;
        Ok(team)
    }

    // ------------------------------------------------------------------
    // Categories and tags
    // ------------------------------------------------------------------

    /// All categories.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::Storage`] if the store fails.
    pub async fn list_categories(&self, principal: &Principal) -> Result<Vec<Category>> {
        Self::authorize(principal, Action::ListReferenceData)?;
        Ok(self.store.list_categories().await?)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::PermissionDenied`]: caller is not an admin
    /// - [`HelpdeskError::Validation`]: empty name
    pub async fn create_category(&self, principal: &Principal, request: CreateCategory) -> Result<Category> {
        Self::authorize(principal, Action::ManageCategories)?;
        require_text("name", &request.name)?;

        let category = Category {
            id: CategoryId::from_uuid(self.ids.next_id()),
            name: request.name,
            kind: request.kind,
            description: request.description,
            created_at: self.clock.now(),
        };
        self.store.insert_category(&category).await?;
        Ok(category)
    }

    /// All tags.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::Storage`] if the store fails.
    pub async fn list_tags(&self, principal: &Principal) -> Result<Vec<Tag>> {
        Self::authorize(principal, Action::ListReferenceData)?;
        Ok(self.store.list_tags().await?)
    }

    /// Return the tag called `name`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::Validation`] for a blank name.
    pub async fn create_tag(&self, principal: &Principal, name: String) -> Result<Tag> {
        Self::authorize(principal, Action::CreateTag)?;
        let tags = resolve_or_create_tags(
            self.store.as_ref(),
            self.clock.as_ref(),
            self.ids.as_ref(),
            std::slice::from_ref(&name),
        )
        .await?;
        tags.into_iter()
            .next()
            .ok_or_else(|| HelpdeskError::Internal("tag resolution returned nothing".to_string()))
    }

    // ------------------------------------------------------------------
    // SLA policies
    // ------------------------------------------------------------------

    /// All SLA policies.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::Storage`] if the store fails.
    pub async fn list_sla_policies(&self, principal: &Principal) -> Result<Vec<SlaPolicy>> {
        Self::authorize(principal, Action::ListReferenceData)?;
        Ok(self.store.list_sla_policies().await?)
    }

    /// Create the policy for one priority.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::Validation`]: non-positive target, empty timezone
    /// - [`HelpdeskError::Conflict`]: the priority already has a policy
    pub async fn create_sla_policy(&self, principal: &Principal, request: CreateSlaPolicy) -> Result<SlaPolicy> {
        Self::authorize(principal, Action::ManageSlaSettings)?;
        require_minutes("first_response_target_minutes", request.first_response_target_minutes)?;
        require_minutes("resolution_target_minutes", request.resolution_target_minutes)?;
        require_text("timezone", &request.timezone)?;

        let now = self.clock.now();
        let policy = SlaPolicy {
            id: SlaPolicyId::from_uuid(self.ids.next_id()),
            priority: request.priority,
            first_response_target_minutes: request.first_response_target_minutes,
            resolution_target_minutes: request.resolution_target_minutes,
            pause_on_waiting_customer: request.pause_on_waiting_customer,
            timezone: request.timezone,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_sla_policy(&policy).await?;
        Ok(policy)
    }

    /// Edit an SLA policy.
    ///
    /// # Errors
    ///
    /// - [`HelpdeskError::NotFound`]: unknown policy
    /// - [`HelpdeskError::Validation`]: non-positive target, empty timezone
    pub async fn update_sla_policy(
        &self,
        principal: &Principal,
        id: SlaPolicyId,
        request: UpdateSlaPolicy,
    ) -> Result<SlaPolicy> {
        Self::authorize(principal, Action::ManageSlaSettings)?;
        let mut policy = self
            .store
            .find_sla_policy(id)
            .await?
            .ok_or_else(|| HelpdeskError::not_found("SlaPolicy", id))?;

        if let Some(minutes) = request.first_response_target_minutes {
            require_minutes("first_response_target_minutes", minutes)?;
            policy.first_response_target_minutes = minutes;
        }
        if let Some(minutes) = request.resolution_target_minutes {
            require_minutes("resolution_target_minutes", minutes)?;
            policy.resolution_target_minutes = minutes;
        }
        if let Some(pause) = request.pause_on_waiting_customer {
            policy.pause_on_waiting_customer = pause;
        }
        if let Some(timezone) = request.timezone {
            require_text("timezone", &timezone)?;
            policy.timezone = timezone;
        }
        policy.updated_at = self.clock.now();

        self.store.update_sla_policy(&policy).await?;
        Ok(policy)
    }

    // ------------------------------------------------------------------
    // Audit log
    // ------------------------------------------------------------------

    /// Read the audit log, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`HelpdeskError::PermissionDenied`] unless the caller is an admin.
    pub async fn audit_logs(
        &self,
        principal: &Principal,
        filter: AuditFilter,
        page: PageRequest,
    ) -> Result<Page<AuditEntry>> {
        query::list_audit_entries(self.store.as_ref(), principal, filter, page).await
    }
}
