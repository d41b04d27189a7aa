//! Role resolution and capability checks.
//!
//! DESIGN
//! ======
//! A signed-in user is resolved to exactly one role per request by a fixed
//! cascade: an active `staff` row wins, then gym ownership, and otherwise the
//! user is a member (linked to a gym only when a `members` row points at
//! them). Capabilities are a static table over roles; every staff-facing
//! service call is scoped to the `gym_id` carried by the resolved `Access`.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Manager,
    Trainer,
    Receptionist,
    Member,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Manager => "manager",
            Self::Trainer => "trainer",
            Self::Receptionist => "receptionist",
            Self::Member => "member",
        }
    }

    /// Parse a role stored on a `staff` row. Owner and member are never
    /// stored there.
    #[must_use]
    pub fn from_staff_role(value: &str) -> Option<Self> {
        match value {
            "manager" => Some(Self::Manager),
            "trainer" => Some(Self::Trainer),
            "receptionist" => Some(Self::Receptionist),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_staff(self) -> bool {
        !matches!(self, Self::Member)
    }

    #[must_use]
    pub fn allows(self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            Self::Owner => true,
            Self::Manager => !matches!(capability, ManageGym | ManageStaff),
            Self::Receptionist => matches!(
                capability,
                ManageMembers | RecordPayments | RequestRefunds | ManageFollowUps | CheckIn
            ),
            Self::Trainer => matches!(capability, ManageFollowUps | ManageTraining | CheckIn),
            Self::Member => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ManageGym,
    ManageStaff,
    ManageMembers,
    ManagePackages,
    RecordPayments,
    RequestRefunds,
    ReviewRefunds,
    ManageFollowUps,
    ManageTraining,
    ManageExpenses,
    ViewReports,
    CheckIn,
    ViewActivity,
}

/// The caller's resolved identity for one request.
#[derive(Debug, Clone, Serialize)]
pub struct Access {
    pub user_id: Uuid,
    pub role: Role,
    pub gym_id: Option<Uuid>,
    /// Set when the role came from a `staff` row.
    pub staff_id: Option<Uuid>,
    /// Set when the user is linked to a `members` row in `gym_id`.
    pub member_id: Option<Uuid>,
}

impl Access {
    /// Require a capability and return the gym it applies to.
    ///
    /// # Errors
    ///
    /// `Forbidden` when the role lacks the capability or the user has no gym.
    pub fn require(&self, capability: Capability) -> Result<Uuid, ServiceError> {
        if !self.role.allows(capability) {
            return Err(ServiceError::Forbidden("role lacks permission"));
        }
        self.gym_id.ok_or(ServiceError::Forbidden("no gym associated with account"))
    }

    /// Require a linked member row (self-service endpoints).
    ///
    /// # Errors
    ///
    /// `Forbidden` when the user is not a member of any gym.
    pub fn require_member(&self) -> Result<(Uuid, Uuid), ServiceError> {
        match (self.gym_id, self.member_id) {
            (Some(gym_id), Some(member_id)) => Ok((gym_id, member_id)),
            _ => Err(ServiceError::Forbidden("no member profile associated with account")),
        }
    }

    /// Trainers only ever see their own sessions.
    #[must_use]
    pub fn trainer_scope(&self) -> Option<Uuid> {
        if self.role == Role::Trainer { self.staff_id } else { None }
    }
}

/// Resolve `user_id` to a role via staff → gym owner → member.
pub async fn resolve(pool: &PgPool, user_id: Uuid) -> Result<Access, sqlx::Error> {
    let staff = sqlx::query_as::<_, (Uuid, Uuid, String)>(
        "SELECT id, gym_id, role FROM staff
         WHERE user_id = $1 AND active
         ORDER BY created_at ASC
         LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    if let Some((staff_id, gym_id, role)) = staff {
        if let Some(role) = Role::from_staff_role(&role) {
            return Ok(Access { user_id, role, gym_id: Some(gym_id), staff_id: Some(staff_id), member_id: None });
        }
    }

    let owned_gym: Option<Uuid> = sqlx::query_scalar("SELECT id FROM gyms WHERE owner_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    if let Some(gym_id) = owned_gym {
        return Ok(Access { user_id, role: Role::Owner, gym_id: Some(gym_id), staff_id: None, member_id: None });
    }

    let member = sqlx::query_as::<_, (Uuid, Uuid)>(
        "SELECT id, gym_id FROM members
         WHERE user_id = $1
         ORDER BY created_at DESC
         LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(Access {
        user_id,
        role: Role::Member,
        gym_id: member.map(|(_, gym_id)| gym_id),
        staff_id: None,
        member_id: member.map(|(member_id, _)| member_id),
    })
}

#[cfg(test)]
#[path = "access_test.rs"]
mod tests;
