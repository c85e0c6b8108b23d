use crate::database::DbPool;
use crate::entities::{PlanTier, team_member_entity as team_members};
use crate::error::{AppError, AppResult};
use crate::models::{InviteTeamMemberRequest, TeamMemberResponse, TeamResponse};
use crate::utils::validate_email;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};

/// team 档位的成员上限；enterprise 不限
const TEAM_PLAN_MEMBER_LIMIT: u64 = 10;

#[derive(Clone)]
pub struct TeamService {
    pool: DbPool,
}

impl TeamService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, owner_id: i64, plan: &PlanTier) -> AppResult<TeamResponse> {
        let members = team_members::Entity::find()
            .filter(team_members::Column::OwnerId.eq(owner_id))
            .order_by_asc(team_members::Column::CreatedAt)
            .all(&self.pool)
            .await?;

        Ok(TeamResponse {
            members: members.into_iter().map(TeamMemberResponse::from).collect(),
            limit: match plan {
                PlanTier::Team => TEAM_PLAN_MEMBER_LIMIT as i64,
                _ => -1,
            },
        })
    }

    pub async fn invite(
        &self,
        owner_id: i64,
        plan: &PlanTier,
        request: InviteTeamMemberRequest,
    ) -> AppResult<TeamMemberResponse> {
        validate_email(&request.email)?;

        // team 档位限 10 人
        if *plan == PlanTier::Team {
            let count = team_members::Entity::find()
                .filter(team_members::Column::OwnerId.eq(owner_id))
                .count(&self.pool)
                .await?;
            if count >= TEAM_PLAN_MEMBER_LIMIT {
                return Err(AppError::ValidationError(
                    "Team size limit reached".to_string(),
                ));
            }
        }

        let existing = team_members::Entity::find()
            .filter(team_members::Column::OwnerId.eq(owner_id))
            .filter(team_members::Column::MemberEmail.eq(request.email.as_str()))
            .one(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::ValidationError(
                "Member already invited".to_string(),
            ));
        }

        let created = team_members::ActiveModel {
            owner_id: Set(owner_id),
            member_email: Set(request.email),
            role: Set(request.role),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        Ok(TeamMemberResponse::from(created))
    }

    pub async fn remove(&self, owner_id: i64, member_id: i64) -> AppResult<()> {
        let result = team_members::Entity::delete_many()
            .filter(team_members::Column::Id.eq(member_id))
            .filter(team_members::Column::OwnerId.eq(owner_id))
            .exec(&self.pool)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Team member not found".to_string()));
        }

        Ok(())
    }
}
