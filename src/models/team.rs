use crate::entities::team_member_entity as team_members;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InviteTeamMemberRequest {
    #[schema(example = "teammate@example.com")]
    pub email: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "member".to_string()
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeamMemberResponse {
    pub id: i64,
    pub member_email: String,
    pub role: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<team_members::Model> for TeamMemberResponse {
    fn from(model: team_members::Model) -> Self {
        Self {
            id: model.id,
            member_email: model.member_email,
            role: model.role,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeamResponse {
    pub members: Vec<TeamMemberResponse>,
    /// team 档位上限 10 人，enterprise 不限（-1）
    pub limit: i64,
}
