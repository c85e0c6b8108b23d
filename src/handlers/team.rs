use crate::models::{InviteTeamMemberRequest, TeamMemberResponse, TeamResponse};
use crate::services::{SubscriptionService, TeamService};
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

fn get_account_id_from_request(req: &HttpRequest) -> Option<i64> {
    req.extensions().get::<i64>().copied()
}

#[utoipa::path(
    get,
    path = "/users/team",
    tag = "team",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取团队成员成功", body = TeamResponse),
        (status = 403, description = "需要 team 或 enterprise 套餐")
    )
)]
pub async fn get_team(
    team_service: web::Data<TeamService>,
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let account_id = get_account_id_from_request(&req).unwrap_or(0);

    let subscription = match subscription_service.require_team_plan(account_id).await {
        Ok(subscription) => subscription,
        Err(e) => return Ok(e.error_response()),
    };

    match team_service.list(account_id, &subscription.plan).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/users/team/invite",
    tag = "team",
    request_body = InviteTeamMemberRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "邀请成功", body = TeamMemberResponse),
        (status = 400, description = "超出团队人数上限或邮箱无效"),
        (status = 403, description = "需要 team 或 enterprise 套餐")
    )
)]
pub async fn invite_member(
    team_service: web::Data<TeamService>,
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    request: web::Json<InviteTeamMemberRequest>,
) -> Result<HttpResponse> {
    let account_id = get_account_id_from_request(&req).unwrap_or(0);

    let subscription = match subscription_service.require_team_plan(account_id).await {
        Ok(subscription) => subscription,
        Err(e) => return Ok(e.error_response()),
    };

    match team_service
        .invite(account_id, &subscription.plan, request.into_inner())
        .await
    {
        Ok(member) => Ok(HttpResponse::Created().json(json!({
            "message": "Invitation sent",
            "member": member
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/users/team/{member_id}",
    tag = "team",
    params(
        ("member_id" = i64, Path, description = "团队成员 ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已移除"),
        (status = 403, description = "需要 team 或 enterprise 套餐"),
        (status = 404, description = "成员不存在")
    )
)]
pub async fn remove_member(
    team_service: web::Data<TeamService>,
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let account_id = get_account_id_from_request(&req).unwrap_or(0);
    let member_id = path.into_inner();

    if let Err(e) = subscription_service.require_team_plan(account_id).await {
        return Ok(e.error_response());
    }

    match team_service.remove(account_id, member_id).await {
        Ok(_) => Ok(HttpResponse::Ok().json(json!({ "message": "Team member removed" }))),
        Err(e) => Ok(e.error_response()),
    }
}
