use crate::models::{
    SubscriptionStatusResponse, UpdateProfileRequest, UsageResponse, UserResponse,
};
use crate::services::{SubscriptionService, UserService};
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

fn get_account_id_from_request(req: &HttpRequest) -> Option<i64> {
    req.extensions().get::<i64>().copied()
}

#[utoipa::path(
    get,
    path = "/users/me",
    tag = "user",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取当前账号成功", body = UserResponse),
        (status = 401, description = "未授权")
    )
)]
pub async fn me(
    user_service: web::Data<UserService>,
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let account_id = get_account_id_from_request(&req).unwrap_or(0);

    let user = match user_service.get_profile(account_id).await {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    let subscription = match subscription_service.current_subscription(account_id).await {
        Ok(subscription) => subscription
            .map(SubscriptionStatusResponse::from)
            .unwrap_or_else(SubscriptionStatusResponse::none),
        Err(e) => return Ok(e.error_response()),
    };

    Ok(HttpResponse::Ok().json(json!({
        "user": user,
        "subscription": subscription
    })))
}

#[utoipa::path(
    put,
    path = "/users/me",
    tag = "user",
    request_body = UpdateProfileRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "更新账号资料成功", body = UserResponse),
        (status = 400, description = "请求参数错误"),
        (status = 401, description = "未授权")
    )
)]
pub async fn update_me(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    request: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    let account_id = get_account_id_from_request(&req).unwrap_or(0);

    match user_service
        .update_profile(account_id, request.into_inner())
        .await
    {
        Ok(user) => Ok(HttpResponse::Ok().json(user)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/users/usage",
    tag = "user",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取用量统计成功", body = UsageResponse),
        (status = 401, description = "未授权")
    )
)]
pub async fn usage(user_service: web::Data<UserService>, req: HttpRequest) -> Result<HttpResponse> {
    let account_id = get_account_id_from_request(&req).unwrap_or(0);

    match user_service.get_usage(account_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn user_config(cfg: &mut web::ServiceConfig) {
    use crate::handlers::{api_key, team};

    cfg.service(
        web::scope("/users")
            .route("/me", web::get().to(me))
            .route("/me", web::put().to(update_me))
            .route("/usage", web::get().to(usage))
            .route("/api-keys", web::get().to(api_key::list_keys))
            .route("/api-keys", web::post().to(api_key::create_key))
            .route("/api-keys/{key_id}", web::delete().to(api_key::delete_key))
            .route("/team", web::get().to(team::get_team))
            .route("/team/invite", web::post().to(team::invite_member))
            .route("/team/{member_id}", web::delete().to(team::remove_member)),
    );
}
