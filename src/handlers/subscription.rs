use crate::models::{
    CancelResponse, CheckoutRequest, CheckoutResponse, PortalResponse, SubscriptionStatusResponse,
    UpdatePlanRequest, UpdatePlanResponse,
};
use crate::services::{AuthService, SubscriptionService};
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};

fn get_account_id_from_request(req: &HttpRequest) -> Option<i64> {
    req.extensions().get::<i64>().copied()
}

#[utoipa::path(
    post,
    path = "/subscriptions/checkout",
    tag = "subscription",
    request_body = CheckoutRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "创建 checkout 会话成功", body = CheckoutResponse),
        (status = 400, description = "套餐无效或已有生效订阅"),
        (status = 401, description = "未授权")
    )
)]
pub async fn checkout(
    subscription_service: web::Data<SubscriptionService>,
    auth_service: web::Data<AuthService>,
    req: HttpRequest,
    request: web::Json<CheckoutRequest>,
) -> Result<HttpResponse> {
    let account_id = get_account_id_from_request(&req).unwrap_or(0);

    let account = match auth_service.get_account(account_id).await {
        Ok(account) => account,
        Err(e) => return Ok(e.error_response()),
    };

    match subscription_service
        .create_checkout(&account, &request.plan)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/update",
    tag = "subscription",
    request_body = UpdatePlanRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "换档成功", body = UpdatePlanResponse),
        (status = 400, description = "无生效订阅或套餐无效"),
        (status = 401, description = "未授权")
    )
)]
pub async fn update_plan(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    request: web::Json<UpdatePlanRequest>,
) -> Result<HttpResponse> {
    let account_id = get_account_id_from_request(&req).unwrap_or(0);

    match subscription_service
        .update_plan(account_id, &request.new_plan)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/cancel",
    tag = "subscription",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已安排取消", body = CancelResponse),
        (status = 400, description = "无生效订阅"),
        (status = 401, description = "未授权")
    )
)]
pub async fn cancel(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let account_id = get_account_id_from_request(&req).unwrap_or(0);

    match subscription_service.cancel(account_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/portal",
    tag = "subscription",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "创建账单门户会话成功", body = PortalResponse),
        (status = 401, description = "未授权")
    )
)]
pub async fn portal(
    subscription_service: web::Data<SubscriptionService>,
    auth_service: web::Data<AuthService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let account_id = get_account_id_from_request(&req).unwrap_or(0);

    let account = match auth_service.get_account(account_id).await {
        Ok(account) => account,
        Err(e) => return Ok(e.error_response()),
    };

    match subscription_service.create_portal(&account).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/subscriptions/status",
    tag = "subscription",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "当前订阅状态", body = SubscriptionStatusResponse),
        (status = 401, description = "未授权")
    )
)]
pub async fn status(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let account_id = get_account_id_from_request(&req).unwrap_or(0);

    match subscription_service.status(account_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn subscription_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/subscriptions")
            .route("/checkout", web::post().to(checkout))
            .route("/update", web::post().to(update_plan))
            .route("/cancel", web::post().to(cancel))
            .route("/portal", web::post().to(portal))
            .route("/status", web::get().to(status)),
    );
}
