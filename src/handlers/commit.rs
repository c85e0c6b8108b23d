use crate::models::{
    AnalyzeCommitsRequest, AnalyzeCommitsResponse, GenerateCommitRequest, GenerateCommitResponse,
    PaginationParams, StylesResponse,
};
use crate::services::{CommitService, SubscriptionService};
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};

fn get_account_id_from_request(req: &HttpRequest) -> Option<i64> {
    req.extensions().get::<i64>().copied()
}

#[utoipa::path(
    post,
    path = "/commits/generate",
    tag = "commit",
    request_body = GenerateCommitRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "生成成功", body = GenerateCommitResponse),
        (status = 400, description = "缺少 diff"),
        (status = 401, description = "未授权"),
        (status = 403, description = "需要生效订阅"),
        (status = 500, description = "生成失败")
    )
)]
pub async fn generate(
    commit_service: web::Data<CommitService>,
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    request: web::Json<GenerateCommitRequest>,
) -> Result<HttpResponse> {
    let account_id = get_account_id_from_request(&req).unwrap_or(0);

    // 任一档位的生效订阅即可生成
    if let Err(e) = subscription_service.require_any_plan(account_id).await {
        return Ok(e.error_response());
    }

    match commit_service.generate(account_id, request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/commits/history",
    tag = "commit",
    params(
        ("page" = Option<i64>, Query, description = "页码"),
        ("per_page" = Option<i64>, Query, description = "每页数量")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取历史成功"),
        (status = 401, description = "未授权")
    )
)]
pub async fn history(
    commit_service: web::Data<CommitService>,
    req: HttpRequest,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let account_id = get_account_id_from_request(&req).unwrap_or(0);

    match commit_service.get_history(account_id, &query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/commits/analyze",
    tag = "commit",
    request_body = AnalyzeCommitsRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "分析成功", body = AnalyzeCommitsResponse),
        (status = 400, description = "没有可分析的提交"),
        (status = 403, description = "需要 team 或 enterprise 套餐")
    )
)]
pub async fn analyze(
    commit_service: web::Data<CommitService>,
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    request: web::Json<AnalyzeCommitsRequest>,
) -> Result<HttpResponse> {
    let account_id = get_account_id_from_request(&req).unwrap_or(0);

    if let Err(e) = subscription_service.require_team_plan(account_id).await {
        return Ok(e.error_response());
    }

    match commit_service.analyze(account_id, request.limit).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/commits/styles",
    tag = "commit",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "可用风格列表", body = StylesResponse)
    )
)]
pub async fn styles(commit_service: web::Data<CommitService>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(commit_service.styles()))
}

pub fn commit_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/commits")
            .route("/generate", web::post().to(generate))
            .route("/history", web::get().to(history))
            .route("/analyze", web::post().to(analyze))
            .route("/styles", web::get().to(styles)),
    );
}
