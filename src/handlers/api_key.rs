use crate::models::{CreateApiKeyRequest, CreatedApiKeyResponse};
use crate::services::ApiKeyService;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

fn get_account_id_from_request(req: &HttpRequest) -> Option<i64> {
    req.extensions().get::<i64>().copied()
}

#[utoipa::path(
    get,
    path = "/users/api-keys",
    tag = "api-key",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取 API key 列表成功"),
        (status = 401, description = "未授权")
    )
)]
pub async fn list_keys(
    api_key_service: web::Data<ApiKeyService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let account_id = get_account_id_from_request(&req).unwrap_or(0);

    match api_key_service.list(account_id).await {
        Ok(keys) => Ok(HttpResponse::Ok().json(keys)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/users/api-keys",
    tag = "api-key",
    request_body = CreateApiKeyRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "创建成功，完整密钥只返回这一次", body = CreatedApiKeyResponse),
        (status = 400, description = "请求参数错误")
    )
)]
pub async fn create_key(
    api_key_service: web::Data<ApiKeyService>,
    req: HttpRequest,
    request: web::Json<CreateApiKeyRequest>,
) -> Result<HttpResponse> {
    let account_id = get_account_id_from_request(&req).unwrap_or(0);

    match api_key_service.create(account_id, request.into_inner()).await {
        Ok(created) => Ok(HttpResponse::Created().json(created)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/users/api-keys/{key_id}",
    tag = "api-key",
    params(
        ("key_id" = i64, Path, description = "API key ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已停用"),
        (status = 404, description = "API key 不存在")
    )
)]
pub async fn delete_key(
    api_key_service: web::Data<ApiKeyService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let account_id = get_account_id_from_request(&req).unwrap_or(0);
    let key_id = path.into_inner();

    match api_key_service.deactivate(account_id, key_id).await {
        Ok(_) => Ok(HttpResponse::Ok().json(json!({ "message": "API key deleted" }))),
        Err(e) => Ok(e.error_response()),
    }
}
