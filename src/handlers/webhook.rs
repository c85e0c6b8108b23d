use crate::external::stripe::StripeService;
use crate::services::SubscriptionLifecycleService;
use actix_web::{HttpRequest, HttpResponse, Result, web};
use log::{error, info, warn};

/// Stripe webhook处理器
///
/// 基于原始请求体校验签名，再交给生命周期服务应用事件。
/// 处理失败返回 400，依赖 Stripe 的重投作为重试机制
pub async fn stripe_webhook(
    req: HttpRequest,
    body: web::Bytes,
    stripe_service: web::Data<StripeService>,
    lifecycle_service: web::Data<SubscriptionLifecycleService>,
) -> Result<HttpResponse> {
    let signature = match req.headers().get("stripe-signature") {
        Some(sig) => sig.to_str().unwrap_or(""),
        None => {
            warn!("Missing Stripe-Signature header");
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Webhook error"
            })));
        }
    };

    let payload = match std::str::from_utf8(&body) {
        Ok(payload) => payload,
        Err(_) => {
            error!("Invalid UTF-8 in webhook payload");
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Webhook error"
            })));
        }
    };

    // 验证webhook签名，失败时不触碰任何持久化状态
    let event = match stripe_service.verify_webhook_signature(payload, signature) {
        Ok(event) => event,
        Err(e) => {
            error!("Webhook signature verification failed: {e}");
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Webhook error"
            })));
        }
    };

    info!(
        "Received Stripe webhook event: {} ({})",
        event.type_, event.id
    );

    match lifecycle_service.handle_event(event).await {
        Ok(_) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "received": true
        }))),
        Err(e) => {
            // 非 2xx 会让 Stripe 重投，处理分支必须全部可安全重放
            error!("Failed to process webhook event: {e}");
            Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Webhook error"
            })))
        }
    }
}

/// 配置webhook路由
pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/webhooks").route("/stripe", web::post().to(stripe_webhook)));
}
