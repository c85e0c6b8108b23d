use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{PlanTier, SubscriptionStatus};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::user::me,
        handlers::user::update_me,
        handlers::user::usage,
        handlers::subscription::checkout,
        handlers::subscription::update_plan,
        handlers::subscription::cancel,
        handlers::subscription::portal,
        handlers::subscription::status,
        handlers::commit::generate,
        handlers::commit::history,
        handlers::commit::analyze,
        handlers::commit::styles,
        handlers::api_key::list_keys,
        handlers::api_key::create_key,
        handlers::api_key::delete_key,
        handlers::team::get_team,
        handlers::team::invite_member,
        handlers::team::remove_member,
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            AuthResponse,
            UserResponse,
            UpdateProfileRequest,
            UsageSnapshot,
            UsageResponse,
            CheckoutRequest,
            CheckoutResponse,
            UpdatePlanRequest,
            UpdatePlanResponse,
            SubscriptionSummary,
            CancelResponse,
            PortalResponse,
            SubscriptionStatusResponse,
            GenerateCommitRequest,
            GenerateCommitResponse,
            CommitHistoryItem,
            AnalyzeCommitsRequest,
            AnalyzeCommitsResponse,
            StylesResponse,
            CreateApiKeyRequest,
            ApiKeyResponse,
            CreatedApiKeyResponse,
            InviteTeamMemberRequest,
            TeamMemberResponse,
            TeamResponse,
            PlanTier,
            SubscriptionStatus,
            CommitStyle,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication API"),
        (name = "user", description = "Account management API"),
        (name = "subscription", description = "Subscription and billing API"),
        (name = "commit", description = "Commit message generation API"),
        (name = "api-key", description = "API key management"),
        (name = "team", description = "Team management API"),
    ),
    info(
        title = "CommitGen Backend API",
        version = "1.0.0",
        description = "AI commit message generator REST API documentation",
    ),
    servers(
        (url = "/api", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
