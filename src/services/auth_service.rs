use crate::database::DbPool;
use crate::entities::account_entity as accounts;
use crate::error::{AppError, AppResult};
use crate::external::StripeService;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, UserResponse};
use crate::utils::{
    JwtService, hash_password, validate_email, validate_password, verify_password,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set};

#[derive(Clone)]
pub struct AuthService {
    pool: DbPool,
    jwt_service: JwtService,
    stripe_service: StripeService,
}

impl AuthService {
    pub fn new(pool: DbPool, jwt_service: JwtService, stripe_service: StripeService) -> Self {
        Self {
            pool,
            jwt_service,
            stripe_service,
        }
    }

    /// 注册：建账号、建对应 Stripe customer、签发令牌。
    /// customer 创建失败时回滚账号行，注册请求整体失败
    pub async fn register(&self, request: RegisterRequest) -> AppResult<AuthResponse> {
        validate_email(&request.email)?;
        validate_password(&request.password)?;
        if request.name.trim().is_empty() {
            return Err(AppError::ValidationError("Name is required".to_string()));
        }

        let existing = accounts::Entity::find()
            .filter(accounts::Column::Email.eq(request.email.as_str()))
            .one(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::ValidationError(
                "Email already registered".to_string(),
            ));
        }

        let password_hash = hash_password(&request.password)?;

        let account = accounts::ActiveModel {
            email: Set(request.email.clone()),
            name: Set(request.name.trim().to_string()),
            password_hash: Set(password_hash),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        let customer = match self
            .stripe_service
            .create_customer(&account.email, &account.name, account.id)
            .await
        {
            Ok(customer) => customer,
            Err(e) => {
                // 清理：billing 注册失败时不留下半成品账号
                log::error!("Stripe customer creation failed, rolling back account: {e}");
                accounts::Entity::delete_by_id(account.id)
                    .exec(&self.pool)
                    .await?;
                return Err(e);
            }
        };

        let mut model = account.clone().into_active_model();
        model.stripe_customer_id = Set(Some(customer.id.to_string()));
        let account = model.update(&self.pool).await?;

        log::info!("Registered account {} ({})", account.id, account.email);
        self.issue_tokens(account)
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        let account = accounts::Entity::find()
            .filter(accounts::Column::Email.eq(request.email.as_str()))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::AuthError("Invalid credentials".to_string()))?;

        if !verify_password(&request.password, &account.password_hash)? {
            return Err(AppError::AuthError("Invalid credentials".to_string()));
        }

        self.issue_tokens(account)
    }

    /// 用 refresh token 换新令牌对
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthResponse> {
        let claims = self.jwt_service.verify_refresh_token(refresh_token)?;
        let account_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;

        let account = accounts::Entity::find_by_id(account_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::AuthError("Account no longer exists".to_string()))?;

        self.issue_tokens(account)
    }

    pub async fn get_account(&self, account_id: i64) -> AppResult<accounts::Model> {
        accounts::Entity::find_by_id(account_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
    }

    fn issue_tokens(&self, account: accounts::Model) -> AppResult<AuthResponse> {
        let access_token = self
            .jwt_service
            .generate_access_token(account.id, &account.email)?;
        let refresh_token = self
            .jwt_service
            .generate_refresh_token(account.id, &account.email)?;
        let expires_in = self.jwt_service.get_access_token_expires_in();

        Ok(AuthResponse {
            user: UserResponse::from(account),
            access_token,
            refresh_token,
            expires_in,
        })
    }
}
