use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use commitgen_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{OpenAiService, StripeService},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // 创建JWT服务
    let jwt_service = JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expires_in,
        config.jwt.refresh_token_expires_in,
    );

    // 创建外部服务
    let stripe_service = StripeService::new(config.stripe.clone());
    let openai_service = OpenAiService::new(config.openai.clone());

    // 创建服务
    let auth_service = AuthService::new(pool.clone(), jwt_service.clone(), stripe_service.clone());
    let user_service = UserService::new(pool.clone());
    let subscription_service = SubscriptionService::new(
        pool.clone(),
        stripe_service.clone(),
        config.frontend.url.clone(),
    );
    let lifecycle_service = SubscriptionLifecycleService::new(pool.clone(), stripe_service.clone());
    let commit_service = CommitService::new(pool.clone(), openai_service.clone());
    let api_key_service = ApiKeyService::new(pool.clone());
    let team_service = TeamService::new(pool.clone());

    // 启动后台任务：每小时清理事件台账中超出留存窗口的记录
    {
        let lifecycle_service_clone = lifecycle_service.clone();
        tokio::spawn(async move {
            loop {
                match lifecycle_service_clone.prune_processed_events(30).await {
                    Ok(0) => {}
                    Ok(pruned) => {
                        log::info!("Pruned {pruned} processed webhook events");
                    }
                    Err(e) => {
                        log::error!("Failed to prune processed webhook events: {e:?}");
                    }
                }
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            }
        });
    }

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let frontend_url = config.frontend.url.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors(&frontend_url))
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(subscription_service.clone()))
            .app_data(web::Data::new(lifecycle_service.clone()))
            .app_data(web::Data::new(commit_service.clone()))
            .app_data(web::Data::new(api_key_service.clone()))
            .app_data(web::Data::new(team_service.clone()))
            .app_data(web::Data::new(stripe_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api")
                    .configure(handlers::webhook_config)
                    .configure(handlers::auth_config)
                    .configure(handlers::user_config)
                    .configure(handlers::subscription_config)
                    .configure(handlers::commit_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
