use actix_cors::Cors;

pub fn create_cors(frontend_url: &str) -> Cors {
    Cors::default()
        .allowed_origin(frontend_url)
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        // 前端自定义 Header 较多，放宽以避免预检失败
        .allow_any_header()
        .supports_credentials()
        .max_age(3600)
}
