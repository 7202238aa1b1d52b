use crate::auth::auth::AuthUser;
use crate::auth::auth_log::{self, AuthFailure};
use crate::auth::jwt::bearer;
use crate::config::Config;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let Some(config) = req.app_data::<Data<Config>>().cloned() else {
        let failure = AuthFailure::MissingConfig("app config missing from app data".to_string());
        auth_log::global().failure("middleware", &failure, json!({ "path": req.path() }));
        let resp = HttpResponse::InternalServerError().json(json!({"message": failure.user_message()}));
        return Ok(req.into_response(resp.map_into_boxed_body()));
    };

    let header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    let auth_user = match bearer(header)
        .and_then(|token| AuthUser::from_access_token(token, &config.jwt_secret))
    {
        Ok(user) => user,
        Err(failure) => {
            auth_log::global().failure(
                "middleware",
                &failure,
                json!({ "path": req.path(), "method": req.method().as_str() }),
            );
            let resp = HttpResponse::Unauthorized().json(json!({"message": failure.user_message()}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}
