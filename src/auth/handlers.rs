use crate::{
    auth::{
        auth::AuthUser,
        auth_log::{self, AuthFailure, AuthLogLevel},
        jwt::{TokenSubject, bearer, generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, is_strong_enough, verify_password},
    },
    config::Config,
    error::{ApiError, ApiResult},
    model::{role::Role, user::User},
    models::{LoginReqDto, RegisterReq, TokenPair, TokenType},
};
use actix_web::{HttpRequest, HttpResponse, web};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, info, instrument};

// auth end points

/// Logs the failure to the auth log and turns it into the HTTP error.
fn reject(event: &str, failure: AuthFailure, context: serde_json::Value) -> ApiError {
    auth_log::global().failure(event, &failure, context);
    failure.into()
}

fn backend(e: impl std::fmt::Display) -> AuthFailure {
    AuthFailure::Backend(e.to_string())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Cheap shape check; the address is confirmed by whoever reads the mailbox.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}

fn authorization(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
}

async fn store_refresh_token(pool: &MySqlPool, user_id: u64, jti: &str, exp: usize) -> Result<(), AuthFailure> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(user_id)
    .bind(jti)
    .bind(exp as i64)
    .execute(pool)
    .await
    .map_err(backend)?;
    Ok(())
}

async fn issue_pair(pool: &MySqlPool, config: &Config, subject: &TokenSubject<'_>) -> Result<TokenPair, AuthFailure> {
    let access_token = generate_access_token(subject, &config.jwt_secret, config.access_token_ttl)?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl)?;

    debug!(user_id = subject.user_id, "Storing refresh token");
    store_refresh_token(pool, subject.user_id, &refresh_claims.jti, refresh_claims.exp).await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// User registration handler
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered"),
        (status = 400, description = "Invalid email or weak password"),
        (status = 403, description = "Only admins may grant elevated roles"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip_all)]
pub async fn register(
    caller: Option<AuthUser>,
    user: web::Json<RegisterReq>,
    pool: web::Data<MySqlPool>,
) -> ApiResult<HttpResponse> {
    let email = normalize_email(&user.email);
    let context = json!({ "email": email });

    if !is_valid_email(&email) {
        return Err(reject("register", AuthFailure::InvalidEmail, context));
    }
    if !is_strong_enough(&user.password) {
        return Err(reject("register", AuthFailure::WeakPassword, context));
    }

    let role = match user.role_id {
        None => Role::Employee,
        Some(id) => Role::from_id(id).ok_or_else(|| ApiError::bad_request("Unknown role"))?,
    };
    if role != Role::Employee || user.employee_id.is_some() {
        match &caller {
            Some(c) if role == Role::Employee => c.require_hr_or_admin()?,
            Some(c) => c.require_admin()?,
            None => {
                return Err(ApiError::forbidden("Sign in as HR or admin to link profiles or grant roles"));
            }
        }
    }

    let hashed = hash_password(&user.password)
        .map_err(|e| reject("register", backend(e), context.clone()))?;

    let result = sqlx::query(
        r#"INSERT INTO users (email, password, role_id, employee_id) VALUES (?, ?, ?, ?)"#,
    )
    .bind(&email)
    .bind(&hashed)
    .bind(role.id())
    .bind(user.employee_id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(done) => {
            auth_log::global().log(
                AuthLogLevel::Info,
                "register",
                "User registered",
                json!({ "email": email, "user_id": done.last_insert_id(), "role": role.id() }),
            );
            Ok(HttpResponse::Created().json(json!({
                "message": "User registered successfully"
            })))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
            Err(reject("register", AuthFailure::EmailTaken, context))
        }
        Err(e) => Err(reject("register", backend(e), context)),
    }
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token pair", body = TokenPair),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account disabled")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip_all)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    let email = normalize_email(&user.email);
    let context = json!({ "email": email });

    // 1️⃣ Basic validation
    if email.is_empty() || user.password.is_empty() {
        return Err(reject("login", AuthFailure::InvalidCredentials, context));
    }

    // 2️⃣ Fetch user
    let db_user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password, role_id, employee_id, is_active, last_login_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| reject("login", backend(e), context.clone()))?
    .ok_or_else(|| reject("login", AuthFailure::InvalidCredentials, context.clone()))?;

    // 3️⃣ Verify password
    if verify_password(&user.password, &db_user.password).is_err() {
        return Err(reject("login", AuthFailure::InvalidCredentials, context));
    }
    if !db_user.is_active {
        return Err(reject("login", AuthFailure::InactiveAccount, context));
    }

    // 4️⃣ Tokens
    let subject = TokenSubject {
        user_id: db_user.id,
        email: &db_user.email,
        role: db_user.role_id,
        employee_id: db_user.employee_id,
    };
    let pair = issue_pair(pool.get_ref(), &config, &subject)
        .await
        .map_err(|f| reject("login", f, context.clone()))?;

    // 5️⃣ Update last_login_at (non-fatal)
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        auth_log::global().log(
            AuthLogLevel::Warn,
            "login",
            "Failed to update last_login_at",
            json!({ "user_id": db_user.id, "error": e.to_string() }),
        );
    }

    auth_log::global().log(
        AuthLogLevel::Info,
        "login",
        "Login successful",
        json!({ "email": email, "user_id": db_user.id, "previous_login": db_user.last_login_at }),
    );
    info!(user_id = db_user.id, "Login successful");

    Ok(HttpResponse::Ok().json(pair))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Rotated token pair", body = TokenPair),
        (status = 401, description = "Invalid, expired or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    let claims = bearer(authorization(&req))
        .and_then(|token| verify_token(token, &config.jwt_secret))
        .map_err(|f| reject("refresh", f, serde_json::Value::Null))?;
    let context = json!({ "user_id": claims.user_id, "jti": claims.jti });

    if claims.token_type != TokenType::Refresh {
        return Err(reject("refresh", AuthFailure::InvalidToken, context));
    }

    // 🔥 revoke the presented token; zero rows means unknown or already used
    let revoked = sqlx::query(
        "UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ? AND revoked = FALSE",
    )
    .bind(&claims.jti)
    .execute(pool.get_ref())
    .await
    .map_err(|e| reject("refresh", backend(e), context.clone()))?;

    if revoked.rows_affected() == 0 {
        return Err(reject("refresh", AuthFailure::TokenRevoked, context));
    }

    // 🔄 issue new pair
    let subject = TokenSubject {
        user_id: claims.user_id,
        email: &claims.sub,
        role: claims.role,
        employee_id: claims.employee_id,
    };
    let pair = issue_pair(pool.get_ref(), &config, &subject)
        .await
        .map_err(|f| reject("refresh", f, context.clone()))?;

    auth_log::global().log(AuthLogLevel::Debug, "refresh", "Refresh token rotated", context);

    Ok(HttpResponse::Ok().json(pair))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Refresh token revoked (idempotent)")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> HttpResponse {
    // 1️⃣ only a valid refresh token can log out
    let claims = match bearer(authorization(&req))
        .and_then(|token| verify_token(token, &config.jwt_secret))
    {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    // 2️⃣ revoke refresh token (idempotent)
    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        auth_log::global().failure("logout", &backend(e), json!({ "user_id": claims.user_id }));
    } else {
        auth_log::global().log(
            AuthLogLevel::Info,
            "logout",
            "Logged out",
            json!({ "user_id": claims.user_id }),
        );
    }

    // 3️⃣ success (even if token didn't exist)
    HttpResponse::NoContent().finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_check() {
        assert!(is_valid_email("maria@empresa.com.br"));
        assert!(!is_valid_email("maria"));
        assert!(!is_valid_email("@empresa.com"));
        assert!(!is_valid_email("maria@empresa"));
        assert!(!is_valid_email("maria@@empresa.com"));
        assert!(!is_valid_email("maria silva@empresa.com"));
        assert!(!is_valid_email("maria@empresa."));
    }

    #[test]
    fn emails_are_normalized_before_lookup() {
        assert_eq!(normalize_email("  Maria@Empresa.COM "), "maria@empresa.com");
    }
}
