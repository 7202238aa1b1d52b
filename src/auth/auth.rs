use crate::auth::auth_log::AuthFailure;
use crate::auth::jwt::{bearer, verify_token};
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::model::role::Role;
use crate::models::TokenType;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let Some(config) = req.app_data::<Data<Config>>() else {
            return ready(Err(ApiError::Internal(anyhow::anyhow!("Config missing"))));
        };

        let header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok());

        ready(
            bearer(header)
                .and_then(|token| AuthUser::from_access_token(token, &config.jwt_secret))
                .map_err(ApiError::from),
        )
    }
}

impl AuthUser {
    pub fn from_access_token(token: &str, secret: &str) -> Result<Self, AuthFailure> {
        let claims = verify_token(token, secret)?;
        if claims.token_type != TokenType::Access {
            return Err(AuthFailure::InvalidToken);
        }
        let role = Role::from_id(claims.role).ok_or(AuthFailure::InvalidToken)?;

        Ok(AuthUser {
            user_id: claims.user_id,
            role,
            employee_id: claims.employee_id,
        })
    }

    pub fn require_admin(&self) -> ApiResult<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin only"))
        }
    }

    pub fn require_hr_or_admin(&self) -> ApiResult<()> {
        if self.is_hr_or_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("HR/Admin only"))
        }
    }

    pub fn is_hr_or_admin(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Hr)
    }

    /// Employee profile linked to this login.
    pub fn own_employee_id(&self) -> ApiResult<u64> {
        self.employee_id
            .ok_or_else(|| ApiError::forbidden("No employee profile"))
    }

    /// HR and admins see everyone; employees only themselves.
    pub fn require_self_or_hr(&self, employee_id: u64) -> ApiResult<()> {
        if self.is_hr_or_admin() || self.employee_id == Some(employee_id) {
            Ok(())
        } else {
            Err(ApiError::forbidden("Not allowed to access another employee's records"))
        }
    }

    /// Employee filter to apply on list endpoints: forced to self for employees.
    pub fn scope_employee_filter(&self, requested: Option<u64>) -> ApiResult<Option<u64>> {
        if self.is_hr_or_admin() {
            Ok(requested)
        } else {
            let own = self.own_employee_id()?;
            match requested {
                Some(id) if id != own => Err(ApiError::forbidden(
                    "Not allowed to access another employee's records",
                )),
                _ => Ok(Some(own)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{TokenSubject, generate_access_token, generate_refresh_token};

    fn user(role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            role,
            employee_id,
        }
    }

    #[test]
    fn employees_are_scoped_to_themselves() {
        let emp = user(Role::Employee, Some(5));
        assert_eq!(emp.scope_employee_filter(None).unwrap(), Some(5));
        assert_eq!(emp.scope_employee_filter(Some(5)).unwrap(), Some(5));
        assert!(emp.scope_employee_filter(Some(6)).is_err());
        assert!(emp.require_self_or_hr(6).is_err());
        assert!(emp.require_hr_or_admin().is_err());
    }

    #[test]
    fn hr_sees_everyone_but_is_not_admin() {
        let hr = user(Role::Hr, None);
        assert_eq!(hr.scope_employee_filter(None).unwrap(), None);
        assert_eq!(hr.scope_employee_filter(Some(6)).unwrap(), Some(6));
        assert!(hr.require_self_or_hr(6).is_ok());
        assert!(hr.require_admin().is_err());
    }

    #[test]
    fn employee_without_profile_is_forbidden() {
        let emp = user(Role::Employee, None);
        assert!(emp.own_employee_id().is_err());
        assert!(emp.scope_employee_filter(None).is_err());
    }

    #[test]
    fn refresh_tokens_are_not_access_tokens() {
        let subject = TokenSubject {
            user_id: 1,
            email: "x@y.com",
            role: 1,
            employee_id: None,
        };
        let access = generate_access_token(&subject, "s", 60).unwrap();
        let (refresh, _) = generate_refresh_token(&subject, "s", 60).unwrap();
        assert_eq!(AuthUser::from_access_token(&access, "s").unwrap().role, Role::Admin);
        assert_eq!(
            AuthUser::from_access_token(&refresh, "s").unwrap_err(),
            AuthFailure::InvalidToken
        );
    }
}
