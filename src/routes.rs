use crate::{
    api::{absence, admin, benefit, company, document, employee, payslip, simulator, vacation},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::anyhow;
use std::sync::Arc;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-route limiters, built once at startup and shared by every worker.
#[derive(Clone)]
pub struct Limiters {
    login: Limiter,
    register: Limiter,
    refresh: Limiter,
    protected: Limiter,
}

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> anyhow::Result<Limiter> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit of {requests_per_min} requests per minute"))?;
    Ok(Arc::new(Governor::new(&cfg)))
}

impl Limiters {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            login: build_limiter(config.rate_login_per_min)?,
            register: build_limiter(config.rate_register_per_min)?,
            refresh: build_limiter(config.rate_refresh_per_min)?,
            protected: build_limiter(config.rate_protected_per_min)?,
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(limiters.register.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(limiters.refresh.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiters.protected.clone()) // rate limiting
            .service(
                web::scope("/companies")
                    .service(
                        web::resource("")
                            .route(web::post().to(company::create_company))
                            .route(web::get().to(company::list_companies)),
                    )
                    // /companies/cnpj/{cnpj}
                    .service(web::resource("/cnpj/{cnpj}").route(web::get().to(company::lookup_cnpj)))
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(company::get_company))
                            .route(web::put().to(company::update_company))
                            .route(web::delete().to(company::delete_company)),
                    ),
            )
            .service(
                web::scope("/employees")
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    )
                    .service(
                        web::resource("/{id}/terminate")
                            .route(web::post().to(employee::terminate_employee)),
                    )
                    // /employees/{id}/benefits
                    .service(
                        web::resource("/{id}/benefits")
                            .route(web::get().to(benefit::employee_benefits))
                            .route(web::post().to(benefit::assign_benefit)),
                    )
                    .service(
                        web::resource("/{id}/benefits/{benefit_id}")
                            .route(web::delete().to(benefit::unassign_benefit)),
                    ),
            )
            .service(
                web::scope("/benefits")
                    .service(
                        web::resource("")
                            .route(web::post().to(benefit::create_benefit))
                            .route(web::get().to(benefit::list_benefits)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(benefit::get_benefit))
                            .route(web::put().to(benefit::update_benefit))
                            .route(web::delete().to(benefit::delete_benefit)),
                    ),
            )
            .service(
                web::scope("/documents")
                    .service(
                        web::resource("")
                            .route(web::post().to(document::create_document))
                            .route(web::get().to(document::list_documents)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(document::get_document))
                            .route(web::delete().to(document::delete_document)),
                    ),
            )
            .service(
                web::scope("/payslips")
                    .service(
                        web::resource("")
                            .route(web::post().to(payslip::generate_payslip))
                            .route(web::get().to(payslip::list_payslips)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(payslip::get_payslip))
                            .route(web::delete().to(payslip::delete_payslip)),
                    ),
            )
            .service(
                web::scope("/absences")
                    .service(
                        web::resource("")
                            .route(web::get().to(absence::list_absences))
                            .route(web::post().to(absence::create_absence)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(absence::get_absence)))
                    // /absences/{id}/approve
                    .service(
                        web::resource("/{id}/approve").route(web::put().to(absence::approve_absence)),
                    )
                    // /absences/{id}/reject
                    .service(
                        web::resource("/{id}/reject").route(web::put().to(absence::reject_absence)),
                    ),
            )
            .service(
                web::scope("/vacations")
                    .service(
                        web::resource("")
                            .route(web::get().to(vacation::list_vacations))
                            .route(web::post().to(vacation::create_vacation)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(vacation::get_vacation)))
                    .service(
                        web::resource("/{id}/simulation")
                            .route(web::get().to(vacation::vacation_simulation)),
                    )
                    .service(
                        web::resource("/{id}/approve").route(web::put().to(vacation::approve_vacation)),
                    )
                    .service(
                        web::resource("/{id}/reject").route(web::put().to(vacation::reject_vacation)),
                    )
                    .service(
                        web::resource("/{id}/cancel").route(web::put().to(vacation::cancel_vacation)),
                    ),
            )
            .service(
                web::scope("/simulators")
                    .route("/termination", web::post().to(simulator::termination))
                    .route("/vacation", web::post().to(simulator::vacation)),
            )
            .service(
                web::resource("/admin/auth-logs")
                    .route(web::get().to(admin::auth_logs))
                    .route(web::delete().to(admin::clear_auth_logs)),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns rotated token pair

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_still_builds_a_limiter() {
        assert!(build_limiter(0).is_ok());
        assert!(build_limiter(1000).is_ok());
    }
}
