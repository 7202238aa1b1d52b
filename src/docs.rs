use crate::api::{
    absence::{AbsenceFilter, AbsenceListResponse, CreateAbsence},
    benefit::{AssignBenefit, BenefitListResponse, BenefitQuery, CreateBenefit},
    company::{CompanyListResponse, CompanyQuery, CreateCompany},
    document::{CreateDocument, DocumentListResponse, DocumentQuery},
    employee::{CreateEmployee, EmployeeListResponse, EmployeeQuery, TerminateEmployee},
    payslip::{GeneratePayslip, PayslipListResponse, PayslipQuery},
    vacation::{CreateVacation, VacationFilter, VacationListResponse},
};
use crate::auth::auth_log::{AuthLogEntry, AuthLogLevel, ErrorCategory};
use crate::model::{
    absence::{AbsenceRequest, AbsenceType},
    benefit::{Benefit, BenefitType},
    company::{Company, TaxRegime},
    document::{Document, DocumentType},
    employee::{Employee, EmployeeStatus},
    payslip::Payslip,
    request_status::RequestStatus,
    vacation::VacationRequest,
};
use crate::models::{LoginReqDto, RegisterReq, TokenPair};
use crate::payroll::{
    ItemKind, LineItem,
    fgts::FgtsSummary,
    termination::{NoticeKind, TerminationInput, TerminationReason, TerminationResult},
    vacation::{VacationInput, VacationResult},
};
use crate::services::cnpj::CompanyLookup;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Folha API",
        version = "1.0.0",
        description = r#"
## HR management and Brazilian payroll

REST API for small companies that run their own HR and payroll under the CLT.

### 🔹 Key Features
- **Companies**: CNPJ validation, public registry lookup and tax regime
- **Employees**: profiles, benefits, documents and termination
- **Payslips**: monthly statements with INSS, IRRF and FGTS
- **Absences & Vacations**: requests with HR approval
- **Simulators**: termination (rescisão) and vacation pay

### 🔐 Security
Endpoints under `/api` require a **JWT Bearer** access token.
HR and Admin manage records; employees only see their own.

### 📦 Response Format
- JSON bodies, errors as `{"message": "..."}`
- Pagination via `page` and `per_page` on list endpoints
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::company::create_company,
        crate::api::company::list_companies,
        crate::api::company::get_company,
        crate::api::company::update_company,
        crate::api::company::delete_company,
        crate::api::company::lookup_cnpj,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::terminate_employee,
        crate::api::employee::delete_employee,

        crate::api::benefit::create_benefit,
        crate::api::benefit::list_benefits,
        crate::api::benefit::get_benefit,
        crate::api::benefit::update_benefit,
        crate::api::benefit::delete_benefit,
        crate::api::benefit::assign_benefit,
        crate::api::benefit::unassign_benefit,
        crate::api::benefit::employee_benefits,

        crate::api::document::create_document,
        crate::api::document::list_documents,
        crate::api::document::get_document,
        crate::api::document::delete_document,

        crate::api::payslip::generate_payslip,
        crate::api::payslip::list_payslips,
        crate::api::payslip::get_payslip,
        crate::api::payslip::delete_payslip,

        crate::api::absence::create_absence,
        crate::api::absence::list_absences,
        crate::api::absence::get_absence,
        crate::api::absence::approve_absence,
        crate::api::absence::reject_absence,

        crate::api::vacation::create_vacation,
        crate::api::vacation::list_vacations,
        crate::api::vacation::get_vacation,
        crate::api::vacation::vacation_simulation,
        crate::api::vacation::approve_vacation,
        crate::api::vacation::reject_vacation,
        crate::api::vacation::cancel_vacation,

        crate::api::simulator::termination,
        crate::api::simulator::vacation,

        crate::api::admin::auth_logs,
        crate::api::admin::clear_auth_logs
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            TokenPair,
            Company,
            TaxRegime,
            CreateCompany,
            CompanyQuery,
            CompanyListResponse,
            CompanyLookup,
            Employee,
            EmployeeStatus,
            CreateEmployee,
            EmployeeQuery,
            EmployeeListResponse,
            TerminateEmployee,
            Benefit,
            BenefitType,
            CreateBenefit,
            BenefitQuery,
            BenefitListResponse,
            AssignBenefit,
            Document,
            DocumentType,
            CreateDocument,
            DocumentQuery,
            DocumentListResponse,
            Payslip,
            GeneratePayslip,
            PayslipQuery,
            PayslipListResponse,
            LineItem,
            ItemKind,
            AbsenceRequest,
            AbsenceType,
            CreateAbsence,
            AbsenceFilter,
            AbsenceListResponse,
            VacationRequest,
            CreateVacation,
            VacationFilter,
            VacationListResponse,
            RequestStatus,
            TerminationInput,
            TerminationResult,
            TerminationReason,
            NoticeKind,
            FgtsSummary,
            VacationInput,
            VacationResult,
            AuthLogEntry,
            AuthLogLevel,
            ErrorCategory
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and token rotation"),
        (name = "Company", description = "Companies and CNPJ lookup"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Benefit", description = "Benefit catalog and assignments"),
        (name = "Document", description = "Employee document metadata"),
        (name = "Payslip", description = "Monthly payslips"),
        (name = "Absence", description = "Absence requests"),
        (name = "Vacation", description = "Vacation requests"),
        (name = "Simulator", description = "Termination and vacation simulators"),
        (name = "Admin", description = "Administration"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_protected_paths_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/payslips"));
        assert!(doc.paths.paths.contains_key("/api/simulators/termination"));
        assert!(doc.paths.paths.contains_key("/auth/login"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
