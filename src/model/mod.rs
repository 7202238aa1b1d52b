pub mod absence;
pub mod benefit;
pub mod company;
pub mod document;
pub mod employee;
pub mod payslip;
pub mod request_status;
pub mod role;
pub mod user;
pub mod vacation;
