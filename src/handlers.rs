pub mod budgets;
pub mod commissions;
pub mod pricing;
