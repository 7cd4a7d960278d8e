pub mod pricing_service;
pub use pricing_service::PricingService;
pub mod budget_service;
pub use budget_service::BudgetService;
pub mod commission_service;
pub use commission_service::CommissionService;
