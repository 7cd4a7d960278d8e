pub mod pricing_repo;
pub use pricing_repo::PricingRepository;
pub mod budget_repo;
pub use budget_repo::{BudgetRepository, NewBudget};
pub mod commission_repo;
pub use commission_repo::CommissionRepository;
