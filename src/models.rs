pub mod budget;
pub mod commission;
pub mod pagination;
pub mod pricing;
