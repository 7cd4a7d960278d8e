pub mod i18n;
pub mod identity;
pub mod tenancy;
