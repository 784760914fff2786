pub mod pricing;
pub mod product;
pub mod quote;
pub mod wizard;
