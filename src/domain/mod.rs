pub mod errors;
pub mod invoice;
pub mod journal;
pub mod order;
pub mod ports;
pub mod pricing;
pub mod product;
