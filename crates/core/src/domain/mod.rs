pub mod component;
pub mod money;
pub mod order;
pub mod promotion;
pub mod quote;
pub mod supplier;
pub mod tax;
