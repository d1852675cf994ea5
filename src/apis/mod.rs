pub mod chizhik;
pub mod factory;
pub mod pyaterochka;

pub use factory::{create_crawler, create_crawlers};
