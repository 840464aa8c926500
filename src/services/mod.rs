pub mod excel;
pub mod explore;
