pub mod exporter;
pub mod loader;
pub mod utils;

pub use exporter::export_table;
pub use loader::WorkbookLoader;
