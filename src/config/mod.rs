//! Configuration module

mod settings;

pub use settings::FormatSettings;
pub use settings::PageConfig;
pub use settings::RenderConfig;
