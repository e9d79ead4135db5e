pub mod config;
pub mod error;
pub mod model;
pub mod services;

pub use config::Settings;
pub use error::{PipelineError, PipelineResult, ProviderError};
pub use model::mapping::{LocaleMapping, MappingShape};
pub use model::report::RunReport;
pub use services::client::{OpenAiTranslator, TranslationClient, Translator};
pub use services::mock::{MockMode, MockTranslator};
pub use services::pipeline::{run, RunOptions};
