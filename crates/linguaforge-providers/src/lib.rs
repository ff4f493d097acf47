//! linguaforge-providers — external service integrations.
//!
//! Implements the `TextJudge` and `SpeechTranscriber` traits over HTTP
//! (OpenAI-compatible chat completions and an AssemblyAI-style speech API),
//! plus deterministic mocks for tests and offline use.

pub mod config;
pub mod error;
pub mod judge;
pub mod mock;
pub mod speech;

pub use config::{
    create_judge, create_transcriber, load_config, load_config_from, JudgeConfig,
    LinguaforgeConfig, SpeechConfig,
};
pub use error::ProviderError;
pub use judge::ChatJudge;
pub use mock::{MockJudge, MockTranscriber};
pub use speech::PollingTranscriber;
