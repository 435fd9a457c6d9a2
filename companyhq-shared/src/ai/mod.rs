/// AI assistant
///
/// - [`provider`]: the `Generator` capability and the Gemini client
/// - [`gateway`]: access checks, daily quota and request logging in front
///   of a generator

pub mod gateway;
pub mod provider;

pub use gateway::{AiAnswer, AiError, AiGateway, QuotaStatus};
pub use provider::{GeminiClient, GenerateError, Generation, Generator};
