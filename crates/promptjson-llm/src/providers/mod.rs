pub mod openai_compatible;
pub mod cohere;

pub use openai_compatible::{OpenAiCompatibleFormat, OpenAiCompatibleProvider};
pub use cohere::{CohereFormat, CohereProvider};
