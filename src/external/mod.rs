pub mod openai;
pub mod stripe;

pub use openai::OpenAiService;
pub use stripe::StripeService;
