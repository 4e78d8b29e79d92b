pub mod toxicity_client;

pub use toxicity_client::ToxicityClient;
