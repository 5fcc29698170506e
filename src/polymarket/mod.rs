pub mod data_client;
pub mod gamma_client;
pub mod types;

pub use data_client::DataClient;
pub use gamma_client::GammaClient;
pub use types::ApiUserProfile;
