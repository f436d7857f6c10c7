//! Client side of the storyteller: the story session controller, the generation
//! gateway it drives, and the presentation and account adapters built on top.

pub mod account;
pub mod controller;
pub mod error;
pub mod fallback;
pub mod gateway;
pub mod presenter;
pub mod random;
pub mod session;
pub mod settings;

pub use account::{AccountClient, AuthOutcome, CheckoutOutcome, LogoutOutcome};
pub use controller::{GenerationOutcome, StoryController};
pub use error::{AccountError, GatewayError};
pub use gateway::{
    GeneratedStory, GenerationGateway, HttpGenerationGateway, MissingGenerationGateway,
};
pub use presenter::{Screen, StoryPresenter, UserAction, ViewUpdate};
pub use random::{RandomSource, StdRandomSource};
pub use session::{SessionPhase, StorySession};
pub use settings::{load_client_settings, load_client_settings_from, ClientSettings};
