pub mod channel;
pub mod controller;
pub mod error;
pub mod http;
pub mod memory;
pub mod relay;
pub mod remote;

pub use channel::ChannelConfig;
pub use channel::ChannelHandle;
pub use controller::Controller;
pub use controller::ControllerHandle;
pub use controller::Presentation;
pub use error::SyncError;
pub use error::SyncResult;
pub use http::HttpRemoteStore;
pub use memory::MemoryRemoteStore;
pub use relay::Relay;
pub use remote::RemoteStore;
