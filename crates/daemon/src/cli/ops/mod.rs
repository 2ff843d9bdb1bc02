pub mod batch;
pub mod daemon;
pub mod health;
pub mod submit;
pub mod version;

pub use batch::Batch;
pub use daemon::Daemon;
pub use health::Health;
pub use submit::Submit;
pub use version::Version;
