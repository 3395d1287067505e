pub mod change_detector;
pub mod homepage;
pub mod lease;
pub mod ops;
pub mod rebuilder;
pub mod strategy;

pub use change_detector::{ChangeDetector, FeedProbe};
pub use lease::LeaseManager;
pub use ops::AdminOps;
pub use rebuilder::{PlaylistRebuilder, SyncAttempt};
