pub mod cascade;
pub mod cdn;
pub mod local;
pub mod paths;
pub mod revalidate;

pub use cascade::CacheCascade;
pub use cdn::CdnPurger;
pub use local::LocalCache;
pub use revalidate::Revalidator;
