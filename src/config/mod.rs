mod config;

pub use self::config::{BatchSettings, ChainSettings, MulticallSettings, Settings, WorkerSettings};
