pub mod board;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod remote;
pub mod session;
pub mod storage;
pub mod task_store;
pub mod view;
