pub mod character;
pub mod client;
pub mod collaboration;
pub mod friends;
pub mod shop;
pub mod tasks;

pub use client::ApiClient;
