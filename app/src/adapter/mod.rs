pub mod homebridge;
pub mod homeserver;
