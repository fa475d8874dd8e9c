mod socket;

pub use socket::{IpcClient, IpcCommand, IpcRequest, IpcServer};
