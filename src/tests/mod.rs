// Test modules for all components
pub mod fixtures;
pub mod test_network;
pub mod test_replay_buffer;
