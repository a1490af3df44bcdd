// Small helpers shared by the network adapters.

pub mod ids;
