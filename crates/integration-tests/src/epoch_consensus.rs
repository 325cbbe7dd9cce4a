//! Multi-node epoch consensus scenarios over the in-memory networks.
