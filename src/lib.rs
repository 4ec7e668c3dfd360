// src/lib.rs
pub mod ports {
    pub mod jsonl_commands;
    pub mod jsonl_feed;
}
pub mod config;
pub mod pairtrade;
pub mod risk;
pub mod signal;
pub mod spread_window;
pub mod trade {
    pub mod execution {
        pub mod venue;
    }
    pub mod hedge;
    pub mod orders;
}
pub mod types;
