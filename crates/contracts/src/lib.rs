//! Wire types shared between the analytics backend and its clients.

pub mod dashboards;
