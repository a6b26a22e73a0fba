#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! Bandwidth-adaptive SVC forwarding relay core.
//!
//! Sits between one ingress and one egress RTP/RTCP leg: drops temporal
//! enhancement layers under congestion ([`filter`]), estimates available
//! bandwidth from TWCC feedback ([`bwe`], [`twcc`]), and shapes egress
//! traffic to the estimate ([`pacer`], [`priority_pacer`]). [`orchestrator`]
//! wires the pieces into running tasks.

pub mod bwe;
pub mod clock;
pub mod filter;
pub mod orchestrator;
pub mod pacer;
pub mod priority_pacer;
pub mod rate_counter;
pub mod twcc;

pub use orchestrator::{RelayConfig, RelayOrchestrator, Track};
