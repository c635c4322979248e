//! Backend integration: REST client, STOMP push channel and the task runner
//! bridging blocking calls to the UI loop.

pub mod realtime;
pub mod rest;
pub mod stomp;
pub mod task_runner;
pub mod wire;
