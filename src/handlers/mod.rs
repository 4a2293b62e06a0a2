//! HTTP request handlers: the administrative API (`admin`) and the
//! stub-serving client surface (`client`).

pub mod admin;
pub mod client;
