//! Inquirydesk: catalog inquiries with customer/admin message threads.
//!
//! A customer submits an inquiry about a product and receives an opaque id.
//! Customers and admins then exchange messages on the inquiry's thread while
//! admins move it through `pending → processing → completed | cancelled`.
//! The first admin reply on a pending inquiry moves it to `processing`.
//!
//! Layers, bottom up: [`inquiry::store`] (persistence contract with
//! [`inquiry::memory`] and [`inquiry::sqlite`] backends),
//! [`inquiry::access`] (pure access rules), [`inquiry::service`]
//! (orchestration) and [`http`] (JSON API).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod config;
pub mod db;
pub mod http;
pub mod inquiry;
pub mod logging;
pub mod stats;
