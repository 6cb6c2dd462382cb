//! HTTP surface of the host: endpoint handlers, their types and the
//! middleware used by the request pipeline

pub mod middleware;
pub mod routes;
pub mod types;
