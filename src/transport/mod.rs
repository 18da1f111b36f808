pub mod bridge;
pub mod http_server;
pub mod middleware;
pub mod routes;
