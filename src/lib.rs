pub mod application {
    pub mod auth_service;
}

pub mod data {
    pub mod user_repository;
}

pub mod domain {
    pub mod error;
    pub mod repository;
    pub mod security;
    pub mod user;
}

pub mod infrastructure {
    pub mod config;
    pub mod logging;
    pub mod security;
}

pub mod presentation {
    pub mod auth;
    pub mod handlers;
    pub mod middleware;
    pub mod routes;
}

pub use presentation::routes::configure;
