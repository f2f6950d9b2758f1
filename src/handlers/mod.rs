pub mod api_handlers;
pub mod generator_handlers;
pub mod health_handlers;
pub mod pages;
pub mod upload_handlers;
pub mod viewer_handlers;
