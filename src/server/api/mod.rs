pub mod catalog_controller;
pub mod health_controller;
pub mod media_controller;
pub mod relay_controller;
