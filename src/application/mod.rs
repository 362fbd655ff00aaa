// Application layer - use cases over the domain, independent of transport
pub mod dashboard_service;
pub mod form;
pub mod modal;
pub mod notifications;
pub mod render;
pub mod source_adapter;
