pub mod event_parser;
pub mod layouts;
pub mod manager;
