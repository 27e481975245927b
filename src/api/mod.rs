pub mod doc;
pub mod handlers;
pub mod metric_handlers;
pub mod routes;
pub mod state;
