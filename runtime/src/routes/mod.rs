pub mod sources;

pub use sources::source_routes;
