pub mod ingest;
pub mod list;
pub mod lookup;
pub mod status;
