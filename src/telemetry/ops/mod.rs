pub mod ingest;
pub mod init;
pub mod posts;
pub mod probe;
pub mod serve;
pub mod sub;
pub mod trends;
