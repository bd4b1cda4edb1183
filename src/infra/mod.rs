pub mod http_client;
pub mod record_file_adapter;
