pub mod volc_client;
