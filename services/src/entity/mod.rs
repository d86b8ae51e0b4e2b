pub mod request_history;
