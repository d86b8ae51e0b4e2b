pub mod models;

pub use models::{
    ExecuteRequest, ExecuteResponse, ExecuteFailure, ResponseBody,
    HistoryRecord, HistoryPage, ClearResponse, SetupResponse, ErrorResponse,
};
