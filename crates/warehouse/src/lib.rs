//! Upload of collected tables to the analytics warehouse.
//!
//! The collector never talks to the warehouse; uploads run as a separate
//! step over the CSV tables it leaves in the output directory.

pub mod error;
pub mod plan;
pub mod sanitize;
pub mod uploader;

pub use error::UploadError;
pub use plan::{upload_all, TableUpload, UploadSummary};
pub use sanitize::{sanitize_column_name, sanitize_header};
pub use uploader::{DuneUploader, WarehouseUploader};
