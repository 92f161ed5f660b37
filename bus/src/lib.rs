//! Bus-side coordination state for uploads.
//!
//! The bus keeps track of sectors that workers have pushed to hosts but that
//! are not yet part of a persisted object. Contract selection consults this
//! state to account for capacity that is already spoken for.

mod error;
pub mod uploading;

pub use error::{BusError, Result};
pub use uploading::{UPLOAD_EXPIRY, UploadingSectorsCache};
