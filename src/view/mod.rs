//! Live views and panel view models
//!
//! - **live**: [`LiveView`] keeps a point query fresh from change notifications
//! - **panels**: display-ready values for the public demand, details and
//!   documents panels

pub mod live;
pub mod panels;

pub use live::{ActiveBatch, ActiveDetails, ActiveDocuments, LiveView, ViewQuery, ViewState};
pub use panels::{format_date, format_grouped, DemandPanel, DetailsPanel, DocumentsPanel};
