//! PAJSK report pipeline
//!
//! - `request`: request body validation
//! - `sections`: record to typed report sections
//! - `pdf`: paginated, streamed PDF output
//! - `service`: lookup and delivery for both modes

mod pdf;
mod request;
mod sections;
mod service;

pub use pdf::{render_document, PageLayout, Page, Paginator, PdfWriter, RenderError};
pub use request::{parse_identifier, Identifier, IDENTIFIER_FIELD};
pub use sections::{build_sections, Section, SectionKind, CATEGORY_PLACEHOLDER, REMARKS_PLACEHOLDER};
pub use service::{Delivery, DocumentStream, ReportService, MSG_LINK_ISSUED};
