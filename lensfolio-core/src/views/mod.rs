//! Read-only projections over catalog snapshots

mod filter;
mod lightbox;
mod paginate;

pub use filter::{all_tags, filter_entities, ViewFilter};
pub use lightbox::Lightbox;
pub use paginate::{Page, Paginator};
