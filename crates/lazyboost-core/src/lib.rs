pub mod catalog;
pub mod customer;
pub mod draft;
pub mod error;
pub mod listing;
pub mod mapping;
pub mod money;
pub mod order;
pub mod review;
pub mod transform;
pub mod window;

pub use catalog::{
    Availability, CATALOG_HEADER, CatalogRow, EtsyListing, EtsyListingState, ListingImage,
};
pub use customer::{Address, AddressAction, Customer, NewCustomer, plan_address};
pub use draft::{ListingDraft, OrderDraft};
pub use error::{DecodeError, MappingError};
pub use listing::{Listing, ListingStatus, Variant};
pub use money::{Money, minor_to_f64};
pub use order::{Buyer, Order, OrderSummary, Transaction, split_name};
pub use review::{EnrichedReview, ProductRef, Review};
pub use transform::{CSV_HEADER, JudgeMeReview, ReviewCsvRow, StampedReview};
pub use window::SyncWindow;
