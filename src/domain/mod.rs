pub mod article;
pub mod cookie;
pub mod listing;

pub use article::Article;
pub use cookie::StoredCookie;
pub use listing::{ListingRow, ListingSnapshot};
