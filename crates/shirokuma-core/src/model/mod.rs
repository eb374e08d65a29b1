//! Item Model & Validation (§4.2 / §3).

mod item;
mod priority;
mod validation;

pub use item::{CreateItemInput, Item, ItemProjection, Nullable, UpdateItemInput};
pub use priority::Priority;
pub use validation::{
    normalize_tags, validate_date, validate_date_range, validate_priority, validate_title,
    validate_type,
};
