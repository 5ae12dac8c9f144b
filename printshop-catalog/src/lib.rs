pub mod variant;

pub use variant::{VariantCheck, VariantValidator};
